use crate::framebuffer::{BLUR_DECAY_DELAY, PLAIN_DECAY_DELAY};
use crate::input::Keymap;
use std::time::Duration;

/// Everything that can be tuned from the outside. `main` builds one of these
/// from the command line; tests mostly use `Config::default()`.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// how terminal keys map onto the hex keypad
    pub keymap: Keymap,
    /// play a tone while the sound timer runs
    pub sound: bool,
    /// keep XORed-off pixels rendered until their decay timer runs out
    pub reduce_flicker: bool,
    /// decay timer length for XORed-off pixels, in scheduler loops
    pub decay_delay: u32,
    /// multiplier on the instruction rate
    pub speed: f64,
    /// FX55/FX65 leave I at I + X + 1 instead of untouched
    pub increment_index_on_dump: bool,
    /// how long a terminal key counts as held; terminals only report presses
    pub key_hold: Duration,
    /// fixed seed for CXKK, for reproducible runs
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            keymap: Keymap::Literal,
            sound: true,
            reduce_flicker: true,
            decay_delay: BLUR_DECAY_DELAY,
            speed: 1.0,
            increment_index_on_dump: false,
            key_hold: Duration::from_millis(100),
            seed: None,
        }
    }
}

impl Config {
    /// plain tiles fade out faster than blurred ones
    pub fn plain_tiles(mut self) -> Self {
        self.decay_delay = PLAIN_DECAY_DELAY;
        self
    }
}
