use std::sync::atomic::{AtomicBool, Ordering};

pub const NUM_KEYS: usize = 16;

/// 16-key hex keypad. written by whatever delivers key events, read by the
/// interpreter; each key is its own atomic flag so the two sides never need
/// to share a lock
#[derive(Debug, Default)]
pub struct Keypad {
    keys: [AtomicBool; NUM_KEYS],
}

impl Keypad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_down(&self, key: u8) {
        self.keys[(key & 0xf) as usize].store(true, Ordering::Release);
    }

    pub fn key_up(&self, key: u8) {
        self.keys[(key & 0xf) as usize].store(false, Ordering::Release);
    }

    pub fn is_pressed(&self, key: u8) -> bool {
        self.keys[(key & 0xf) as usize].load(Ordering::Acquire)
    }

    /// lowest-numbered key currently down, if any
    pub fn first_pressed(&self) -> Option<u8> {
        (0..NUM_KEYS as u8).find(|&k| self.is_pressed(k))
    }

    /// release everything
    pub fn clear(&self) {
        for key in &self.keys {
            key.store(false, Ordering::Release);
        }
    }
}
