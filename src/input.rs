use crossterm::event::{poll, read, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal;
use log::{debug, error};
use std::collections::{HashMap, VecDeque};
use std::io;
use std::time::{Duration, Instant};

/// map of keys read from the terminal to what the chip8 might expect
/// where '1' => 0x01 and 'a' => 0x0a
const CHIP8_LITERAL_KEYMAP: [(char, u8); 16] = [
    ('0', 0x00),
    ('1', 0x01),
    ('2', 0x02),
    ('3', 0x03),
    ('4', 0x04),
    ('5', 0x05),
    ('6', 0x06),
    ('7', 0x07),
    ('8', 0x08),
    ('9', 0x09),
    ('a', 0x0a),
    ('b', 0x0b),
    ('c', 0x0c),
    ('d', 0x0d),
    ('e', 0x0e),
    ('f', 0x0f),
];

/// ditto using left-hand side of qwerty keyboard
const CHIP8_CONVENTIONAL_KEYMAP: [(char, u8); 16] = [
    ('x', 0x00), // x
    ('1', 0x01), // 1
    ('2', 0x02), // 2
    ('3', 0x03), // 3
    ('q', 0x04), // q
    ('w', 0x05), // w
    ('e', 0x06), // e
    ('a', 0x07), // a
    ('s', 0x08), // s
    ('d', 0x09), // d
    ('z', 0x0a), // z
    ('c', 0x0b), // c
    ('4', 0x0c), // 4
    ('r', 0x0d), // r
    ('f', 0x0e), // f
    ('v', 0x0f), // v
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Keymap {
    /// 0-9 and a-f press the hex key of the same name
    Literal,
    /// the 4x4 block at 1234/qwer/asdf/zxcv, laid out like the COSMAC VIP pad
    Conventional,
}

impl Keymap {
    fn table(self) -> HashMap<char, u8> {
        match self {
            Keymap::Literal => HashMap::from(CHIP8_LITERAL_KEYMAP),
            Keymap::Conventional => HashMap::from(CHIP8_CONVENTIONAL_KEYMAP),
        }
    }
}

/// what the input side can tell the rest of the emulator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    KeyDown(u8),
    KeyUp(u8),
    TogglePause,
    Reset,
    Quit,
}

/// reads keypresses
pub trait Input {
    /// everything that happened since the last poll, oldest first
    fn poll(&mut self) -> Result<Vec<InputEvent>, io::Error>;
}

/// Tracks which hex keys are held. Terminals report presses (and auto-repeat)
/// but never releases, so a key counts as released once `hold` has passed
/// without another press of it.
struct HeldKeys {
    hold: Duration,
    held: HashMap<u8, Instant>,
}

impl HeldKeys {
    fn new(hold: Duration) -> Self {
        HeldKeys {
            hold,
            held: HashMap::new(),
        }
    }

    fn press(&mut self, key: u8, now: Instant, out: &mut Vec<InputEvent>) {
        if self.held.insert(key, now).is_none() {
            out.push(InputEvent::KeyDown(key));
        }
    }

    fn expire(&mut self, now: Instant, out: &mut Vec<InputEvent>) {
        let hold = self.hold;
        let mut released: Vec<u8> = self
            .held
            .iter()
            .filter(|&(_, &at)| now.duration_since(at) >= hold)
            .map(|(&k, _)| k)
            .collect();
        released.sort_unstable();
        for key in released {
            self.held.remove(&key);
            out.push(InputEvent::KeyUp(key));
        }
    }
}

/// keyboard input from the terminal, via crossterm
pub struct TermInput {
    keymap: HashMap<char, u8>,
    keys: HeldKeys,
}

impl TermInput {
    pub fn new(keymap: Keymap, hold: Duration) -> Result<Self, io::Error> {
        terminal::enable_raw_mode()?;
        Ok(TermInput {
            keymap: keymap.table(),
            keys: HeldKeys::new(hold),
        })
    }

    fn translate(&mut self, evt: KeyEvent, now: Instant, out: &mut Vec<InputEvent>) {
        match evt.code {
            KeyCode::Char('c') if evt.modifiers.contains(KeyModifiers::CONTROL) => {
                out.push(InputEvent::Quit)
            }
            KeyCode::Char(' ') | KeyCode::Char('p') => out.push(InputEvent::TogglePause),
            KeyCode::Char(key) => match self.keymap.get(&key.to_ascii_lowercase()) {
                Some(&mapped_key) => self.keys.press(mapped_key, now, out),
                None => debug!("can't map {:?} to a hex key", key),
            },
            KeyCode::Backspace => out.push(InputEvent::Reset),
            KeyCode::Esc => out.push(InputEvent::Quit),
            other => debug!("ignoring key {:?}", other),
        }
    }
}

impl Drop for TermInput {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            error!("couldn't restore the terminal: {}", e);
        }
    }
}

impl Input for TermInput {
    fn poll(&mut self) -> Result<Vec<InputEvent>, io::Error> {
        let mut out = Vec::new();
        while poll(Duration::from_millis(0))? {
            if let Event::Key(evt) = read()? {
                self.translate(evt, Instant::now(), &mut out);
            }
        }
        self.keys.expire(Instant::now(), &mut out);
        Ok(out)
    }
}

/// dummy Input implementation for testing
pub struct DummyInput {
    events: VecDeque<Vec<InputEvent>>,
}

impl DummyInput {
    /// each inner vec is handed out by one call to poll
    pub fn new(batches: Vec<Vec<InputEvent>>) -> Self {
        DummyInput {
            events: VecDeque::from(batches),
        }
    }
}

impl Input for DummyInput {
    fn poll(&mut self) -> Result<Vec<InputEvent>, io::Error> {
        Ok(self.events.pop_front().unwrap_or_default())
    }
}
