use beep::beep;
use std::error::Error;

/// The audio side only ever hears two things from the interpreter: start a
/// sustained tone, stop it. waveforms and devices are the implementor's
/// business
pub trait Sound {
    fn start_tone(&mut self) -> Result<(), Box<dyn Error>>;
    fn stop_tone(&mut self) -> Result<(), Box<dyn Error>>;
    fn is_sounding(&self) -> bool;
}

const SIMPLEBEEP_PITCH: u16 = 2093; // C

/// PC speaker beep via the `beep` crate
pub struct SimpleBeep {
    is_beeping: bool,
}

impl SimpleBeep {
    pub fn new() -> Self {
        SimpleBeep { is_beeping: false }
    }
}

impl Default for SimpleBeep {
    fn default() -> Self {
        Self::new()
    }
}

impl Sound for SimpleBeep {
    fn start_tone(&mut self) -> Result<(), Box<dyn Error>> {
        beep(SIMPLEBEEP_PITCH)?;
        self.is_beeping = true;
        Ok(())
    }

    fn stop_tone(&mut self) -> Result<(), Box<dyn Error>> {
        beep(0)?;
        self.is_beeping = false;
        Ok(())
    }

    fn is_sounding(&self) -> bool {
        self.is_beeping
    }
}

/// silence; remembers whether it would be sounding
#[derive(Default)]
pub struct Mute {
    sounding: bool,
}

impl Mute {
    pub fn new() -> Self {
        Mute::default()
    }
}

impl Sound for Mute {
    fn start_tone(&mut self) -> Result<(), Box<dyn Error>> {
        self.sounding = true;
        Ok(())
    }

    fn stop_tone(&mut self) -> Result<(), Box<dyn Error>> {
        self.sounding = false;
        Ok(())
    }

    fn is_sounding(&self) -> bool {
        self.sounding
    }
}
