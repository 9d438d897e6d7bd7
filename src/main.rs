use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use log::{error, info};

use superchip8::config::Config;
use superchip8::display::{Display, MonoTermDisplay};
use superchip8::input::{Input, InputEvent, Keymap, TermInput};
use superchip8::interpreter::Chip8Interpreter;
use superchip8::keypad::Keypad;
use superchip8::scheduler::{Scheduler, SchedulerEvent, MAX_SPEED, MIN_SPEED};
use superchip8::sound::{Mute, SimpleBeep, Sound};

/// roughly 60 frames a second
const FRAME_TIME: Duration = Duration::from_micros(16_667);

/// Run a CHIP-8 / SUPER-CHIP program in the terminal.
///
/// Space or p pauses, backspace restarts the program, esc quits. Logs go to
/// stderr (RUST_LOG=info etc.), so redirect it somewhere if you want them.
#[derive(Parser, Debug)]
#[command(name = "superchip8", version)]
struct Args {
    /// program to run
    rom: PathBuf,

    /// which terminal keys make up the hex keypad
    #[arg(long, value_enum, default_value_t = Keymap::Literal)]
    keymap: Keymap,

    /// never beep
    #[arg(long)]
    no_sound: bool,

    /// clear XORed-off pixels immediately instead of letting them fade
    #[arg(long)]
    no_reduce_flicker: bool,

    /// shorter fade for XORed-off pixels
    #[arg(long)]
    plain_tiles: bool,

    /// instruction rate multiplier, 0.01 to 100
    #[arg(long, default_value_t = 1.0, value_parser = parse_speed)]
    speed: f64,

    /// FX55/FX65 advance I past the registers they touch
    #[arg(long)]
    increment_index: bool,

    /// how long a key counts as held after the terminal reports it
    #[arg(long, default_value_t = 100)]
    key_hold_ms: u64,

    /// seed for the random number generator
    #[arg(long)]
    seed: Option<u64>,
}

fn parse_speed(s: &str) -> Result<f64, String> {
    let speed: f64 = s.parse().map_err(|e| format!("{}", e))?;
    if (MIN_SPEED..=MAX_SPEED).contains(&speed) {
        Ok(speed)
    } else {
        Err(format!("must be between {} and {}", MIN_SPEED, MAX_SPEED))
    }
}

impl Args {
    fn config(&self) -> Config {
        let config = Config {
            keymap: self.keymap,
            sound: !self.no_sound,
            reduce_flicker: !self.no_reduce_flicker,
            speed: self.speed,
            increment_index_on_dump: self.increment_index,
            key_hold: Duration::from_millis(self.key_hold_ms),
            seed: self.seed,
            ..Config::default()
        };
        if self.plain_tiles {
            config.plain_tiles()
        } else {
            config
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();
    let config = args.config();

    // load the program before touching the terminal, so a bad path is
    // reported on a sane screen
    let keypad = Arc::new(Keypad::new());
    let interpreter = Chip8Interpreter::shared(Arc::clone(&keypad), &config);
    let len = interpreter
        .lock()
        .map_err(|e| e.to_string())?
        .load_rom(&args.rom)?;
    info!("{}: {} bytes", args.rom.display(), len);

    let sound: Box<dyn Sound + Send> = if config.sound {
        Box::new(SimpleBeep::new())
    } else {
        Box::new(Mute::new())
    };

    let mut display = MonoTermDisplay::new()?;
    let mut input = TermInput::new(config.keymap, config.key_hold)?;
    let mut scheduler = Scheduler::spawn(interpreter, sound, &config)?;

    let result = main_loop(&scheduler, &keypad, &mut display, &mut input);
    scheduler.stop()?;
    result
}

fn main_loop(
    scheduler: &Scheduler,
    keypad: &Keypad,
    display: &mut impl Display,
    input: &mut impl Input,
) -> Result<(), Box<dyn Error>> {
    loop {
        let started = Instant::now();

        for event in input.poll()? {
            match event {
                InputEvent::KeyDown(key) => keypad.key_down(key),
                InputEvent::KeyUp(key) => keypad.key_up(key),
                InputEvent::TogglePause => {
                    scheduler.toggle_pause();
                }
                InputEvent::Reset => {
                    scheduler.restart()?;
                }
                InputEvent::Quit => return Ok(()),
            }
        }

        for event in scheduler.events().try_iter() {
            match event {
                // the scheduler has already logged it
                SchedulerEvent::Fault { .. } => {}
                SchedulerEvent::Exited => {
                    info!("program finished");
                    return Ok(());
                }
            }
        }

        // copy the frame out so the scheduler isn't held up by the terminal
        let frame = match scheduler.interpreter().lock() {
            Ok(interp) => interp.framebuffer().clone(),
            Err(e) => {
                error!("{}", e);
                return Err(e.to_string().into());
            }
        };
        display.draw(&frame, scheduler.state())?;

        if let Some(rest) = FRAME_TIME.checked_sub(started.elapsed()) {
            thread::sleep(rest);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use superchip8::display::DummyDisplay;
    use superchip8::input::DummyInput;
    use superchip8::scheduler::SchedulerState;

    #[test]
    fn test_defaults_match_config() -> Result<(), clap::Error> {
        let args = Args::try_parse_from(["superchip8", "game.ch8"])?;
        assert_eq!(args.rom, PathBuf::from("game.ch8"));
        assert_eq!(args.config(), Config::default());
        Ok(())
    }

    #[test]
    fn test_flags() -> Result<(), clap::Error> {
        let args = Args::try_parse_from([
            "superchip8",
            "--keymap",
            "conventional",
            "--no-sound",
            "--no-reduce-flicker",
            "--plain-tiles",
            "--speed",
            "2.5",
            "--increment-index",
            "--key-hold-ms",
            "40",
            "--seed",
            "7",
            "game.ch8",
        ])?;
        let config = args.config();
        assert_eq!(config.keymap, Keymap::Conventional);
        assert!(!config.sound);
        assert!(!config.reduce_flicker);
        assert_eq!(config.decay_delay, 15);
        assert_eq!(config.speed, 2.5);
        assert!(config.increment_index_on_dump);
        assert_eq!(config.key_hold, Duration::from_millis(40));
        assert_eq!(config.seed, Some(7));
        Ok(())
    }

    #[test]
    fn test_rom_is_required() {
        assert!(Args::try_parse_from(["superchip8"]).is_err());
    }

    #[test]
    fn test_speed_out_of_range_is_rejected() {
        for speed in ["0", "-1", "1e-21", "1000", "NaN", "fast"] {
            let args = Args::try_parse_from(["superchip8", "--speed", speed, "game.ch8"]);
            assert!(args.is_err(), "--speed {} was accepted", speed);
        }
        assert!(Args::try_parse_from(["superchip8", "--speed", "0.01", "game.ch8"]).is_ok());
    }

    // main_loop tests
    fn spawn(words: &[u16]) -> Result<(Scheduler, Arc<Keypad>), Box<dyn Error>> {
        let config = Config {
            sound: false,
            seed: Some(3),
            ..Config::default()
        };
        let keypad = Arc::new(Keypad::new());
        let interpreter = Chip8Interpreter::shared(Arc::clone(&keypad), &config);
        let scheduler = Scheduler::spawn(interpreter, Box::new(Mute::new()), &config)?;
        let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_be_bytes()).collect();
        scheduler.reload(&bytes)?;
        Ok((scheduler, keypad))
    }

    #[test]
    fn test_keys_reach_keypad() -> Result<(), Box<dyn Error>> {
        // 200: jmp 200
        let (mut scheduler, keypad) = spawn(&[0x1200])?;
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new(vec![
            vec![InputEvent::KeyDown(5), InputEvent::KeyDown(6)],
            vec![InputEvent::KeyUp(6)],
            vec![InputEvent::Quit],
        ]);
        main_loop(&scheduler, &keypad, &mut display, &mut input)?;
        assert!(keypad.is_pressed(5));
        assert!(!keypad.is_pressed(6));
        // one frame per poll before the quit
        assert_eq!(display.frames(), 2);
        scheduler.stop()?;
        Ok(())
    }

    #[test]
    fn test_returns_when_program_exits() -> Result<(), Box<dyn Error>> {
        // 200: exit
        let (mut scheduler, keypad) = spawn(&[0x00FD])?;
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new(vec![]);
        main_loop(&scheduler, &keypad, &mut display, &mut input)?;
        assert_eq!(scheduler.state(), SchedulerState::Halted);
        scheduler.stop()?;
        Ok(())
    }

    #[test]
    fn test_toggle_pause() -> Result<(), Box<dyn Error>> {
        let (mut scheduler, keypad) = spawn(&[0x1200])?;
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new(vec![
            vec![InputEvent::TogglePause],
            vec![InputEvent::Quit],
        ]);
        main_loop(&scheduler, &keypad, &mut display, &mut input)?;
        assert_eq!(scheduler.state(), SchedulerState::Paused);
        assert!(display.frames() > 0);
        scheduler.stop()?;
        Ok(())
    }

    #[test]
    fn test_reset_restarts_program() -> Result<(), Box<dyn Error>> {
        // 200: mov v0, 2a; 202: exit
        let (mut scheduler, keypad) = spawn(&[0x602A, 0x00FD])?;
        // let it run to the end and halt
        let event = scheduler.events().recv_timeout(Duration::from_secs(2))?;
        assert_eq!(event, SchedulerEvent::Exited);
        assert_eq!(scheduler.state(), SchedulerState::Halted);

        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new(vec![vec![InputEvent::Reset], vec![InputEvent::Quit]]);
        keypad.key_down(1);
        main_loop(&scheduler, &keypad, &mut display, &mut input)?;
        // the restart released the keys and loaded the program again
        assert!(!keypad.is_pressed(1));
        assert!(scheduler.interpreter().lock().map_err(|e| e.to_string())?.has_program());
        scheduler.stop()?;
        Ok(())
    }
}
