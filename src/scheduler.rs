/// # scheduler
///
/// Runs the interpreter on its own thread. Cycles are run in batches of
/// `BATCH_CYCLES`; between batches the thread sleeps until the next batch is
/// due, and between the cycles of a batch it only yields. Every cycle slot
/// ages the frame buffer's decay timers, whether or not an instruction runs
/// in it, so fading pixels keep fading while paused.
///
/// States:
///
/// ```text
///   Halted --reload/restart--> Running <--pause/resume--> Paused
///      ^                          |
///      `------- 00FD / reset -----'
/// ```
use crate::config::Config;
use crate::error::{Error, Fault};
use crate::interpreter::{Outcome, SharedInterpreter};
use crate::sound::Sound;
use log::{debug, error, info, warn};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// cycles run back to back before sleeping
pub const BATCH_CYCLES: u32 = 15;

/// nominal cost of one instruction, in milliseconds
pub const CYCLE_TIME_MS: f64 = 0.015;

/// slowest speed multiplier accepted
pub const MIN_SPEED: f64 = 0.01;

/// fastest speed multiplier accepted
pub const MAX_SPEED: f64 = 100.0;

/// longest single sleep, so a stop request is seen promptly at low speed
const SLEEP_SLICE: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Running,
    Paused,
    /// reset, waiting for a program
    Halted,
}

/// things the application hears about from the scheduler thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerEvent {
    Fault { pc: u16, fault: Fault },
    /// the program ran 00FD; the machine has been reset
    Exited,
}

/// Keeps batches on a fixed cadence. The batch rate is
/// `pace_scale * BATCH_CYCLES * CYCLE_TIME_MS * speed` Hz.
pub struct Pacer {
    speed: f64,
    pace_scale: u32,
    period: Duration,
    deadline: Instant,
}

impl Pacer {
    pub fn new(pace_scale: u32, speed: f64) -> Self {
        let speed = if !(speed.is_finite() && speed > 0.0) {
            warn!("ignoring speed {}", speed);
            1.0
        } else if !(MIN_SPEED..=MAX_SPEED).contains(&speed) {
            let clamped = speed.clamp(MIN_SPEED, MAX_SPEED);
            warn!("speed {} out of range, using {}", speed, clamped);
            clamped
        } else {
            speed
        };
        let period = Self::period_for(pace_scale, speed);
        Pacer {
            speed,
            pace_scale,
            period,
            deadline: Instant::now() + period,
        }
    }

    /// batches per second
    pub fn batch_rate(pace_scale: u32, speed: f64) -> f64 {
        pace_scale as f64 * BATCH_CYCLES as f64 * CYCLE_TIME_MS * speed
    }

    fn period_for(pace_scale: u32, speed: f64) -> Duration {
        Duration::from_secs_f64(1.0 / Self::batch_rate(pace_scale.max(1), speed))
    }

    pub fn set_pace_scale(&mut self, pace_scale: u32) {
        if pace_scale != self.pace_scale {
            self.pace_scale = pace_scale;
            self.period = Self::period_for(pace_scale, self.speed);
            debug!("batch period now {:?}", self.period);
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// sleep until the next batch is due, or until `running` goes false. if
    /// we've fallen behind, start counting again from now rather than running
    /// batches back to back
    pub fn wait(&mut self, running: &AtomicBool) {
        let now = Instant::now();
        if self.deadline <= now {
            self.deadline = now + self.period;
            return;
        }
        while running.load(Ordering::Acquire) {
            let now = Instant::now();
            if now >= self.deadline {
                break;
            }
            spin_sleep::sleep((self.deadline - now).min(SLEEP_SLICE));
        }
        self.deadline += self.period;
    }
}

#[derive(Debug, Default)]
struct Control {
    running: AtomicBool,
    paused: AtomicBool,
    halted: AtomicBool,
}

impl Control {
    fn is_active(&self) -> bool {
        !self.paused.load(Ordering::Acquire) && !self.halted.load(Ordering::Acquire)
    }
}

/// handle on the scheduler thread. dropping it stops the thread
pub struct Scheduler {
    interpreter: SharedInterpreter,
    control: Arc<Control>,
    events: Receiver<SchedulerEvent>,
    handle: Option<JoinHandle<()>>,
}

impl Scheduler {
    /// start running `interpreter` on a new thread. if it has no program
    /// loaded the scheduler starts out halted
    pub fn spawn(
        interpreter: SharedInterpreter,
        sound: Box<dyn Sound + Send>,
        config: &Config,
    ) -> Result<Self, Error> {
        let (has_program, pace_scale) = {
            let interp = interpreter.lock()?;
            (interp.has_program(), interp.pace_scale())
        };
        let control = Arc::new(Control::default());
        control.running.store(true, Ordering::Release);
        control.halted.store(!has_program, Ordering::Release);

        let (tx, rx) = channel();
        let worker = Worker {
            interpreter: Arc::clone(&interpreter),
            control: Arc::clone(&control),
            sound,
            events: tx,
            pacer: Pacer::new(pace_scale, config.speed),
        };
        let handle = thread::Builder::new()
            .name("chip8-scheduler".into())
            .spawn(move || worker.run())?;

        Ok(Scheduler {
            interpreter,
            control,
            events: rx,
            handle: Some(handle),
        })
    }

    pub fn interpreter(&self) -> &SharedInterpreter {
        &self.interpreter
    }

    pub fn events(&self) -> &Receiver<SchedulerEvent> {
        &self.events
    }

    pub fn state(&self) -> SchedulerState {
        if self.control.halted.load(Ordering::Acquire) {
            SchedulerState::Halted
        } else if self.control.paused.load(Ordering::Acquire) {
            SchedulerState::Paused
        } else {
            SchedulerState::Running
        }
    }

    pub fn pause(&self) {
        self.control.paused.store(true, Ordering::Release);
    }

    pub fn resume(&self) {
        self.control.paused.store(false, Ordering::Release);
    }

    /// returns whether we're now paused
    pub fn toggle_pause(&self) -> bool {
        let paused = !self.control.paused.fetch_xor(true, Ordering::AcqRel);
        info!("{}", if paused { "paused" } else { "resumed" });
        paused
    }

    pub fn is_paused(&self) -> bool {
        self.control.paused.load(Ordering::Acquire)
    }

    /// reset the machine and wait for a program
    pub fn reset(&self) -> Result<(), Error> {
        let mut interp = self.interpreter.lock()?;
        self.control.halted.store(true, Ordering::Release);
        interp.reset();
        Ok(())
    }

    /// reset, then start the last program again from the top
    pub fn restart(&self) -> Result<bool, Error> {
        let mut interp = self.interpreter.lock()?;
        self.control.halted.store(true, Ordering::Release);
        let reloaded = interp.restart()?;
        self.control.halted.store(!reloaded, Ordering::Release);
        Ok(reloaded)
    }

    /// swap in a new program and run it
    pub fn reload(&self, program: &[u8]) -> Result<usize, Error> {
        let mut interp = self.interpreter.lock()?;
        self.control.halted.store(true, Ordering::Release);
        let len = interp.load_program(&mut &program[..])?;
        self.control.halted.store(false, Ordering::Release);
        Ok(len)
    }

    pub fn load_rom(&self, path: impl AsRef<Path>) -> Result<usize, Error> {
        let mut interp = self.interpreter.lock()?;
        self.control.halted.store(true, Ordering::Release);
        let len = interp.load_rom(path)?;
        self.control.halted.store(false, Ordering::Release);
        Ok(len)
    }

    /// ask the thread to finish its current cycle and wait for it
    pub fn stop(&mut self) -> Result<(), Error> {
        self.control.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            handle.join().map_err(|_| Error::SchedulerPanicked)?;
            debug!("scheduler stopped");
        }
        Ok(())
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!("{}", e);
        }
    }
}

/// everything owned by the scheduler thread
struct Worker {
    interpreter: SharedInterpreter,
    control: Arc<Control>,
    sound: Box<dyn Sound + Send>,
    events: Sender<SchedulerEvent>,
    pacer: Pacer,
}

impl Worker {
    fn run(mut self) {
        while self.control.running.load(Ordering::Acquire) {
            for _ in 0..BATCH_CYCLES {
                if !self.control.running.load(Ordering::Acquire) {
                    break;
                }
                if let Err(e) = self.tick() {
                    error!("scheduler giving up: {}", e);
                    self.control.running.store(false, Ordering::Release);
                    break;
                }
                thread::yield_now();
            }
            self.pacer.wait(&self.control.running);
        }
        self.silence();
    }

    /// one cycle slot. the interpreter lock is only held while the machine
    /// is touched; the tone is dealt with afterwards
    fn tick(&mut self) -> Result<(), Error> {
        let (outcome, sound_timer) = {
            let mut interp = self.interpreter.lock()?;
            interp.framebuffer_mut().update_decay();
            if !self.control.is_active() {
                drop(interp);
                self.silence();
                return Ok(());
            }

            let step = interp.cycle();
            for fault in step.faults {
                warn!("{:03x}: {} (code {})", step.pc, fault, fault.code());
                let _ = self.events.send(SchedulerEvent::Fault { pc: step.pc, fault });
            }
            if step.outcome == Outcome::Exit {
                interp.reset();
                self.control.halted.store(true, Ordering::Release);
            }
            self.pacer.set_pace_scale(interp.pace_scale());
            (step.outcome, interp.registers().sound_timer())
        };

        match outcome {
            Outcome::StartTone if !self.sound.is_sounding() => {
                if let Err(e) = self.sound.start_tone() {
                    error!("couldn't start tone: {}", e);
                }
            }
            Outcome::Exit => {
                self.silence();
                let _ = self.events.send(SchedulerEvent::Exited);
                return Ok(());
            }
            _ => {}
        }
        if sound_timer == 0 {
            self.silence();
        }
        Ok(())
    }

    fn silence(&mut self) {
        if self.sound.is_sounding() {
            if let Err(e) = self.sound.stop_tone() {
                error!("couldn't stop tone: {}", e);
            }
        }
    }
}
