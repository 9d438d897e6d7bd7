//! # superchip8
//!
//! A CHIP-8 / SUPER-CHIP virtual machine that runs in a terminal.
//!
//! ## Design
//!
//! * machine state (memory, registers, frame buffer) lives in one
//!   `Chip8Interpreter`, shared as `Arc<Mutex<_>>`; a whole cycle happens
//!   under one lock
//! * the keypad sits outside the lock as atomic flags, so input never waits
//!   on the interpreter
//! * opcodes are decoded once into an `Instruction` and executed with one
//!   `match`
//! * nothing that goes wrong mid-cycle stops the machine; it becomes a
//!   `Fault` that gets logged and passed on
//! * the scheduler thread runs cycles in paced batches; the main thread
//!   polls input and redraws at about 60Hz
//! * display, input and sound are traits, so the terminal versions can be
//!   swapped for test doubles
//!
//! ## Model
//!
//! ```text
//! main
//!  |-- config (from the command line)
//!  |-- keypad, interpreter(keypad, config)
//!  |-- display, input, sound
//!  |-- scheduler(interpreter, sound, config)
//!  |    `-- loop { batch of cycles; decay; tone on/off; sleep }
//!  `-- loop { input -> keypad/pause/restart/quit; events; draw }
//! ```
pub mod config;
pub mod display;
pub mod error;
pub mod framebuffer;
pub mod input;
pub mod instruction;
pub mod interpreter;
pub mod keypad;
pub mod memory;
pub mod registers;
pub mod scheduler;
pub mod sound;

pub use config::Config;
pub use error::{Error, Fault};
pub use interpreter::{Chip8Interpreter, SharedInterpreter};
pub use scheduler::{Scheduler, SchedulerEvent, SchedulerState};
