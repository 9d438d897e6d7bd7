/// # interpreter
///
/// The fetch/decode/execute engine. One `cycle()` is:
///  1. fetch the big-endian word at PC
///  2. decode it into an `Instruction`
///  3. execute it against memory, registers, frame buffer and keypad
///  4. decrement both timers
///  5. PC += 2
///
/// Control flow instructions therefore aim two bytes short of their target;
/// the unconditional advance in step 5 lands them on it.
///
/// Nothing in here can fail mid-cycle. Anomalies (bad opcodes, stack abuse,
/// reads or writes past the end of RAM) are recorded as `Fault`s, execution
/// carries on with a fallback, and the faults are handed back with the `Step`.
use crate::config::Config;
use crate::error::{Error, Fault};
use crate::framebuffer::FrameBuffer;
use crate::instruction::Instruction;
use crate::keypad::Keypad;
use crate::memory::{font_address, xfont_address, Chip8MemoryMap, MemoryMap};
use crate::registers::{Registers, VF};
use log::{info, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// pace scale in 64x32 mode
pub const STANDARD_PACE_SCALE: u32 = 150;
/// pace scale in 128x64 mode
pub const EXTENDED_PACE_SCALE: u32 = 250;

/// what a caller is expected to share between the scheduler and the renderer
pub type SharedInterpreter = Arc<Mutex<Chip8Interpreter>>;

/// what an instruction asks of the world outside the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    /// the sound timer was loaded with a nonzero value
    StartTone,
    /// 00FD; the program is finished
    Exit,
}

/// result of a single `cycle()`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// where the instruction was fetched from
    pub pc: u16,
    /// `None` if the fetch itself ran off the end of memory
    pub instruction: Option<Instruction>,
    pub outcome: Outcome,
    pub faults: Vec<Fault>,
}

pub struct Chip8Interpreter {
    memory: Chip8MemoryMap,
    registers: Registers,
    framebuffer: FrameBuffer,
    keypad: Arc<Keypad>,
    increment_index_on_dump: bool,
    rng: StdRng,
    faults: Vec<Fault>,
    program: Option<Vec<u8>>,
}

impl Chip8Interpreter {
    pub fn new(keypad: Arc<Keypad>, config: &Config) -> Self {
        let mut framebuffer = FrameBuffer::new();
        framebuffer.set_reduce_flicker(config.reduce_flicker);
        framebuffer.set_decay_delay(config.decay_delay);
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Chip8Interpreter {
            memory: Chip8MemoryMap::new(),
            registers: Registers::new(),
            framebuffer,
            keypad,
            increment_index_on_dump: config.increment_index_on_dump,
            rng,
            faults: Vec::new(),
            program: None,
        }
    }

    /// shorthand for wrapping a new interpreter up for sharing
    pub fn shared(keypad: Arc<Keypad>, config: &Config) -> SharedInterpreter {
        Arc::new(Mutex::new(Self::new(keypad, config)))
    }

    /// load a chip8 program at 0x200. the whole machine is reset first, so on
    /// failure it is left blank
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<usize, Error> {
        self.reset();
        self.program = None;
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let len = self.memory.load_program(&mut bytes.as_slice())?;
        info!("loaded {} byte program", len);
        self.program = Some(bytes);
        Ok(len)
    }

    pub fn load_rom(&mut self, path: impl AsRef<Path>) -> Result<usize, Error> {
        let mut f = File::open(path.as_ref())?;
        self.load_program(&mut f)
    }

    /// reset, then load the last program again. returns false (and leaves
    /// the machine reset) if there's nothing to reload
    pub fn restart(&mut self) -> Result<bool, Error> {
        match self.program.take() {
            Some(bytes) => {
                self.load_program(&mut bytes.as_slice())?;
                Ok(true)
            }
            None => {
                self.reset();
                Ok(false)
            }
        }
    }

    /// back to power-on state: registers zeroed, program region cleared,
    /// fonts reinstalled, 64x32 blank screen, no keys down
    pub fn reset(&mut self) {
        self.registers.reset();
        self.memory.reset();
        self.framebuffer.set_extended(false);
        self.keypad.clear();
        self.faults.clear();
    }

    pub fn has_program(&self) -> bool {
        self.program.is_some()
    }

    /// relative instruction rate for the current resolution
    pub fn pace_scale(&self) -> u32 {
        if self.framebuffer.is_extended() {
            EXTENDED_PACE_SCALE
        } else {
            STANDARD_PACE_SCALE
        }
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.registers
    }

    pub fn memory(&self) -> &Chip8MemoryMap {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Chip8MemoryMap {
        &mut self.memory
    }

    pub fn framebuffer(&self) -> &FrameBuffer {
        &self.framebuffer
    }

    pub fn framebuffer_mut(&mut self) -> &mut FrameBuffer {
        &mut self.framebuffer
    }

    pub fn keypad(&self) -> &Arc<Keypad> {
        &self.keypad
    }

    /// faults recorded since the last cycle (or the last call)
    pub fn take_faults(&mut self) -> Vec<Fault> {
        std::mem::take(&mut self.faults)
    }

    /// one full machine cycle. an `Exit` outcome leaves the timers and the
    /// program counter where they were
    pub fn cycle(&mut self) -> Step {
        let pc = self.registers.pc();
        let instruction = match self.memory.get_word(pc as usize) {
            Ok(word) => Some(Instruction::decode(word)),
            Err(fault) => {
                self.faults.push(fault);
                None
            }
        };
        let outcome = match instruction {
            Some(ins) => {
                trace!("{:03x}: {}", pc, ins);
                self.execute(ins)
            }
            None => Outcome::Continue,
        };
        if outcome != Outcome::Exit {
            self.registers.tick_timers();
            self.advance();
        }
        Step {
            pc,
            instruction,
            outcome,
            faults: self.take_faults(),
        }
    }

    /// execute a single instruction, without the timer tick or the PC
    /// advance that `cycle()` wraps around it
    pub fn execute(&mut self, instruction: Instruction) -> Outcome {
        use Instruction::*;

        match instruction {
            ScrollDown(n) => self.framebuffer.scroll_down(n as usize),
            ClearScreen => self.framebuffer.clear(),
            Return => {
                let popped = self.registers.pop();
                let addr = self.absorb(popped);
                self.registers.set_pc(addr);
            }
            ScrollRight => self.framebuffer.scroll_right(),
            ScrollLeft => self.framebuffer.scroll_left(),
            Exit => {
                info!("program exited at {:03x}", self.registers.pc());
                return Outcome::Exit;
            }
            LowRes => {
                info!("switching to 64x32");
                self.framebuffer.set_extended(false);
            }
            HighRes => {
                info!("switching to 128x64");
                self.framebuffer.set_extended(true);
            }
            Jump(addr) => self.jump(addr),
            Call(addr) => {
                let pc = self.registers.pc();
                let pushed = self.registers.push(pc);
                self.absorb(pushed);
                self.jump(addr);
            }
            SkipEqImm(x, kk) => self.skip_if(self.registers.v(x) == kk),
            SkipNeImm(x, kk) => self.skip_if(self.registers.v(x) != kk),
            SkipEqReg(x, y) => self.skip_if(self.registers.v(x) == self.registers.v(y)),
            LoadImm(x, kk) => self.registers.set_v(x, kk),
            AddImm(x, kk) => {
                let vx = self.registers.v(x);
                self.registers.set_v(x, vx.wrapping_add(kk));
            }
            Move(x, y) => self.registers.set_v(x, self.registers.v(y)),
            Or(x, y) => self.alu(x, y, |a, b| a | b),
            And(x, y) => self.alu(x, y, |a, b| a & b),
            Xor(x, y) => self.alu(x, y, |a, b| a ^ b),
            AddReg(x, y) => {
                // flag last: with x == F the carry is what's left in VF
                let (sum, carry) = self.registers.v(x).overflowing_add(self.registers.v(y));
                self.registers.set_v(x, sum);
                self.registers.set_v(VF, carry as u8);
            }
            Sub(x, y) => {
                // flag first: with x == F the difference is what's left in VF
                let (vx, vy) = (self.registers.v(x), self.registers.v(y));
                self.registers.set_v(VF, (vx >= vy) as u8);
                self.registers.set_v(x, vx.wrapping_sub(vy));
            }
            ShiftRight(x) => {
                let vx = self.registers.v(x);
                self.registers.set_v(VF, vx & 0x01);
                self.registers.set_v(x, vx >> 1);
            }
            ReverseSub(x, y) => {
                let (vx, vy) = (self.registers.v(x), self.registers.v(y));
                self.registers.set_v(VF, (vy >= vx) as u8);
                self.registers.set_v(x, vy.wrapping_sub(vx));
            }
            ShiftLeft(x) => {
                let vx = self.registers.v(x);
                self.registers.set_v(VF, vx >> 7);
                self.registers.set_v(x, vx << 1);
            }
            SkipNeReg(x, y) => self.skip_if(self.registers.v(x) != self.registers.v(y)),
            LoadIndex(addr) => self.registers.set_i(addr),
            JumpIndexed(addr) => self.jump(addr.wrapping_add(self.registers.v(0) as u16)),
            Random(x, kk) => {
                let r: u8 = self.rng.gen();
                self.registers.set_v(x, r & kk);
            }
            Draw(x, y, n) => self.draw(x, y, 1, n as usize),
            DrawExtended(x, y) => self.draw(x, y, 2, 16),
            SkipKeyDown(x) => self.skip_if(self.keypad.is_pressed(self.registers.v(x))),
            SkipKeyUp(x) => self.skip_if(!self.keypad.is_pressed(self.registers.v(x))),
            GetDelay(x) => self.registers.set_v(x, self.registers.delay_timer()),
            WaitKey(x) => match self.keypad.first_pressed() {
                Some(key) => self.registers.set_v(x, key),
                // come back to this instruction next cycle
                None => self.rewind(),
            },
            SetDelay(x) => self.registers.set_delay_timer(self.registers.v(x)),
            SetSound(x) => {
                let vx = self.registers.v(x);
                self.registers.set_sound_timer(vx);
                if vx > 0 {
                    return Outcome::StartTone;
                }
            }
            AddIndex(x) => {
                let i = self.registers.i();
                self.registers.set_i(i.wrapping_add(self.registers.v(x) as u16));
            }
            LoadFont(x) => self.registers.set_i(font_address(self.registers.v(x))),
            LoadExtendedFont(x) => self.registers.set_i(xfont_address(self.registers.v(x))),
            StoreBcd(x) => {
                let vx = self.registers.v(x);
                let i = self.registers.i() as usize;
                self.store_byte(i, vx / 100);
                self.store_byte(i + 1, (vx / 10) % 10);
                self.store_byte(i + 2, vx % 10);
            }
            StoreRegisters(x) => {
                let i = self.registers.i() as usize;
                for k in 0..=x {
                    self.store_byte(i + k, self.registers.v(k));
                }
                self.bump_index(x);
            }
            LoadRegisters(x) => {
                let i = self.registers.i() as usize;
                for k in 0..=x {
                    let value = self.load_byte(i + k);
                    self.registers.set_v(k, value);
                }
                self.bump_index(x);
            }
            Unknown(word) => self.faults.push(Fault::UnknownOpcode(word)),
        }
        Outcome::Continue
    }

    fn advance(&mut self) {
        self.registers.set_pc(self.registers.pc().wrapping_add(2));
    }

    fn rewind(&mut self) {
        self.registers.set_pc(self.registers.pc().wrapping_sub(2));
    }

    fn jump(&mut self, addr: u16) {
        self.registers.set_pc(addr.wrapping_sub(2));
    }

    fn skip_if(&mut self, condition: bool) {
        if condition {
            self.advance();
        }
    }

    fn alu(&mut self, x: usize, y: usize, op: impl Fn(u8, u8) -> u8) {
        let result = op(self.registers.v(x), self.registers.v(y));
        self.registers.set_v(x, result);
    }

    fn bump_index(&mut self, x: usize) {
        if self.increment_index_on_dump {
            let i = self.registers.i();
            self.registers.set_i(i.wrapping_add(x as u16 + 1));
        }
    }

    /// XOR a sprite from I onto the screen; `row_bytes` wide, `rows` high
    fn draw(&mut self, x: usize, y: usize, row_bytes: usize, rows: usize) {
        let i = self.registers.i() as usize;
        let mut pixels = Vec::with_capacity(row_bytes * 8 * rows);
        for offset in 0..row_bytes * rows {
            let byte = self.load_byte(i + offset);
            pixels.extend((0..8).rev().map(|bit| (byte >> bit) & 1));
        }
        let collision = self.framebuffer.draw_sprite(
            self.registers.v(x) as usize,
            self.registers.v(y) as usize,
            row_bytes * 8,
            &pixels,
        );
        self.registers.set_v(VF, collision as u8);
    }

    /// a failed read comes back as 0
    fn load_byte(&mut self, addr: usize) -> u8 {
        let result = self.memory.load(addr);
        self.absorb(result)
    }

    /// a failed write is dropped
    fn store_byte(&mut self, addr: usize, value: u8) {
        let result = self.memory.store(addr, value);
        self.absorb(result)
    }

    fn absorb<T: Default>(&mut self, result: Result<T, Fault>) -> T {
        result.unwrap_or_else(|fault| {
            self.faults.push(fault);
            T::default()
        })
    }
}
