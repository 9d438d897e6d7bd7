/// # registers
///
/// CPU-visible state of the interpreter:
///  * V0-VF general registers; VF doubles as the carry/borrow/collision flag
///  * I, the 16bit address register
///  * the program counter, starting at 0x200
///  * a 16 deep call stack. the stack pointer starts at the top slot and
///    grows downward, so "empty" is 15 and "full" is -1
///  * delay and sound timers
use crate::error::Fault;
use crate::memory::CHIP8_PROGRAM_ADDR;

pub const STACK_SIZE: usize = 16;
pub const NUM_REGISTERS: usize = 16;
pub const VF: usize = 0xf;

const STACK_EMPTY: isize = STACK_SIZE as isize - 1;
const STACK_FULL: isize = -1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registers {
    v: [u8; NUM_REGISTERS],
    i: u16,
    pc: u16,
    stack: [u16; STACK_SIZE],
    sp: isize,
    delay_timer: u8,
    sound_timer: u8,
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

impl Registers {
    pub fn new() -> Self {
        Registers {
            v: [0; NUM_REGISTERS],
            i: 0,
            pc: CHIP8_PROGRAM_ADDR as u16,
            stack: [0; STACK_SIZE],
            sp: STACK_EMPTY,
            delay_timer: 0,
            sound_timer: 0,
        }
    }

    /// zero everything and point the program counter back at 0x200
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn v(&self, register: usize) -> u8 {
        self.v[register & 0xf]
    }

    pub fn set_v(&mut self, register: usize, value: u8) {
        self.v[register & 0xf] = value;
    }

    pub fn i(&self) -> u16 {
        self.i
    }

    pub fn set_i(&mut self, value: u16) {
        self.i = value;
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn set_pc(&mut self, value: u16) {
        self.pc = value;
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer
    }

    pub fn set_delay_timer(&mut self, value: u8) {
        self.delay_timer = value;
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer
    }

    pub fn set_sound_timer(&mut self, value: u8) {
        self.sound_timer = value;
    }

    pub fn stack_pointer(&self) -> isize {
        self.sp
    }

    /// number of return addresses currently on the stack
    pub fn stack_depth(&self) -> usize {
        (STACK_EMPTY - self.sp) as usize
    }

    /// store then decrement. pushing onto a full stack clobbers the lowest
    /// slot and reports an overflow
    pub fn push(&mut self, value: u16) -> Result<(), Fault> {
        if self.sp == STACK_FULL {
            self.stack[0] = value;
            return Err(Fault::StackOverflow);
        }
        self.stack[self.sp as usize] = value;
        self.sp -= 1;
        Ok(())
    }

    /// increment then read. popping an empty stack reports an underflow and
    /// yields 0
    pub fn pop(&mut self) -> Result<u16, Fault> {
        if self.sp == STACK_EMPTY {
            return Err(Fault::StackUnderflow);
        }
        self.sp += 1;
        Ok(self.stack[self.sp as usize])
    }

    /// one tick of both countdown timers
    pub fn tick_timers(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let r = Registers::new();
        assert_eq!(r.pc(), 0x200);
        assert_eq!(r.stack_pointer(), 15);
        assert_eq!(r.stack_depth(), 0);
        assert_eq!(r.i(), 0);
        assert!((0..16).all(|x| r.v(x) == 0));
    }

    #[test]
    fn test_push_pop_lifo() -> Result<(), Fault> {
        let mut r = Registers::new();
        r.push(0x202)?;
        r.push(0x304)?;
        assert_eq!(r.stack_depth(), 2);
        assert_eq!(r.pop()?, 0x304);
        assert_eq!(r.pop()?, 0x202);
        assert_eq!(r.stack_depth(), 0);
        Ok(())
    }

    #[test]
    fn test_sixteen_pushes_fit() -> Result<(), Fault> {
        let mut r = Registers::new();
        for n in 0..16 {
            r.push(n)?;
        }
        assert_eq!(r.stack_pointer(), -1);
        assert_eq!(r.pop()?, 15);
        Ok(())
    }

    #[test]
    fn test_overflow_reported_and_clamped() {
        let mut r = Registers::new();
        for n in 0..16 {
            r.push(n).unwrap();
        }
        assert_eq!(r.push(0xabc), Err(Fault::StackOverflow));
        assert_eq!(r.stack_pointer(), -1);
        // the value landed in the lowest slot
        assert_eq!(r.pop(), Ok(0xabc));
    }

    #[test]
    fn test_underflow_yields_zero_and_stays_empty() {
        let mut r = Registers::new();
        assert_eq!(r.pop(), Err(Fault::StackUnderflow));
        assert_eq!(r.stack_pointer(), 15);
        // still usable afterwards
        r.push(0x222).unwrap();
        assert_eq!(r.pop(), Ok(0x222));
    }

    #[test]
    fn test_tick_timers_stop_at_zero() {
        let mut r = Registers::new();
        r.set_delay_timer(2);
        r.set_sound_timer(1);
        r.tick_timers();
        assert_eq!((r.delay_timer(), r.sound_timer()), (1, 0));
        r.tick_timers();
        r.tick_timers();
        assert_eq!((r.delay_timer(), r.sound_timer()), (0, 0));
    }

    #[test]
    fn test_reset() {
        let mut r = Registers::new();
        r.set_v(3, 9);
        r.set_i(0x123);
        r.set_pc(0x444);
        r.push(0x206).unwrap();
        r.set_delay_timer(5);
        r.reset();
        assert_eq!(r, Registers::new());
    }
}
