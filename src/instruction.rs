/// # instruction
///
/// Decoding of CHIP-8 / SUPER-CHIP opcode words. An opcode is split into four
/// nibbles:
///
/// ```text
///   n1    n2    n3    n4
///   opcode group
///         x     y     n / minor opcode
///               kk (low byte)
///         nnn (low 12 bits)
/// ```
///
/// Dispatch is on `n1` first, then on `n4`, `kk` or `nnn` depending on the
/// group, following the usual opcode table. Anything that doesn't match
/// decodes to `Unknown` rather than failing.
use std::fmt;

/// general register index, 0x0-0xf
pub type Reg = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// 00CN: scroll the screen down N lines (SCHIP)
    ScrollDown(u8),
    /// 00E0
    ClearScreen,
    /// 00EE
    Return,
    /// 00FB: scroll right (SCHIP)
    ScrollRight,
    /// 00FC: scroll left (SCHIP)
    ScrollLeft,
    /// 00FD: "game over", the program wants to stop (SCHIP)
    Exit,
    /// 00FE: 64x32 (SCHIP)
    LowRes,
    /// 00FF: 128x64 (SCHIP)
    HighRes,
    /// 1NNN
    Jump(u16),
    /// 2NNN
    Call(u16),
    /// 3XKK
    SkipEqImm(Reg, u8),
    /// 4XKK
    SkipNeImm(Reg, u8),
    /// 5XY0
    SkipEqReg(Reg, Reg),
    /// 6XKK
    LoadImm(Reg, u8),
    /// 7XKK
    AddImm(Reg, u8),
    /// 8XY0
    Move(Reg, Reg),
    /// 8XY1
    Or(Reg, Reg),
    /// 8XY2
    And(Reg, Reg),
    /// 8XY3
    Xor(Reg, Reg),
    /// 8XY4
    AddReg(Reg, Reg),
    /// 8XY5
    Sub(Reg, Reg),
    /// 8XY6
    ShiftRight(Reg),
    /// 8XY7
    ReverseSub(Reg, Reg),
    /// 8XYE
    ShiftLeft(Reg),
    /// 9XY0
    SkipNeReg(Reg, Reg),
    /// ANNN
    LoadIndex(u16),
    /// BNNN
    JumpIndexed(u16),
    /// CXKK
    Random(Reg, u8),
    /// DXYN, N > 0
    Draw(Reg, Reg, u8),
    /// DXY0: 16x16 sprite (SCHIP)
    DrawExtended(Reg, Reg),
    /// EX9E
    SkipKeyDown(Reg),
    /// EXA1
    SkipKeyUp(Reg),
    /// FX07
    GetDelay(Reg),
    /// FX0A
    WaitKey(Reg),
    /// FX15
    SetDelay(Reg),
    /// FX18
    SetSound(Reg),
    /// FX1E
    AddIndex(Reg),
    /// FX29
    LoadFont(Reg),
    /// FX30: 10-byte glyph (SCHIP)
    LoadExtendedFont(Reg),
    /// FX33
    StoreBcd(Reg),
    /// FX55
    StoreRegisters(Reg),
    /// FX65
    LoadRegisters(Reg),
    Unknown(u16),
}

impl Instruction {
    pub fn decode(word: u16) -> Instruction {
        use Instruction::*;

        let n1 = (word & 0xF000) >> 12;
        let x = ((word & 0x0F00) >> 8) as Reg;
        let y = ((word & 0x00F0) >> 4) as Reg;
        let n = (word & 0x000F) as u8;
        let kk = (word & 0x00FF) as u8;
        let nnn = word & 0x0FFF;

        match n1 {
            0x0 => match kk {
                0xE0 => ClearScreen,
                0xEE => Return,
                0xFB => ScrollRight,
                0xFC => ScrollLeft,
                0xFD => Exit,
                0xFE => LowRes,
                0xFF => HighRes,
                _ if y == 0xC => ScrollDown(n),
                _ => Unknown(word),
            },
            0x1 => Jump(nnn),
            0x2 => Call(nnn),
            0x3 => SkipEqImm(x, kk),
            0x4 => SkipNeImm(x, kk),
            0x5 => SkipEqReg(x, y),
            0x6 => LoadImm(x, kk),
            0x7 => AddImm(x, kk),
            0x8 => match n {
                0x0 => Move(x, y),
                0x1 => Or(x, y),
                0x2 => And(x, y),
                0x3 => Xor(x, y),
                0x4 => AddReg(x, y),
                0x5 => Sub(x, y),
                0x6 => ShiftRight(x),
                0x7 => ReverseSub(x, y),
                0xE => ShiftLeft(x),
                _ => Unknown(word),
            },
            0x9 => SkipNeReg(x, y),
            0xA => LoadIndex(nnn),
            0xB => JumpIndexed(nnn),
            0xC => Random(x, kk),
            0xD => match n {
                0 => DrawExtended(x, y),
                _ => Draw(x, y, n),
            },
            0xE => match kk {
                0x9E => SkipKeyDown(x),
                0xA1 => SkipKeyUp(x),
                _ => Unknown(word),
            },
            0xF => match kk {
                0x07 => GetDelay(x),
                0x0A => WaitKey(x),
                0x15 => SetDelay(x),
                0x18 => SetSound(x),
                0x1E => AddIndex(x),
                0x29 => LoadFont(x),
                0x30 => LoadExtendedFont(x),
                0x33 => StoreBcd(x),
                0x55 => StoreRegisters(x),
                0x65 => LoadRegisters(x),
                _ => Unknown(word),
            },
            _ => unreachable!("a u16 only has 16 top nibbles"),
        }
    }
}

/// chipper-style mnemonics, handy in trace logs
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;
        match *self {
            ScrollDown(n) => write!(f, "scd {}", n),
            ClearScreen => write!(f, "cls"),
            Return => write!(f, "rts"),
            ScrollRight => write!(f, "scr"),
            ScrollLeft => write!(f, "scl"),
            Exit => write!(f, "exit"),
            LowRes => write!(f, "low"),
            HighRes => write!(f, "high"),
            Jump(a) => write!(f, "jmp {:03x}", a),
            Call(a) => write!(f, "jsr {:03x}", a),
            SkipEqImm(x, k) => write!(f, "skeq v{:x}, {:02x}", x, k),
            SkipNeImm(x, k) => write!(f, "skne v{:x}, {:02x}", x, k),
            SkipEqReg(x, y) => write!(f, "skeq v{:x}, v{:x}", x, y),
            LoadImm(x, k) => write!(f, "mov v{:x}, {:02x}", x, k),
            AddImm(x, k) => write!(f, "add v{:x}, {:02x}", x, k),
            Move(x, y) => write!(f, "mov v{:x}, v{:x}", x, y),
            Or(x, y) => write!(f, "or v{:x}, v{:x}", x, y),
            And(x, y) => write!(f, "and v{:x}, v{:x}", x, y),
            Xor(x, y) => write!(f, "xor v{:x}, v{:x}", x, y),
            AddReg(x, y) => write!(f, "add v{:x}, v{:x}", x, y),
            Sub(x, y) => write!(f, "sub v{:x}, v{:x}", x, y),
            ShiftRight(x) => write!(f, "shr v{:x}", x),
            ReverseSub(x, y) => write!(f, "rsb v{:x}, v{:x}", x, y),
            ShiftLeft(x) => write!(f, "shl v{:x}", x),
            SkipNeReg(x, y) => write!(f, "skne v{:x}, v{:x}", x, y),
            LoadIndex(a) => write!(f, "mvi {:03x}", a),
            JumpIndexed(a) => write!(f, "jmi {:03x}", a),
            Random(x, k) => write!(f, "rand v{:x}, {:02x}", x, k),
            Draw(x, y, n) => write!(f, "sprite v{:x}, v{:x}, {:x}", x, y, n),
            DrawExtended(x, y) => write!(f, "xsprite v{:x}, v{:x}", x, y),
            SkipKeyDown(x) => write!(f, "skpr v{:x}", x),
            SkipKeyUp(x) => write!(f, "skup v{:x}", x),
            GetDelay(x) => write!(f, "gdelay v{:x}", x),
            WaitKey(x) => write!(f, "key v{:x}", x),
            SetDelay(x) => write!(f, "sdelay v{:x}", x),
            SetSound(x) => write!(f, "ssound v{:x}", x),
            AddIndex(x) => write!(f, "adi v{:x}", x),
            LoadFont(x) => write!(f, "font v{:x}", x),
            LoadExtendedFont(x) => write!(f, "xfont v{:x}", x),
            StoreBcd(x) => write!(f, "bcd v{:x}", x),
            StoreRegisters(x) => write!(f, "str v0-v{:x}", x),
            LoadRegisters(x) => write!(f, "ldr v0-v{:x}", x),
            Unknown(w) => write!(f, "dw {:04x}", w),
        }
    }
}
