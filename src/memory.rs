use crate::error::{Error, Fault};
use std::io;

// NB. addresses are usize here, not u16; I plus an offset can run past
//     0xffff and we want that reported as out of range rather than wrapped

/// Represents the flat memory map the interpreter runs against
pub trait MemoryMap {
    /// total addressable bytes
    fn capacity(&self) -> usize;

    /// get a r/w slice of the underlying memory
    fn get_rw_slice(&mut self, addr: usize, len: usize) -> Result<&mut [u8], Fault>;

    /// get a r/o slice of the underlying memory
    fn get_ro_slice(&self, addr: usize, len: usize) -> Result<&[u8], Fault>;

    /// read a single byte
    fn load(&self, addr: usize) -> Result<u8, Fault> {
        Ok(self.get_ro_slice(addr, 1)?[0])
    }

    /// write a single byte
    fn store(&mut self, addr: usize, value: u8) -> Result<(), Fault> {
        self.get_rw_slice(addr, 1)?[0] = value;
        Ok(())
    }

    /// write a chunk of bytes into "RAM"
    fn write(&mut self, data: &[u8], addr: usize) -> Result<(), Fault> {
        self.get_rw_slice(addr, data.len())?.copy_from_slice(data);
        Ok(())
    }

    /// get a big-endian two-byte word (opcodes)
    fn get_word(&self, addr: usize) -> Result<u16, Fault> {
        let word = self.get_ro_slice(addr, 2)?;
        Ok(((word[0] as u16) << 8) | (word[1] as u16))
    }
}

/// how much RAM we have
pub const CHIP8_RAM_SIZE_BYTES: usize = 4096;

/// where the program is loaded
pub const CHIP8_PROGRAM_ADDR: usize = 0x0200;

/// largest program that fits between the program address and the top of RAM
pub const CHIP8_MAX_PROGRAM_BYTES: usize = CHIP8_RAM_SIZE_BYTES - CHIP8_PROGRAM_ADDR;

/// Defines the SUPER-CHIP memory map:
///   0x0000-0x004f  standard 5-byte font
///   0x004f-0x00ee  SCHIP 10-byte font (shares its first byte with the
///                  standard font's last)
///   0x0200-0x0fff  program and working data
pub struct Chip8MemoryMap {
    bytes: Box<[u8]>,
}

impl MemoryMap for Chip8MemoryMap {
    fn capacity(&self) -> usize {
        self.bytes.len()
    }

    fn get_rw_slice(&mut self, addr: usize, len: usize) -> Result<&mut [u8], Fault> {
        let end = checked_end(addr, len, self.capacity())?;
        Ok(&mut self.bytes[addr..end])
    }

    fn get_ro_slice(&self, addr: usize, len: usize) -> Result<&[u8], Fault> {
        let end = checked_end(addr, len, self.capacity())?;
        Ok(&self.bytes[addr..end])
    }
}

fn checked_end(addr: usize, len: usize, capacity: usize) -> Result<usize, Fault> {
    match addr.checked_add(len) {
        Some(end) if end <= capacity => Ok(end),
        _ => Err(Fault::OutOfRange(addr.max(capacity))),
    }
}

impl Default for Chip8MemoryMap {
    fn default() -> Self {
        Self::new()
    }
}

impl Chip8MemoryMap {
    /// zeroed RAM with both fonts installed
    pub fn new() -> Self {
        let mut mm = Chip8MemoryMap {
            bytes: vec![0u8; CHIP8_RAM_SIZE_BYTES].into_boxed_slice(),
        };
        mm.install_fonts();
        mm
    }

    /// reinstall the fonts and zero the program region; the interpreter
    /// region is otherwise left alone
    pub fn reset(&mut self) {
        self.bytes[CHIP8_PROGRAM_ADDR..].fill(0);
        self.install_fonts();
    }

    /// load a program at 0x200, resetting memory first. on failure memory is
    /// left in its reset state
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<usize, Error> {
        self.reset();
        let mut buf = Vec::new();
        let len = reader.read_to_end(&mut buf)?;
        if len > CHIP8_MAX_PROGRAM_BYTES {
            return Err(Error::ProgramTooLarge {
                len,
                max: CHIP8_MAX_PROGRAM_BYTES,
            });
        }
        self.bytes[CHIP8_PROGRAM_ADDR..CHIP8_PROGRAM_ADDR + len].copy_from_slice(&buf);
        Ok(len)
    }

    fn install_fonts(&mut self) {
        let low = CHIP8_FONT_ADDR..CHIP8_FONT_ADDR + CHIP8_FONT.len();
        self.bytes[low].copy_from_slice(&CHIP8_FONT);
        // written second so the shared byte at 0x4f belongs to the big font
        let high = SCHIP_FONT_ADDR..SCHIP_FONT_ADDR + SCHIP_FONT.len();
        self.bytes[high].copy_from_slice(&SCHIP_FONT);
    }
}

/// address of the 5-byte glyph for a hex digit
pub fn font_address(digit: u8) -> u16 {
    (CHIP8_FONT_ADDR + 5 * (digit & 0x0f) as usize) as u16
}

/// address of the 10-byte SCHIP glyph for a hex digit
pub fn xfont_address(digit: u8) -> u16 {
    (SCHIP_FONT_ADDR + 10 * (digit & 0x0f) as usize) as u16
}

const CHIP8_FONT_ADDR: usize = 0x000;
pub const CHIP8_FONT: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

const SCHIP_FONT_ADDR: usize = 79;
#[rustfmt::skip]
pub const SCHIP_FONT: [u8; 160] = [
    0xF0, 0xF0, 0x90, 0x90, 0x90, 0x90, 0x90, 0x90, 0xF0, 0xF0, // 0
    0x20, 0x20, 0x60, 0x60, 0x20, 0x20, 0x20, 0x20, 0x70, 0x70, // 1
    0xF0, 0xF0, 0x10, 0x10, 0xF0, 0xF0, 0x80, 0x80, 0xF0, 0xF0, // 2
    0xF0, 0xF0, 0x10, 0x10, 0xF0, 0xF0, 0x10, 0x10, 0xF0, 0xF0, // 3
    0x90, 0x90, 0x90, 0x90, 0xF0, 0xF0, 0x10, 0x10, 0x10, 0x10, // 4
    0xF0, 0xF0, 0x80, 0x80, 0xF0, 0xF0, 0x10, 0x10, 0xF0, 0xF0, // 5
    0xF0, 0xF0, 0x80, 0x80, 0xF0, 0xF0, 0x90, 0x90, 0xF0, 0xF0, // 6
    0xF0, 0xF0, 0x10, 0x10, 0x20, 0x20, 0x40, 0x40, 0x40, 0x40, // 7
    0xF0, 0xF0, 0x90, 0x90, 0xF0, 0xF0, 0x90, 0x90, 0xF0, 0xF0, // 8
    0xF0, 0xF0, 0x90, 0x90, 0xF0, 0xF0, 0x10, 0x10, 0xF0, 0xF0, // 9
    0xF0, 0xF0, 0x90, 0x90, 0xF0, 0xF0, 0x90, 0x90, 0x90, 0x90, // A
    0xE0, 0xE0, 0x90, 0x90, 0xE0, 0xE0, 0x90, 0x90, 0xE0, 0xE0, // B
    0xF0, 0xF0, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0xF0, 0xF0, // C
    0xE0, 0xE0, 0x90, 0x90, 0x90, 0x90, 0x90, 0x90, 0xE0, 0xE0, // D
    0xF0, 0xF0, 0x80, 0x80, 0xF0, 0xF0, 0x80, 0x80, 0xF0, 0xF0, // E
    0xF0, 0xF0, 0x80, 0x80, 0xF0, 0xF0, 0x80, 0x80, 0x80, 0x80, // F
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_zeroed() {
        let m = Chip8MemoryMap::new();
        // NB. memory is zeroed from 0x200 because before that we bake in the
        //     fonts
        assert_eq!(m.bytes[0x200..], [0; 0xe00]);
    }

    #[test]
    fn test_fonts_installed() -> Result<(), Fault> {
        let m = Chip8MemoryMap::new();
        assert_eq!(m.get_ro_slice(0, 79)?, &CHIP8_FONT[..79]);
        assert_eq!(m.get_ro_slice(79, 160)?, &SCHIP_FONT[..]);
        // the overlap byte belongs to the SCHIP "0"
        assert_eq!(m.load(79)?, 0xF0);
        Ok(())
    }

    #[test]
    fn test_write_slice_ok() -> Result<(), Fault> {
        let mut dst = Chip8MemoryMap::new();
        let src: &[u8] = &[0, 1, 2, 3, 4, 5, 6, 7];
        dst.write(src, 0x300)?;
        assert_eq!(dst.get_ro_slice(0x300, 8)?, src);
        Ok(())
    }

    #[test]
    fn test_read_word() -> Result<(), Fault> {
        let mut m = Chip8MemoryMap::new();
        m.write(&[0, 1, 2, 3, 4, 5, 6, 7], 0x200)?;
        assert_eq!(m.get_word(0x204)?, 0x0405);
        Ok(())
    }

    #[test]
    fn test_load_store_out_of_range() {
        let mut m = Chip8MemoryMap::new();
        assert_eq!(m.load(4096), Err(Fault::OutOfRange(4096)));
        assert_eq!(m.store(5000, 1), Err(Fault::OutOfRange(5000)));
        assert!(m.load(4095).is_ok());
    }

    #[test]
    fn test_slices_bounded_by_capacity() {
        let mut m = Chip8MemoryMap::new();
        let cap = m.capacity();
        assert_eq!(cap, 4096);
        assert_eq!(m.get_ro_slice(cap - 2, 2).map(|s| s.len()), Ok(2));
        assert_eq!(m.get_rw_slice(cap - 2, 3).map(|s| s.len()), Err(Fault::OutOfRange(cap)));
        assert_eq!(m.get_ro_slice(cap, 0).map(|s| s.len()), Ok(0));
        assert_eq!(m.get_word(cap - 1), Err(Fault::OutOfRange(cap)));
    }

    #[test]
    fn test_write_too_much_is_fault() {
        let mut dst = Chip8MemoryMap::new();
        assert!(dst.write(&[0; 8], 4089).is_err());
        // nothing was written
        assert_eq!(dst.bytes[4089..], [0; 7]);
    }

    #[test]
    fn test_program_load_ok() -> Result<(), Error> {
        let mut dst = Chip8MemoryMap::new();
        let mut prog: &[u8] = &[0x00, 0xe0]; // clear screen
        assert_eq!(dst.load_program(&mut prog)?, 2);
        assert_eq!(dst.get_ro_slice(0x200, 2)?, &[0x00, 0xe0]);
        Ok(())
    }

    #[test]
    fn test_program_too_large() {
        let mut dst = Chip8MemoryMap::new();
        let big = vec![0xaa; CHIP8_MAX_PROGRAM_BYTES + 1];
        let err = dst.load_program(&mut big.as_slice()).unwrap_err();
        assert!(matches!(err, Error::ProgramTooLarge { len, .. } if len == big.len()));
        assert_eq!(dst.bytes[0x200..], [0; 0xe00]);
    }

    #[test]
    fn test_reload_is_idempotent() -> Result<(), Error> {
        let prog: &[u8] = &[0x6a, 0x02, 0x6b, 0x03, 0xa0, 0x00, 0xda, 0xb5];
        let mut once = Chip8MemoryMap::new();
        once.load_program(&mut &prog[..])?;

        let mut twice = Chip8MemoryMap::new();
        twice.load_program(&mut &prog[..])?;
        twice.store(0x400, 0x55)?;
        twice.reset();
        twice.load_program(&mut &prog[..])?;

        assert_eq!(once.bytes[0x200..], twice.bytes[0x200..]);
        Ok(())
    }

    #[test]
    fn test_reset_restores_clobbered_font() -> Result<(), Fault> {
        let mut m = Chip8MemoryMap::new();
        m.store(0, 0x00)?;
        m.reset();
        assert_eq!(m.load(0)?, 0xF0);
        Ok(())
    }

    #[test]
    fn test_font_addresses() {
        assert_eq!(font_address(0), 0);
        assert_eq!(font_address(0xf), 75);
        assert_eq!(font_address(0x1a), 50); // only the low nibble counts
        assert_eq!(xfont_address(0), 79);
        assert_eq!(xfont_address(0xf), 229);
    }
}
