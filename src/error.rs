use std::io;
use std::sync::PoisonError;
use thiserror::Error;

/// Fatal errors: something the caller of a setup operation has to deal with.
/// Nothing in here is ever produced mid-cycle.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("program is {len} bytes; at most {max} fit above 0x200")]
    ProgramTooLarge { len: usize, max: usize },
    #[error("machine state lock poisoned: {0}")]
    Poisoned(String),
    #[error(transparent)]
    Fault(#[from] Fault),
    #[error("scheduler thread panicked")]
    SchedulerPanicked,
}

impl<T> From<PoisonError<T>> for Error {
    fn from(err: PoisonError<T>) -> Self {
        Error::Poisoned(err.to_string())
    }
}

/// Per-cycle anomalies. These are reported as diagnostics and execution
/// carries on with a best-effort fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Fault {
    #[error("invalid opcode {0:#06x}")]
    UnknownOpcode(u16),
    #[error("stack overflow")]
    StackOverflow,
    #[error("stack underflow")]
    StackUnderflow,
    #[error("memory address {0:#06x} out of range")]
    OutOfRange(usize),
}

impl Fault {
    /// numeric code for the diagnostic channel
    pub fn code(&self) -> u32 {
        match self {
            Fault::UnknownOpcode(_) => 1,
            Fault::StackOverflow => 2,
            Fault::StackUnderflow => 3,
            Fault::OutOfRange(_) => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_codes_are_distinct() {
        let faults = [
            Fault::UnknownOpcode(0x5001),
            Fault::StackOverflow,
            Fault::StackUnderflow,
            Fault::OutOfRange(0x1000),
        ];
        let mut codes: Vec<u32> = faults.iter().map(Fault::code).collect();
        codes.dedup();
        assert_eq!(codes, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_fault_messages() {
        assert_eq!(
            Fault::UnknownOpcode(0xe0ff).to_string(),
            "invalid opcode 0xe0ff"
        );
        assert_eq!(
            Fault::OutOfRange(0x1000).to_string(),
            "memory address 0x1000 out of range"
        );
    }

    #[test]
    fn test_program_too_large_message() {
        let e = Error::ProgramTooLarge { len: 4000, max: 3584 };
        assert_eq!(
            e.to_string(),
            "program is 4000 bytes; at most 3584 fit above 0x200"
        );
    }
}
