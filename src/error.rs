use thiserror::Error;

use crate::state::Address;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("unknown opcode {0:#06X}")]
    UnknownOpcode(u16),

    #[error("unsupported machine-language routine {0:#06X}")]
    UnsupportedOpcode(u16),

    #[error("stack overflow: call at {pc:#05X} exceeds the call stack")]
    StackOverflow { pc: Address },

    #[error("stack underflow: return at {pc:#05X} with an empty call stack")]
    StackUnderflow { pc: Address },

    #[error("memory access out of range at {addr:#06X}")]
    MemoryOutOfRange { addr: usize },

    #[error("program is too large ({size} bytes), at most {max} bytes fit")]
    LoadTooLarge { size: usize, max: usize },
}

impl Error {
    /// Fatal errors halt the machine; the others skip the offending
    /// instruction and execution carries on.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::UnknownOpcode(_) | Error::UnsupportedOpcode(_))
    }
}
