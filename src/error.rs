use thiserror::Error;

use crate::hsf::format::Section;

/// Errors that can occur while loading an HSF scene file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("bad magic: expected `HSFV`, found {found:02X?}")]
    BadMagic { found: [u8; 4] },
    #[error("unsupported HSF version {0:03}")]
    UnsupportedVersion(u32),
    #[error("data too short: need {need} bytes at offset 0x{offset:X}, have {have}")]
    OutOfBounds {
        offset: usize,
        need: usize,
        have: usize,
    },
    #[error("symbol index {index} out of range (symbol table has {count} entries)")]
    SymbolOutOfRange { index: u32, count: usize },
    #[error("{section} index {index} out of range ({count} entries)")]
    IndexOutOfRange {
        section: Section,
        index: u32,
        count: usize,
    },
    #[error("failed to allocate {count} {section} entries")]
    AllocationFailure { section: Section, count: usize },
    #[error("corrupt model: {0}")]
    CorruptModel(String),
    #[error("parse error: {0}")]
    ParseError(String),
}

impl From<winnow::error::ErrMode<winnow::error::ContextError>> for LoadError {
    fn from(e: winnow::error::ErrMode<winnow::error::ContextError>) -> Self {
        LoadError::ParseError(format!("{e}"))
    }
}
