use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("SDAT parse error: {0}")]
    SdatParse(String),

    #[error("PSF error: {0}")]
    Psf(String),

    #[error("Compression error: {0}")]
    Compression(String),

    #[error("Sequence {0} not found in SDAT")]
    MissingSequence(usize),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Malformed sequence data found while interpreting an SSEQ
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SequenceError {
    #[error("Unknown command {opcode:#04x} at offset {offset:#x}")]
    UnknownOpcode { opcode: u8, offset: usize },

    #[error("Sequence data ends inside a command at offset {offset:#x}")]
    UnexpectedEnd { offset: usize },

    #[error("Call stack overflow at offset {offset:#x}")]
    CallStackOverflow { offset: usize },

    #[error("Return without call at offset {offset:#x}")]
    CallStackUnderflow { offset: usize },

    #[error("Loop stack overflow at offset {offset:#x}")]
    LoopStackOverflow { offset: usize },

    #[error("Loop end without loop start at offset {offset:#x}")]
    LoopStackUnderflow { offset: usize },

    #[error("Track {track} opened at offset {offset:#x} is out of range")]
    InvalidTrack { track: usize, offset: usize },
}
