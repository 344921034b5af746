//! Error types for the agent's handle bookkeeping and wire framing.
//!
//! Configuration errors live with the config model (`config::ConfigError`).

use thiserror::Error;

/// Misuse of a correlation token after the create dispatch.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandleError {
    #[error("unknown handle token {0:#x}")]
    UnknownToken(u64),

    #[error("handle {0:#x} is already closed")]
    Closed(u64),

    #[error("reference count underflow on handle {0:#x}")]
    Underflow(u64),
}

/// All the ways reading or writing a frame can go wrong.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protobuf decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("frame of {0} bytes exceeds the maximum frame length")]
    TooLarge(usize),

    #[error("truncated frame: expected {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },
}
