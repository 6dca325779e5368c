use std::io;
use thiserror::Error;

/// The primary error type for the `bmsrelay-rs` library.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("truncated frame: {len} bytes is shorter than the minimal packet")]
    Truncated { len: usize },

    #[error("frame does not start with the sync sequence")]
    BadSync,
}
