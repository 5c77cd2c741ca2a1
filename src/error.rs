//! Error types for the codec.
//!
//! Every fallible operation in the library returns [`Result`]. Nothing is
//! retried; an error ends the current compress or decompress call.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The underlying stream could not be read, written or repositioned.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The compressed stream does not follow the expected layout. Any output
    /// produced before this error must be discarded.
    #[error("malformed compressed stream: {0}")]
    MalformedStream(String),

    /// A tree was requested for a histogram with no non-zero counts.
    #[error("cannot build a code tree from empty input")]
    EmptyInput,

    /// A code was requested for a byte that never appeared in the histogram.
    #[error("byte {0:#04x} has no code in this tree")]
    UnknownSymbol(u8),

    #[error("code for byte {byte:#04x} needs {len} bits, limit is 64")]
    CodeTooLong { byte: u8, len: usize },
}

impl Error {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Error::MalformedStream(reason.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
