//! Error types for the packaging engine.

use thiserror::Error;

/// Main error type for packaging operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A caller-supplied part producer failed while generating source bytes.
    /// The run aborts; bytes already written for the part are discarded.
    #[error("producer for entry '{name}' failed: {source}")]
    Producer {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// Temp-store or destination I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// API misuse: writing a closed sink, consuming an open sink,
    /// duplicate or empty entry names at submission
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A size, offset or count exceeds the non-zip64 container limits
    #[error("{what} {value} exceeds the non-zip64 limit {limit}")]
    UnsupportedSize {
        what: &'static str,
        value: u64,
        limit: u64,
    },
}

impl Error {
    /// Create an invalid-state error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Create an unsupported-size error.
    pub fn too_large(what: &'static str, value: u64, limit: u64) -> Self {
        Self::UnsupportedSize { what, value, limit }
    }
}

/// Result type alias for packaging operations.
pub type Result<T> = std::result::Result<T, Error>;
