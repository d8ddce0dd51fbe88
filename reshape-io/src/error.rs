//! Error types for the streaming layer

use reshape_format::ReshapeError;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Identity of an [`ObjectStream`](crate::ObjectStream), used to match
/// `pipe`/`unpipe` signals to their source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamId(u64);

impl StreamId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        StreamId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Errors raised by streams, sources and sinks
#[derive(Debug, Error)]
pub enum StreamError {
    /// A second destination was piped while one is still bound
    #[error("Stream {stream} is already piped to a destination; unpipe it first")]
    DestinationAlreadyBound {
        /// Stream that rejected the bind
        stream: StreamId,
    },
    /// An input line could not be parsed
    #[error("Invalid JSON on line {line}: {source}")]
    InvalidLine {
        /// 1-based line number
        line: usize,
        /// Parser error
        source: serde_json::Error,
    },
    /// I/O operation failed while reading or writing data.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON parsing or serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Options or field maps were invalid.
    #[error(transparent)]
    Format(#[from] ReshapeError),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, StreamError>;
