//! Error types for the stats pipeline.
//!
//! Each stage gets its own error so callers can decide where to degrade:
//! - `ConnectionError` is fatal for one aggregation call
//! - `RemoteError::NotFound` and `PlayerDataError` are per-player and only
//!   drop (or partially drop) that player's record
//! - `DecodeError` carries the byte offset where NBT parsing stopped
//! - `StatusError` never leaves the aggregator

use std::fmt;
use thiserror::Error;

/// Failure to establish a remote session.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Server rejected the credentials
    #[error("authentication failed for {user}@{host}")]
    Auth { host: String, user: String },

    /// Connect or handshake did not finish within the timeout
    #[error("connection to {host}:{port} timed out after {secs}s")]
    Timeout { host: String, port: u16, secs: u64 },

    /// Name resolution or TCP connect failed
    #[error("{host}:{port} unreachable: {reason}")]
    Unreachable {
        host: String,
        port: u16,
        reason: String,
    },

    /// Transport came up but the SSH/SFTP layer failed
    #[error("session setup failed: {0}")]
    Protocol(String),
}

/// Failure of a single read or listing on an open session.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote file not found: {path}")]
    NotFound { path: String },

    #[error("transport error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl RemoteError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound { .. })
    }
}

/// Structural problem found while decoding an NBT stream.
#[derive(Debug, Error, PartialEq)]
#[error("{kind} at byte offset {offset}")]
pub struct DecodeError {
    /// Offset into the decompressed stream (or the compressed one for gzip
    /// header problems)
    pub offset: usize,
    pub kind: DecodeErrorKind,
}

impl DecodeError {
    pub fn new(offset: usize, kind: DecodeErrorKind) -> Self {
        Self { offset, kind }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DecodeErrorKind {
    InvalidGzipHeader,
    Decompress(String),
    UnexpectedEof { needed: usize, remaining: usize },
    UnknownTag(u8),
    NegativeLength(i32),
    LengthExceedsBuffer { length: usize, remaining: usize },
    RootNotCompound(u8),
    DepthLimitExceeded(usize),
    NonEmptyEndList(i32),
}

impl fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeErrorKind::InvalidGzipHeader => write!(f, "invalid gzip header"),
            DecodeErrorKind::Decompress(msg) => write!(f, "gzip stream corrupt ({})", msg),
            DecodeErrorKind::UnexpectedEof { needed, remaining } => write!(
                f,
                "unexpected end of data (needed {} bytes, {} left)",
                needed, remaining
            ),
            DecodeErrorKind::UnknownTag(id) => write!(f, "unknown tag type {}", id),
            DecodeErrorKind::NegativeLength(len) => write!(f, "negative length {}", len),
            DecodeErrorKind::LengthExceedsBuffer { length, remaining } => write!(
                f,
                "length {} exceeds remaining buffer of {} bytes",
                length, remaining
            ),
            DecodeErrorKind::RootNotCompound(id) => {
                write!(f, "root tag must be a compound, found type {}", id)
            }
            DecodeErrorKind::DepthLimitExceeded(depth) => {
                write!(f, "nesting deeper than {} levels", depth)
            }
            DecodeErrorKind::NonEmptyEndList(len) => {
                write!(f, "list of end tags with length {}", len)
            }
        }
    }
}

/// Why one player's file could not be turned into data.
///
/// Caught at the per-player boundary in the aggregator.
#[derive(Debug, Error)]
pub enum PlayerDataError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path} does not contain a statistics object")]
    NotAnObject { path: String },

    #[error("failed to decode {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: DecodeError,
    },
}

/// Failure of a whole aggregation call.
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("failed to list players: {0}")]
    Remote(#[from] RemoteError),

    #[error("aggregation task failed: {0}")]
    Task(String),
}

/// Failure of the live server-list-ping query.
#[derive(Debug, Error)]
pub enum StatusError {
    #[error("status query I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("status query timed out after {0}s")]
    Timeout(u64),

    #[error("malformed status response: {0}")]
    Protocol(String),

    #[error("invalid status JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Invalid or incomplete dashboard configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set (or LOCAL_SERVER_ROOT for a local save directory)")]
    Missing(&'static str),

    #[error("LOCAL_SERVER_ROOT {0} is not a directory")]
    NotADirectory(String),
}
