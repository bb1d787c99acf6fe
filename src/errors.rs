//! # Errors
//!
//! Error types used throughout the library, layered the way the subsystems call each other:
//! [`RESPError`] (codec) is wrapped by [`ConnectionError`] (per-connection handler); [`CmdError`]
//! (dispatcher/store) never propagates past the dispatcher, since every variant becomes a reply
//! frame instead. [`ServerError`] (accept loop) is wrapped by [`ApplicationError`] (top level).

use thiserror::Error;

/// Errors related to working with [`crate::resp`].
///
/// A [`RESPError`] always means the byte stream is malformed beyond recovery; the connection is
/// closed without attempting to resynchronize.
#[derive(Debug, Error)]
pub enum RESPError {
    #[error(transparent)]
    FromUtf8Error(#[from] std::string::FromUtf8Error),

    #[error("unsupported RESP type byte: {0}")]
    UnsupportedRESPType(u8),

    #[error("couldn't parse {0:?} as a length")]
    IntegerParseError(String),

    #[error("received a negative length other than -1")]
    NegativeLength,

    #[error("missing CRLF terminator")]
    MissingCRLF,
}

/// Errors raised while executing a parsed command against the store.
///
/// These never close the connection: the dispatcher turns every variant into an
/// [`crate::resp::Frame::Error`] reply.
#[derive(Debug, Error)]
pub enum CmdError {
    #[error("Invalid frame type")]
    NotAnArray,

    #[error("Empty command")]
    EmptyCommand,

    #[error("Invalid command")]
    UnrecognizedCmd,

    #[error("wrong number of arguments for '{0}' command")]
    WrongArity(String),

    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,

    #[error("value is not an integer or out of range")]
    NotAnInteger,
}

/// Errors related to working with [`crate::conn`].
///
/// Transport errors: close the connection silently, but don't take the server down.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    RESPError(#[from] RESPError),
}

/// Top-level errors that can terminate [`crate::server::Server::start`].
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("timed out waiting for a connection slot: {0}")]
    ElapsedError(String),

    #[error("connection semaphore closed: {0}")]
    AcquireError(#[from] tokio::sync::AcquireError),
}

/// Errors that can reach `main`.
#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    ServerError(#[from] ServerError),
}
