//! Typed error kinds shared across the crate.
//!
//! Library code returns [`MuxError`] so callers can branch on kind; the
//! binary boundary (`main.rs`, `commands/*`) wraps everything in
//! `anyhow::Result`.

use thiserror::Error;

/// Errors surfaced by the multiplexer core.
#[derive(Debug, Error)]
pub enum MuxError {
    /// A child process failed to start.
    #[error("failed to spawn agent process: {0}")]
    SpawnFailed(String),

    /// PTY or socket I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON, missing required field, or unknown performative.
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// A conversation's deadline elapsed before it could be referenced.
    #[error("conversation expired: {0}")]
    ConversationExpired(String),

    /// No conversation exists with the given id.
    #[error("conversation not found: {0}")]
    ConversationNotFound(String),

    /// No session exists with the given id or name.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// A session file exists but could not be parsed.
    #[error("session file corrupt: {0}")]
    SessionCorrupt(String),

    /// `:w`/`:write`/`:wq` attempted without a session name.
    #[error("E32: No session name")]
    NoSessionName,

    /// A modal overlay refused the pending input.
    #[error("overlay rejected input: {0}")]
    OverlayReject(String),
}

pub type Result<T> = std::result::Result<T, MuxError>;
