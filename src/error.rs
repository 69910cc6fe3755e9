//! Error types for the REFLEX inbound.

use thiserror::Error;

/// Result type alias for REFLEX operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while handling a REFLEX connection.
///
/// The per-connection task is the error boundary: none of these escape into
/// shared state. The core does not log; errors are returned for the host to
/// log.
#[derive(Error, Debug)]
pub enum Error {
    /// Cryptographic operation failed
    #[error("cryptographic error: {0}")]
    Crypto(String),

    /// Malformed or unverifiable frame (short read, bad length, auth failure)
    #[error("framing error: {0}")]
    Frame(String),

    /// A frame carried a nonce counter at or below the last accepted one
    #[error("replay detected")]
    Replay,

    /// Handshake parsing or validation error
    #[error("handshake error: {0}")]
    Handshake(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Non-REFLEX traffic arrived but no fallback destination is configured
    #[error("no fallback configured")]
    NoFallback,

    /// Peer closed the connection cleanly
    #[error("connection closed")]
    ConnectionClosed,

    /// Network I/O error
    #[error("network error: {0}")]
    Network(#[from] std::io::Error),
}

impl Error {
    /// Create a new cryptographic error
    pub fn crypto(msg: impl Into<String>) -> Self {
        Error::Crypto(msg.into())
    }

    /// Create a new framing error
    pub fn frame(msg: impl Into<String>) -> Self {
        Error::Frame(msg.into())
    }

    /// Create a new handshake error
    pub fn handshake(msg: impl Into<String>) -> Self {
        Error::Handshake(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Check if this error marks a clean end of the connection.
    pub fn is_clean_close(&self) -> bool {
        matches!(self, Error::ConnectionClosed)
    }

    /// Check if this error is a replay rejection.
    pub fn is_replay(&self) -> bool {
        matches!(self, Error::Replay)
    }
}
