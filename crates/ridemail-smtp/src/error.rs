//! Error types for SMTP sessions.

use std::fmt;
use std::io;
use std::time::Duration;

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Network phase that ran out of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// TCP connect, including name resolution and any TLS handshake.
    Connect,
    /// Waiting for a server reply.
    Read,
    /// Sending a command or message data.
    Write,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connect => "connect",
            Self::Read => "read",
            Self::Write => "write",
        })
    }
}

/// SMTP error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TLS error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// A network phase exceeded its time budget.
    #[error("{phase} timed out after {}s", .after.as_secs_f32())]
    Timeout {
        /// Phase that timed out.
        phase: Phase,
        /// Budget that was exceeded.
        after: Duration,
    },

    /// The server closed the connection mid-session.
    #[error("Connection closed by server")]
    ConnectionClosed,

    /// Server returned an error reply.
    #[error("SMTP error {code}: {message}")]
    SmtpError {
        /// Reply code (e.g., 550).
        code: u16,
        /// Error message from server.
        message: String,
    },

    /// The server rejected the supplied credentials.
    #[error("Authentication rejected ({code}): {message}")]
    AuthRejected {
        /// Reply code (typically 535).
        code: u16,
        /// Error message from server.
        message: String,
    },

    /// The server offers no authentication mechanism this client speaks.
    #[error("No supported authentication mechanism (server offers: {0})")]
    NoAuthMechanism(String),

    /// Protocol error (unexpected or malformed response).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Feature not supported by server.
    #[error("Server does not support {0}")]
    NotSupported(String),
}

impl Error {
    /// Creates an SMTP error from a reply code and message.
    #[must_use]
    pub fn smtp_error(code: u16, message: impl Into<String>) -> Self {
        Self::SmtpError {
            code,
            message: message.into(),
        }
    }

    /// Returns true if the server refused the login rather than the connection.
    #[must_use]
    pub const fn is_auth_failure(&self) -> bool {
        matches!(self, Self::AuthRejected { .. } | Self::NoAuthMechanism(_))
    }
}
