//! Error types for the delivery subsystem.

use thiserror::Error;

use crate::dispatch::AttemptRecord;

/// Errors raised while loading [`MailConfig`](crate::MailConfig).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// `MAIL_PORT` is not a port number.
    #[error("MAIL_PORT must be a port number between 1 and 65535, got {0:?}")]
    InvalidPort(String),

    /// `MAIL_HOST` is set but blank.
    #[error("MAIL_HOST must not be empty")]
    EmptyHost,

    /// `MAIL_PROTOCOL` names something other than SMTP.
    #[error("Unsupported MAIL_PROTOCOL {0:?} (expected \"smtp\" or \"smtps\")")]
    UnsupportedProtocol(String),
}

/// Why a single transport attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptError {
    /// The server was reached but refused the login.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Connect, TLS, timeout or protocol failure.
    #[error("Connection failed: {0}")]
    Connection(String),
}

impl AttemptError {
    /// Returns the underlying error text without the class prefix.
    #[must_use]
    pub fn detail(&self) -> &str {
        match self {
            Self::Authentication(detail) | Self::Connection(detail) => detail,
        }
    }
}

impl From<ridemail_smtp::Error> for AttemptError {
    fn from(err: ridemail_smtp::Error) -> Self {
        if err.is_auth_failure() {
            Self::Authentication(err.to_string())
        } else {
            Self::Connection(err.to_string())
        }
    }
}

/// Terminal outcome of a dispatch that delivered nothing.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No credential is configured; no connection was attempted.
    #[error("Mail credential is not configured (set MAIL_PASSWORD)")]
    CredentialMissing,

    /// Sender or recipient is not a usable address; no connection was attempted.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Every candidate transport failed.
    #[error("All {} transport candidates failed", .attempts.len())]
    AllCandidatesExhausted {
        /// One record per candidate, in the order tried.
        attempts: Vec<AttemptRecord>,
    },
}

impl DispatchError {
    /// Returns the attempt records, empty if nothing was tried.
    #[must_use]
    pub fn attempts(&self) -> &[AttemptRecord] {
        match self {
            Self::AllCandidatesExhausted { attempts } => attempts,
            Self::CredentialMissing | Self::InvalidAddress(_) => &[],
        }
    }
}
