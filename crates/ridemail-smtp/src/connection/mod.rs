//! SMTP connection management with type-state pattern.

mod client;
mod stream;

pub use client::{Authenticated, Client, Connected, Data, MailTransaction, RecipientAdded};
pub use stream::{SmtpStream, connect, connect_tls};

use crate::types::{AuthMechanism, Extension};
use std::time::Duration;

/// Time budgets applied to every network operation of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// TCP connect plus TLS handshake.
    pub connect: Duration,
    /// Waiting for each server reply.
    pub read: Duration,
    /// Each write of a command or message chunk.
    pub write: Duration,
}

impl Timeouts {
    /// Uses the same budget for connect, read and write.
    #[must_use]
    pub const fn uniform(budget: Duration) -> Self {
        Self {
            connect: budget,
            read: budget,
            write: budget,
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::uniform(Duration::from_secs(30))
    }
}

/// Server identity and capabilities from the greeting and EHLO.
#[derive(Debug, Clone, Default)]
pub struct ServerInfo {
    /// Server hostname from greeting.
    pub hostname: String,
    /// Extensions from the most recent EHLO.
    pub extensions: Vec<Extension>,
}

impl ServerInfo {
    /// Checks if STARTTLS is advertised.
    #[must_use]
    pub fn supports_starttls(&self) -> bool {
        self.extensions.contains(&Extension::StartTls)
    }

    /// Returns the advertised AUTH mechanisms, empty if AUTH is absent.
    #[must_use]
    pub fn auth_mechanisms(&self) -> &[AuthMechanism] {
        self.extensions
            .iter()
            .find_map(|ext| match ext {
                Extension::Auth(mechanisms) => Some(mechanisms.as_slice()),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// Picks the mechanism to authenticate with.
    ///
    /// PLAIN is preferred. Servers that omit the AUTH keyword are tried with
    /// PLAIN as well, matching what most submission servers accept.
    #[must_use]
    pub fn preferred_auth(&self) -> Option<AuthMechanism> {
        let offered = self.auth_mechanisms();
        if offered.is_empty() || offered.contains(&AuthMechanism::Plain) {
            Some(AuthMechanism::Plain)
        } else if offered.contains(&AuthMechanism::Login) {
            Some(AuthMechanism::Login)
        } else {
            None
        }
    }
}
