//! Transport descriptors.

use std::fmt;

use serde::Serialize;

/// How a connection is encrypted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Encryption {
    /// Plaintext for the whole session.
    None,
    /// TLS from the first byte (port 465).
    ImplicitTls,
    /// Plaintext upgraded with STARTTLS (port 587). The upgrade is mandatory.
    #[serde(rename = "STARTTLS")]
    StartTls,
}

impl Encryption {
    /// Encryption implied by a configured port: 465 is implicit TLS, 587 is
    /// STARTTLS, anything else is plaintext.
    #[must_use]
    pub const fn for_port(port: u16) -> Self {
        match port {
            465 => Self::ImplicitTls,
            587 => Self::StartTls,
            _ => Self::None,
        }
    }

    /// Human-readable name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ImplicitTls => "SSL/TLS",
            Self::StartTls => "STARTTLS",
        }
    }
}

/// One SMTP connection strategy: host, port and encryption mode.
///
/// Descriptors are built fresh for every call and never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportDescriptor {
    host: String,
    port: u16,
    #[serde(rename = "encryptionMode")]
    encryption: Encryption,
    label: &'static str,
}

/// Structural identity used to de-duplicate descriptors. The label is not
/// part of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransportIdentity {
    /// Hostname.
    pub host: String,
    /// Port.
    pub port: u16,
    /// TLS from the first byte.
    pub implicit_tls: bool,
    /// STARTTLS upgrade.
    pub starttls: bool,
}

impl TransportDescriptor {
    /// Creates a descriptor.
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        port: u16,
        encryption: Encryption,
        label: &'static str,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            encryption,
            label,
        }
    }

    /// SMTP hostname.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// TCP port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Encryption mode.
    #[must_use]
    pub const fn encryption(&self) -> Encryption {
        self.encryption
    }

    /// Short label naming why this candidate exists.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        self.label
    }

    /// True for TLS-from-connect.
    #[must_use]
    pub const fn uses_implicit_tls(&self) -> bool {
        matches!(self.encryption, Encryption::ImplicitTls)
    }

    /// True for a STARTTLS upgrade.
    #[must_use]
    pub const fn uses_starttls(&self) -> bool {
        matches!(self.encryption, Encryption::StartTls)
    }

    /// Returns the de-duplication identity.
    #[must_use]
    pub fn identity(&self) -> TransportIdentity {
        TransportIdentity {
            host: self.host.clone(),
            port: self.port,
            implicit_tls: self.uses_implicit_tls(),
            starttls: self.uses_starttls(),
        }
    }
}

impl fmt::Display for TransportDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} ({}, {})",
            self.host,
            self.port,
            self.encryption.display_name(),
            self.label
        )
    }
}
