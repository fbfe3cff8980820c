//! Mail configuration.
//!
//! Values come from `MAIL_*` environment variables with built-in defaults for
//! the business mailbox. The configuration is read once at startup and
//! handed to [`Mailer`](crate::Mailer) or [`probe`](crate::probe); nothing in
//! this crate mutates it afterwards.

use std::fmt;
use std::time::Duration;

use ridemail_smtp::Timeouts;
use serde::Serialize;

use crate::error::ConfigError;

/// Connect, read and write budgets for each delivery attempt.
pub const DELIVERY_TIMEOUTS: Timeouts = Timeouts::uniform(Duration::from_secs(10));

/// Connect, read and write budgets for each diagnostic probe.
pub const PROBE_TIMEOUTS: Timeouts = Timeouts::uniform(Duration::from_secs(5));

/// Environment variable holding the sender address and SMTP username.
pub const ENV_USERNAME: &str = "MAIL_USERNAME";
/// Environment variable holding the SMTP password.
pub const ENV_PASSWORD: &str = "MAIL_PASSWORD";
/// Environment variable holding the SMTP host.
pub const ENV_HOST: &str = "MAIL_HOST";
/// Environment variable holding the SMTP port.
pub const ENV_PORT: &str = "MAIL_PORT";
/// Environment variable holding the protocol name.
pub const ENV_PROTOCOL: &str = "MAIL_PROTOCOL";

/// Resolved SMTP settings.
#[derive(Clone, PartialEq, Eq)]
pub struct MailConfig {
    /// Address used as `From` and as the SMTP login.
    pub sender: String,
    /// SMTP password. `None` or blank means mail cannot be sent.
    pub credential: Option<String>,
    /// SMTP server hostname.
    pub host: String,
    /// Configured SMTP port.
    pub port: u16,
    /// Protocol name (`smtp` or `smtps`).
    pub protocol: String,
}

impl MailConfig {
    /// Default sender mailbox.
    pub const DEFAULT_SENDER: &'static str = "info@careridesolutionspa.com";
    /// Default SMTP host.
    pub const DEFAULT_HOST: &'static str = "smtp.mail.us-east-1.awsapps.com";
    /// Default SMTP port.
    pub const DEFAULT_PORT: u16 = 465;
    /// Default protocol.
    pub const DEFAULT_PROTOCOL: &'static str = "smtp";

    /// Loads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if `MAIL_PORT`, `MAIL_HOST` or `MAIL_PROTOCOL` hold
    /// unusable values.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the configuration through `lookup`, falling back to defaults for
    /// unset keys.
    ///
    /// # Errors
    ///
    /// Returns an error if `MAIL_PORT`, `MAIL_HOST` or `MAIL_PROTOCOL` hold
    /// unusable values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let sender = lookup(ENV_USERNAME)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| Self::DEFAULT_SENDER.to_string());

        let host = match lookup(ENV_HOST) {
            Some(host) if host.trim().is_empty() => return Err(ConfigError::EmptyHost),
            Some(host) => host.trim().to_string(),
            None => Self::DEFAULT_HOST.to_string(),
        };

        let port = match lookup(ENV_PORT) {
            Some(raw) => match raw.trim().parse::<u16>() {
                Ok(port) if port != 0 => port,
                _ => return Err(ConfigError::InvalidPort(raw)),
            },
            None => Self::DEFAULT_PORT,
        };

        let protocol = lookup(ENV_PROTOCOL)
            .map(|p| p.trim().to_ascii_lowercase())
            .unwrap_or_else(|| Self::DEFAULT_PROTOCOL.to_string());
        if !matches!(protocol.as_str(), "smtp" | "smtps") {
            return Err(ConfigError::UnsupportedProtocol(protocol));
        }

        Ok(Self {
            sender,
            credential: lookup(ENV_PASSWORD),
            host,
            port,
            protocol,
        })
    }

    /// Sets the sender address.
    #[must_use]
    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = sender.into();
        self
    }

    /// Sets the SMTP password.
    #[must_use]
    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    /// Sets the SMTP host.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the SMTP port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Returns the credential if it is present and not blank.
    #[must_use]
    pub fn credential(&self) -> Option<&str> {
        self.credential
            .as_deref()
            .filter(|secret| !secret.trim().is_empty())
    }

    /// Returns true if a usable credential is configured.
    #[must_use]
    pub fn has_credential(&self) -> bool {
        self.credential().is_some()
    }

    /// Returns the credential length in characters (0 when unset).
    #[must_use]
    pub fn credential_len(&self) -> usize {
        self.credential.as_deref().map_or(0, |s| s.chars().count())
    }

    /// Returns a redacted view suitable for logs and diagnostics output.
    #[must_use]
    pub fn summary(&self) -> ConfigSummary {
        ConfigSummary {
            host: self.host.clone(),
            port: self.port,
            username: self.sender.clone(),
            protocol: self.protocol.clone(),
            password_length: self.credential_len(),
            password_masked: mask_secret(self.credential.as_deref()),
            env_hint: std::env::var_os(ENV_PASSWORD).is_some(),
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            sender: Self::DEFAULT_SENDER.to_string(),
            credential: None,
            host: Self::DEFAULT_HOST.to_string(),
            port: Self::DEFAULT_PORT,
            protocol: Self::DEFAULT_PROTOCOL.to_string(),
        }
    }
}

impl fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailConfig")
            .field("sender", &self.sender)
            .field("credential", &mask_secret(self.credential.as_deref()))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("protocol", &self.protocol)
            .finish()
    }
}

/// Redacted configuration for operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSummary {
    /// SMTP host.
    pub host: String,
    /// SMTP port.
    pub port: u16,
    /// SMTP login / sender.
    pub username: String,
    /// Protocol name.
    pub protocol: String,
    /// Password length in characters.
    pub password_length: usize,
    /// First and last character of the password, or `empty`/`unset`.
    pub password_masked: String,
    /// Whether `MAIL_PASSWORD` is present in the process environment.
    pub env_hint: bool,
}

/// Masks a secret as `f***l`, keeping only its first and last character.
fn mask_secret(secret: Option<&str>) -> String {
    let Some(secret) = secret else {
        return "unset".to_string();
    };
    let mut chars = secret.chars();
    match (chars.next(), chars.next_back()) {
        (None, _) => "empty".to_string(),
        (Some(_), None) => "***".to_string(),
        (Some(first), Some(last)) => format!("{first}***{last}"),
    }
}
