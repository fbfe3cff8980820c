//! Connection and login self-test.
//!
//! [`probe`] checks STARTTLS/587, implicit TLS/465 and plaintext/25 on the
//! configured host without sending mail, and reports every result. It shares
//! no state with [`Mailer`](crate::Mailer).

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::config::{MailConfig, PROBE_TIMEOUTS};
use crate::dispatch::{AttemptOutcome, AttemptRecord};
use crate::transport::{Encryption, Login, SmtpTransport, Transport, TransportDescriptor};
use ridemail_smtp::Timeouts;

/// Result of a [`probe`] run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeReport {
    /// Configured host.
    pub host: String,
    /// Configured port.
    pub port: u16,
    /// Login / sender.
    pub username: String,
    /// Whether a usable credential is configured.
    pub password_configured: bool,
    /// Credential length in characters.
    pub password_length: usize,
    /// One record per probed transport, in probe order.
    pub attempts: Vec<AttemptRecord>,
    /// When the probe finished.
    pub timestamp: DateTime<Utc>,
    /// Static advice for Microsoft 365 mailboxes.
    pub guidance: Guidance,
}

impl ProbeReport {
    /// Returns the first transport that logged in, if any.
    #[must_use]
    pub fn working_transport(&self) -> Option<&TransportDescriptor> {
        self.attempts
            .iter()
            .find(|a| a.is_success())
            .map(|a| &a.descriptor)
    }
}

/// Recommended Microsoft 365 settings and known pitfalls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Guidance {
    /// Settings Microsoft recommends for SMTP submission.
    pub recommended_settings: RecommendedSettings,
    /// Frequent reasons for login failures.
    pub common_issues: Vec<&'static str>,
    /// Where to create an app password.
    pub app_password_url: &'static str,
}

/// Recommended SMTP settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecommendedSettings {
    /// SMTP host.
    pub host: &'static str,
    /// SMTP port.
    pub port: u16,
    /// Encryption mode.
    pub encryption: Encryption,
    /// Accepted login methods.
    pub authentication: &'static str,
}

impl Guidance {
    /// Guidance for Microsoft 365 / Outlook mailboxes.
    #[must_use]
    pub fn microsoft365() -> Self {
        Self {
            recommended_settings: RecommendedSettings {
                host: "smtp.office365.com",
                port: 587,
                encryption: Encryption::StartTls,
                authentication: "OAuth2 or App Password",
            },
            common_issues: vec![
                "Basic authentication may be disabled - use app-specific passwords",
                "Multi-factor authentication blocks regular passwords",
                "Security defaults in Microsoft 365 disable basic auth",
                "SMTP AUTH may be disabled for the mailbox",
            ],
            app_password_url: "https://support.microsoft.com/en-us/account-billing/create-app-passwords-for-apps-that-can-t-use-two-step-verification-5896ed9b-4263-e681-128a-a6f2979a7944",
        }
    }
}

/// The fixed probe set for `host`.
#[must_use]
pub fn probe_targets(host: &str) -> [TransportDescriptor; 3] {
    [
        TransportDescriptor::new(host, 587, Encryption::StartTls, "starttls587"),
        TransportDescriptor::new(host, 465, Encryption::ImplicitTls, "ssl465"),
        TransportDescriptor::new(host, 25, Encryption::None, "plain25"),
    ]
}

/// Probes every target over SMTP with 5 second timeouts.
pub async fn probe(config: &MailConfig) -> ProbeReport {
    probe_with(&SmtpTransport, config, PROBE_TIMEOUTS).await
}

/// Probes every target over `transport`.
///
/// Each target is tried regardless of earlier results. Without a credential
/// the connection is still checked and the login is reported as failed.
pub async fn probe_with<T: Transport>(
    transport: &T,
    config: &MailConfig,
    timeouts: Timeouts,
) -> ProbeReport {
    let login = config.credential().map(|password| Login {
        username: &config.sender,
        password,
    });

    let mut attempts = Vec::with_capacity(3);
    for descriptor in probe_targets(&config.host) {
        let result = transport.verify(&descriptor, login, timeouts).await;
        let mut record = AttemptRecord::from_result(descriptor, result);
        if record.outcome == AttemptOutcome::Success {
            record.detail = "Authentication and connection successful".to_string();
        }
        info!(
            transport = %record.descriptor,
            status = ?record.outcome,
            detail = %record.detail,
            "Probe result"
        );
        attempts.push(record);
    }

    ProbeReport {
        host: config.host.clone(),
        port: config.port,
        username: config.sender.clone(),
        password_configured: config.has_credential(),
        password_length: config.credential_len(),
        attempts,
        timestamp: Utc::now(),
        guidance: Guidance::microsoft365(),
    }
}
