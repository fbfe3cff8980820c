//! First-success-wins delivery across the candidate transports.

use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::candidates::build_candidates;
use crate::config::{DELIVERY_TIMEOUTS, MailConfig};
use crate::error::{AttemptError, DispatchError};
use crate::message::OutboundMessage;
use crate::transport::{Login, SmtpTransport, Transport, TransportDescriptor};
use ridemail_smtp::Timeouts;

/// Result class of a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AttemptOutcome {
    /// Delivered (or, for probes, logged in).
    #[serde(rename = "SUCCESS")]
    Success,
    /// Reached the server but the login was refused.
    #[serde(rename = "AUTH_FAILED")]
    AuthenticationFailed,
    /// Connect, TLS, timeout or protocol failure.
    #[serde(rename = "CONNECTION_FAILED")]
    ConnectionFailed,
}

/// One attempt against one descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptRecord {
    /// Transport that was tried.
    #[serde(flatten)]
    pub descriptor: TransportDescriptor,
    /// How it ended.
    #[serde(rename = "status")]
    pub outcome: AttemptOutcome,
    /// Human-readable result or raw error text.
    #[serde(rename = "message")]
    pub detail: String,
}

impl AttemptRecord {
    /// Records the result of one attempt.
    #[must_use]
    pub fn from_result(descriptor: TransportDescriptor, result: Result<(), AttemptError>) -> Self {
        match result {
            Ok(()) => Self {
                descriptor,
                outcome: AttemptOutcome::Success,
                detail: "OK".to_string(),
            },
            Err(AttemptError::Authentication(detail)) => Self {
                descriptor,
                outcome: AttemptOutcome::AuthenticationFailed,
                detail,
            },
            Err(AttemptError::Connection(detail)) => Self {
                descriptor,
                outcome: AttemptOutcome::ConnectionFailed,
                detail,
            },
        }
    }

    /// True if the attempt succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Success)
    }
}

/// A successful dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Transport that accepted the message.
    pub via: TransportDescriptor,
    /// Every attempt made, ending with the successful one.
    pub attempts: Vec<AttemptRecord>,
}

/// Sends owner notifications over the first working transport.
///
/// A `Mailer` holds an immutable configuration and a stateless transport, so
/// it is cheap to clone and safe to share between request handlers.
#[derive(Debug, Clone)]
pub struct Mailer<T = SmtpTransport> {
    config: Arc<MailConfig>,
    transport: T,
    timeouts: Timeouts,
}

impl Mailer<SmtpTransport> {
    /// Creates a mailer that delivers over SMTP.
    #[must_use]
    pub fn new(config: MailConfig) -> Self {
        Self::with_transport(config, SmtpTransport)
    }
}

impl<T: Transport> Mailer<T> {
    /// Creates a mailer over a custom transport.
    #[must_use]
    pub fn with_transport(config: MailConfig, transport: T) -> Self {
        Self {
            config: Arc::new(config),
            transport,
            timeouts: DELIVERY_TIMEOUTS,
        }
    }

    /// Overrides the per-attempt timeouts.
    #[must_use]
    pub const fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &MailConfig {
        &self.config
    }

    /// Sends `message`, returning whether any transport delivered it.
    ///
    /// Never fails; every error is logged and reduced to `false`.
    pub async fn send(&self, message: &OutboundMessage) -> bool {
        self.dispatch(message).await.is_ok()
    }

    /// Sends `message` over the candidate transports in order, stopping at
    /// the first that delivers.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::CredentialMissing`] or
    /// [`DispatchError::InvalidAddress`] before any connection is made, or
    /// [`DispatchError::AllCandidatesExhausted`] once every transport failed.
    pub async fn dispatch(&self, message: &OutboundMessage) -> Result<Delivery, DispatchError> {
        let config = self.config.as_ref();

        let Some(password) = config.credential() else {
            error!(
                to = %message.to,
                subject = %message.subject,
                "MAIL_PASSWORD is not set; notification not sent"
            );
            return Err(DispatchError::CredentialMissing);
        };

        let rendered = message.render(&config.sender).map_err(|err| {
            error!(to = %message.to, error = %err, "Notification has an invalid address");
            DispatchError::InvalidAddress(err.to_string())
        })?;

        let login = Login {
            username: &config.sender,
            password,
        };
        let candidates = build_candidates(config);
        info!(
            to = %message.to,
            subject = %message.subject,
            candidates = candidates.len(),
            "Sending notification"
        );

        let mut attempts = Vec::with_capacity(candidates.len());
        for descriptor in candidates {
            debug!(transport = %descriptor, "Trying transport");
            let result = self
                .transport
                .deliver(&descriptor, login, &rendered, self.timeouts)
                .await;

            if let Err(err) = &result {
                log_failure(&descriptor, err);
            }

            let record = AttemptRecord::from_result(descriptor, result);
            if record.is_success() {
                let via = record.descriptor.clone();
                attempts.push(record);
                info!(
                    to = %message.to,
                    transport = %via,
                    attempts = attempts.len(),
                    "Notification delivered"
                );
                return Ok(Delivery { via, attempts });
            }
            attempts.push(record);
        }

        error!(
            to = %message.to,
            attempts = attempts.len(),
            sender = %config.sender,
            "All transports failed. Likely causes: wrong MAIL_USERNAME or MAIL_PASSWORD; \
             mailbox not activated for SMTP; sender domain {} not verified with the provider; \
             provider sending limits reached",
            rendered.from.domain()
        );
        Err(DispatchError::AllCandidatesExhausted { attempts })
    }
}

impl<T> Mailer<T>
where
    T: Transport + Clone + 'static,
{
    /// Sends `message` on a background task so the caller can respond
    /// without waiting for SMTP.
    #[must_use = "the handle reports whether the notification was delivered"]
    pub fn send_detached(&self, message: OutboundMessage) -> JoinHandle<bool> {
        let mailer = self.clone();
        tokio::spawn(async move { mailer.send(&message).await })
    }
}

fn log_failure(descriptor: &TransportDescriptor, err: &AttemptError) {
    match err {
        AttemptError::Authentication(detail) => warn!(
            host = descriptor.host(),
            port = descriptor.port(),
            label = descriptor.label(),
            error = %detail,
            hint = auth_hint(descriptor.host()),
            "Authentication failed"
        ),
        AttemptError::Connection(detail) => warn!(
            host = descriptor.host(),
            port = descriptor.port(),
            label = descriptor.label(),
            error = %detail,
            "Connection failed"
        ),
    }
}

fn auth_hint(host: &str) -> &'static str {
    let host = host.to_ascii_lowercase();
    if host.contains("awsapps") {
        "check the WorkMail password and that the mailbox is enabled"
    } else if host.contains("office365") || host.contains("outlook") {
        "enable SMTP AUTH for the mailbox or use an app password"
    } else {
        "check MAIL_USERNAME and MAIL_PASSWORD"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use crate::message::RenderedMessage;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays scripted results and records which transports were tried.
    #[derive(Debug, Clone, Default)]
    struct ScriptedTransport {
        results: Arc<Mutex<Vec<Result<(), AttemptError>>>>,
        tried: Arc<Mutex<Vec<&'static str>>>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedTransport {
        fn new(results: Vec<Result<(), AttemptError>>) -> Self {
            Self {
                results: Arc::new(Mutex::new(results)),
                ..Self::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn tried(&self) -> Vec<&'static str> {
            self.tried.lock().unwrap().clone()
        }

        fn next(&self, descriptor: &TransportDescriptor) -> Result<(), AttemptError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.tried.lock().unwrap().push(descriptor.label());
            let mut results = self.results.lock().unwrap();
            if results.is_empty() {
                Err(AttemptError::Connection("refused".into()))
            } else {
                results.remove(0)
            }
        }
    }

    impl Transport for ScriptedTransport {
        async fn deliver(
            &self,
            descriptor: &TransportDescriptor,
            _login: Login<'_>,
            _message: &RenderedMessage,
            _timeouts: Timeouts,
        ) -> Result<(), AttemptError> {
            self.next(descriptor)
        }

        async fn verify(
            &self,
            descriptor: &TransportDescriptor,
            _login: Option<Login<'_>>,
            _timeouts: Timeouts,
        ) -> Result<(), AttemptError> {
            self.next(descriptor)
        }
    }

    fn config() -> MailConfig {
        MailConfig::default()
            .with_host("smtp.example.com")
            .with_port(2525)
            .with_credential("secret")
    }

    fn message() -> OutboundMessage {
        OutboundMessage::new("owner@example.com", "New booking request", "Pickup at 9:00")
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let transport = ScriptedTransport::new(vec![
            Err(AttemptError::Connection("timed out".into())),
            Ok(()),
        ]);
        let mailer = Mailer::with_transport(config(), transport.clone());

        let delivery = mailer.dispatch(&message()).await.unwrap();

        assert_eq!(transport.calls(), 2);
        assert_eq!(transport.tried(), ["configured", "ssl465"]);
        assert_eq!(delivery.via.label(), "ssl465");
        assert_eq!(delivery.attempts.len(), 2);
        assert_eq!(delivery.attempts[0].outcome, AttemptOutcome::ConnectionFailed);
        assert_eq!(delivery.attempts[1].outcome, AttemptOutcome::Success);
    }

    #[tokio::test]
    async fn test_auth_failure_continues_to_next_candidate() {
        let transport = ScriptedTransport::new(vec![
            Err(AttemptError::Authentication("535 5.7.8 bad credentials".into())),
            Err(AttemptError::Connection("refused".into())),
            Ok(()),
        ]);
        let mailer = Mailer::with_transport(config(), transport.clone());

        assert!(mailer.send(&message()).await);
        assert_eq!(transport.tried(), ["configured", "ssl465", "starttls587"]);
    }

    #[tokio::test]
    async fn test_missing_credential_makes_no_attempt() {
        for credential in [None, Some(String::new()), Some("  ".to_string())] {
            let mut cfg = config();
            cfg.credential = credential;
            let transport = ScriptedTransport::new(vec![Ok(())]);
            let mailer = Mailer::with_transport(cfg, transport.clone());

            let err = mailer.dispatch(&message()).await.unwrap_err();

            assert!(matches!(err, DispatchError::CredentialMissing));
            assert_eq!(transport.calls(), 0);
        }
    }

    #[tokio::test]
    async fn test_invalid_recipient_makes_no_attempt() {
        let transport = ScriptedTransport::new(vec![Ok(())]);
        let mailer = Mailer::with_transport(config(), transport.clone());

        let err = mailer
            .dispatch(&OutboundMessage::new("not an address", "s", "b"))
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::InvalidAddress(_)));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_exhaustion_tries_every_candidate_once() {
        let cfg = config();
        let expected = build_candidates(&cfg).len();
        let transport = ScriptedTransport::new(vec![]);
        let mailer = Mailer::with_transport(cfg, transport.clone());

        let err = mailer.dispatch(&message()).await.unwrap_err();

        assert_eq!(transport.calls(), expected);
        assert_eq!(err.attempts().len(), expected);
        assert!(err.attempts().iter().all(|a| !a.is_success()));
        assert!(!mailer.send(&message()).await);
    }

    #[tokio::test]
    async fn test_send_detached_reports_result() {
        let transport = ScriptedTransport::new(vec![Ok(())]);
        let mailer = Mailer::with_transport(config(), transport.clone());

        let handle = mailer.send_detached(message());

        assert!(handle.await.unwrap());
        assert_eq!(transport.calls(), 1);
    }

    #[test]
    fn test_attempt_record_serializes_flat() {
        let record = AttemptRecord::from_result(
            TransportDescriptor::new("smtp.example.com", 25, crate::Encryption::None, "plain25"),
            Err(AttemptError::Authentication("535 rejected".into())),
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "host": "smtp.example.com",
                "port": 25,
                "encryptionMode": "NONE",
                "label": "plain25",
                "status": "AUTH_FAILED",
                "message": "535 rejected",
            })
        );
    }
}
