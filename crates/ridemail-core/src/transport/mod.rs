//! Transport descriptors and the seam the dispatcher delivers through.
//!
//! [`Transport`] performs exactly one attempt against one
//! [`TransportDescriptor`]; choosing and ordering descriptors is the job of
//! [`build_candidates`](crate::build_candidates). [`SmtpTransport`] is the
//! production implementation.

mod descriptor;
mod smtp;

use std::future::Future;

pub use descriptor::{Encryption, TransportDescriptor, TransportIdentity};
pub use smtp::SmtpTransport;

use ridemail_smtp::Timeouts;

use crate::error::AttemptError;
use crate::message::RenderedMessage;

/// SMTP login pair.
#[derive(Clone, Copy)]
pub struct Login<'a> {
    /// Login name (the sender address).
    pub username: &'a str,
    /// Password.
    pub password: &'a str,
}

impl std::fmt::Debug for Login<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Login")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// One connection attempt over one transport descriptor.
///
/// Each call opens and closes its own session; implementations keep no
/// state between calls and must honour `timeouts` on every network step.
pub trait Transport: Send + Sync {
    /// Connects, authenticates and transmits `message`.
    fn deliver(
        &self,
        descriptor: &TransportDescriptor,
        login: Login<'_>,
        message: &RenderedMessage,
        timeouts: Timeouts,
    ) -> impl Future<Output = Result<(), AttemptError>> + Send;

    /// Connects and authenticates without starting a mail transaction.
    ///
    /// With no login the connection is still checked and the attempt is
    /// reported as an authentication failure.
    fn verify(
        &self,
        descriptor: &TransportDescriptor,
        login: Option<Login<'_>>,
        timeouts: Timeouts,
    ) -> impl Future<Output = Result<(), AttemptError>> + Send;
}
