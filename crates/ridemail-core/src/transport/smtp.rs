//! SMTP-backed transport.

use ridemail_smtp::connection::{connect, connect_tls};
use ridemail_smtp::{Client, Connected, Timeouts};
use tracing::debug;

use super::{Encryption, Login, Transport, TransportDescriptor};
use crate::error::AttemptError;
use crate::message::RenderedMessage;

/// Name announced in EHLO.
const HELO_NAME: &str = "localhost";

/// Delivers over a fresh SMTP session per attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmtpTransport;

impl SmtpTransport {
    /// Opens a session and brings it to the point where AUTH can be sent:
    /// greeting read, EHLO done, and STARTTLS completed when required.
    async fn open(
        descriptor: &TransportDescriptor,
        timeouts: Timeouts,
    ) -> ridemail_smtp::Result<Client<Connected>> {
        let host = descriptor.host();
        let stream = match descriptor.encryption() {
            Encryption::ImplicitTls => connect_tls(host, descriptor.port(), timeouts).await?,
            Encryption::StartTls | Encryption::None => {
                connect(host, descriptor.port(), timeouts).await?
            }
        };

        let client = Client::from_stream(stream).await?.ehlo(HELO_NAME).await?;
        let client = if descriptor.uses_starttls() {
            client.starttls(host).await?
        } else {
            client
        };
        debug!(
            transport = %descriptor,
            server = %client.server_info().hostname,
            tls = client.is_tls(),
            "SMTP session ready"
        );
        Ok(client)
    }
}

impl Transport for SmtpTransport {
    async fn deliver(
        &self,
        descriptor: &TransportDescriptor,
        login: Login<'_>,
        message: &RenderedMessage,
        timeouts: Timeouts,
    ) -> Result<(), AttemptError> {
        let client = Self::open(descriptor, timeouts).await?;
        let client = client.authenticate(login.username, login.password).await?;
        debug!(transport = %descriptor, "Authenticated");

        let client = client
            .mail_from(message.from.clone())
            .await?
            .rcpt_to(message.to.clone())
            .await?
            .data()
            .await?
            .send_message(&message.data)
            .await?;

        // The message is accepted at this point; a failed QUIT does not undo it.
        if let Err(err) = client.quit().await {
            debug!(transport = %descriptor, error = %err, "QUIT after delivery failed");
        }
        Ok(())
    }

    async fn verify(
        &self,
        descriptor: &TransportDescriptor,
        login: Option<Login<'_>>,
        timeouts: Timeouts,
    ) -> Result<(), AttemptError> {
        let client = Self::open(descriptor, timeouts).await?;

        let Some(login) = login else {
            let _ = client.quit().await;
            return Err(AttemptError::Authentication(
                "No credential configured; connection succeeded but login was not attempted"
                    .into(),
            ));
        };

        let client = client.authenticate(login.username, login.password).await?;
        let _ = client.quit().await;
        Ok(())
    }
}
