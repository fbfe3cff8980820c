//! # ridemail-core
//!
//! Owner notification delivery for the ride-booking backend.
//!
//! Booking and contact handlers hand this crate a recipient, subject and
//! body; it tries a short, de-duplicated list of SMTP transport variants
//! (the configured one, a Microsoft STARTTLS variant, implicit TLS on 465,
//! STARTTLS on 587, plaintext on 25) and stops at the first that delivers.
//!
//! This crate provides:
//! - **Configuration** - [`MailConfig`] loaded from `MAIL_*` environment variables
//! - **Candidate building** - [`build_candidates`] turns a configuration into
//!   an ordered list of [`TransportDescriptor`]s
//! - **Dispatch** - [`Mailer::send`] walks the candidates, first success wins
//! - **Diagnostics** - [`probe`] checks connection and login on every
//!   transport without sending mail and returns a [`ProbeReport`]
//!
//! ## Example
//!
//! ```ignore
//! use ridemail_core::{MailConfig, Mailer, OutboundMessage};
//!
//! let mailer = Mailer::new(MailConfig::from_env()?);
//! let message = OutboundMessage::new(
//!     "owner@careridesolutionspa.com",
//!     "New booking request",
//!     "Pickup: 9:00 at Main St",
//! );
//!
//! // Persisting the booking does not depend on this result.
//! let delivered = mailer.send(&message).await;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod candidates;
pub mod config;
pub mod dispatch;
mod error;
pub mod message;
pub mod probe;
pub mod transport;

pub use candidates::build_candidates;
pub use config::{ConfigSummary, DELIVERY_TIMEOUTS, MailConfig, PROBE_TIMEOUTS};
pub use dispatch::{AttemptOutcome, AttemptRecord, Delivery, Mailer};
pub use error::{AttemptError, ConfigError, DispatchError};
pub use message::{OutboundMessage, RenderedMessage};
pub use probe::{Guidance, ProbeReport, RecommendedSettings, probe, probe_targets, probe_with};
pub use ridemail_smtp::Timeouts;
pub use transport::{
    Encryption, Login, SmtpTransport, Transport, TransportDescriptor, TransportIdentity,
};
