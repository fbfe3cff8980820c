//! # ridemail-smtp
//!
//! Async SMTP submission client used by the ridemail notification sender.
//!
//! ## Features
//!
//! - **Type-state sessions**: a session moves from `Connected` through
//!   `Authenticated`, `MailTransaction`, `RecipientAdded` and `Data`; invalid
//!   command orderings do not compile
//! - **Three connection modes**: plaintext, implicit TLS (port 465) and
//!   STARTTLS upgrade (port 587)
//! - **Authentication**: PLAIN and LOGIN, picked from the EHLO advertisement
//! - **Bounded I/O**: every connect, read and write runs under a [`Timeouts`]
//!   budget so an unresponsive server cannot stall the caller
//!
//! ## Quick Start
//!
//! ```ignore
//! use ridemail_smtp::{Address, Client, Timeouts};
//! use ridemail_smtp::connection::connect;
//!
//! #[tokio::main]
//! async fn main() -> ridemail_smtp::Result<()> {
//!     let stream = connect("smtp.example.com", 587, Timeouts::default()).await?;
//!     let client = Client::from_stream(stream).await?;
//!     let client = client.ehlo("localhost").await?;
//!     let client = client.starttls("smtp.example.com").await?;
//!     let client = client.authenticate("owner@example.com", "secret").await?;
//!
//!     let client = client.mail_from(Address::new("owner@example.com")?).await?;
//!     let client = client.rcpt_to(Address::new("dispatch@example.com")?).await?;
//!     let client = client.data().await?;
//!     let client = client.send_message(b"Subject: New booking\r\n\r\nHello\r\n").await?;
//!
//!     client.quit().await
//! }
//! ```
//!
//! ## Session States
//!
//! ```text
//! Connected ── authenticate() ──→ Authenticated ── mail_from() ──→ MailTransaction
//!                                                                       │
//!                         Data ←── data() ── RecipientAdded ←── rcpt_to()
//!                          │
//!                          └── send_message() ──→ Connected
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use connection::{
    Authenticated, Client, Connected, Data, MailTransaction, RecipientAdded, ServerInfo,
    SmtpStream, Timeouts,
};
pub use error::{Error, Phase, Result};
pub use types::{Address, AuthMechanism, Extension, Reply, ReplyCode};
