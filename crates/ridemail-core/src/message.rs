//! Notification message and its wire rendering.

use std::borrow::Cow;
use std::fmt::Write as _;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use ridemail_smtp::Address;

/// A plain-text notification to one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Plain text body.
    pub body: String,
}

impl OutboundMessage {
    /// Creates a new message.
    #[must_use]
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Validates the envelope and renders the message once for every attempt.
    ///
    /// # Errors
    ///
    /// Returns an error if `sender` or the recipient is not a valid address.
    pub fn render(&self, sender: &str) -> ridemail_smtp::Result<RenderedMessage> {
        self.render_at(sender, Utc::now())
    }

    fn render_at(&self, sender: &str, date: DateTime<Utc>) -> ridemail_smtp::Result<RenderedMessage> {
        let from = Address::new(sender)?;
        let to = Address::new(&self.to)?;

        let mut data = String::with_capacity(self.body.len() + 256);
        let _ = write!(data, "From: {from}\r\n");
        let _ = write!(data, "To: {to}\r\n");
        let _ = write!(data, "Subject: {}\r\n", encode_header(&self.subject));
        let _ = write!(data, "Date: {}\r\n", date.to_rfc2822());
        data.push_str("MIME-Version: 1.0\r\n");
        data.push_str("Content-Type: text/plain; charset=utf-8\r\n");
        data.push_str("Content-Transfer-Encoding: 8bit\r\n");
        data.push_str("\r\n");
        data.push_str(&self.body);

        Ok(RenderedMessage {
            from,
            to,
            data: data.into_bytes(),
        })
    }
}

/// Envelope plus RFC 5322 bytes ready for `DATA`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    /// Envelope sender.
    pub from: Address,
    /// Envelope recipient.
    pub to: Address,
    /// Headers and body.
    pub data: Vec<u8>,
}

/// Bytes of text per RFC 2047 encoded-word: 45 bytes become 60 base64
/// characters, 72 with delimiters, under the 75 character limit.
const ENCODED_WORD_BYTES: usize = 45;

/// Folds line breaks and applies RFC 2047 base64 encoding to non-ASCII text,
/// splitting it into as many encoded-words as needed.
fn encode_header(value: &str) -> Cow<'_, str> {
    let value: Cow<'_, str> = if value.contains(['\r', '\n']) {
        Cow::Owned(value.replace(['\r', '\n'], " "))
    } else {
        Cow::Borrowed(value)
    };

    if value.is_ascii() {
        return value;
    }

    let mut words = Vec::new();
    let mut start = 0;
    for (idx, ch) in value.char_indices() {
        if idx + ch.len_utf8() - start > ENCODED_WORD_BYTES {
            words.push(encoded_word(&value[start..idx]));
            start = idx;
        }
    }
    words.push(encoded_word(&value[start..]));
    Cow::Owned(words.join("\r\n "))
}

fn encoded_word(text: &str) -> String {
    format!("=?UTF-8?B?{}?=", STANDARD.encode(text.as_bytes()))
}
