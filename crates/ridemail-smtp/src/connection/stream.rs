//! Low-level SMTP stream handling.

use super::Timeouts;
use crate::error::{Error, Phase, Result};
use rustls::pki_types::ServerName;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_rustls::{
    TlsConnector,
    client::TlsStream,
    rustls::{ClientConfig, RootCertStore},
};

/// Longest reply line accepted before the server is treated as broken.
const MAX_LINE_LEN: usize = 4096;

#[derive(Debug)]
enum Inner {
    Tcp(BufReader<TcpStream>),
    Tls(Box<BufReader<TlsStream<TcpStream>>>),
}

/// SMTP byte stream (TCP or TLS) with per-operation time budgets.
#[derive(Debug)]
pub struct SmtpStream {
    inner: Inner,
    timeouts: Timeouts,
}

impl SmtpStream {
    /// Returns true once the stream is encrypted.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self.inner, Inner::Tls(_))
    }

    /// Returns the budgets this stream enforces.
    #[must_use]
    pub const fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    /// Reads one line, stripping the line ending.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] if no complete line arrives within the read
    /// budget, [`Error::ConnectionClosed`] on end of stream, and
    /// [`Error::Protocol`] for lines over 4096 bytes or invalid UTF-8.
    pub async fn read_line(&mut self) -> Result<String> {
        let budget = self.timeouts.read;
        let mut buf = Vec::new();
        let read = match &mut self.inner {
            Inner::Tcp(reader) => bounded(Phase::Read, budget, read_capped(reader, &mut buf)).await?,
            Inner::Tls(reader) => {
                bounded(Phase::Read, budget, read_capped(&mut **reader, &mut buf)).await?
            }
        };

        if read == 0 {
            return Err(Error::ConnectionClosed);
        }
        if buf.len() > MAX_LINE_LEN {
            return Err(Error::Protocol(format!(
                "Reply line exceeds {MAX_LINE_LEN} bytes"
            )));
        }

        let mut line = String::from_utf8(buf)
            .map_err(|_| Error::Protocol("Reply line is not valid UTF-8".into()))?;
        line.truncate(line.trim_end_matches(['\r', '\n']).len());
        Ok(line)
    }

    /// Writes and flushes `data`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] if the write does not complete within the
    /// write budget.
    pub async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let budget = self.timeouts.write;
        match &mut self.inner {
            Inner::Tcp(reader) => {
                let io = reader.get_mut();
                bounded(Phase::Write, budget, async {
                    io.write_all(data).await?;
                    io.flush().await
                })
                .await
            }
            Inner::Tls(reader) => {
                let io = reader.get_mut();
                bounded(Phase::Write, budget, async {
                    io.write_all(data).await?;
                    io.flush().await
                })
                .await
            }
        }
    }

    /// Upgrades a plaintext stream to TLS after a successful STARTTLS reply.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is already encrypted, the hostname is
    /// not a valid server name, or the handshake fails or times out.
    pub async fn upgrade_to_tls(self, hostname: &str) -> Result<Self> {
        let Self { inner, timeouts } = self;
        let Inner::Tcp(reader) = inner else {
            return Err(Error::Protocol("Already using TLS".into()));
        };

        let tls = handshake(hostname, reader.into_inner(), timeouts.connect).await?;
        Ok(Self {
            inner: Inner::Tls(Box::new(BufReader::new(tls))),
            timeouts,
        })
    }
}

/// Reads up to and including `\n`, stopping after `MAX_LINE_LEN + 1` bytes
/// so an endless line cannot grow the buffer.
async fn read_capped<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let cap = u64::try_from(MAX_LINE_LEN + 1).unwrap_or(u64::MAX);
    (&mut *reader).take(cap).read_until(b'\n', buf).await
}

/// Connects over plain TCP (port 25, or port 587 before STARTTLS).
///
/// # Errors
///
/// Returns an error if resolution or the connection fails or exceeds the
/// connect budget.
pub async fn connect(hostname: &str, port: u16, timeouts: Timeouts) -> Result<SmtpStream> {
    tracing::debug!(host = hostname, port, "Opening plaintext SMTP connection");
    let tcp = bounded(
        Phase::Connect,
        timeouts.connect,
        TcpStream::connect((hostname, port)),
    )
    .await?;

    Ok(SmtpStream {
        inner: Inner::Tcp(BufReader::new(tcp)),
        timeouts,
    })
}

/// Connects with implicit TLS (port 465).
///
/// The connect budget covers the TCP connect and the handshake together.
///
/// # Errors
///
/// Returns an error if the connection or handshake fails or times out.
pub async fn connect_tls(hostname: &str, port: u16, timeouts: Timeouts) -> Result<SmtpStream> {
    tracing::debug!(host = hostname, port, "Opening implicit-TLS SMTP connection");
    let started = tokio::time::Instant::now();
    let tcp = bounded(
        Phase::Connect,
        timeouts.connect,
        TcpStream::connect((hostname, port)),
    )
    .await?;

    let remaining = timeouts.connect.saturating_sub(started.elapsed());
    let tls = handshake(hostname, tcp, remaining)
        .await
        .map_err(|err| match err {
            Error::Timeout { phase, .. } => Error::Timeout {
                phase,
                after: timeouts.connect,
            },
            other => other,
        })?;

    Ok(SmtpStream {
        inner: Inner::Tls(Box::new(BufReader::new(tls))),
        timeouts,
    })
}

async fn handshake(
    hostname: &str,
    tcp: TcpStream,
    budget: Duration,
) -> Result<TlsStream<TcpStream>> {
    let server_name = ServerName::try_from(hostname.to_string())
        .map_err(|_| Error::Protocol(format!("Invalid hostname: {hostname}")))?;

    bounded(
        Phase::Connect,
        budget,
        create_tls_connector().connect(server_name, tcp),
    )
    .await
}

/// Runs an I/O future under a time budget.
async fn bounded<T, F>(phase: Phase, budget: Duration, io: F) -> Result<T>
where
    F: Future<Output = std::io::Result<T>>,
{
    match tokio::time::timeout(budget, io).await {
        Ok(result) => result.map_err(unwrap_tls_error),
        Err(_) => Err(Error::Timeout {
            phase,
            after: budget,
        }),
    }
}

/// Surfaces rustls errors that tokio-rustls wraps in `io::Error`.
fn unwrap_tls_error(err: std::io::Error) -> Error {
    if err
        .get_ref()
        .is_some_and(|inner| inner.downcast_ref::<rustls::Error>().is_some())
    {
        if let Some(inner) = err.into_inner() {
            if let Ok(tls) = inner.downcast::<rustls::Error>() {
                return Error::Tls(*tls);
            }
        }
        return Error::Protocol("TLS failure".into());
    }
    Error::Io(err)
}

/// Creates a TLS connector trusting the webpki root set.
fn create_tls_connector() -> TlsConnector {
    let root_store = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}
