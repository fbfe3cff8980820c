//! In-process SMTP servers for integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// EHLO reply advertising PLAIN and LOGIN without STARTTLS.
pub const EHLO_AUTH: &str = "250-mail.test\r\n250-AUTH PLAIN LOGIN\r\n250 8BITMIME\r\n";

/// Serves one connection: sends `greeting`, then answers each received line
/// with the next reply. Message data after a 354 is collected up to the
/// terminating `.`. Returns every line the client sent.
pub async fn scripted_server(
    greeting: &'static str,
    replies: Vec<&'static str>,
) -> (u16, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let (read, mut write) = socket.into_split();
        let mut reader = BufReader::new(read);
        let mut received = Vec::new();

        write.write_all(greeting.as_bytes()).await.unwrap();
        let mut replies = replies.into_iter();
        let mut in_data = false;

        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).await.unwrap_or(0) == 0 {
                break;
            }
            let line = line.trim_end_matches(['\r', '\n']).to_string();
            received.push(line.clone());

            if in_data && line != "." {
                continue;
            }
            in_data = false;

            let Some(reply) = replies.next() else { break };
            in_data = reply.starts_with("354");
            write.write_all(reply.as_bytes()).await.unwrap();
        }
        received
    });

    (port, handle)
}

/// Accepts connections and never writes a byte.
pub async fn silent_server() -> (u16, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    (port, handle)
}

/// Accepts one connection and sends a blank line every `interval`, never a
/// reply.
pub async fn blank_line_server(interval: Duration) -> (u16, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        while socket.write_all(b"\r\n").await.is_ok() {
            tokio::time::sleep(interval).await;
        }
    });

    (port, handle)
}
