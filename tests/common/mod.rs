//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use grpc_logger::logger::{JsonFormatter, SharedBuffer};
use grpc_logger::{Logger, Settings};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Settings writing JSON lines into a buffer the test can inspect.
pub fn capture_settings() -> (Settings, SharedBuffer) {
    let buffer = SharedBuffer::new();
    let settings = Settings::default()
        .with_formatter(Arc::new(JsonFormatter::default()))
        .with_output(buffer.clone());
    (settings, buffer)
}

pub fn capture_logger() -> (Logger, SharedBuffer) {
    let (settings, buffer) = capture_settings();
    (Logger::from_settings(settings), buffer)
}

/// Every captured line, parsed as JSON.
pub fn json_lines(buffer: &SharedBuffer) -> Vec<Value> {
    buffer
        .lines()
        .iter()
        .map(|line| serde_json::from_str(line).expect("captured line is not JSON"))
        .collect()
}

/// A request received by [`start_event_sink`].
#[derive(Debug)]
pub struct ReceivedEvent {
    pub path: String,
    pub auth: Option<String>,
    pub body: Value,
}

/// Starts an HTTP endpoint on a random local port that accepts event posts
/// and forwards each one to the returned channel. Returns the base address.
pub async fn start_event_sink() -> (String, mpsc::UnboundedReceiver<ReceivedEvent>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        loop {
            let (mut socket, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => break,
            };
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut raw = Vec::new();
                let mut chunk = [0u8; 4096];
                let header_end = loop {
                    let n = socket.read(&mut chunk).await.unwrap_or(0);
                    if n == 0 {
                        return;
                    }
                    raw.extend_from_slice(&chunk[..n]);
                    if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
                        break pos + 4;
                    }
                };

                let head = String::from_utf8_lossy(&raw[..header_end]).to_string();
                let mut lines = head.lines();
                let path = lines
                    .next()
                    .and_then(|line| line.split_whitespace().nth(1))
                    .unwrap_or_default()
                    .to_string();
                let mut content_length = 0;
                let mut auth = None;
                for line in lines {
                    if let Some((name, value)) = line.split_once(':') {
                        let name = name.trim().to_ascii_lowercase();
                        if name == "content-length" {
                            content_length = value.trim().parse().unwrap_or(0);
                        } else if name == "x-sentry-auth" {
                            auth = Some(value.trim().to_string());
                        }
                    }
                }

                while raw.len() < header_end + content_length {
                    let n = socket.read(&mut chunk).await.unwrap_or(0);
                    if n == 0 {
                        break;
                    }
                    raw.extend_from_slice(&chunk[..n]);
                }

                let body = serde_json::from_slice(&raw[header_end..]).unwrap_or(Value::Null);
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{}")
                    .await;
                let _ = socket.shutdown().await;
                let _ = tx.send(ReceivedEvent { path, auth, body });
            });
        }
    });

    (format!("127.0.0.1:{}", addr.port()), rx)
}
