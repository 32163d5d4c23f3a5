//! Minimal HTTP/1.1 server that answers with a scripted sequence of status codes.
//!
//! Each connection gets the next status from the script; once the script runs
//! out every request gets `200 OK` with the configured body. Connections are
//! served one at a time so the order is deterministic.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub struct StatusServer {
    pub addr: String,
    hits: Arc<AtomicUsize>,
}

impl StatusServer {
    /// Number of requests served so far.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Starts the server in a background thread. It runs until the process exits.
pub fn start(script: Vec<u16>, body: &'static str) -> StatusServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().unwrap().to_string();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let status = script.get(n).copied().unwrap_or(200);
            handle(stream, status, body);
        }
    });
    StatusServer { addr, hits }
}

fn handle(mut stream: TcpStream, status: u16, body: &str) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 4096];
    if !matches!(stream.read(&mut buf), Ok(n) if n > 0) {
        return;
    }
    let body = if status == 200 { body } else { "" };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason(status),
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "Unknown",
    }
}

/// Error from [`get`]: transport failure or a non-200 status.
#[derive(Debug)]
pub enum FetchError {
    Io(std::io::Error),
    Status(u16),
}

impl take2_core::retry::Classify for FetchError {
    fn failure_kind(&self) -> take2_core::retry::FailureKind {
        match self {
            FetchError::Io(e) => take2_core::retry::classify_io_error(e),
            FetchError::Status(code) => take2_core::retry::classify_http_status(*code),
        }
    }
}

/// Plain GET of `/` returning the response body on 200.
pub fn get(addr: &str) -> Result<String, FetchError> {
    let mut stream = TcpStream::connect(addr).map_err(FetchError::Io)?;
    stream
        .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .map_err(FetchError::Io)?;
    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .map_err(FetchError::Io)?;
    let (head, body) = response.split_once("\r\n\r\n").unwrap_or((&response, ""));
    let status: u16 = head
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    if status == 200 {
        Ok(body.to_string())
    } else {
        Err(FetchError::Status(status))
    }
}
