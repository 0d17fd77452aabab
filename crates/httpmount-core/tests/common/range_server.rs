//! Minimal HTTP/1.1 server that supports HEAD and Range GET for integration tests.
//!
//! Serves a single static body over keep-alive connections. Options cover the
//! origin misbehaviours the client must cope with: blocked HEAD, missing range
//! support, short bodies and dropped connections.

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RangeServerOptions {
    /// If false, HEAD returns 405 (simulates servers that block HEAD).
    pub head_allowed: bool,
    /// Value sent as `Accept-Ranges`; `None` omits the header.
    pub accept_ranges: Option<&'static str>,
    /// If false, probe responses carry no `Content-Length` (chunked GET, bare HEAD).
    pub content_length: bool,
    /// If false, ranged GETs ignore Range and return 200 with the full body.
    pub honor_ranges: bool,
    /// Bytes cut from the end of every 206 body (Content-Length matches what is sent).
    pub truncate_by: usize,
    /// Extra bytes appended to every 206 body (Content-Length matches what is sent).
    pub pad_by: usize,
    /// The first N ranged GETs get the connection closed without a response.
    pub drop_first_ranges: usize,
    /// Pause before answering a ranged GET.
    pub range_delay: Duration,
    /// If false, every response carries `Connection: close`.
    pub keep_alive: bool,
}

impl Default for RangeServerOptions {
    fn default() -> Self {
        Self {
            head_allowed: true,
            accept_ranges: Some("bytes"),
            content_length: true,
            honor_ranges: true,
            truncate_by: 0,
            pad_by: 0,
            drop_first_ranges: 0,
            range_delay: Duration::ZERO,
            keep_alive: true,
        }
    }
}

/// Handle to a running server. The server runs until the process exits.
#[derive(Debug, Clone)]
pub struct RangeServer {
    /// e.g. "http://127.0.0.1:12345/file.iso"
    pub url: String,
    counters: Arc<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
    range_requests: AtomicUsize,
    probe_requests: AtomicUsize,
    body_bytes_sent: AtomicUsize,
}

impl RangeServer {
    /// Ranged GETs received, including dropped ones.
    pub fn range_requests(&self) -> usize {
        self.counters.range_requests.load(Ordering::SeqCst)
    }

    /// HEADs and unranged GETs received.
    pub fn probe_requests(&self) -> usize {
        self.counters.probe_requests.load(Ordering::SeqCst)
    }

    /// Body bytes written to client sockets over all responses.
    pub fn body_bytes_sent(&self) -> usize {
        self.counters.body_bytes_sent.load(Ordering::SeqCst)
    }
}

/// Deterministic test body of `len` bytes.
pub fn body(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Starts a server in a background thread serving `body` at `/file.iso`.
pub fn start(body: Vec<u8>) -> RangeServer {
    start_with_options(body, RangeServerOptions::default())
}

/// Like `start` but allows customizing server behavior (HEAD blocked, ranges missing, etc.).
pub fn start_with_options(body: Vec<u8>, opts: RangeServerOptions) -> RangeServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let body = Arc::new(body);
    let counters = Arc::new(Counters::default());
    let shared = Arc::clone(&counters);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            let counters = Arc::clone(&shared);
            thread::spawn(move || serve_connection(stream, &body, opts, &counters));
        }
    });
    RangeServer {
        url: format!("http://127.0.0.1:{}/file.iso", port),
        counters,
    }
}

fn serve_connection(
    mut stream: TcpStream,
    body: &[u8],
    opts: RangeServerOptions,
    counters: &Counters,
) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    loop {
        let Some(request) = read_request(&mut stream) else {
            return;
        };
        let (method, range) = parse_request(&request);
        let keep_going = match (method.to_ascii_uppercase().as_str(), range) {
            ("HEAD", _) => {
                counters.probe_requests.fetch_add(1, Ordering::SeqCst);
                respond_head(&mut stream, body, opts)
            }
            ("GET", Some(range)) => {
                let n = counters.range_requests.fetch_add(1, Ordering::SeqCst);
                if n < opts.drop_first_ranges {
                    return;
                }
                if !opts.range_delay.is_zero() {
                    thread::sleep(opts.range_delay);
                }
                respond_range(&mut stream, body, range, opts, counters)
            }
            ("GET", None) => {
                counters.probe_requests.fetch_add(1, Ordering::SeqCst);
                respond_full(&mut stream, body, opts, counters)
            }
            _ => {
                let _ = stream.write_all(
                    b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                );
                false
            }
        };
        if !keep_going || !opts.keep_alive {
            return;
        }
    }
}

/// Reads up to the blank line ending the request head.
fn read_request(stream: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut byte = [0u8; 1];
    while !buf.ends_with(b"\r\n\r\n") {
        match stream.read(&mut byte) {
            Ok(1) => buf.push(byte[0]),
            _ => return None,
        }
        if buf.len() > 16 * 1024 {
            return None;
        }
    }
    String::from_utf8(buf).ok()
}

fn common_headers(opts: RangeServerOptions) -> String {
    let mut headers = String::new();
    if let Some(value) = opts.accept_ranges {
        headers.push_str(&format!("Accept-Ranges: {}\r\n", value));
    }
    if !opts.keep_alive {
        headers.push_str("Connection: close\r\n");
    }
    headers
}

fn respond_head(stream: &mut TcpStream, body: &[u8], opts: RangeServerOptions) -> bool {
    if !opts.head_allowed {
        let response = format!(
            "HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\n{}\r\n",
            common_headers(opts)
        );
        return stream.write_all(response.as_bytes()).is_ok();
    }
    let length = if opts.content_length {
        format!("Content-Length: {}\r\n", body.len())
    } else {
        String::new()
    };
    let response = format!(
        "HTTP/1.1 200 OK\r\n{}ETag: \"test-etag\"\r\n{}\r\n",
        length,
        common_headers(opts)
    );
    stream.write_all(response.as_bytes()).is_ok()
}

/// Writes `body` in chunks, counting what reached the socket. False once the
/// peer stops reading.
fn write_body(stream: &mut TcpStream, body: &[u8], counters: &Counters) -> bool {
    for chunk in body.chunks(16 * 1024) {
        if stream.write_all(chunk).is_err() {
            return false;
        }
        counters.body_bytes_sent.fetch_add(chunk.len(), Ordering::SeqCst);
    }
    true
}

fn respond_full(
    stream: &mut TcpStream,
    body: &[u8],
    opts: RangeServerOptions,
    counters: &Counters,
) -> bool {
    if !opts.content_length {
        // Close-delimited body: no length known up front.
        let response = format!(
            "HTTP/1.1 200 OK\r\n{}Connection: close\r\n\r\n",
            opts.accept_ranges
                .map(|v| format!("Accept-Ranges: {}\r\n", v))
                .unwrap_or_default()
        );
        let _ = stream.write_all(response.as_bytes());
        write_body(stream, body, counters);
        return false;
    }
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n{}\r\n",
        body.len(),
        common_headers(opts)
    );
    stream.write_all(response.as_bytes()).is_ok() && write_body(stream, body, counters)
}

fn respond_range(
    stream: &mut TcpStream,
    body: &[u8],
    (start, end_incl): (u64, u64),
    opts: RangeServerOptions,
    counters: &Counters,
) -> bool {
    if !opts.honor_ranges {
        return respond_full(stream, body, opts, counters);
    }
    let total = body.len() as u64;
    let end_incl = end_incl.min(total.saturating_sub(1));
    if start >= total || start > end_incl {
        let response = format!(
            "HTTP/1.1 416 Range Not Satisfiable\r\nContent-Range: bytes */{}\r\nContent-Length: 0\r\n{}\r\n",
            total,
            common_headers(opts)
        );
        return stream.write_all(response.as_bytes()).is_ok();
    }
    let end_excl = (end_incl + 1) as usize;
    let mut slice = body[start as usize..end_excl].to_vec();
    slice.truncate(slice.len().saturating_sub(opts.truncate_by));
    slice.extend(std::iter::repeat(0xAA).take(opts.pad_by));
    let response = format!(
        "HTTP/1.1 206 Partial Content\r\nContent-Length: {}\r\nContent-Range: bytes {}-{}/{}\r\n{}\r\n",
        slice.len(),
        start,
        end_incl,
        total,
        common_headers(opts)
    );
    stream.write_all(response.as_bytes()).is_ok() && write_body(stream, &slice, counters)
}

/// Returns (method, optional (start, end_inclusive) for Range: bytes=X-Y).
fn parse_request(request: &str) -> (&str, Option<(u64, u64)>) {
    let mut method = "";
    let mut range = None;
    for line in request.lines() {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if method.is_empty() {
            method = line.split_whitespace().next().unwrap_or("");
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("range") {
                let value = value.trim();
                if let Some(part) = value.strip_prefix("bytes=") {
                    if let Some((a, b)) = part.split_once('-') {
                        let start = a.trim().parse::<u64>().unwrap_or(0);
                        let end = b.trim();
                        let end_incl = if end.is_empty() {
                            u64::MAX
                        } else {
                            end.parse::<u64>().unwrap_or(0)
                        };
                        range = Some((start, end_incl));
                    }
                }
            }
        }
    }
    (method, range)
}
