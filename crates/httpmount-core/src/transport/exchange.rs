//! Easy2 handler for one request/response exchange.
//!
//! Collects the final response's header lines and (optionally) its body, and
//! aborts the transfer when the read's cancel token is set.

use std::str;

use crate::cancel::CancelToken;

/// What to do with the response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyMode {
    /// Buffer the body in memory.
    Collect,
    /// Stop at the first body byte; only headers matter (GET probe).
    Discard,
    /// Buffer only a 206 body of at most the expected length; anything else
    /// stops the transfer at its first byte.
    Partial,
}

/// Handler state for a single exchange. Reset before every request so a
/// pooled handle never carries data from the previous one.
pub struct Exchange {
    pub(super) headers: Vec<String>,
    pub(super) body: Vec<u8>,
    pub(super) mode: BodyMode,
    /// Status of the response currently being received.
    pub(super) status: Option<u32>,
    pub(super) expected_len: usize,
    pub(super) headers_complete: bool,
    pub(super) body_discarded: bool,
    /// Set when a `Partial` body was rejected (wrong status or too long).
    pub(super) body_refused: bool,
    cancel: Option<CancelToken>,
}

impl Exchange {
    pub(super) fn new() -> Self {
        Self {
            headers: Vec::new(),
            body: Vec::new(),
            mode: BodyMode::Collect,
            status: None,
            expected_len: 0,
            headers_complete: false,
            body_discarded: false,
            body_refused: false,
            cancel: None,
        }
    }

    pub(super) fn prepare(&mut self, mode: BodyMode, expected_len: usize, cancel: Option<CancelToken>) {
        self.headers.clear();
        self.body = Vec::with_capacity(expected_len);
        self.mode = mode;
        self.status = None;
        self.expected_len = expected_len;
        self.headers_complete = false;
        self.body_discarded = false;
        self.body_refused = false;
        self.cancel = cancel;
    }

    pub(super) fn take_body(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.body)
    }

    /// True when the transfer was stopped on purpose from `write`.
    pub(super) fn stopped_by_handler(&self) -> bool {
        self.headers_complete && (self.body_discarded || self.body_refused)
    }
}

impl curl::easy::Handler for Exchange {
    fn header(&mut self, data: &[u8]) -> bool {
        if let Ok(s) = str::from_utf8(data) {
            let line = s.trim_end();
            if line.starts_with("HTTP/") {
                // New status line (redirect hop or 100-continue): keep only the last response.
                self.headers.clear();
                self.headers_complete = false;
                self.status = status_code(line);
                self.headers.push(line.to_string());
            } else if line.is_empty() {
                self.headers_complete = true;
            } else {
                self.headers.push(line.to_string());
            }
        }
        true
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, curl::easy::WriteError> {
        match self.mode {
            BodyMode::Collect => {
                self.body.extend_from_slice(data);
                Ok(data.len())
            }
            BodyMode::Discard => {
                self.body_discarded = true;
                Ok(0)
            }
            BodyMode::Partial => {
                if self.status != Some(206) || self.body.len() + data.len() > self.expected_len {
                    self.body_refused = true;
                    return Ok(0);
                }
                self.body.extend_from_slice(data);
                Ok(data.len())
            }
        }
    }

    fn progress(&mut self, _dltotal: f64, _dlnow: f64, _ultotal: f64, _ulnow: f64) -> bool {
        !self
            .cancel
            .as_ref()
            .map(CancelToken::is_cancelled)
            .unwrap_or(false)
    }
}

/// Status code from an `HTTP/x y reason` line.
fn status_code(line: &str) -> Option<u32> {
    line.split_whitespace().nth(1)?.parse().ok()
}
