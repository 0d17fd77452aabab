//! Typed errors for the probe, read and mount paths.

use thiserror::Error;

/// Failure while probing the remote resource. Always fatal to the mount.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("probe request failed: {0}")]
    Transport(#[source] curl::Error),

    #[error("probe returned HTTP {0}")]
    HttpStatus(u32),

    /// `Accept-Ranges` missing or not exactly `bytes`.
    #[error("server does not accept byte ranges (Accept-Ranges: {})", .0.as_deref().unwrap_or("<missing>"))]
    RangesUnsupported(Option<String>),

    #[error("response has no Content-Length")]
    MissingContentLength,

    #[error("invalid Content-Length {0:?}")]
    InvalidContentLength(String),
}

/// Failure while serving a single read. Never terminates the mount.
#[derive(Debug, Error)]
pub enum ReadError {
    /// Origin answered a ranged GET with something other than 206, or with a
    /// 206 body longer than the range.
    #[error("status code was not partial content: {status}")]
    Protocol { status: u32 },

    /// Connection-level failure or timeout; retrying the same range may succeed.
    #[error("range request failed: {0}")]
    Transport(#[source] curl::Error),

    /// 206 whose body does not cover the requested range.
    #[error("short body: expected {expected} bytes, got {received}")]
    ShortBody { expected: u64, received: u64 },

    #[error("read cancelled")]
    Cancelled,
}

impl ReadError {
    /// Map a curl failure, distinguishing our own cancellation from network errors.
    pub fn from_curl(e: curl::Error) -> Self {
        if e.is_aborted_by_callback() {
            ReadError::Cancelled
        } else {
            ReadError::Transport(e)
        }
    }

    /// errno reported to the process that issued the read.
    pub fn errno(&self) -> i32 {
        match self {
            ReadError::Cancelled => libc::EINTR,
            ReadError::Protocol { .. } | ReadError::Transport(_) | ReadError::ShortBody { .. } => {
                libc::EIO
            }
        }
    }
}

/// Failure while setting up or running the mount.
#[derive(Debug, Error)]
pub enum MountError {
    /// Missing or invalid startup parameters.
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error("mount tree is already attached")]
    AlreadyAttached,

    #[error("mount failed: {0}")]
    Mount(#[from] std::io::Error),
}
