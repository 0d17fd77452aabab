//! Cancellation tokens for in-flight reads.
//!
//! Each dispatched read is registered with a token. The transport checks the
//! token from curl's progress callback and aborts the transfer once it is set,
//! so the handle goes back to the pool instead of draining the body.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// Shared flag: set once, observed by the transfer running the read.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Registry of request id -> token for reads currently being served.
#[derive(Debug, Default)]
pub struct InFlightReads {
    reads: RwLock<HashMap<u64, CancelToken>>,
}

impl InFlightReads {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a read; returns the token to hand to the transfer.
    pub fn register(&self, request_id: u64) -> CancelToken {
        let token = CancelToken::new();
        if let Ok(mut reads) = self.reads.write() {
            reads.insert(request_id, token.clone());
        }
        token
    }

    /// Unregister a read once its reply has been sent.
    pub fn unregister(&self, request_id: u64) {
        if let Ok(mut reads) = self.reads.write() {
            reads.remove(&request_id);
        }
    }

    /// Cancel every read in flight (unmount).
    pub fn cancel_all(&self) -> usize {
        match self.reads.read() {
            Ok(reads) => {
                for token in reads.values() {
                    token.cancel();
                }
                reads.len()
            }
            Err(_) => 0,
        }
    }

    pub fn len(&self) -> usize {
        self.reads.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
