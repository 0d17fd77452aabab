//! Bounded retry for transient read failures.
//!
//! Classifies read errors (timeouts, connection failures, truncated bodies)
//! and decides exponential backoff. Protocol violations and cancellations are
//! never retried: re-asking a misbehaving origin the same way will not help.

mod classify;
mod policy;
mod run;

pub use classify::{classify, classify_curl_error};
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
