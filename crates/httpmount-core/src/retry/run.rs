//! Retry loop: run a read attempt until success, a final failure, or cancellation.

use super::classify::classify;
use super::policy::{RetryDecision, RetryPolicy};
use crate::cancel::CancelToken;
use crate::error::ReadError;

pub fn run_with_retry<T, F>(
    policy: &RetryPolicy,
    cancel: Option<&CancelToken>,
    mut f: F,
) -> Result<T, ReadError>
where
    F: FnMut() -> Result<T, ReadError>,
{
    let mut attempt = 1u32;
    loop {
        match f() {
            Ok(v) => return Ok(v),
            Err(e) => match policy.decide(attempt, classify(&e)) {
                RetryDecision::NoRetry => return Err(e),
                RetryDecision::RetryAfter(d) => {
                    tracing::debug!(attempt, delay_ms = d.as_millis() as u64, error = %e, "retrying read");
                    std::thread::sleep(d);
                    if cancel.map(CancelToken::is_cancelled).unwrap_or(false) {
                        return Err(ReadError::Cancelled);
                    }
                    attempt += 1;
                }
            },
        }
    }
}
