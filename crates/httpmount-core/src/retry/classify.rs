//! Map read errors and curl errors onto retry kinds.

use super::policy::ErrorKind;
use crate::error::ReadError;

/// Classify a curl error for retry decisions.
pub fn classify_curl_error(e: &curl::Error) -> ErrorKind {
    if e.is_operation_timedout() {
        return ErrorKind::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
        || e.is_partial_file()
    {
        return ErrorKind::Connection;
    }
    ErrorKind::Other
}

pub fn classify(e: &ReadError) -> ErrorKind {
    match e {
        ReadError::Transport(ce) => classify_curl_error(ce),
        ReadError::ShortBody { .. } => ErrorKind::Connection,
        ReadError::Protocol { .. } | ReadError::Cancelled => ErrorKind::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_violation_is_not_retryable() {
        assert_eq!(classify(&ReadError::Protocol { status: 200 }), ErrorKind::Other);
        assert_eq!(classify(&ReadError::Protocol { status: 503 }), ErrorKind::Other);
    }

    #[test]
    fn cancelled_is_not_retryable() {
        assert_eq!(classify(&ReadError::Cancelled), ErrorKind::Other);
    }

    #[test]
    fn short_body_is_retryable() {
        let e = ReadError::ShortBody {
            expected: 100,
            received: 40,
        };
        assert_eq!(classify(&e), ErrorKind::Connection);
    }

    #[test]
    fn curl_timeout_and_connect_failures() {
        // CURLE_OPERATION_TIMEDOUT = 28, CURLE_COULDNT_CONNECT = 7, CURLE_URL_MALFORMAT = 3
        assert_eq!(classify_curl_error(&curl::Error::new(28)), ErrorKind::Timeout);
        assert_eq!(classify_curl_error(&curl::Error::new(7)), ErrorKind::Connection);
        assert_eq!(classify_curl_error(&curl::Error::new(3)), ErrorKind::Other);
    }
}
