//! Pooled HTTP transport for probe and range requests.
//!
//! One `HttpTransport` is built per RemoteFile and shared by every read. Each
//! request checks a handle out of the pool, configures it from scratch and
//! returns it when the exchange is over, so connections are reused across
//! reads without any request holding a lock while it waits on the network.

mod exchange;
mod pool;

pub use exchange::{BodyMode, Exchange};
pub use pool::{ConnectionPool, PoolStats, PooledHandle};

use std::time::Duration;

use curl::easy::Easy2;

use crate::cancel::CancelToken;
use crate::range::ByteRange;

/// Connection limits and timeouts for the pooled transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportOptions {
    /// Handles (and their keep-alive connections) kept idle for reuse.
    pub max_idle_connections: usize,
    /// Handles open at once against the origin; further requests wait.
    pub max_connections_per_host: usize,
    /// Idle handles older than this are closed instead of reused.
    pub idle_timeout: Duration,
    pub connect_timeout: Duration,
    /// Abort when no bytes arrive for this long (covers waiting on headers).
    pub response_timeout: Duration,
    /// Upper bound on one whole exchange.
    pub request_timeout: Duration,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            max_idle_connections: 100,
            max_connections_per_host: 100,
            idle_timeout: Duration::from_secs(15),
            connect_timeout: Duration::from_secs(15),
            response_timeout: Duration::from_secs(15),
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// Final response of an exchange.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u32,
    pub headers: Vec<String>,
    pub body: Vec<u8>,
    /// A ranged GET's body was cut off because the reply was not a 206 of
    /// the requested length.
    pub body_refused: bool,
}

/// Request shape understood by [`HttpTransport::execute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    Head,
    /// Unconditional GET whose body is dropped after the headers.
    GetHeaders,
    GetRange(ByteRange),
}

pub struct HttpTransport {
    pool: ConnectionPool,
    options: TransportOptions,
}

impl HttpTransport {
    pub fn new(options: TransportOptions) -> Self {
        Self {
            pool: ConnectionPool::new(
                options.max_idle_connections,
                options.max_connections_per_host,
                options.idle_timeout,
            ),
            options,
        }
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Run one exchange on a pooled handle.
    ///
    /// Follows redirects; only the final response's headers are returned.
    /// When `cancel` is set mid-transfer curl aborts with "aborted by callback".
    pub fn execute(
        &self,
        url: &str,
        request: Request,
        cancel: Option<&CancelToken>,
    ) -> Result<Response, curl::Error> {
        let mut easy = self.pool.checkout();
        let expected_len = match request {
            Request::GetRange(r) => r.len() as usize,
            Request::Head | Request::GetHeaders => 0,
        };
        let mode = match request {
            Request::GetHeaders => BodyMode::Discard,
            Request::Head => BodyMode::Collect,
            Request::GetRange(_) => BodyMode::Partial,
        };

        // reset() keeps the connection cache; it only clears per-request options.
        easy.reset();
        easy.get_mut().prepare(mode, expected_len, cancel.cloned());
        self.configure(&mut easy, url, request)?;

        let performed = easy.perform();
        if let Err(e) = performed {
            let exchange = easy.get_ref();
            // Discard and Partial modes abort through the write callback on purpose.
            if !(e.is_write_error() && exchange.stopped_by_handler()) {
                return Err(e);
            }
        }

        let status = easy.response_code()?;
        let exchange = easy.get_mut();
        Ok(Response {
            status,
            headers: std::mem::take(&mut exchange.headers),
            body: exchange.take_body(),
            body_refused: exchange.body_refused,
        })
    }

    fn configure(
        &self,
        easy: &mut Easy2<Exchange>,
        url: &str,
        request: Request,
    ) -> Result<(), curl::Error> {
        let o = &self.options;
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.connect_timeout(o.connect_timeout)?;
        easy.low_speed_limit(1)?;
        easy.low_speed_time(o.response_timeout)?;
        easy.timeout(o.request_timeout)?;
        easy.tcp_keepalive(true)?;
        easy.useragent(concat!("httpmount/", env!("CARGO_PKG_VERSION")))?;
        easy.progress(true)?;

        match request {
            Request::Head => {
                easy.nobody(true)?;
            }
            Request::GetHeaders => {
                easy.get(true)?;
            }
            Request::GetRange(range) => {
                easy.get(true)?;
                // curl expects "start-end" (inclusive), not "bytes=start-end".
                easy.range(&range.curl_range())?;
            }
        }
        Ok(())
    }
}
