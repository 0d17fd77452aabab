//! The remote resource seen as a fixed-size, read-only file.
//!
//! A `RemoteFile` is built by probing the origin once; after that its size is
//! immutable and every read is an independent ranged GET (or a block-cache
//! hit) over the shared pooled transport. It is `Sync` and meant to be shared
//! through `Arc` by concurrent readers.

use std::sync::Arc;

use crate::attrs::{FileAttributes, BLOCK_SIZE};
use crate::cache::{BlockCache, BlockKey, CacheStats};
use crate::cancel::CancelToken;
use crate::error::{ProbeError, ReadError};
use crate::probe::{self, ProbeMethod, RemoteFileDescriptor};
use crate::range::ByteRange;
use crate::retry::{run_with_retry, RetryPolicy};
use crate::transport::{HttpTransport, PoolStats, Request, TransportOptions};

/// Everything needed to open a RemoteFile besides its URL.
#[derive(Debug, Clone, Default)]
pub struct RemoteFileOptions {
    pub transport: TransportOptions,
    pub probe_method: ProbeMethod,
    /// `None` reports the first retryable failure as-is.
    pub retry: Option<RetryPolicy>,
    /// Blocks of [`BLOCK_SIZE`] kept in memory; 0 disables caching.
    pub cache_blocks: usize,
}

pub struct RemoteFile {
    url: String,
    file_id: u64,
    descriptor: RemoteFileDescriptor,
    transport: HttpTransport,
    retry: Option<RetryPolicy>,
    cache: Option<Arc<BlockCache>>,
}

impl std::fmt::Debug for RemoteFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteFile")
            .field("url", &self.url)
            .field("file_id", &self.file_id)
            .field("size", &self.descriptor.size)
            .finish()
    }
}

impl RemoteFile {
    /// Builds the pooled transport and probes `url`. `file_id` identifies this
    /// file in the block cache.
    pub fn probe(url: &str, file_id: u64, options: &RemoteFileOptions) -> Result<Self, ProbeError> {
        let transport = HttpTransport::new(options.transport);
        let descriptor = probe::probe(&transport, url, options.probe_method)?;
        let cache = BlockCache::new(options.cache_blocks).map(Arc::new);
        Ok(Self {
            url: url.to_string(),
            file_id,
            descriptor,
            transport,
            retry: options.retry,
            cache,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn size(&self) -> u64 {
        self.descriptor.size
    }

    pub fn range_supported(&self) -> bool {
        self.descriptor.range_supported
    }

    pub fn descriptor(&self) -> &RemoteFileDescriptor {
        &self.descriptor
    }

    pub fn attributes(&self) -> FileAttributes {
        FileAttributes::regular(self.descriptor.size)
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.transport.pool_stats()
    }

    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|c| c.stats())
    }

    /// Reads up to `length` bytes at `offset`.
    ///
    /// Reads running past the end are shortened; reads at or beyond the end
    /// return no bytes. Neither is an error.
    pub fn read_range(&self, offset: u64, length: u32) -> Result<Vec<u8>, ReadError> {
        self.read_range_cancellable(offset, length, None)
    }

    /// Like [`read_range`](Self::read_range); the transfer aborts with
    /// [`ReadError::Cancelled`] once `cancel` is set.
    pub fn read_range_cancellable(
        &self,
        offset: u64,
        length: u32,
        cancel: Option<&CancelToken>,
    ) -> Result<Vec<u8>, ReadError> {
        let Some(range) = ByteRange::clamped(offset, length, self.descriptor.size) else {
            return Ok(Vec::new());
        };
        match &self.cache {
            Some(cache) => self.read_through_cache(cache, range, cancel),
            None => self.fetch(range, cancel),
        }
    }

    fn read_through_cache(
        &self,
        cache: &BlockCache,
        range: ByteRange,
        cancel: Option<&CancelToken>,
    ) -> Result<Vec<u8>, ReadError> {
        let mut out = Vec::with_capacity(range.len() as usize);
        for index in range.block_span(BLOCK_SIZE) {
            let key = BlockKey {
                file_id: self.file_id,
                index,
            };
            let block_range = ByteRange::block(index, BLOCK_SIZE, self.descriptor.size);
            let block = match cache.get(&key) {
                Some(b) => b,
                None => {
                    let data = Arc::new(self.fetch(block_range, cancel)?);
                    cache.insert(key, Arc::clone(&data));
                    data
                }
            };
            let from = (range.start.max(block_range.start) - block_range.start) as usize;
            let to = (range.end.min(block_range.end) - block_range.start) as usize;
            out.extend_from_slice(&block[from..to]);
        }
        Ok(out)
    }

    fn fetch(&self, range: ByteRange, cancel: Option<&CancelToken>) -> Result<Vec<u8>, ReadError> {
        match &self.retry {
            Some(policy) => run_with_retry(policy, cancel, || self.fetch_once(range, cancel)),
            None => self.fetch_once(range, cancel),
        }
    }

    /// One ranged GET. Anything but 206 with exactly the requested length is an error.
    ///
    /// The transport stops receiving at the first byte of a non-206 body or
    /// past the requested length, so an origin that ignores `Range` costs one
    /// round trip, not the whole object.
    fn fetch_once(&self, range: ByteRange, cancel: Option<&CancelToken>) -> Result<Vec<u8>, ReadError> {
        let response = self
            .transport
            .execute(&self.url, Request::GetRange(range), cancel)
            .map_err(ReadError::from_curl)?;

        if response.status != 206 || response.body_refused {
            return Err(ReadError::Protocol {
                status: response.status,
            });
        }
        let received = response.body.len() as u64;
        if received != range.len() {
            return Err(ReadError::ShortBody {
                expected: range.len(),
                received,
            });
        }
        tracing::trace!(range = %range.header_value(), "range fetched");
        Ok(response.body)
    }
}
