//! Interpret probe response headers.

use super::RemoteFileDescriptor;
use crate::error::ProbeError;

/// Raw values of the headers the probe cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeHeaders {
    pub content_length: Option<String>,
    pub accept_ranges: Option<String>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

impl ProbeHeaders {
    /// Collect from header lines; later occurrences win.
    pub fn from_lines(lines: &[String]) -> Self {
        let mut out = ProbeHeaders::default();
        for line in lines {
            let Some((name, value)) = line.split_once(':') else {
                continue;
            };
            let name = name.trim();
            let value = value.trim().to_string();
            if name.eq_ignore_ascii_case("content-length") {
                out.content_length = Some(value);
            } else if name.eq_ignore_ascii_case("accept-ranges") {
                out.accept_ranges = Some(value);
            } else if name.eq_ignore_ascii_case("etag") {
                out.etag = Some(value.trim_matches('"').to_string());
            } else if name.eq_ignore_ascii_case("last-modified") {
                out.last_modified = Some(value);
            }
        }
        out
    }
}

/// Validate probe headers: `Accept-Ranges` must be exactly `bytes` and
/// `Content-Length` a non-negative integer.
pub fn descriptor_from_headers(lines: &[String]) -> Result<RemoteFileDescriptor, ProbeError> {
    let headers = ProbeHeaders::from_lines(lines);

    if headers.accept_ranges.as_deref() != Some("bytes") {
        return Err(ProbeError::RangesUnsupported(headers.accept_ranges));
    }

    let raw = headers
        .content_length
        .ok_or(ProbeError::MissingContentLength)?;
    let size = raw
        .parse::<u64>()
        .map_err(|_| ProbeError::InvalidContentLength(raw.clone()))?;

    Ok(RemoteFileDescriptor {
        size,
        range_supported: true,
        etag: headers.etag,
        last_modified: headers.last_modified,
    })
}
