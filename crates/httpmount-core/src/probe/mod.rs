//! One-time probe of the remote resource: size and byte-range support.
//!
//! Runs before the mount is presented. Any failure here is terminal; the
//! mount must not come up with a file it cannot read.

mod parse;

pub use parse::{descriptor_from_headers, ProbeHeaders};

use serde::{Deserialize, Serialize};

use crate::error::ProbeError;
use crate::transport::{HttpTransport, Request, Response};
use crate::url_model::validate_url;

/// How the probe asks for headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMethod {
    /// HEAD, retried once as GET if the server rejects HEAD (405/501).
    #[default]
    Head,
    /// GET without Range; the body is dropped as soon as headers are in.
    Get,
}

/// What a successful probe established about the resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFileDescriptor {
    /// `Content-Length` of the full resource.
    pub size: u64,
    /// Always true for a descriptor; probing fails otherwise.
    pub range_supported: bool,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

/// Probes `url` over `transport`. Blocks until the origin answers or the
/// transport's timeouts expire. Never retried at this layer.
pub fn probe(
    transport: &HttpTransport,
    url: &str,
    method: ProbeMethod,
) -> Result<RemoteFileDescriptor, ProbeError> {
    validate_url(url)?;

    let response = match method {
        ProbeMethod::Head => {
            let head = send(transport, url, Request::Head)?;
            if head.status == 405 || head.status == 501 {
                tracing::debug!(status = head.status, "HEAD rejected, probing with GET");
                send(transport, url, Request::GetHeaders)?
            } else {
                head
            }
        }
        ProbeMethod::Get => send(transport, url, Request::GetHeaders)?,
    };

    if !(200..300).contains(&response.status) {
        return Err(ProbeError::HttpStatus(response.status));
    }

    let descriptor = descriptor_from_headers(&response.headers)?;
    tracing::info!(
        url,
        size = descriptor.size,
        etag = descriptor.etag.as_deref().unwrap_or("-"),
        last_modified = descriptor.last_modified.as_deref().unwrap_or("-"),
        "probed remote file"
    );
    Ok(descriptor)
}

fn send(transport: &HttpTransport, url: &str, request: Request) -> Result<Response, ProbeError> {
    transport
        .execute(url, request, None)
        .map_err(ProbeError::Transport)
}
