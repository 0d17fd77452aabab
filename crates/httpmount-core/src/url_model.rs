//! URL validation and the name the remote file gets inside the mount.

use url::Url;

use crate::error::ProbeError;

/// Name used when neither configuration nor the URL path supplies one.
pub const DEFAULT_FILE_NAME: &str = "test.iso";

/// Linux NAME_MAX.
const NAME_MAX: usize = 255;

/// Parses `raw` and checks it is an absolute http/https URL with a host.
pub fn validate_url(raw: &str) -> Result<Url, ProbeError> {
    let invalid = |reason: String| ProbeError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };
    let parsed = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(format!("unsupported scheme {:?}", other))),
    }
    if parsed.host_str().map(str::is_empty).unwrap_or(true) {
        return Err(invalid("missing host".to_string()));
    }
    Ok(parsed)
}

/// Picks the file name: an explicit override wins, then the last URL path
/// segment, then [`DEFAULT_FILE_NAME`]. The result is always a single safe
/// path component.
pub fn mount_file_name(url: &str, override_name: Option<&str>) -> String {
    override_name
        .map(sanitize_component)
        .filter(|n| is_usable(n))
        .or_else(|| {
            last_path_segment(url)
                .map(|s| sanitize_component(&s))
                .filter(|n| is_usable(n))
        })
        .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string())
}

fn is_usable(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".."
}

/// Last non-empty path segment, percent-decoded.
fn last_path_segment(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    Some(percent_decode(segment))
}

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(b) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(b);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Makes `name` safe as one path component: `/`, NUL and control characters
/// become `_`, surrounding dots and spaces are trimmed, length capped at NAME_MAX.
fn sanitize_component(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if c == '/' || c == '\0' || c.is_control() { '_' } else { c })
        .collect();
    let trimmed = replaced.trim_matches(|c| c == ' ' || c == '.');
    let mut take = trimmed.len().min(NAME_MAX);
    while !trimmed.is_char_boundary(take) {
        take -= 1;
    }
    trimmed[..take].to_string()
}
