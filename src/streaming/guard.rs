use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName};

use crate::error::{Result, StreamError};

pub const NDJSON_MEDIA_TYPE: &str = "application/x-ndjson";

/// Check that the response advertises an NDJSON body.
///
/// Parameters such as `charset` are ignored. On mismatch the error carries the header
/// value exactly as received (empty when the header is missing).
pub fn validate_content_type(headers: &HeaderMap) -> Result<()> {
    let received = headers
        .get(CONTENT_TYPE)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .unwrap_or_default();

    let media_type = received.split(';').next().unwrap_or_default().trim();
    if media_type.eq_ignore_ascii_case(NDJSON_MEDIA_TYPE) {
        return Ok(());
    }

    tracing::warn!(content_type = %received, "Rejecting stream with unexpected content type");
    Err(StreamError::UnexpectedContentType {
        content_type: received,
    })
}

/// Read the server-echoed correlation id, if any.
pub fn request_id(headers: &HeaderMap, header: &HeaderName) -> Option<String> {
    headers
        .get(header)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
}
