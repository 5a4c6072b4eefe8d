use std::io;

use futures::TryStreamExt;
use serde_json::Value;

use crate::config::StreamOptions;
use crate::error::{Result, StreamError};
use crate::streaming::EventStream;

impl EventStream {
    /// Open an event stream over a `reqwest` response.
    ///
    /// A non-2xx status is reported as an upstream error before the content type is
    /// looked at.
    pub async fn from_response(
        response: reqwest::Response,
        options: StreamOptions,
    ) -> Result<Self> {
        let status = response.status();
        tracing::debug!("Upstream responded with status: {}", status);

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let error = upstream_error(status.as_u16(), &body);
            crate::metrics::STREAM_STATS.record_failure(error.kind());
            tracing::warn!(status = status.as_u16(), "Upstream rejected the request: {}", error);
            return Err(error);
        }

        let headers = response.headers().clone();
        let body = response.bytes_stream().map_err(io::Error::other);
        EventStream::open(&headers, body, options)
    }
}

/// Build an upstream error from a non-2xx body.
///
/// JSON bodies of the form `{"error":{"message":..}}` or `{"message":..}` contribute
/// their message and code; anything else is used verbatim.
pub fn upstream_error(status: u16, body: &str) -> StreamError {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return StreamError::upstream(Some(status), None, fallback_message(status, body));
    };

    let nested = value.get("error");
    let message = nested
        .and_then(|e| e.get("message"))
        .or_else(|| value.get("message"))
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| fallback_message(status, body));
    let code = nested
        .and_then(|e| e.get("code").or_else(|| e.get("type")))
        .or_else(|| value.get("code"))
        .and_then(|c| match c {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        });

    StreamError::upstream(Some(status), code, message)
}

fn fallback_message(status: u16, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        format!("HTTP status {}", status)
    } else {
        body.to_string()
    }
}
