use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use super::{ToolCall, Usage};

/// A whole streamed response, reassembled from its events.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Response {
    /// Correlation id echoed in the response headers
    pub request_id: Option<String>,
    /// Id announced by the `start` frame
    pub response_id: Option<String>,
    pub model: Option<String>,
    pub text: String,
    pub reasoning: String,
    pub tool_calls: Vec<ToolCall>,
    pub tool_result: Option<Value>,
    pub usage: Option<Usage>,
    pub stop_reason: Option<String>,
}

impl Response {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Timing of one stream, measured from the moment it was opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreamMetrics {
    pub duration: Duration,
    pub ttft: Duration,
}

impl StreamMetrics {
    /// Build metrics, keeping `ttft` within `0..=duration`.
    pub fn new(duration: Duration, ttft: Option<Duration>) -> Self {
        let ttft = ttft.map_or(duration, |t| t.min(duration));
        Self { duration, ttft }
    }
}

impl std::fmt::Display for StreamMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ttft {:.2}ms, duration {:.2}ms",
            self.ttft.as_secs_f64() * 1000.0,
            self.duration.as_secs_f64() * 1000.0
        )
    }
}
