use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Result, StreamError};
use crate::models::{FunctionCall, ToolCall, ToolCallDelta};

/// One decoded NDJSON line, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    line: u64,
    value: Value,
}

impl RawFrame {
    pub(crate) fn new(line: u64, value: Value) -> Self {
        Self { line, value }
    }

    /// 1-based line number within the stream
    pub fn line(&self) -> u64 {
        self.line
    }

    /// The `type` discriminator, if the frame carries a string one
    pub fn frame_type(&self) -> Option<&str> {
        self.value.get("type").and_then(Value::as_str)
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    /// Deserialize the frame body into one of the typed wire shapes.
    ///
    /// Unknown fields are ignored; fields with the wrong shape are a protocol error.
    pub(crate) fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        T::deserialize(&self.value).map_err(|e| {
            StreamError::protocol(format!(
                "malformed {} frame at line {}: {}",
                self.frame_type().unwrap_or("untyped"),
                self.line,
                e
            ))
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct StartFrame {
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct UpdateFrame {
    #[serde(default)]
    pub delta: Option<String>,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub payload: Option<UpdatePayload>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct UpdatePayload {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

impl UpdateFrame {
    /// Bare `delta` wins over `payload.content`. Empty strings count as absent.
    pub fn text(&self) -> Option<&str> {
        non_empty(&self.delta)
            .or_else(|| self.payload.as_ref().and_then(|p| non_empty(&p.content)))
    }

    pub fn reasoning(&self) -> Option<&str> {
        non_empty(&self.reasoning)
            .or_else(|| self.payload.as_ref().and_then(|p| non_empty(&p.reasoning)))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Shared shape of `tool_use_start` and `tool_use_delta`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ToolUseFrame {
    pub tool_call_delta: WireToolCallDelta,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireToolCallDelta {
    pub index: usize,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "type")]
    pub call_type: Option<String>,
    #[serde(default)]
    pub function: Option<WireFunction>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct WireFunction {
    #[serde(default)]
    pub name: Option<String>,
    /// Usually a string fragment; complete snapshots sometimes carry an object.
    #[serde(default)]
    pub arguments: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ToolUseStopFrame {
    #[serde(default)]
    pub tool_calls: Option<Vec<WireToolCall>>,
    #[serde(default)]
    pub tool_result: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireToolCall {
    #[serde(default)]
    pub index: Option<usize>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "type")]
    pub call_type: Option<String>,
    #[serde(default)]
    pub function: Option<WireFunction>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct CompletionFrame {
    #[serde(default)]
    pub usage: Option<crate::models::Usage>,
    #[serde(default)]
    pub stop_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ErrorFrame {
    #[serde(default)]
    pub error: Option<ErrorBody>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<Value>,
    #[serde(default, rename = "type")]
    pub error_type: Option<String>,
}

impl ErrorFrame {
    pub fn into_error(self, status: Option<u16>) -> StreamError {
        let body = self.error.unwrap_or_default();
        let message = body
            .message
            .or(self.message)
            .unwrap_or_else(|| "provider reported an error".to_string());
        let code = body
            .code
            .or(self.code)
            .map(|c| match c {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .or(body.error_type);
        StreamError::upstream(status, code, message)
    }
}

impl WireToolCallDelta {
    pub fn into_delta(self) -> ToolCallDelta {
        let function = self.function.unwrap_or_default();
        ToolCallDelta {
            index: self.index,
            id: self.id,
            call_type: self.call_type,
            function_name: function.name,
            arguments: arguments_text(function.arguments),
        }
    }
}

impl WireToolCall {
    /// Entries without an explicit index take their list position.
    pub fn into_tool_call(self, position: usize) -> ToolCall {
        let function = self.function.unwrap_or_default();
        ToolCall {
            index: self.index.unwrap_or(position),
            id: self.id.unwrap_or_default(),
            call_type: self.call_type.unwrap_or_else(|| "function".to_string()),
            function: FunctionCall {
                name: function.name.unwrap_or_default(),
                arguments: arguments_text(function.arguments).unwrap_or_default(),
            },
        }
    }
}

/// Render wire arguments (string fragment or JSON snapshot) as text.
pub(crate) fn arguments_text(arguments: Option<Value>) -> Option<String> {
    match arguments? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}
