use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Token accounting reported on the completion frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

impl Usage {
    pub fn new(input_tokens: u64, output_tokens: u64, total_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
        .normalized()
    }

    /// Fill in `total_tokens` when the wire left it at zero.
    pub fn normalized(mut self) -> Self {
        if self.total_tokens == 0 && (self.input_tokens != 0 || self.output_tokens != 0) {
            self.total_tokens = self.input_tokens.saturating_add(self.output_tokens);
        }
        self
    }
}

/// A partial tool call, correlated across frames by `index`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallDelta {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// Raw JSON text of the arguments, exactly as streamed
    pub arguments: String,
}

/// A finalized tool call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub index: usize,
    pub id: String,
    pub call_type: String,
    pub function: FunctionCall,
}

impl ToolCall {
    /// Parse the argument text as JSON.
    pub fn parse_arguments(&self) -> serde_json::Result<Value> {
        if self.function.arguments.trim().is_empty() {
            return Ok(Value::Object(Default::default()));
        }
        serde_json::from_str(&self.function.arguments)
    }
}

/// Fieldless discriminant of [`StreamEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    MessageStart,
    MessageDelta,
    MessageStop,
    ReasoningDelta,
    ToolUseStart,
    ToolUseDelta,
    ToolUseStop,
    Ping,
    Custom,
}

/// Canonical output unit, one per frame.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    MessageStart {
        response_id: Option<String>,
        model: Option<String>,
    },
    MessageDelta {
        text: String,
    },
    ReasoningDelta {
        text: String,
    },
    ToolUseStart {
        delta: ToolCallDelta,
    },
    ToolUseDelta {
        delta: ToolCallDelta,
    },
    /// All pending tool calls, finalized in ascending index order.
    ToolUseStop {
        tool_calls: Vec<ToolCall>,
        tool_result: Option<Value>,
    },
    MessageStop {
        stop_reason: Option<String>,
        usage: Option<Usage>,
    },
    Ping,
    /// Frame with a `type` this crate does not know, kept verbatim.
    Custom {
        frame_type: String,
        raw: Value,
    },
}

impl StreamEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            StreamEvent::MessageStart { .. } => EventKind::MessageStart,
            StreamEvent::MessageDelta { .. } => EventKind::MessageDelta,
            StreamEvent::ReasoningDelta { .. } => EventKind::ReasoningDelta,
            StreamEvent::ToolUseStart { .. } => EventKind::ToolUseStart,
            StreamEvent::ToolUseDelta { .. } => EventKind::ToolUseDelta,
            StreamEvent::ToolUseStop { .. } => EventKind::ToolUseStop,
            StreamEvent::MessageStop { .. } => EventKind::MessageStop,
            StreamEvent::Ping => EventKind::Ping,
            StreamEvent::Custom { .. } => EventKind::Custom,
        }
    }

    /// Whether this event counts as first output for the TTFT clock.
    pub fn is_content(&self) -> bool {
        matches!(
            self,
            StreamEvent::MessageDelta { .. }
                | StreamEvent::ReasoningDelta { .. }
                | StreamEvent::ToolUseStart { .. }
                | StreamEvent::ToolUseDelta { .. }
                | StreamEvent::ToolUseStop { .. }
        )
    }

    pub fn text_delta(&self) -> Option<&str> {
        match self {
            StreamEvent::MessageDelta { text } => Some(text),
            _ => None,
        }
    }

    pub fn reasoning_delta(&self) -> Option<&str> {
        match self {
            StreamEvent::ReasoningDelta { text } => Some(text),
            _ => None,
        }
    }

    pub fn tool_call_delta(&self) -> Option<&ToolCallDelta> {
        match self {
            StreamEvent::ToolUseStart { delta } | StreamEvent::ToolUseDelta { delta } => {
                Some(delta)
            }
            _ => None,
        }
    }
}
