use crate::error::{Result, StreamError};
use crate::models::frame::{
    CompletionFrame, ErrorFrame, StartFrame, ToolUseFrame, ToolUseStopFrame, UpdateFrame,
};
use crate::models::{RawFrame, StreamEvent, ToolCall, Usage};

use super::accumulator::DeltaAccumulator;

/// Maps raw frames onto [`StreamEvent`]s, routing tool-call fragments through the
/// accumulator.
#[derive(Debug, Default)]
pub struct EventNormalizer {
    accumulator: DeltaAccumulator,
}

impl EventNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert one frame into exactly one event.
    ///
    /// An `error` frame produces no event: it ends the stream with an upstream error.
    pub fn normalize(&mut self, frame: RawFrame) -> Result<StreamEvent> {
        let Some(frame_type) = frame.frame_type() else {
            return Err(StreamError::protocol(format!(
                "frame at line {} has no type discriminator",
                frame.line()
            )));
        };

        let event = match frame_type {
            "start" => {
                let start: StartFrame = frame.parse()?;
                StreamEvent::MessageStart {
                    response_id: start.request_id,
                    model: start.model,
                }
            }
            "update" => {
                let update: UpdateFrame = frame.parse()?;
                if let Some(text) = update.text() {
                    StreamEvent::MessageDelta {
                        text: text.to_string(),
                    }
                } else if let Some(text) = update.reasoning() {
                    StreamEvent::ReasoningDelta {
                        text: text.to_string(),
                    }
                } else {
                    tracing::debug!(line = frame.line(), "Update frame without text or reasoning");
                    custom(frame)
                }
            }
            "tool_use_start" => {
                let delta = frame.parse::<ToolUseFrame>()?.tool_call_delta.into_delta();
                self.accumulator.seed(&delta);
                StreamEvent::ToolUseStart { delta }
            }
            "tool_use_delta" => {
                let delta = frame.parse::<ToolUseFrame>()?.tool_call_delta.into_delta();
                self.accumulator.append(&delta);
                StreamEvent::ToolUseDelta { delta }
            }
            "tool_use_stop" => {
                let stop: ToolUseStopFrame = frame.parse()?;
                let authoritative: Option<Vec<ToolCall>> = stop.tool_calls.map(|calls| {
                    calls
                        .into_iter()
                        .enumerate()
                        .map(|(position, call)| call.into_tool_call(position))
                        .collect()
                });
                StreamEvent::ToolUseStop {
                    tool_calls: self.accumulator.finalize(authoritative),
                    tool_result: stop.tool_result,
                }
            }
            "completion" => {
                let completion: CompletionFrame = frame.parse()?;
                StreamEvent::MessageStop {
                    stop_reason: completion.stop_reason,
                    usage: completion.usage.map(Usage::normalized),
                }
            }
            "ping" => StreamEvent::Ping,
            "error" => {
                let error: ErrorFrame = frame.parse()?;
                return Err(error.into_error(None));
            }
            other => {
                tracing::debug!(
                    frame_type = other,
                    line = frame.line(),
                    "Passing through unknown frame"
                );
                custom(frame)
            }
        };

        Ok(event)
    }

    /// At end of stream, close any tool calls still being assembled.
    pub fn flush(&mut self) -> Option<StreamEvent> {
        if self.accumulator.is_empty() {
            return None;
        }
        tracing::debug!(
            pending = self.accumulator.len(),
            "Stream ended with open tool calls, finalizing"
        );
        Some(StreamEvent::ToolUseStop {
            tool_calls: self.accumulator.finalize(None),
            tool_result: None,
        })
    }

    pub fn pending_tool_calls(&self) -> usize {
        self.accumulator.len()
    }

    pub fn reset(&mut self) {
        self.accumulator.clear();
    }
}

fn custom(frame: RawFrame) -> StreamEvent {
    let frame_type = frame.frame_type().unwrap_or_default().to_string();
    StreamEvent::Custom {
        frame_type,
        raw: frame.into_value(),
    }
}
