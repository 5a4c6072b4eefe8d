use tokio::time::Instant;

use crate::error::Result;
use crate::models::{Response, StreamEvent, StreamMetrics};

use super::stream::EventStream;

/// Folds events into a [`Response`].
#[derive(Debug, Default)]
pub struct ResponseBuilder {
    response: Response,
}

impl ResponseBuilder {
    pub fn new(request_id: Option<String>) -> Self {
        Self {
            response: Response {
                request_id,
                ..Default::default()
            },
        }
    }

    /// Apply one event. Returns `true` once the terminal `MessageStop` is seen.
    pub fn apply(&mut self, event: StreamEvent) -> bool {
        let response = &mut self.response;
        match event {
            StreamEvent::MessageStart { response_id, model } => {
                if response_id.is_some() {
                    response.response_id = response_id;
                }
                if model.is_some() {
                    response.model = model;
                }
            }
            StreamEvent::MessageDelta { text } => response.text.push_str(&text),
            StreamEvent::ReasoningDelta { text } => response.reasoning.push_str(&text),
            StreamEvent::ToolUseStop {
                tool_calls,
                tool_result,
            } => {
                response.tool_calls.extend(tool_calls);
                if tool_result.is_some() {
                    response.tool_result = tool_result;
                }
            }
            StreamEvent::MessageStop { stop_reason, usage } => {
                response.stop_reason = stop_reason;
                response.usage = usage;
                return true;
            }
            StreamEvent::ToolUseStart { .. }
            | StreamEvent::ToolUseDelta { .. }
            | StreamEvent::Ping
            | StreamEvent::Custom { .. } => {}
        }
        false
    }

    pub fn finish(self) -> Response {
        self.response
    }
}

impl EventStream {
    /// Drain the stream into one [`Response`].
    ///
    /// The first error aborts collection and is returned as-is.
    pub async fn collect(self) -> Result<Response> {
        self.collect_with_metrics().await.map(|(response, _)| response)
    }

    /// Like [`collect`](Self::collect), also reporting TTFT and duration.
    pub async fn collect_with_metrics(mut self) -> Result<(Response, StreamMetrics)> {
        let mut builder = ResponseBuilder::new(self.request_id().map(ToOwned::to_owned));

        while let Some(event) = self.recv().await? {
            if builder.apply(event) {
                // calls left open when the completion frame arrived
                if let Some(pending) = self.flush_pending() {
                    builder.apply(pending);
                }
                break;
            }
        }

        let opened = self.opened_at();
        let metrics = StreamMetrics::new(
            Instant::now() - opened,
            self.first_content_at().map(|at| at - opened),
        );
        self.close();

        tracing::debug!(stream_id = %self.id(), %metrics, "Collected response");
        Ok((builder.finish(), metrics))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FunctionCall, ToolCall, Usage};
    use serde_json::json;

    fn call(index: usize, name: &str) -> ToolCall {
        ToolCall {
            index,
            id: format!("call_{index}"),
            call_type: "function".into(),
            function: FunctionCall {
                name: name.into(),
                arguments: "{}".into(),
            },
        }
    }

    #[test]
    fn test_builder_folds_events() {
        let mut builder = ResponseBuilder::new(Some("req-1".into()));
        let events = vec![
            StreamEvent::MessageStart {
                response_id: Some("resp-1".into()),
                model: Some("m".into()),
            },
            StreamEvent::ReasoningDelta {
                text: "hmm".into(),
            },
            StreamEvent::MessageDelta { text: "Hel".into() },
            StreamEvent::Ping,
            StreamEvent::MessageDelta { text: "lo".into() },
            StreamEvent::ToolUseStop {
                tool_calls: vec![call(0, "a")],
                tool_result: Some(json!({"ok": 1})),
            },
            StreamEvent::ToolUseStop {
                tool_calls: vec![call(1, "b")],
                tool_result: None,
            },
        ];
        for event in events {
            assert!(!builder.apply(event));
        }
        assert!(builder.apply(StreamEvent::MessageStop {
            stop_reason: Some("end_turn".into()),
            usage: Some(Usage::new(3, 4, 7)),
        }));

        let response = builder.finish();
        assert_eq!(response.request_id.as_deref(), Some("req-1"));
        assert_eq!(response.response_id.as_deref(), Some("resp-1"));
        assert_eq!(response.text(), "Hello");
        assert_eq!(response.reasoning(), "hmm");
        assert_eq!(response.tool_calls.len(), 2);
        assert_eq!(response.tool_calls[1].function.name, "b");
        assert_eq!(response.tool_result, Some(json!({"ok": 1})));
        assert_eq!(response.stop_reason.as_deref(), Some("end_turn"));
        assert_eq!(response.usage.unwrap().total_tokens, 7);
    }

    #[test]
    fn test_custom_events_are_ignored() {
        let mut builder = ResponseBuilder::default();
        assert!(!builder.apply(StreamEvent::Custom {
            frame_type: "citation".into(),
            raw: json!({"type": "citation"}),
        }));
        assert_eq!(builder.finish(), Response::default());
    }
}
