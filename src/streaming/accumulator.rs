use std::collections::BTreeMap;

use crate::models::{FunctionCall, ToolCall, ToolCallDelta};

/// Buffer for one tool call whose arguments arrive in fragments
#[derive(Debug, Clone, Default)]
pub struct ToolInputBuffer {
    pub id: Option<String>,
    pub call_type: Option<String>,
    pub name: Option<String>,
    /// Argument fragments concatenated in arrival order
    pub partial_json: String,
    /// Fragments received, for diagnostics
    pub fragments: usize,
}

impl ToolInputBuffer {
    /// Merge one fragment. Identity fields stick to their first non-empty value.
    fn apply(&mut self, delta: &ToolCallDelta) {
        fill(&mut self.id, &delta.id);
        fill(&mut self.call_type, &delta.call_type);
        fill(&mut self.name, &delta.function_name);
        if let Some(chunk) = delta.arguments.as_deref() {
            self.partial_json.push_str(chunk);
            self.fragments += 1;
        }
    }

    /// Get the current size of buffered data
    pub fn size(&self) -> usize {
        self.partial_json.len()
    }

    /// Try to parse the accumulated JSON, returning the value once it is complete
    pub fn try_parse(&self) -> Option<serde_json::Value> {
        serde_json::from_str(&self.partial_json).ok()
    }

    fn into_tool_call(self, index: usize) -> ToolCall {
        ToolCall {
            index,
            id: self.id.unwrap_or_default(),
            call_type: self.call_type.unwrap_or_else(|| "function".to_string()),
            function: FunctionCall {
                name: self.name.unwrap_or_default(),
                arguments: self.partial_json,
            },
        }
    }
}

fn fill(slot: &mut Option<String>, value: &Option<String>) {
    if slot.as_deref().is_none_or(str::is_empty)
        && let Some(v) = value.as_deref().filter(|v| !v.is_empty())
    {
        *slot = Some(v.to_string());
    }
}

/// Merges tool-call fragments keyed by their stream-local index.
///
/// The ordered map makes finalization come out in ascending index order.
#[derive(Debug, Default)]
pub struct DeltaAccumulator {
    pending: BTreeMap<usize, ToolInputBuffer>,
}

impl DeltaAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open (or re-open) the entry for `delta.index`.
    pub fn seed(&mut self, delta: &ToolCallDelta) {
        let entry = self.pending.entry(delta.index).or_default();
        entry.apply(delta);
        tracing::debug!(
            index = delta.index,
            name = entry.name.as_deref().unwrap_or(""),
            "Started tool input buffering"
        );
    }

    /// Append a fragment; an index never seeded is created on the fly.
    pub fn append(&mut self, delta: &ToolCallDelta) {
        let entry = self.pending.entry(delta.index).or_default();
        entry.apply(delta);
        tracing::trace!(
            index = delta.index,
            size = entry.size(),
            "Appended to tool input buffer"
        );
    }

    /// Close every pending call.
    ///
    /// A non-empty server-supplied list wins verbatim over what was accumulated.
    pub fn finalize(&mut self, authoritative: Option<Vec<ToolCall>>) -> Vec<ToolCall> {
        let pending = std::mem::take(&mut self.pending);
        match authoritative.filter(|calls| !calls.is_empty()) {
            Some(calls) => {
                tracing::debug!(
                    authoritative = calls.len(),
                    discarded = pending.len(),
                    "Using server-supplied tool calls"
                );
                calls
            }
            None => {
                let calls: Vec<ToolCall> = pending
                    .into_iter()
                    .map(|(index, buffer)| {
                        if buffer.try_parse().is_none() && !buffer.partial_json.is_empty() {
                            tracing::warn!(
                                index,
                                size = buffer.size(),
                                "Tool arguments are not valid JSON"
                            );
                        }
                        buffer.into_tool_call(index)
                    })
                    .collect();
                tracing::debug!(count = calls.len(), "Finalized accumulated tool calls");
                calls
            }
        }
    }

    pub fn get(&self, index: usize) -> Option<&ToolInputBuffer> {
        self.pending.get(&index)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(index: usize, id: &str, name: &str) -> ToolCallDelta {
        ToolCallDelta {
            index,
            id: Some(id.to_string()),
            call_type: Some("function".to_string()),
            function_name: Some(name.to_string()),
            arguments: None,
        }
    }

    fn args(index: usize, fragment: &str) -> ToolCallDelta {
        ToolCallDelta {
            index,
            arguments: Some(fragment.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_fragments_concatenate_in_order() {
        let mut acc = DeltaAccumulator::new();
        acc.seed(&start(0, "call_1", "get_weather"));
        acc.append(&args(0, r#"{"loc"#));
        acc.append(&args(0, r#"ation":"#));
        acc.append(&args(0, r#""SF"}"#));

        assert_eq!(acc.get(0).unwrap().fragments, 3);
        let calls = acc.finalize(None);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].function.name, "get_weather");
        assert_eq!(calls[0].function.arguments, r#"{"location":"SF"}"#);
        assert!(acc.is_empty());
    }

    #[test]
    fn test_finalize_orders_by_index() {
        let mut acc = DeltaAccumulator::new();
        acc.seed(&start(2, "c", "third"));
        acc.seed(&start(0, "a", "first"));
        acc.append(&args(2, "{}"));
        acc.seed(&start(1, "b", "second"));

        let names: Vec<_> = acc
            .finalize(None)
            .into_iter()
            .map(|c| c.function.name)
            .collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_first_identity_wins() {
        let mut acc = DeltaAccumulator::new();
        acc.seed(&start(0, "call_1", "search"));
        acc.append(&ToolCallDelta {
            index: 0,
            id: Some("call_other".into()),
            function_name: Some("other".into()),
            arguments: Some("{}".into()),
            ..Default::default()
        });
        let calls = acc.finalize(None);
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].function.name, "search");
    }

    #[test]
    fn test_append_without_seed_creates_entry() {
        let mut acc = DeltaAccumulator::new();
        acc.append(&ToolCallDelta {
            index: 3,
            id: Some("late".into()),
            function_name: Some("lookup".into()),
            arguments: Some("{\"q\":1}".into()),
            ..Default::default()
        });
        let calls = acc.finalize(None);
        assert_eq!(calls[0].index, 3);
        assert_eq!(calls[0].call_type, "function");
        assert_eq!(calls[0].function.arguments, "{\"q\":1}");
    }

    #[test]
    fn test_authoritative_list_wins() {
        let mut acc = DeltaAccumulator::new();
        acc.seed(&start(0, "local", "local_tool"));
        acc.append(&args(0, "{\"partial\":"));

        let server = vec![ToolCall {
            index: 0,
            id: "server".into(),
            call_type: "function".into(),
            function: FunctionCall {
                name: "server_tool".into(),
                arguments: "{\"full\":true}".into(),
            },
        }];
        let calls = acc.finalize(Some(server.clone()));
        assert_eq!(calls, server);
        assert!(acc.is_empty());
    }

    #[test]
    fn test_empty_authoritative_list_falls_back() {
        let mut acc = DeltaAccumulator::new();
        acc.seed(&start(0, "local", "local_tool"));
        let calls = acc.finalize(Some(Vec::new()));
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "local");
    }

    #[test]
    fn test_try_parse_tracks_completeness() {
        let mut acc = DeltaAccumulator::new();
        acc.append(&args(0, "{\"a\":"));
        assert!(acc.get(0).unwrap().try_parse().is_none());
        acc.append(&args(0, "1}"));
        assert!(acc.get(0).unwrap().try_parse().is_some());
    }
}
