// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Call classification for telemetry enrichment.
//!
//! Inspects the serialized query mapping of an intercepted call and detects
//! notable shapes: tool definitions attached to the request, and tool results
//! embedded in user-authored conversation content. The classifier is a total
//! function over arbitrary JSON — unexpected shapes produce default traits,
//! never an error, so classification can never affect a call's outcome.

use serde_json::Value;

/// Traits detected on a single intercepted call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallTraits {
    /// Number of tool definitions attached to the request, if any.
    pub tool_count: Option<usize>,

    /// Whether a user message carries a tool_result content item.
    pub has_tool_result: bool,
}

impl CallTraits {
    /// Check if the call carries at least one tool definition.
    pub fn has_tools(&self) -> bool {
        self.tool_count.is_some_and(|n| n > 0)
    }
}

/// Classify a serialized query mapping.
pub fn classify(query: &Value) -> CallTraits {
    let tool_count = query.get("tools").and_then(Value::as_array).map(Vec::len);

    let has_tool_result = query
        .get("messages")
        .and_then(Value::as_array)
        .is_some_and(|messages| messages.iter().any(is_user_tool_result));

    CallTraits {
        tool_count,
        has_tool_result,
    }
}

/// Check whether one conversation entry is a user message whose structured
/// content contains a tool_result item.
fn is_user_tool_result(entry: &Value) -> bool {
    if entry.get("role").and_then(Value::as_str) != Some("user") {
        return false;
    }

    let Some(items) = entry.get("content").and_then(Value::as_array) else {
        return false;
    };

    items
        .iter()
        .any(|item| item.get("type").and_then(Value::as_str) == Some("tool_result"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tools_cardinality() {
        let query = json!({
            "model": "m",
            "messages": [{"role": "user", "content": "hi"}],
            "tools": [
                {"name": "read_file", "description": "", "input_schema": {"type": "object", "properties": {}}},
                {"name": "bash", "description": "", "input_schema": {"type": "object", "properties": {}}},
            ],
        });

        let traits = classify(&query);
        assert_eq!(traits.tool_count, Some(2));
        assert!(traits.has_tools());
        assert!(!traits.has_tool_result);
    }

    #[test]
    fn test_no_tools_key() {
        let query = json!({"model": "m", "messages": []});
        let traits = classify(&query);
        assert_eq!(traits.tool_count, None);
        assert!(!traits.has_tools());
    }

    #[test]
    fn test_empty_tools_list() {
        let query = json!({"model": "m", "tools": []});
        let traits = classify(&query);
        assert_eq!(traits.tool_count, Some(0));
        assert!(!traits.has_tools());
    }

    #[test]
    fn test_tool_result_in_user_content() {
        let query = json!({
            "messages": [
                {"role": "assistant", "content": [
                    {"type": "tool_use", "id": "t1", "name": "bash", "input": {"command": "ls"}},
                ]},
                {"role": "user", "content": [
                    {"type": "tool_result", "tool_use_id": "t1", "content": "README.md"},
                ]},
            ],
        });

        assert!(classify(&query).has_tool_result);
    }

    #[test]
    fn test_tool_result_in_assistant_content_ignored() {
        let query = json!({
            "messages": [
                {"role": "assistant", "content": [
                    {"type": "tool_result", "tool_use_id": "t1", "content": "x"},
                ]},
            ],
        });

        assert!(!classify(&query).has_tool_result);
    }

    #[test]
    fn test_plain_text_user_content_ignored() {
        let query = json!({
            "messages": [{"role": "user", "content": "just text"}],
        });

        assert!(!classify(&query).has_tool_result);
    }

    #[test]
    fn test_malformed_shapes_yield_defaults() {
        assert_eq!(classify(&json!(null)), CallTraits::default());
        assert_eq!(classify(&json!("not a mapping")), CallTraits::default());
        assert_eq!(
            classify(&json!({"messages": "not a list", "tools": 3})),
            CallTraits::default()
        );
        assert_eq!(
            classify(&json!({"messages": [{"role": 1, "content": [null]}]})),
            CallTraits::default()
        );
    }
}
