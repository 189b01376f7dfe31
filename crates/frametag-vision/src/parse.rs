//! Recovering JSON from free-form model output.
//!
//! Models wrap their JSON in prose, code fences, or both. The strategies in
//! [`PARSE_STRATEGIES`] are tried in order and the first success wins.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// Error text when the provider returned nothing.
pub const EMPTY_OUTPUT: &str = "empty";

/// Error text when no strategy produced JSON.
pub const UNPARSABLE_OUTPUT: &str = "Could not parse model output as JSON";

static FENCED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)```(?:json)?\n([\s\S]*?)```").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    /// The whole trimmed text
    Direct,
    /// Contents of the first ``` fence, optionally tagged `json`
    FencedBlock,
    /// From the first `{` through the last `}`
    BraceSpan,
}

pub const PARSE_STRATEGIES: [ParseStrategy; 3] = [
    ParseStrategy::Direct,
    ParseStrategy::FencedBlock,
    ParseStrategy::BraceSpan,
];

impl ParseStrategy {
    /// Try this strategy on already trimmed text.
    ///
    /// Only objects and arrays count as a successful parse.
    pub fn attempt(&self, trimmed: &str) -> Option<Value> {
        let candidate = match self {
            ParseStrategy::Direct => trimmed,
            ParseStrategy::FencedBlock => FENCED_BLOCK
                .captures(trimmed)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str())?,
            ParseStrategy::BraceSpan => {
                let start = trimmed.find('{')?;
                let end = trimmed.rfind('}')?;
                if end <= start {
                    return None;
                }
                &trimmed[start..=end]
            }
        };

        serde_json::from_str::<Value>(candidate)
            .ok()
            .filter(|v| v.is_object() || v.is_array())
    }
}

/// Outcome of running the parse chain.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedOutput {
    Parsed(Value),
    /// Placeholder path; never a pipeline failure
    Unparsable { error: String, raw: Option<String> },
}

impl ParsedOutput {
    pub fn value(&self) -> Option<&Value> {
        match self {
            ParsedOutput::Parsed(v) => Some(v),
            ParsedOutput::Unparsable { .. } => None,
        }
    }

    /// Per-frame entries: `frames` of an object, or the value itself when it
    /// is an array.
    pub fn frames(&self) -> &[Value] {
        match self.value() {
            Some(Value::Array(items)) => items.as_slice(),
            Some(Value::Object(map)) => match map.get("frames") {
                Some(Value::Array(items)) => items.as_slice(),
                _ => &[],
            },
            _ => &[],
        }
    }

    pub fn overall(&self) -> Option<&Value> {
        self.value().and_then(|v| v.get("overall"))
    }
}

/// Run the parse chain over raw provider text.
pub fn parse_model_output(text: &str) -> ParsedOutput {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return ParsedOutput::Unparsable {
            error: EMPTY_OUTPUT.to_string(),
            raw: None,
        };
    }

    PARSE_STRATEGIES
        .iter()
        .find_map(|strategy| strategy.attempt(trimmed))
        .map(ParsedOutput::Parsed)
        .unwrap_or_else(|| ParsedOutput::Unparsable {
            error: UNPARSABLE_OUTPUT.to_string(),
            raw: Some(text.to_string()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_direct() {
        let out = parse_model_output("  {\"frames\": []}  ");
        assert_eq!(out, ParsedOutput::Parsed(json!({"frames": []})));
        assert_eq!(
            ParseStrategy::Direct.attempt("[1,2]"),
            Some(json!([1, 2]))
        );
    }

    #[test]
    fn test_fenced_block() {
        let text = "Here you go:\n```JSON\n{\"frames\": [{\"caption\": \"a\"}]}\n```\nDone.";
        assert_eq!(ParseStrategy::Direct.attempt(text.trim()), None);
        let out = parse_model_output(text);
        assert_eq!(out.frames().len(), 1);

        let untagged = "```\n{\"overall\": {\"summary\": \"s\"}}\n```";
        assert_eq!(
            parse_model_output(untagged).overall(),
            Some(&json!({"summary": "s"}))
        );
    }

    #[test]
    fn test_brace_span() {
        let text = "Sure! {\"frames\": [{}, {}]} hope this helps";
        assert!(ParseStrategy::FencedBlock.attempt(text).is_none());
        assert_eq!(parse_model_output(text).frames().len(), 2);
    }

    #[test]
    fn test_empty() {
        for text in ["", "   \n "] {
            assert_eq!(
                parse_model_output(text),
                ParsedOutput::Unparsable {
                    error: "empty".to_string(),
                    raw: None
                }
            );
        }
    }

    #[test]
    fn test_unparsable_keeps_raw() {
        let out = parse_model_output("I cannot help with { that");
        match out {
            ParsedOutput::Unparsable { error, raw } => {
                assert_eq!(error, UNPARSABLE_OUTPUT);
                assert_eq!(raw.as_deref(), Some("I cannot help with { that"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_scalars_are_not_json_output() {
        assert!(matches!(
            parse_model_output("42"),
            ParsedOutput::Unparsable { .. }
        ));
        assert!(parse_model_output("null").value().is_none());
    }

    #[test]
    fn test_frames_from_top_level_array() {
        let out = parse_model_output("[{\"caption\": \"x\"}]");
        assert_eq!(out.frames().len(), 1);
        assert!(out.overall().is_none());

        let out = parse_model_output("{\"frames\": \"nope\"}");
        assert!(out.frames().is_empty());
    }
}
