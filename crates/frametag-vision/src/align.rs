//! Aligning provider output onto the canonical frame sequence.
//!
//! Whatever the model returned, the result has exactly one annotation per
//! sampled frame, in frame order, with `index` and `timestampSec` taken from
//! the frame itself.

use frametag_models::{AnalysisPayload, FrameAnnotation, OverallAnnotation};
use serde_json::Value;

use crate::parse::{parse_model_output, ParsedOutput};

/// Ways of assigning parsed elements to frame slots, applied in order until
/// every slot is filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentStrategy {
    /// Element count equals frame count: trust the order
    Positional,
    /// Every element carries a numeric `index`: place by it
    IndexPlacement,
    /// Unfilled slots take unplaced elements in their original order
    OrderedFill,
    /// Whatever is left gets an empty annotation
    EmptyFill,
}

pub const ALIGNMENT_STRATEGIES: [AlignmentStrategy; 4] = [
    AlignmentStrategy::Positional,
    AlignmentStrategy::IndexPlacement,
    AlignmentStrategy::OrderedFill,
    AlignmentStrategy::EmptyFill,
];

/// Slot assignment in progress. `slots[i]` holds the element index placed
/// at frame `i`.
#[derive(Debug)]
struct Placement {
    slots: Vec<Option<usize>>,
    used: Vec<bool>,
}

impl Placement {
    fn new(frame_count: usize, element_count: usize) -> Self {
        Self {
            slots: vec![None; frame_count],
            used: vec![false; element_count],
        }
    }

    fn is_complete(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    fn place(&mut self, slot: usize, element: usize) {
        self.slots[slot] = Some(element);
        self.used[element] = true;
    }
}

impl AlignmentStrategy {
    /// Returns true once every slot has been decided.
    fn apply(&self, elements: &[Value], placement: &mut Placement) -> bool {
        let n = placement.slots.len();
        match self {
            AlignmentStrategy::Positional => {
                if elements.len() == n {
                    for i in 0..n {
                        placement.place(i, i);
                    }
                    return true;
                }
                false
            }
            AlignmentStrategy::IndexPlacement => {
                let Some(indices) = numeric_indices(elements) else {
                    return false;
                };
                let min = indices.iter().copied().fold(f64::INFINITY, f64::min);
                let max = indices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let shift = if min == 1.0 && max == n as f64 { 1.0 } else { 0.0 };

                // Fractional or out-of-range indices stay unplaced for OrderedFill.
                for (element, raw) in indices.into_iter().enumerate() {
                    let slot = raw - shift;
                    if slot.fract() != 0.0 || slot < 0.0 || slot >= n as f64 {
                        continue;
                    }
                    let slot = slot as usize;
                    if placement.slots[slot].is_none() {
                        placement.place(slot, element);
                    }
                }
                placement.is_complete()
            }
            AlignmentStrategy::OrderedFill => {
                let mut remaining = elements
                    .iter()
                    .enumerate()
                    .filter(|(i, v)| !placement.used[*i] && !v.is_null())
                    .map(|(i, _)| i)
                    .collect::<Vec<_>>()
                    .into_iter();

                for slot in 0..n {
                    if placement.slots[slot].is_some() {
                        continue;
                    }
                    match remaining.next() {
                        Some(element) => placement.place(slot, element),
                        None => break,
                    }
                }
                placement.is_complete()
            }
            // Unfilled slots are rendered empty during coercion.
            AlignmentStrategy::EmptyFill => true,
        }
    }
}

/// Finite numeric `index` of every element, or `None` if any element lacks one.
fn numeric_indices(elements: &[Value]) -> Option<Vec<f64>> {
    if elements.is_empty() {
        return None;
    }
    elements
        .iter()
        .map(|e| e.get("index")?.as_f64().filter(|n| n.is_finite()))
        .collect()
}

/// Map parsed elements onto `frame_count` slots.
///
/// `result[i]` is the element chosen for frame `i`, or `None` when the slot
/// ends up empty.
pub fn align_elements(elements: &[Value], frame_count: usize) -> Vec<Option<&Value>> {
    let mut placement = Placement::new(frame_count, elements.len());

    for strategy in ALIGNMENT_STRATEGIES {
        if strategy.apply(elements, &mut placement) {
            break;
        }
    }

    placement
        .slots
        .into_iter()
        .map(|slot| slot.map(|i| &elements[i]))
        .collect()
}

fn string_field(value: Option<&Value>, key: &str) -> String {
    value
        .and_then(|v| v.get(key))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Lists stay lists (nulls dropped), a lone scalar becomes a one-element
/// list, null or missing becomes empty.
fn list_field(value: Option<&Value>, key: &str) -> Vec<String> {
    match value.and_then(|v| v.get(key)) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .filter(|item| !item.is_null())
            .map(stringify)
            .collect(),
        Some(other) => vec![stringify(other)],
    }
}

/// Build a frame annotation from an arbitrary JSON value.
///
/// Non-object values yield an empty annotation. `index` and `timestamp_sec`
/// are always the caller's.
pub fn coerce_frame(value: Option<&Value>, index: usize, timestamp_sec: f64) -> FrameAnnotation {
    let value = value.filter(|v| v.is_object());
    FrameAnnotation {
        index,
        timestamp_sec,
        caption: string_field(value, "caption"),
        tags: list_field(value, "tags"),
        people: list_field(value, "people"),
        organizations: list_field(value, "organizations"),
        locations: list_field(value, "locations"),
        objects: list_field(value, "objects"),
        actions: list_field(value, "actions"),
        text: string_field(value, "text"),
    }
}

pub fn coerce_overall(value: Option<&Value>) -> OverallAnnotation {
    let value = value.filter(|v| v.is_object());
    OverallAnnotation {
        summary: string_field(value, "summary"),
        topics: list_field(value, "topics"),
        people: list_field(value, "people"),
        organizations: list_field(value, "organizations"),
        locations: list_field(value, "locations"),
        objects: list_field(value, "objects"),
        actions: list_field(value, "actions"),
    }
}

/// Normalize one batch response covering every frame.
///
/// `timestamps[i]` is the timestamp of frame `i`; its length is the frame
/// count. Always returns exactly that many annotations.
pub fn normalize_batch(raw: &str, timestamps: &[f64]) -> AnalysisPayload {
    let parsed = parse_model_output(raw);
    let aligned = align_elements(parsed.frames(), timestamps.len());

    let frames = aligned
        .into_iter()
        .zip(timestamps)
        .enumerate()
        .map(|(i, (element, &ts))| coerce_frame(element, i, ts))
        .collect();

    let overall = Some(coerce_overall(parsed.overall()));

    match parsed {
        ParsedOutput::Parsed(_) => AnalysisPayload {
            frames,
            overall,
            error: None,
            raw: None,
        },
        ParsedOutput::Unparsable { error, raw } => AnalysisPayload {
            frames,
            overall,
            error: Some(error),
            raw,
        },
    }
}

/// Normalize the response to a single-frame call.
///
/// Accepts either a bare annotation object or a `frames` wrapper holding one.
pub fn normalize_single(raw: &str, index: usize, timestamp_sec: f64) -> FrameAnnotation {
    let parsed = parse_model_output(raw);
    let element = match parsed.value() {
        Some(v) if v.get("frames").is_some() || v.is_array() => parsed.frames().first(),
        other => other,
    };
    coerce_frame(element, index, timestamp_sec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn captions(payload: &AnalysisPayload) -> Vec<&str> {
        payload.frames.iter().map(|f| f.caption.as_str()).collect()
    }

    fn indices(payload: &AnalysisPayload) -> Vec<usize> {
        payload.frames.iter().map(|f| f.index).collect()
    }

    #[test]
    fn test_well_formed_passes_through() {
        let raw = json!({
            "frames": [
                {"index": 0, "timestampSec": 99, "caption": "a", "tags": ["x"], "text": "OCR"},
                {"index": 1, "caption": "b", "people": ["p"]},
                {"index": 2, "caption": "c", "objects": ["o"], "actions": ["run"]}
            ],
            "overall": {"summary": "s", "topics": ["t"]}
        })
        .to_string();

        let payload = normalize_batch(&raw, &[1.0, 2.0, 3.0]);
        assert_eq!(captions(&payload), vec!["a", "b", "c"]);
        assert_eq!(indices(&payload), vec![0, 1, 2]);
        assert_eq!(payload.frames[0].timestamp_sec, 1.0);
        assert_eq!(payload.frames[0].tags, vec!["x"]);
        assert_eq!(payload.frames[0].text, "OCR");
        assert_eq!(payload.frames[2].actions, vec!["run"]);
        let overall = payload.overall.unwrap();
        assert_eq!(overall.summary, "s");
        assert_eq!(overall.topics, vec!["t"]);
        assert!(payload.error.is_none());
    }

    #[test]
    fn test_positional_ignores_model_indices() {
        let raw = r#"[{"index": 7, "caption": "a"}, {"index": 7, "caption": "b"}]"#;
        let payload = normalize_batch(raw, &[0.5, 1.5]);
        assert_eq!(captions(&payload), vec!["a", "b"]);
        assert_eq!(indices(&payload), vec![0, 1]);
    }

    #[test]
    fn test_one_based_indices_are_shifted() {
        let elements = vec![
            json!({"index": 3, "caption": "third"}),
            json!({"index": 1, "caption": "first"}),
            json!({"index": 2, "caption": "second"}),
            json!({"index": 2, "caption": "dup"}),
        ];
        let aligned = align_elements(&elements, 3);
        let caps: Vec<_> = aligned
            .iter()
            .map(|e| e.and_then(|v| v["caption"].as_str()))
            .collect();
        assert_eq!(caps, vec![Some("first"), Some("second"), Some("third")]);
    }

    #[test]
    fn test_one_based_contiguous_range_exactly_matching_count() {
        // [1,2,3] with N=3 is a positional match already; drop one to force
        // index placement with a 1-based range.
        let raw = r#"{"frames": [{"index": 3, "caption": "c"}, {"index": 1, "caption": "a"}]}"#;
        let payload = normalize_batch(raw, &[1.0, 2.0, 3.0]);
        assert_eq!(captions(&payload), vec!["a", "", "c"]);
    }

    #[test]
    fn test_zero_based_placement_with_gaps_and_out_of_range() {
        let raw = r#"{"frames": [
            {"index": 2, "caption": "two"},
            {"index": 9, "caption": "far"},
            {"index": -1, "caption": "neg"},
            {"index": 0, "caption": "zero"},
            {"index": 0, "caption": "again"}
        ]}"#;
        let payload = normalize_batch(raw, &[0.0, 1.0, 2.0, 3.0]);
        // 0 and 2 placed by index; 1 and 3 filled from unplaced elements in order
        assert_eq!(captions(&payload), vec!["zero", "far", "two", "neg"]);
        assert_eq!(indices(&payload), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_ordered_fill_without_indices() {
        let raw = r#"{"frames": [{"caption": "a"}, {"caption": "b"}]}"#;
        let payload = normalize_batch(raw, &[1.0, 2.0, 3.0]);
        assert_eq!(captions(&payload), vec!["a", "b", ""]);
        assert_eq!(indices(&payload), vec![0, 1, 2]);
        assert!(payload.frames[2].is_empty());
    }

    #[test]
    fn test_fractional_index_is_filled_after_placed_ones() {
        let raw = r#"[{"index": 1.5, "caption": "a"}, {"index": 0, "caption": "b"}]"#;
        let payload = normalize_batch(raw, &[1.0, 2.0, 3.0]);
        assert_eq!(captions(&payload), vec!["b", "a", ""]);
        assert_eq!(indices(&payload), vec![0, 1, 2]);
    }

    #[test]
    fn test_non_numeric_index_skips_placement() {
        let raw = r#"[{"index": "2", "caption": "a"}, {"index": 0, "caption": "b"}]"#;
        let payload = normalize_batch(raw, &[1.0, 2.0, 3.0]);
        assert_eq!(captions(&payload), vec!["a", "b", ""]);
    }

    #[test]
    fn test_ordered_fill_skips_null_elements() {
        let raw = r#"[null, {"caption": "a"}, null, {"caption": "b"}, {"caption": "c"}]"#;
        let payload = normalize_batch(raw, &[1.0, 2.0, 3.0]);
        assert_eq!(captions(&payload), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_excess_elements_are_ignored() {
        let raw = r#"[{"caption": "a"}, {"caption": "b"}, {"caption": "c"}]"#;
        let payload = normalize_batch(raw, &[1.0, 2.0]);
        assert_eq!(captions(&payload), vec!["a", "b"]);
    }

    #[test]
    fn test_unparsable_output_still_yields_every_frame() {
        let payload = normalize_batch("The model is overloaded.", &[1.0, 2.0, 3.0]);
        assert_eq!(indices(&payload), vec![0, 1, 2]);
        assert!(payload.frames.iter().all(FrameAnnotation::is_empty));
        assert_eq!(
            payload.error.as_deref(),
            Some("Could not parse model output as JSON")
        );
        assert_eq!(payload.raw.as_deref(), Some("The model is overloaded."));
        assert_eq!(payload.overall, Some(OverallAnnotation::default()));
    }

    #[test]
    fn test_noisy_output_with_embedded_json() {
        let raw = "Analysis below\n{\"frames\": [{\"caption\": \"x\"}]}\nThanks";
        let payload = normalize_batch(raw, &[0.1, 0.2]);
        assert_eq!(captions(&payload), vec!["x", ""]);
        assert!(payload.error.is_none());
    }

    #[test]
    fn test_empty_output() {
        let payload = normalize_batch("", &[0.5]);
        assert_eq!(payload.frames.len(), 1);
        assert_eq!(payload.error.as_deref(), Some("empty"));
        assert!(payload.raw.is_none());
    }

    #[test]
    fn test_zero_frames() {
        let payload = normalize_batch("[]", &[]);
        assert!(payload.frames.is_empty());
    }

    #[test]
    fn test_field_coercion() {
        let value = json!({
            "caption": 12,
            "text": ["not", "a", "string"],
            "tags": "solo",
            "people": [null, "Ann", 3, true],
            "objects": null,
            "actions": {"k": "v"},
            "index": 42,
            "timestampSec": 1000
        });
        let a = coerce_frame(Some(&value), 1, 2.5);
        assert_eq!(a.index, 1);
        assert_eq!(a.timestamp_sec, 2.5);
        assert_eq!(a.caption, "");
        assert_eq!(a.text, "");
        assert_eq!(a.tags, vec!["solo"]);
        assert_eq!(a.people, vec!["Ann", "3", "true"]);
        assert!(a.objects.is_empty());
        assert_eq!(a.actions, vec![r#"{"k":"v"}"#]);
        assert!(a.organizations.is_empty());
    }

    #[test]
    fn test_non_object_elements_become_empty() {
        let a = coerce_frame(Some(&json!("just text")), 0, 0.0);
        assert!(a.is_empty());
        assert!(coerce_overall(Some(&json!([1, 2]))).summary.is_empty());
    }

    #[test]
    fn test_normalize_single() {
        let a = normalize_single(
            "```json\n{\"caption\": \"podium\", \"tags\": [\"press\"]}\n```",
            4,
            9.0,
        );
        assert_eq!(a.index, 4);
        assert_eq!(a.caption, "podium");
        assert_eq!(a.tags, vec!["press"]);

        let wrapped = normalize_single(r#"{"frames": [{"caption": "inner"}]}"#, 0, 0.0);
        assert_eq!(wrapped.caption, "inner");

        let garbage = normalize_single("sorry", 2, 1.0);
        assert!(garbage.is_empty());
        assert_eq!(garbage.index, 2);
    }

    #[test]
    fn test_strategy_order() {
        assert_eq!(ALIGNMENT_STRATEGIES[0], AlignmentStrategy::Positional);
        assert_eq!(ALIGNMENT_STRATEGIES[3], AlignmentStrategy::EmptyFill);
    }

    #[test]
    fn test_any_output_yields_exact_count() {
        let inputs = [
            "",
            "null",
            "[]",
            "{}",
            "[1, 2, 3, 4, 5, 6]",
            r#"{"frames": [{"index": 100}]}"#,
            r#"{"frames": [{"index": 0}, {"index": 0}, {"index": 0}]}"#,
            "```json\n[{\"caption\": \"a\"}]\n```",
            "{{{{",
        ];
        for raw in inputs {
            for n in 0..6 {
                let ts: Vec<f64> = (0..n).map(|i| i as f64).collect();
                let payload = normalize_batch(raw, &ts);
                assert_eq!(payload.frames.len(), n, "input {:?}", raw);
                assert!(payload
                    .frames
                    .iter()
                    .enumerate()
                    .all(|(i, f)| f.index == i && f.timestamp_sec == i as f64));
            }
        }
    }
}
