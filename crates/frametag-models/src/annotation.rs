//! Search-oriented annotations produced by the vision models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Annotation for a single keyframe.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FrameAnnotation {
    /// Index of the source frame (never taken from model output)
    pub index: usize,
    /// Timestamp of the source frame in seconds
    pub timestamp_sec: f64,
    pub caption: String,
    pub tags: Vec<String>,
    pub people: Vec<String>,
    pub organizations: Vec<String>,
    pub locations: Vec<String>,
    pub objects: Vec<String>,
    pub actions: Vec<String>,
    /// On-screen text (OCR)
    pub text: String,
}

impl FrameAnnotation {
    /// Placeholder used when the provider produced nothing usable for a frame.
    pub fn empty(index: usize, timestamp_sec: f64) -> Self {
        Self {
            index,
            timestamp_sec,
            ..Default::default()
        }
    }

    /// True when no field carries model output.
    pub fn is_empty(&self) -> bool {
        self.caption.is_empty()
            && self.text.is_empty()
            && self.tags.is_empty()
            && self.people.is_empty()
            && self.organizations.is_empty()
            && self.locations.is_empty()
            && self.objects.is_empty()
            && self.actions.is_empty()
    }
}

/// Whole-video summary, produced only by batch providers.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct OverallAnnotation {
    pub summary: String,
    pub topics: Vec<String>,
    pub people: Vec<String>,
    pub organizations: Vec<String>,
    pub locations: Vec<String>,
    pub objects: Vec<String>,
    pub actions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_annotation() {
        let a = FrameAnnotation::empty(3, 7.25);
        assert_eq!(a.index, 3);
        assert_eq!(a.timestamp_sec, 7.25);
        assert!(a.is_empty());

        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["caption"], "");
        assert_eq!(json["timestampSec"], 7.25);
        assert!(json["tags"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_not_empty_with_caption() {
        let a = FrameAnnotation {
            caption: "press conference".to_string(),
            ..FrameAnnotation::empty(0, 0.5)
        };
        assert!(!a.is_empty());
    }
}
