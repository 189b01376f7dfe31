//! Sampled keyframes.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A still image captured from the source video.
///
/// `index` is the frame's position in capture order, which is also temporal
/// order. It is the only source of truth for alignment downstream.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledFrame {
    pub index: usize,
    pub timestamp_sec: f64,
    pub file_name: String,
    pub image: Vec<u8>,
}

impl SampledFrame {
    pub fn new(index: usize, timestamp_sec: f64, image: Vec<u8>) -> Self {
        Self {
            index,
            timestamp_sec,
            file_name: frame_file_name(index),
            image,
        }
    }

    /// Image bytes as standard base64, the form both providers accept.
    pub fn image_base64(&self) -> String {
        STANDARD.encode(&self.image)
    }

    pub fn to_payload(&self) -> FramePayload {
        FramePayload {
            index: self.index,
            timestamp_sec: self.timestamp_sec,
            base64: self.image_base64(),
            file_name: self.file_name.clone(),
        }
    }
}

/// Output file name for the frame at `index` (`frame_001.jpg` for index 0).
pub fn frame_file_name(index: usize) -> String {
    format!("frame_{:03}.jpg", index + 1)
}

/// Frame as returned to API callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FramePayload {
    pub index: usize,
    pub timestamp_sec: f64,
    /// JPEG bytes, standard base64
    pub base64: String,
    pub file_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_is_one_based_and_padded() {
        assert_eq!(frame_file_name(0), "frame_001.jpg");
        assert_eq!(frame_file_name(41), "frame_042.jpg");
        assert_eq!(frame_file_name(999), "frame_1000.jpg");
    }

    #[test]
    fn test_payload_wire_names() {
        let frame = SampledFrame::new(2, 12.5, vec![0xff, 0xd8, 0xff]);
        let json = serde_json::to_value(frame.to_payload()).unwrap();

        assert_eq!(json["index"], 2);
        assert_eq!(json["timestampSec"], 12.5);
        assert_eq!(json["base64"], "/9j/");
        assert_eq!(json["fileName"], "frame_003.jpg");
    }
}
