//! Prompt text sent to the vision models.

use crate::config::LanguageConfig;
use crate::provider::Instructions;

/// Archivist framing shared by every call.
pub fn system_instruction(language: &LanguageConfig) -> String {
    format!(
        "You are a media archivist assisting investigative journalists. \
         Create search-friendly, concise tags. Use {label} for ALL text fields \
         (captions, tags, people, organizations, locations, objects, actions, \
         topics, summary, OCR text). Keep JSON keys in English.",
        label = language.label
    )
}

/// Batch instruction: full schema plus the count and order contract.
pub fn batch_instruction(language: &LanguageConfig, frame_count: usize) -> String {
    let last_index = frame_count.saturating_sub(1);
    format!(
        r#"Analyze the following {n} keyframes from a video and produce STRICT JSON ONLY with the schema below. Do not include any prose or code fences. Keep the response compact, high-signal, and directly useful for newsroom search.

{{
  "frames": [
    {{ "index": number, "timestampSec": number, "caption": string, "tags": string[], "people": string[], "organizations": string[], "locations": string[], "objects": string[], "actions": string[], "text": string }}
  ],
  "overall": {{
    "summary": string,
    "topics": string[],
    "people": string[],
    "organizations": string[],
    "locations": string[],
    "objects": string[],
    "actions": string[]
  }}
}}

Requirements:
- Language: {label} (all text values)
- Audience: journalists conducting media archive search
- Be concise, avoid repetition, maximize retrieval quality
- OCR any visible on-screen text into the "text" field
- Use neutral, factual wording
- IMPORTANT: Return exactly {n} items in the frames array, one for each provided keyframe image, in the SAME order as given. Set index to 0..{last} to match that order. Do NOT reorder, skip, or duplicate frames."#,
        n = frame_count,
        label = language.label,
        last = last_index,
    )
}

/// Per-frame instruction for providers called once per image.
pub fn single_frame_instruction() -> String {
    r#"You will analyze ONE keyframe only and return STRICT JSON ONLY with this schema (no prose):
{
  "caption": string,
  "tags": string[],
  "people": string[],
  "organizations": string[],
  "locations": string[],
  "objects": string[],
  "actions": string[],
  "text": string
}"#
    .to_string()
}

pub fn batch_instructions(language: &LanguageConfig, frame_count: usize) -> Instructions {
    Instructions::new(
        system_instruction(language),
        batch_instruction(language, frame_count),
    )
}

pub fn single_frame_instructions(language: &LanguageConfig) -> Instructions {
    Instructions::new(system_instruction(language), single_frame_instruction())
}
