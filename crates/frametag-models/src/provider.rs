//! Vision provider selection.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which model backend annotates the frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Locally hosted model server (Ollama), called once per frame
    #[default]
    Local,
    /// Cloud chat-completions API (OpenRouter), called once per batch
    Cloud,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Local => "local",
            ProviderKind::Cloud => "cloud",
        }
    }

    /// Whether the orchestrator issues one provider call per frame.
    pub fn is_per_frame(&self) -> bool {
        matches!(self, ProviderKind::Local)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown provider selector.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown provider '{0}' (expected 'local' or 'cloud')")]
pub struct ParseProviderKindError(pub String);

impl FromStr for ProviderKind {
    type Err = ParseProviderKindError;

    /// Accepts the canonical names plus the backend names used by older clients.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "ollama" => Ok(ProviderKind::Local),
            "cloud" | "openrouter" => Ok(ProviderKind::Cloud),
            _ => Err(ParseProviderKindError(s.to_string())),
        }
    }
}
