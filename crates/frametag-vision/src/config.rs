//! Provider configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

const DEFAULT_OLLAMA_URL: &str = "http://host.docker.internal:11434";
const DEFAULT_OLLAMA_MODEL: &str = "qwen2.5vl:32b";
const DEFAULT_OPENROUTER_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_OPENROUTER_MODEL: &str = "qwen/qwen2.5-vl-72b-instruct:free";
const DEFAULT_SECRETS_FILE: &str = "config.secrets.json";
const DEFAULT_TIMEOUT_MS: u64 = 900_000;

/// Output language for every free-text field the model writes.
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageConfig {
    /// BCP-47 code
    pub code: String,
    /// Human readable name placed into prompts
    pub label: String,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            code: "zh-Hant".to_string(),
            label: "Traditional Chinese".to_string(),
        }
    }
}

impl LanguageConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            code: std::env::var("TAG_LANGUAGE").unwrap_or(defaults.code),
            label: std::env::var("TAG_LANGUAGE_LABEL").unwrap_or(defaults.label),
        }
    }
}

/// Local (Ollama) provider settings.
#[derive(Debug, Clone)]
pub struct LocalProviderConfig {
    pub enabled: bool,
    pub base_url: String,
    /// Model used until changed at runtime
    pub model: String,
    pub timeout: Duration,
}

impl Default for LocalProviderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_OLLAMA_MODEL.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

impl LocalProviderConfig {
    pub fn from_env() -> Self {
        Self {
            enabled: env_enabled("OLLAMA_ENABLED"),
            base_url: trim_base_url(
                std::env::var("OLLAMA_BASE_URL").unwrap_or_else(|_| DEFAULT_OLLAMA_URL.to_string()),
            ),
            model: std::env::var("OLLAMA_MODEL")
                .unwrap_or_else(|_| DEFAULT_OLLAMA_MODEL.to_string()),
            timeout: env_timeout("OLLAMA_TIMEOUT_MS"),
        }
    }
}

/// Cloud (OpenRouter) provider settings.
#[derive(Debug, Clone)]
pub struct CloudProviderConfig {
    pub enabled: bool,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    /// Bearer credential; calls fail before any network I/O without it
    pub api_key: Option<String>,
    /// Sent as `HTTP-Referer`
    pub referer: String,
    /// Sent as `X-Title`
    pub title: String,
}

impl Default for CloudProviderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: DEFAULT_OPENROUTER_URL.to_string(),
            model: DEFAULT_OPENROUTER_MODEL.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            api_key: None,
            referer: "https://example.com".to_string(),
            title: "video-tagger".to_string(),
        }
    }
}

impl CloudProviderConfig {
    /// Create config from environment variables.
    ///
    /// `OPENROUTER_API_KEY` wins over the `openrouterApiKey` entry of the
    /// secrets file.
    pub fn from_env() -> Self {
        let secrets_path = std::env::var("OPENROUTER_SECRETS_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_SECRETS_FILE));

        let api_key = std::env::var("OPENROUTER_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| read_secrets_key(&secrets_path));

        Self {
            enabled: env_enabled("OPENROUTER_ENABLED"),
            base_url: trim_base_url(
                std::env::var("OPENROUTER_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_OPENROUTER_URL.to_string()),
            ),
            model: std::env::var("OPENROUTER_MODEL")
                .unwrap_or_else(|_| DEFAULT_OPENROUTER_MODEL.to_string()),
            timeout: env_timeout("OPENROUTER_TIMEOUT_MS"),
            api_key,
            ..Default::default()
        }
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SecretsFile {
    openrouter_api_key: Option<String>,
}

/// Read the API key from a JSON secrets file. A missing file is not an error.
pub fn read_secrets_key(path: &Path) -> Option<String> {
    let contents = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str::<SecretsFile>(&contents) {
        Ok(secrets) => secrets.openrouter_api_key.filter(|k| !k.trim().is_empty()),
        Err(e) => {
            warn!("Ignoring unreadable secrets file {}: {}", path.display(), e);
            None
        }
    }
}

/// Providers are on unless explicitly set to "false".
fn env_enabled(name: &str) -> bool {
    std::env::var(name).map(|v| v != "false").unwrap_or(true)
}

fn env_timeout(name: &str) -> Duration {
    Duration::from_millis(
        std::env::var(name)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_MS),
    )
}

fn trim_base_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let local = LocalProviderConfig::default();
        assert!(local.enabled);
        assert_eq!(local.model, "qwen2.5vl:32b");
        assert_eq!(local.timeout, Duration::from_secs(900));

        let cloud = CloudProviderConfig::default();
        assert!(!cloud.has_credential());
        assert_eq!(cloud.base_url, "https://openrouter.ai/api/v1");

        assert_eq!(LanguageConfig::default().label, "Traditional Chinese");
    }

    #[test]
    fn test_read_secrets_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.secrets.json");

        assert_eq!(read_secrets_key(&path), None);

        std::fs::write(&path, r#"{"openrouterApiKey": "sk-file"}"#).unwrap();
        assert_eq!(read_secrets_key(&path).as_deref(), Some("sk-file"));

        std::fs::write(&path, r#"{"openrouterApiKey": "  "}"#).unwrap();
        assert_eq!(read_secrets_key(&path), None);

        std::fs::write(&path, "not json").unwrap();
        assert_eq!(read_secrets_key(&path), None);
    }

    #[test]
    fn test_blank_credential_is_missing() {
        let cloud = CloudProviderConfig {
            api_key: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(!cloud.has_credential());
    }

    #[test]
    fn test_trim_base_url() {
        assert_eq!(trim_base_url("http://h:1/".to_string()), "http://h:1");
    }
}
