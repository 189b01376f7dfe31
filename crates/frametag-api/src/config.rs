//! API configuration.

use std::path::PathBuf;

use frametag_media::SamplerConfig;
use frametag_models::{DEFAULT_FRAME_COUNT, MAX_FRAME_COUNT};
use frametag_vision::{CloudProviderConfig, LanguageConfig, LocalProviderConfig};

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Rate limit requests per second
    pub rate_limit_rps: u32,
    /// Max request body size (uploads included)
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
    /// Root for uploads and per-session frame directories
    pub work_dir: PathBuf,
    /// Frame count when the client omits `numFrames`
    pub default_num_frames: u32,
    /// Upper bound on `numFrames`
    pub max_num_frames: u32,
    /// Max in-flight analysis sessions
    pub max_sessions: usize,
    pub sampler: SamplerConfig,
    pub language: LanguageConfig,
    pub local: LocalProviderConfig,
    pub cloud: CloudProviderConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3020,
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: 10,
            max_body_size: 512 * 1024 * 1024, // 512MB
            environment: "development".to_string(),
            work_dir: PathBuf::from("tmp"),
            default_num_frames: DEFAULT_FRAME_COUNT,
            max_num_frames: MAX_FRAME_COUNT,
            max_sessions: 32,
            sampler: SamplerConfig::default(),
            language: LanguageConfig::default(),
            local: LocalProviderConfig::default(),
            cloud: CloudProviderConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: std::env::var("PORT")
                .or_else(|_| std::env::var("API_PORT"))
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            rate_limit_rps: std::env::var("RATE_LIMIT_RPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.rate_limit_rps),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_body_size),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            work_dir: std::env::var("WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            default_num_frames: std::env::var("DEFAULT_NUM_FRAMES")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.default_num_frames),
            max_num_frames: std::env::var("MAX_NUM_FRAMES")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_num_frames),
            max_sessions: std::env::var("MAX_SESSIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_sessions),
            sampler: SamplerConfig::from_env(),
            language: LanguageConfig::from_env(),
            local: LocalProviderConfig::from_env(),
            cloud: CloudProviderConfig::from_env(),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.port, 3020);
        assert_eq!(config.default_num_frames, 8);
        assert_eq!(config.max_num_frames, 64);
        assert_eq!(config.max_sessions, 32);
        assert_eq!(config.sampler.output_width, 768);
        assert!(!config.is_production());
    }
}
