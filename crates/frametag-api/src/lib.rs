//! Axum HTTP API server for keyframe annotation.
//!
//! This crate provides:
//! - Multipart video upload and analysis with local or cloud vision models
//! - Client-initiated cancellation keyed by session id
//! - Rate limiting and security headers
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod pipeline;
pub mod routes;
pub mod sessions;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use sessions::{RegistryError, SessionGuard, SessionRegistry};
pub use state::AppState;
