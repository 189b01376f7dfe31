//! Vision model clients and response normalization.
//!
//! Two providers sit behind the [`VisionProvider`] trait: a locally hosted
//! model server called once per frame, and a cloud chat-completions API
//! called once per batch. Their raw text output goes through the parse chain
//! in [`parse`] and is aligned to the frame order by [`align`].

pub mod align;
pub mod config;
pub mod error;
pub mod ollama;
pub mod openrouter;
pub mod parse;
pub mod prompt;
pub mod provider;

pub use align::{normalize_batch, normalize_single, AlignmentStrategy};
pub use config::{CloudProviderConfig, LanguageConfig, LocalProviderConfig};
pub use error::{VisionError, VisionResult};
pub use ollama::LocalVisionClient;
pub use openrouter::CloudVisionClient;
pub use parse::{parse_model_output, ParseStrategy, ParsedOutput};
pub use provider::{Instructions, ProviderRequest, VisionProvider};
