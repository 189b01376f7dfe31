//! Analysis orchestration.

mod error;
mod logging;
mod orchestrator;

pub use error::AnalysisError;
pub use logging::SessionLogger;
pub use orchestrator::{annotate_frames, preflight, run_analysis, AnalysisContext};
