//! Request handlers.

pub mod abort;
pub mod analyze;
pub mod health;
pub mod providers;

pub use abort::*;
pub use analyze::*;
pub use health::*;
pub use providers::*;
