//! Configuration module — settings structs, TOML persistence, app paths.

pub mod paths;
pub mod settings;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use paths::AppPaths;
pub use settings::{AppConfig, AudioConfig, FeedbackConfig, FeedbackMode, PracticeConfig};
