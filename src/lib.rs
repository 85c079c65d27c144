//! pref-learner - Preference Learning Library
//!
//! Learns a user's summary-writing preferences from the edits they make:
//! - Word-level diffs between a generated summary and its edited version
//! - Counted observations of recurring edit patterns, reinforced at most once per round
//! - Promotion of reinforced observations into deduplicated rules
//! - Summaries produced under the learned rules
//!
//! # Example
//!
//! ```ignore
//! use pref_learner::{agent, Config};
//! use pref_learner::learning::UpdateRequest;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let engine = agent::engine_from_config(&config)?;
//!     let summary = engine.produce_summary("Meeting notes...", &[]).await?;
//!     println!("{}", summary);
//!     Ok(())
//! }
//! ```

pub mod types;
pub mod error;
pub mod config;
pub mod security;
pub mod learning;
pub mod agent;
pub mod server;
pub mod cli;

// Re-export commonly used types for convenience
pub use types::{
    CandidateObservation,
    DiffSegment,
    LearningRate,
    Observation,
    PreferenceState,
    Rule,
    SegmentKind,
    Threshold,
};

pub use error::{CollaboratorError, EngineError, EngineResult, Stage};

pub use config::Config;

pub use learning::{PreferenceEngine, UpdateOutcome, UpdateRequest};

pub use agent::{engine_from_config, LlmCollaborator, OpenRouterClient};

pub use server::{
    router,
    ServerState,
    start as start_server,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log filter from `RUST_LOG` directives, WARN when unset or unparsable
pub fn log_filter(directives: Option<&str>) -> tracing_subscriber::EnvFilter {
    directives
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| tracing_subscriber::EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| tracing_subscriber::EnvFilter::new("warn"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn test_log_filter_defaults_to_warn() {
        assert_eq!(log_filter(None).max_level_hint(), Some(LevelFilter::WARN));
    }

    #[test]
    fn test_log_filter_honors_plain_level() {
        assert_eq!(log_filter(Some("info")).max_level_hint(), Some(LevelFilter::INFO));
        assert_eq!(log_filter(Some("debug")).max_level_hint(), Some(LevelFilter::DEBUG));
    }
}
