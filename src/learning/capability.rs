//! Capability interfaces for the hosted model
//!
//! The engine only talks to these traits. Production wiring uses
//! [`crate::agent::collaborators::LlmCollaborator`]; tests substitute
//! deterministic stubs.

use async_trait::async_trait;

use crate::error::CollaboratorError;
use crate::types::{CandidateObservation, Observation, Rule};

/// Everything the classifier sees for one round
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierRequest {
    pub prior_observations: Vec<Observation>,
    pub reference_summary: String,
    pub working_summary: String,
    pub diff_rendering: String,
    pub direct_preference: Option<String>,
}

impl ClassifierRequest {
    /// Text rendering of the prior log, one `- text [count: n]` line per entry
    pub fn observations_log(&self) -> String {
        self.prior_observations
            .iter()
            .map(|o| format!("- {} [count: {}]", o.text, o.count))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Maps a diff plus context to a complete proposed observation log
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObservationClassifier: Send + Sync {
    async fn classify(&self, request: &ClassifierRequest) -> Result<Vec<CandidateObservation>, CollaboratorError>;
}

/// Rewrites an observation as an imperative rule, echoing an existing rule
/// verbatim when it already covers the observation
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RuleWriter: Send + Sync {
    async fn write_rule(&self, observation: &str, existing_rules: &[Rule]) -> Result<String, CollaboratorError>;
}

/// Produces a summary of a source document that follows the given rules
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, source_document: &str, rules: &[Rule]) -> Result<String, CollaboratorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observations_log_rendering() {
        let request = ClassifierRequest {
            prior_observations: vec![Observation::new("Use bullet points", 2), Observation::new("Lead with age", 1)],
            reference_summary: String::new(),
            working_summary: String::new(),
            diff_rendering: String::new(),
            direct_preference: None,
        };
        assert_eq!(
            request.observations_log(),
            "- Use bullet points [count: 2]\n- Lead with age [count: 1]"
        );
    }
}
