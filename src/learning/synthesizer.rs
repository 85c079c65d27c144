//! Rule synthesizer - turns promoted observations into imperative rules
//!
//! One collaborator call per observation, all issued concurrently. A failed
//! call only loses that observation's rule for this round.

use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use super::capability::RuleWriter;
use crate::error::CollaboratorError;
use crate::types::{Observation, Rule};

/// An observation whose rule could not be produced this round
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SynthesisFailure {
    pub observation: String,
    pub reason: String,
}

/// A successfully synthesized rule and the observation it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedRule {
    pub observation: String,
    pub rule: Rule,
}

/// Result of a synthesis batch, in the order the observations were given
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynthesisBatch {
    pub rules: Vec<SynthesizedRule>,
    pub failures: Vec<SynthesisFailure>,
}

pub struct RuleSynthesizer {
    writer: Arc<dyn RuleWriter>,
}

impl RuleSynthesizer {
    pub fn new(writer: Arc<dyn RuleWriter>) -> Self {
        Self { writer }
    }

    /// Request one rule, trimmed. Empty output counts as a failure.
    pub async fn synthesize(&self, observation: &str, existing_rules: &[Rule]) -> Result<Rule, CollaboratorError> {
        let raw = self.writer.write_rule(observation, existing_rules).await?;
        let rule = raw.trim();
        if rule.is_empty() {
            return Err(CollaboratorError::Content("empty rule text".to_string()));
        }
        debug!("Synthesized rule for '{}': {}", observation, rule);
        Ok(rule.to_string())
    }

    /// Synthesize rules for every observation concurrently
    pub async fn synthesize_all(&self, observations: &[&Observation], existing_rules: &[Rule]) -> SynthesisBatch {
        let calls = observations
            .iter()
            .map(|o| self.synthesize(&o.text, existing_rules));
        let results = join_all(calls).await;

        let mut batch = SynthesisBatch::default();
        for (observation, result) in observations.iter().zip(results) {
            match result {
                Ok(rule) => batch.rules.push(SynthesizedRule {
                    observation: observation.text.clone(),
                    rule,
                }),
                Err(e) => {
                    warn!("Failed to synthesize rule for '{}': {}", observation.text, e);
                    batch.failures.push(SynthesisFailure {
                        observation: observation.text.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        batch
    }
}
