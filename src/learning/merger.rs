//! Observation merger
//!
//! The classifier proposes a complete replacement log. The merger does not
//! trust it: counts may move by at most one per round, never go down, and a
//! proposed text that only differs from an existing one in case, spacing or
//! trailing punctuation is folded onto the existing canonical string.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

use crate::error::{EngineError, EngineResult, Stage};
use crate::types::{CandidateObservation, Observation};

static LABEL_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:rule|preference)\s*:\s*").expect("label prefix pattern is valid")
});

/// Result of merging one classifier round into the prior log
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MergeOutcome {
    pub observations: Vec<Observation>,
    pub summary: MergeSummary,
}

/// What changed in a merge, by canonical text
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct MergeSummary {
    /// Existing observations whose count went up by one
    pub reinforced: Vec<String>,
    /// Observations that were not in the prior log
    pub created: Vec<String>,
    /// Texts whose proposed count was out of bounds
    pub clamped: Vec<String>,
}

impl MergeSummary {
    pub fn is_empty(&self) -> bool {
        self.reinforced.is_empty() && self.created.is_empty()
    }
}

/// Canonical matching key: case, whitespace and trailing punctuation insensitive
pub fn canonical_key(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    let unlabeled = LABEL_PREFIX.replace(&collapsed, "");
    unlabeled
        .trim_end_matches(|c| matches!(c, '.' | '!' | '?'))
        .trim()
        .to_string()
}

/// Check a caller-supplied log before anything is sent out
pub fn validate_prior(prior: &[Observation]) -> EngineResult<()> {
    let mut seen: HashMap<String, &str> = HashMap::new();
    for obs in prior {
        let key = canonical_key(&obs.text);
        if key.is_empty() {
            return Err(EngineError::Validation("observation text must not be empty".to_string()));
        }
        if let Some(existing) = seen.insert(key, &obs.text) {
            return Err(EngineError::Validation(format!(
                "duplicate observation: '{}' and '{}'",
                existing, obs.text
            )));
        }
    }
    Ok(())
}

/// Refuse classifier output that cannot be merged safely
pub fn validate_candidates(candidates: &[CandidateObservation]) -> EngineResult<()> {
    for c in candidates {
        if canonical_key(&c.observation).is_empty() {
            return Err(EngineError::content(
                Stage::Classification,
                "observation with empty text",
            ));
        }
        if c.count < 0 {
            return Err(EngineError::content(
                Stage::Classification,
                format!("negative count {} for '{}'", c.count, c.observation),
            ));
        }
    }
    Ok(())
}

/// True when the candidate log restates the prior log exactly
fn is_pass_through(prior: &[Observation], candidates: &[CandidateObservation]) -> bool {
    if prior.len() != candidates.len() {
        return false;
    }
    let proposed: HashMap<&str, i64> = candidates
        .iter()
        .map(|c| (c.observation.as_str(), c.count))
        .collect();
    proposed.len() == prior.len()
        && prior
            .iter()
            .all(|o| proposed.get(o.text.as_str()) == Some(&i64::from(o.count)))
}

/// Merge a validated candidate log into the prior log.
///
/// Prior entries keep their order and their `promoted` marker; new entries
/// follow in the order the classifier listed them.
pub fn merge(prior: &[Observation], candidates: &[CandidateObservation]) -> MergeOutcome {
    if is_pass_through(prior, candidates) {
        debug!("Classifier returned the prior log unchanged");
        return MergeOutcome {
            observations: prior.to_vec(),
            summary: MergeSummary::default(),
        };
    }

    let index: HashMap<String, usize> = prior
        .iter()
        .enumerate()
        .map(|(i, o)| (canonical_key(&o.text), i))
        .collect();

    let mut merged = prior.to_vec();
    let mut summary = MergeSummary::default();
    let mut created: Vec<Observation> = Vec::new();
    let mut created_index: HashMap<String, usize> = HashMap::new();

    for candidate in candidates {
        let key = canonical_key(&candidate.observation);
        let proposed = u32::try_from(candidate.count).unwrap_or(u32::MAX);

        if let Some(&i) = index.get(&key) {
            let base = prior[i].count;
            let ceiling = base.saturating_add(1);
            let bounded = proposed.clamp(base, ceiling);
            if bounded != proposed && !summary.clamped.contains(&prior[i].text) {
                summary.clamped.push(prior[i].text.clone());
            }
            if bounded > merged[i].count {
                merged[i].count = bounded;
                summary.reinforced.push(prior[i].text.clone());
            }
        } else {
            let bounded = proposed.min(1);
            let text = candidate.observation.trim();
            if bounded != proposed && !summary.clamped.iter().any(|t| t == text) {
                summary.clamped.push(text.to_string());
            }
            match created_index.get(&key) {
                Some(&j) => created[j].count = created[j].count.max(bounded),
                None => {
                    created_index.insert(key, created.len());
                    created.push(Observation::new(text, bounded));
                }
            }
        }
    }

    summary.created = created.iter().map(|o| o.text.clone()).collect();
    merged.extend(created);

    debug!(
        "Merged observations: {} reinforced, {} created, {} clamped",
        summary.reinforced.len(),
        summary.created.len(),
        summary.clamped.len()
    );

    MergeOutcome {
        observations: merged,
        summary,
    }
}
