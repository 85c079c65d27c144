//! Shared types used across modules
//!
//! Observations, rules and the caller-held preference state. These are the
//! values that round-trip through the CLI state file and the HTTP API.

use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;

use crate::error::EngineError;

/// A rule is a trimmed, non-empty imperative instruction.
pub type Rule = String;

/// A counted, canonical description of a detected editing preference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    #[serde(rename = "observation", alias = "text")]
    pub text: String,
    pub count: u32,
    /// Set once a rule has been synthesized from this observation
    #[serde(default)]
    pub promoted: bool,
}

impl Observation {
    pub fn new(text: impl Into<String>, count: u32) -> Self {
        Self {
            text: text.into(),
            count,
            promoted: false,
        }
    }
}

/// An observation as proposed by the classifier, before validation.
///
/// Counts are kept signed so that a negative count can be rejected instead
/// of failing deserialization somewhere far from the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateObservation {
    #[serde(alias = "text")]
    pub observation: String,
    pub count: i64,
}

impl CandidateObservation {
    pub fn new(observation: impl Into<String>, count: i64) -> Self {
        Self {
            observation: observation.into(),
            count,
        }
    }
}

impl From<&Observation> for CandidateObservation {
    fn from(o: &Observation) -> Self {
        Self {
            observation: o.text.clone(),
            count: i64::from(o.count),
        }
    }
}

/// Minimum reinforcement count before an observation may become a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Threshold(NonZeroU32);

impl Threshold {
    pub fn new(value: u32) -> Result<Self, EngineError> {
        NonZeroU32::new(value)
            .map(Self)
            .ok_or_else(|| EngineError::Validation("threshold must be a positive integer".to_string()))
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl TryFrom<u32> for Threshold {
    type Error = EngineError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Threshold> for u32 {
    fn from(t: Threshold) -> Self {
        t.get()
    }
}

impl std::fmt::Display for Threshold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Named threshold tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LearningRate {
    Slow,
    #[default]
    Normal,
    Fast,
}

impl LearningRate {
    pub fn threshold(self) -> Threshold {
        let value = match self {
            LearningRate::Slow => NonZeroU32::MIN.saturating_add(4),
            LearningRate::Normal => NonZeroU32::MIN.saturating_add(2),
            LearningRate::Fast => NonZeroU32::MIN.saturating_add(1),
        };
        Threshold(value)
    }

    /// Parse from a case-insensitive name
    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "slow" => Some(LearningRate::Slow),
            "normal" => Some(LearningRate::Normal),
            "fast" => Some(LearningRate::Fast),
            _ => None,
        }
    }
}

impl std::fmt::Display for LearningRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LearningRate::Slow => write!(f, "Slow"),
            LearningRate::Normal => write!(f, "Normal"),
            LearningRate::Fast => write!(f, "Fast"),
        }
    }
}

impl std::str::FromStr for LearningRate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("unknown learning rate '{}' (slow, normal, fast)", s))
    }
}

/// The complete caller-held state, resubmitted on every round
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceState {
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub observations: Vec<Observation>,
    #[serde(default)]
    pub source_document: String,
    #[serde(default)]
    pub reference_summary: String,
    #[serde(default)]
    pub working_summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learning_rate: Option<LearningRate>,
}

/// Label of a diff segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Unchanged,
    Added,
    Removed,
}

/// A labeled span from comparing two text versions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSegment {
    pub value: String,
    pub kind: SegmentKind,
}

impl DiffSegment {
    pub fn new(value: impl Into<String>, kind: SegmentKind) -> Self {
        Self {
            value: value.into(),
            kind,
        }
    }
}
