//! Error types for the preference engine

use serde::Serialize;
use thiserror::Error;

/// Which collaborator call a failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Classification,
    Synthesis,
    Summary,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Classification => write!(f, "classification"),
            Stage::Synthesis => write!(f, "synthesis"),
            Stage::Summary => write!(f, "summary"),
        }
    }
}

/// Failure reported by a model-backed capability
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollaboratorError {
    /// Network, timeout, auth or HTTP status failure
    #[error("transport failure: {0}")]
    Transport(String),

    /// The call went through but the payload is unusable
    #[error("invalid response: {0}")]
    Content(String),
}

/// Errors surfaced by an engine round
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Malformed input, rejected before any collaborator call
    #[error("validation error: {0}")]
    Validation(String),

    #[error("{stage} transport error: {message}")]
    Transport { stage: Stage, message: String },

    #[error("{stage} returned invalid data: {message}")]
    Content { stage: Stage, message: String },
}

impl EngineError {
    pub fn from_collaborator(stage: Stage, err: CollaboratorError) -> Self {
        match err {
            CollaboratorError::Transport(message) => EngineError::Transport { stage, message },
            CollaboratorError::Content(message) => EngineError::Content { stage, message },
        }
    }

    pub fn content(stage: Stage, message: impl Into<String>) -> Self {
        EngineError::Content {
            stage,
            message: message.into(),
        }
    }

    /// Stage the error belongs to, if it came from a collaborator
    pub fn stage(&self) -> Option<Stage> {
        match self {
            EngineError::Validation(_) => None,
            EngineError::Transport { stage, .. } | EngineError::Content { stage, .. } => Some(*stage),
        }
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
