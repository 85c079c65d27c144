//! Agent module - LLM interaction
//!
//! The chat completion client, the prompt templates, and the collaborator
//! that backs the learning capabilities with a hosted model.

pub mod collaborators;
pub mod llm;
pub mod prompts;

pub use collaborators::LlmCollaborator;
pub use llm::{OpenRouterClient, ProviderConfig};

use anyhow::Result;
use std::sync::Arc;

use crate::config::Config;
use crate::learning::PreferenceEngine;

/// Build an engine backed by the configured model
pub fn engine_from_config(config: &Config) -> Result<PreferenceEngine> {
    let client = OpenRouterClient::from_config(config)?;
    let collaborator = LlmCollaborator::new(client, config.llm.model.clone());
    Ok(PreferenceEngine::with_collaborator(Arc::new(collaborator)))
}
