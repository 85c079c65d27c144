//! Deterministic stand-in for the hosted model

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pref_learner::learning::{ClassifierRequest, ObservationClassifier, RuleWriter, Summarizer};
use pref_learner::{CandidateObservation, CollaboratorError, PreferenceEngine, Rule};

/// Scripted collaborator: returns a fixed observation log, writes
/// `"Always: <observation>."` rules, and fails on request
#[derive(Default)]
pub struct ScriptedModel {
    pub candidates: Mutex<Vec<CandidateObservation>>,
    pub failing_rules: Mutex<HashSet<String>>,
    pub echo_rule: Mutex<Option<Rule>>,
    pub summary: Mutex<String>,
    pub delay: Mutex<Option<Duration>>,
    pub classify_calls: AtomicUsize,
    pub rule_calls: AtomicUsize,
    pub last_request: Mutex<Option<ClassifierRequest>>,
}

impl ScriptedModel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            summary: Mutex::new("A short summary.".to_string()),
            ..Default::default()
        })
    }

    pub fn returning(candidates: &[(&str, i64)]) -> Arc<Self> {
        let model = Self::new();
        model.set_candidates(candidates);
        model
    }

    pub fn set_candidates(&self, candidates: &[(&str, i64)]) {
        *self.candidates.lock().unwrap() = candidates
            .iter()
            .map(|(text, count)| CandidateObservation::new(*text, *count))
            .collect();
    }

    pub fn fail_rule_for(&self, observation: &str) {
        self.failing_rules.lock().unwrap().insert(observation.to_string());
    }

    pub fn echo(&self, rule: &str) {
        *self.echo_rule.lock().unwrap() = Some(rule.to_string());
    }

    pub fn slow_down(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn engine(self: &Arc<Self>) -> PreferenceEngine {
        PreferenceEngine::with_collaborator(self.clone())
    }

    async fn pause(&self) {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ObservationClassifier for ScriptedModel {
    async fn classify(&self, request: &ClassifierRequest) -> Result<Vec<CandidateObservation>, CollaboratorError> {
        self.pause().await;
        self.classify_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        Ok(self.candidates.lock().unwrap().clone())
    }
}

#[async_trait]
impl RuleWriter for ScriptedModel {
    async fn write_rule(&self, observation: &str, _existing_rules: &[Rule]) -> Result<String, CollaboratorError> {
        self.rule_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_rules.lock().unwrap().contains(observation) {
            return Err(CollaboratorError::Transport("connection reset".to_string()));
        }
        if let Some(rule) = self.echo_rule.lock().unwrap().clone() {
            return Ok(rule);
        }
        Ok(format!("Always: {}.", observation))
    }
}

#[async_trait]
impl Summarizer for ScriptedModel {
    async fn summarize(&self, _source_document: &str, rules: &[Rule]) -> Result<String, CollaboratorError> {
        self.pause().await;
        let summary = self.summary.lock().unwrap().clone();
        if rules.is_empty() {
            Ok(summary)
        } else {
            Ok(format!("{} ({} rules)", summary, rules.len()))
        }
    }
}
