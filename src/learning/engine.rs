//! Preference engine - one learning round per call
//!
//! Diff, classify, merge, select, synthesize, dedupe. The engine holds no
//! state between calls: every round is a function of its request plus the
//! collaborators' answers, and the caller replaces its state only with the
//! returned outcome.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use super::capability::{ClassifierRequest, ObservationClassifier, RuleWriter, Summarizer};
use super::dedupe::dedupe;
use super::diff::{diff, render_diff};
use super::merger::{self, MergeSummary};
use super::promotion::{mark_promoted, pending_promotion};
use super::synthesizer::{RuleSynthesizer, SynthesisFailure};
use crate::error::{EngineError, EngineResult, Stage};
use crate::types::{Observation, Rule, Threshold};

/// Input of one learning round
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRequest {
    pub reference_summary: String,
    pub working_summary: String,
    pub direct_preference: Option<String>,
    pub rules: Vec<Rule>,
    pub observations: Vec<Observation>,
    pub threshold: Threshold,
}

/// Next state produced by a learning round
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateOutcome {
    pub observations: Vec<Observation>,
    pub rules: Vec<Rule>,
    /// Promotions that failed this round; those observations stay pending
    pub warnings: Vec<SynthesisFailure>,
    pub merge: MergeSummary,
}

pub struct PreferenceEngine {
    classifier: Arc<dyn ObservationClassifier>,
    synthesizer: RuleSynthesizer,
    summarizer: Arc<dyn Summarizer>,
}

impl PreferenceEngine {
    pub fn new(
        classifier: Arc<dyn ObservationClassifier>,
        writer: Arc<dyn RuleWriter>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        Self {
            classifier,
            synthesizer: RuleSynthesizer::new(writer),
            summarizer,
        }
    }

    /// Build an engine where one collaborator provides every capability
    pub fn with_collaborator<C>(collaborator: Arc<C>) -> Self
    where
        C: ObservationClassifier + RuleWriter + Summarizer + 'static,
    {
        Self::new(collaborator.clone(), collaborator.clone(), collaborator)
    }

    /// Summarize a source document under the current rules
    pub async fn produce_summary(&self, source_document: &str, rules: &[Rule]) -> EngineResult<String> {
        if source_document.trim().is_empty() {
            return Err(EngineError::Validation("source document must not be empty".to_string()));
        }

        let summary = self
            .summarizer
            .summarize(source_document, rules)
            .await
            .map_err(|e| EngineError::from_collaborator(Stage::Summary, e))?;

        let summary = summary.trim();
        if summary.is_empty() {
            return Err(EngineError::content(Stage::Summary, "empty summary"));
        }
        info!("Produced summary ({} chars, {} rules)", summary.len(), rules.len());
        Ok(summary.to_string())
    }

    /// Run one learning round
    pub async fn update_preferences(&self, request: UpdateRequest) -> EngineResult<UpdateOutcome> {
        validate(&request)?;

        let segments = diff(&request.reference_summary, &request.working_summary);
        let diff_rendering = render_diff(&segments);
        debug!("Diff has {} segments", segments.len());

        let direct_preference = request
            .direct_preference
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        let classifier_request = ClassifierRequest {
            prior_observations: request.observations.clone(),
            reference_summary: request.reference_summary.clone(),
            working_summary: request.working_summary.clone(),
            diff_rendering,
            direct_preference,
        };

        let candidates = self
            .classifier
            .classify(&classifier_request)
            .await
            .map_err(|e| EngineError::from_collaborator(Stage::Classification, e))?;
        merger::validate_candidates(&candidates)?;

        let merged = merger::merge(&request.observations, &candidates);

        let pending = pending_promotion(&merged.observations, request.threshold);
        let batch = self.synthesizer.synthesize_all(&pending, &request.rules).await;

        let promoted: Vec<String> = batch.rules.iter().map(|r| r.observation.clone()).collect();
        let incoming: Vec<Rule> = batch.rules.into_iter().map(|r| r.rule).collect();
        let rules = dedupe(&request.rules, &incoming);
        let observations = if promoted.is_empty() {
            merged.observations
        } else {
            mark_promoted(&merged.observations, &promoted)
        };

        info!(
            "Preference round complete: {} observations ({} reinforced, {} new), {} promoted, {} rules (+{}), {} failed",
            observations.len(),
            merged.summary.reinforced.len(),
            merged.summary.created.len(),
            promoted.len(),
            rules.len(),
            rules.len().saturating_sub(request.rules.len()),
            batch.failures.len()
        );

        Ok(UpdateOutcome {
            observations,
            rules,
            warnings: batch.failures,
            merge: merged.summary,
        })
    }
}

fn validate(request: &UpdateRequest) -> EngineResult<()> {
    if request.working_summary.trim().is_empty() {
        return Err(EngineError::Validation("working summary must not be empty".to_string()));
    }
    merger::validate_prior(&request.observations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CollaboratorError;
    use crate::learning::capability::{MockObservationClassifier, MockRuleWriter, MockSummarizer};
    use crate::types::CandidateObservation;

    fn request(observations: Vec<Observation>, threshold: u32) -> UpdateRequest {
        UpdateRequest {
            reference_summary: "The patient is a 45-year-old male.".to_string(),
            working_summary: "- 45M".to_string(),
            direct_preference: None,
            rules: vec![],
            observations,
            threshold: Threshold::new(threshold).unwrap(),
        }
    }

    fn build_engine(
        classifier: MockObservationClassifier,
        writer: MockRuleWriter,
        summarizer: MockSummarizer,
    ) -> PreferenceEngine {
        PreferenceEngine::new(Arc::new(classifier), Arc::new(writer), Arc::new(summarizer))
    }

    #[tokio::test]
    async fn test_classifier_sees_diff_and_preference() {
        let mut classifier = MockObservationClassifier::new();
        classifier
            .expect_classify()
            .times(1)
            .withf(|req| {
                req.diff_rendering.contains("- added: ")
                    && req.direct_preference.as_deref() == Some("Keep it short")
            })
            .returning(|_| Ok(vec![]));
        let mut writer = MockRuleWriter::new();
        writer.expect_write_rule().never();

        let engine = build_engine(classifier, writer, MockSummarizer::new());
        let mut req = request(vec![], 3);
        req.direct_preference = Some("  Keep it short ".to_string());
        let outcome = engine.update_preferences(req).await.unwrap();
        assert!(outcome.observations.is_empty());
    }

    #[tokio::test]
    async fn test_blank_direct_preference_is_omitted() {
        let mut classifier = MockObservationClassifier::new();
        classifier
            .expect_classify()
            .withf(|req| req.direct_preference.is_none())
            .returning(|_| Ok(vec![]));

        let engine = build_engine(classifier, MockRuleWriter::new(), MockSummarizer::new());
        let mut req = request(vec![], 3);
        req.direct_preference = Some("   ".to_string());
        assert!(engine.update_preferences(req).await.is_ok());
    }

    #[tokio::test]
    async fn test_validation_happens_before_classification() {
        let mut classifier = MockObservationClassifier::new();
        classifier.expect_classify().never();
        let engine = build_engine(classifier, MockRuleWriter::new(), MockSummarizer::new());

        let mut req = request(vec![], 3);
        req.working_summary = "  ".to_string();
        assert!(matches!(engine.update_preferences(req).await, Err(EngineError::Validation(_))));

        let dupes = vec![Observation::new("A", 1), Observation::new("a", 1)];
        assert!(matches!(
            engine.update_preferences(request(dupes, 3)).await,
            Err(EngineError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_classifier_transport_failure_fails_round() {
        let mut classifier = MockObservationClassifier::new();
        classifier
            .expect_classify()
            .returning(|_| Err(CollaboratorError::Transport("503".to_string())));
        let engine = build_engine(classifier, MockRuleWriter::new(), MockSummarizer::new());

        let err = engine.update_preferences(request(vec![], 3)).await.unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Classification));
        assert!(matches!(err, EngineError::Transport { .. }));
    }

    #[tokio::test]
    async fn test_negative_count_is_content_error() {
        let mut classifier = MockObservationClassifier::new();
        classifier
            .expect_classify()
            .returning(|_| Ok(vec![CandidateObservation::new("Use bullet points", -2)]));
        let mut writer = MockRuleWriter::new();
        writer.expect_write_rule().never();
        let engine = build_engine(classifier, writer, MockSummarizer::new());

        let err = engine.update_preferences(request(vec![], 1)).await.unwrap_err();
        assert!(matches!(err, EngineError::Content { stage: Stage::Classification, .. }));
    }

    #[tokio::test]
    async fn test_already_promoted_observation_is_not_resynthesized() {
        let mut promoted = Observation::new("Use bullet points", 3);
        promoted.promoted = true;

        let mut classifier = MockObservationClassifier::new();
        classifier
            .expect_classify()
            .returning(|_| Ok(vec![CandidateObservation::new("Use bullet points", 4)]));
        let mut writer = MockRuleWriter::new();
        writer.expect_write_rule().never();
        let engine = build_engine(classifier, writer, MockSummarizer::new());

        let mut req = request(vec![promoted], 3);
        req.rules = vec!["Use bullet points.".to_string()];
        let outcome = engine.update_preferences(req).await.unwrap();
        assert_eq!(outcome.observations[0].count, 4);
        assert_eq!(outcome.rules, vec!["Use bullet points.".to_string()]);
    }

    #[tokio::test]
    async fn test_produce_summary_trims_and_rejects_blank() {
        let mut summarizer = MockSummarizer::new();
        summarizer
            .expect_summarize()
            .times(1)
            .returning(|_, _| Ok("  A 45M with chest pain.\n".to_string()));
        let engine = build_engine(MockObservationClassifier::new(), MockRuleWriter::new(), summarizer);
        assert_eq!(
            engine.produce_summary("record", &[]).await.unwrap(),
            "A 45M with chest pain."
        );

        let mut summarizer = MockSummarizer::new();
        summarizer.expect_summarize().returning(|_, _| Ok(String::new()));
        let engine = build_engine(MockObservationClassifier::new(), MockRuleWriter::new(), summarizer);
        assert!(matches!(
            engine.produce_summary("record", &[]).await,
            Err(EngineError::Content { stage: Stage::Summary, .. })
        ));
        assert!(matches!(engine.produce_summary(" ", &[]).await, Err(EngineError::Validation(_))));
    }
}
