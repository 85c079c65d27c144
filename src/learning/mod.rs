//! Preference learning
//!
//! Observes edits to generated summaries, accumulates recurring edit patterns
//! as counted observations, and promotes reinforced observations to rules
//! that steer future summaries.

pub mod capability;
pub mod dedupe;
pub mod diff;
pub mod engine;
pub mod merger;
pub mod promotion;
pub mod synthesizer;

pub use capability::{ClassifierRequest, ObservationClassifier, RuleWriter, Summarizer};
pub use dedupe::dedupe;
pub use diff::{diff, render_diff};
pub use engine::{PreferenceEngine, UpdateOutcome, UpdateRequest};
pub use merger::{merge, MergeOutcome, MergeSummary};
pub use promotion::select_promotable;
pub use synthesizer::{RuleSynthesizer, SynthesisFailure};
