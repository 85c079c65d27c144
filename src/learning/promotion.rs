//! Promotion policy - decides which observations are reinforced enough to become rules
//!
//! Observations stay in the log after promotion. The `promoted` marker keeps
//! the engine from asking for the same rule again on later rounds.

use tracing::debug;

use crate::types::{Observation, Threshold};

/// Observations with `count >= threshold`, in log order
pub fn select_promotable(log: &[Observation], threshold: Threshold) -> Vec<&Observation> {
    let promotable: Vec<&Observation> = log
        .iter()
        .filter(|o| o.count >= threshold.get())
        .collect();

    debug!("Found {} promotable observations (threshold {})", promotable.len(), threshold);
    promotable
}

/// Promotable observations that do not have a rule yet
pub fn pending_promotion(log: &[Observation], threshold: Threshold) -> Vec<&Observation> {
    select_promotable(log, threshold)
        .into_iter()
        .filter(|o| !o.promoted)
        .collect()
}

/// Mark the given texts as promoted, returning a new log
pub fn mark_promoted(log: &[Observation], promoted: &[String]) -> Vec<Observation> {
    log.iter()
        .map(|o| {
            let mut o = o.clone();
            if promoted.iter().any(|t| t == &o.text) {
                o.promoted = true;
            }
            o
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log() -> Vec<Observation> {
        vec![
            Observation::new("Use bullet points", 3),
            Observation::new("Lead with age", 1),
            Observation::new("Abbreviate patient", 5),
            Observation::new("Omit vitals", 2),
        ]
    }

    fn texts(selected: &[&Observation]) -> Vec<String> {
        selected.iter().map(|o| o.text.clone()).collect()
    }

    #[test]
    fn test_selects_at_or_above_threshold() {
        let log = log();
        let selected = select_promotable(&log, Threshold::new(3).unwrap());
        assert_eq!(texts(&selected), vec!["Use bullet points", "Abbreviate patient"]);
    }

    #[test]
    fn test_higher_threshold_never_selects_more() {
        let log = log();
        for t in 1..7 {
            let lower = texts(&select_promotable(&log, Threshold::new(t).unwrap()));
            let higher = texts(&select_promotable(&log, Threshold::new(t + 1).unwrap()));
            assert!(higher.iter().all(|h| lower.contains(h)), "threshold {} vs {}", t, t + 1);
        }
    }

    #[test]
    fn test_empty_log() {
        assert!(select_promotable(&[], Threshold::new(1).unwrap()).is_empty());
    }

    #[test]
    fn test_pending_skips_promoted() {
        let log = mark_promoted(&log(), &["Use bullet points".to_string()]);
        let pending = pending_promotion(&log, Threshold::new(3).unwrap());
        assert_eq!(texts(&pending), vec!["Abbreviate patient"]);
        assert_eq!(select_promotable(&log, Threshold::new(3).unwrap()).len(), 2);
    }
}
