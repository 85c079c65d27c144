//! Rule deduplication

use std::collections::HashSet;

use crate::types::Rule;

/// Concatenate `existing` and `incoming`, trim every rule and keep the first
/// occurrence of each distinct string. Blank rules are dropped.
pub fn dedupe(existing: &[Rule], incoming: &[Rule]) -> Vec<Rule> {
    let mut seen = HashSet::new();
    existing
        .iter()
        .chain(incoming)
        .map(|r| r.trim())
        .filter(|r| !r.is_empty() && seen.insert(*r))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(items: &[&str]) -> Vec<Rule> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_keeps_first_seen_order() {
        let existing = rules(&["Use bullet points.", "Lead with age."]);
        let incoming = rules(&["Abbreviate patient as pt.", "Use bullet points."]);
        assert_eq!(
            dedupe(&existing, &incoming),
            rules(&["Use bullet points.", "Lead with age.", "Abbreviate patient as pt."])
        );
    }

    #[test]
    fn test_trims_before_comparing() {
        let existing = rules(&["Use bullet points."]);
        let incoming = rules(&["\n  Use bullet points.  \n"]);
        assert_eq!(dedupe(&existing, &incoming), rules(&["Use bullet points."]));
    }

    #[test]
    fn test_drops_blank_rules() {
        assert_eq!(dedupe(&rules(&["  ", "A"]), &rules(&["", "\n"])), rules(&["A"]));
    }

    #[test]
    fn test_idempotent() {
        let existing = rules(&[" B", "A", "B "]);
        let incoming = rules(&["C", "A"]);
        let once = dedupe(&existing, &incoming);
        assert_eq!(dedupe(&once, &[]), once);
        assert_eq!(dedupe(&existing, &[]), rules(&["B", "A"]));
    }
}
