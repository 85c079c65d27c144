//! Word-level, whitespace-preserving text diff
//!
//! Text is split into word runs, whitespace runs and single punctuation
//! characters. Every token belongs to exactly one segment, so filtering the
//! segments by kind reconstructs either input byte-for-byte.

use similar::{capture_diff_slices_deadline, Algorithm, DiffTag};
use std::time::{Duration, Instant};

use crate::types::{DiffSegment, SegmentKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenClass {
    Word,
    Space,
    Punct,
}

fn classify(c: char) -> TokenClass {
    if c.is_alphanumeric() || c == '_' {
        TokenClass::Word
    } else if c.is_whitespace() {
        TokenClass::Space
    } else {
        TokenClass::Punct
    }
}

/// Split text into word, whitespace and punctuation tokens
fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut current: Option<TokenClass> = None;

    for (i, c) in text.char_indices() {
        let class = classify(c);
        match current {
            Some(prev) if prev == class && class != TokenClass::Punct => {}
            Some(_) => {
                tokens.push(&text[start..i]);
                start = i;
            }
            None => {}
        }
        current = Some(class);
    }
    if start < text.len() {
        tokens.push(&text[start..]);
    }
    tokens
}

/// Append a token, coalescing with the previous segment of the same kind
fn push(segments: &mut Vec<DiffSegment>, value: &str, kind: SegmentKind) {
    if let Some(last) = segments.last_mut() {
        if last.kind == kind {
            last.value.push_str(value);
            return;
        }
    }
    segments.push(DiffSegment::new(value, kind));
}

/// Upper bound on one diff computation. Past it the edit script gets
/// coarser but still reconstructs both inputs.
const DIFF_DEADLINE: Duration = Duration::from_millis(500);

/// Compute the edit script turning `original` into `edited`.
///
/// Myers diff over tokens in linear space. Within a hunk all removals are
/// emitted before the additions.
pub fn diff(original: &str, edited: &str) -> Vec<DiffSegment> {
    let a = tokenize(original);
    let b = tokenize(edited);
    let ops = capture_diff_slices_deadline(Algorithm::Myers, &a, &b, Some(Instant::now() + DIFF_DEADLINE));

    let mut segments = Vec::new();
    let mut removed = String::new();
    let mut added = String::new();

    for op in &ops {
        let (tag, old_range, new_range) = op.as_tag_tuple();
        match tag {
            DiffTag::Equal => {
                flush(&mut segments, &mut removed, &mut added);
                for token in &a[old_range] {
                    push(&mut segments, token, SegmentKind::Unchanged);
                }
            }
            DiffTag::Delete | DiffTag::Insert | DiffTag::Replace => {
                a[old_range].iter().for_each(|t| removed.push_str(t));
                b[new_range].iter().for_each(|t| added.push_str(t));
            }
        }
    }
    flush(&mut segments, &mut removed, &mut added);
    segments
}

/// Emit a pending hunk, removal first
fn flush(segments: &mut Vec<DiffSegment>, removed: &mut String, added: &mut String) {
    if !removed.is_empty() {
        push(segments, removed, SegmentKind::Removed);
        removed.clear();
    }
    if !added.is_empty() {
        push(segments, added, SegmentKind::Added);
        added.clear();
    }
}

/// Render the changed segments for the classifier prompt
pub fn render_diff(segments: &[DiffSegment]) -> String {
    segments
        .iter()
        .filter_map(|s| match s.kind {
            SegmentKind::Added => Some(format!("- added: {}", s.value)),
            SegmentKind::Removed => Some(format!("- removed: {}", s.value)),
            SegmentKind::Unchanged => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Rebuild the edited text from a diff
pub fn reconstruct_edited(segments: &[DiffSegment]) -> String {
    segments
        .iter()
        .filter(|s| s.kind != SegmentKind::Removed)
        .map(|s| s.value.as_str())
        .collect()
}

/// Rebuild the original text from a diff
pub fn reconstruct_original(segments: &[DiffSegment]) -> String {
    segments
        .iter()
        .filter(|s| s.kind != SegmentKind::Added)
        .map(|s| s.value.as_str())
        .collect()
}

/// True when the diff contains any change
pub fn has_changes(segments: &[DiffSegment]) -> bool {
    segments.iter().any(|s| s.kind != SegmentKind::Unchanged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trips(a: &str, b: &str) {
        let segments = diff(a, b);
        assert_eq!(reconstruct_original(&segments), a, "original of {:?} -> {:?}", a, b);
        assert_eq!(reconstruct_edited(&segments), b, "edited of {:?} -> {:?}", a, b);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(diff("", "").is_empty());
        assert_eq!(diff("", "hello world"), vec![DiffSegment::new("hello world", SegmentKind::Added)]);
        assert_eq!(diff("gone", ""), vec![DiffSegment::new("gone", SegmentKind::Removed)]);
    }

    #[test]
    fn test_identical_text_is_one_unchanged_segment() {
        let segments = diff("The patient is 45.", "The patient is 45.");
        assert_eq!(segments, vec![DiffSegment::new("The patient is 45.", SegmentKind::Unchanged)]);
        assert!(!has_changes(&segments));
    }

    #[test]
    fn test_word_replacement() {
        let segments = diff("The patient is male.", "The pt is male.");
        assert_eq!(
            segments,
            vec![
                DiffSegment::new("The ", SegmentKind::Unchanged),
                DiffSegment::new("patient", SegmentKind::Removed),
                DiffSegment::new("pt", SegmentKind::Added),
                DiffSegment::new(" is male.", SegmentKind::Unchanged),
            ]
        );
    }

    #[test]
    fn test_whitespace_changes_are_visible() {
        let segments = diff("a b", "a  b");
        assert!(has_changes(&segments));
        round_trips("a b", "a  b");
    }

    #[test]
    fn test_tokenize_keeps_punctuation_separate() {
        assert_eq!(tokenize("Hi, there!!"), vec!["Hi", ",", " ", "there", "!", "!"]);
        assert_eq!(tokenize("  x"), vec!["  ", "x"]);
    }

    #[test]
    fn test_round_trip_samples() {
        let samples = [
            ("", ""),
            ("one", "two"),
            ("A 45-year-old male presents.", "- 45M presents\n- BP 120/80"),
            ("Ünïcode wörds here", "Ünïcode words there"),
            ("line one\nline two\n", "line two\nline three\n"),
            ("same prefix, different end", "same prefix, other end!"),
        ];
        for (a, b) in samples {
            round_trips(a, b);
            round_trips(b, a);
        }
    }

    #[test]
    fn test_render_diff() {
        let segments = diff("The patient is male.", "The pt is male.");
        assert_eq!(render_diff(&segments), "- removed: patient\n- added: pt");
        assert_eq!(render_diff(&diff("same", "same")), "");
    }

    #[test]
    fn test_long_unrelated_rewrite() {
        let a: String = (0..6000).map(|i| format!("alpha{} ", i)).collect();
        let b: String = (0..6000).map(|i| format!("beta{}, ", i)).collect();
        round_trips(&a, &b);

        let segments = diff(&a, &b);
        assert!(has_changes(&segments));
        assert!(segments.len() <= 3 * 12_000);
    }

    #[test]
    fn test_long_rewrite_keeps_shared_words() {
        let a: String = (0..5000).map(|i| format!("word{} ", i)).collect();
        let b = a.replace("word2500 ", "changed ");
        let segments = diff(&a, &b);
        assert_eq!(render_diff(&segments), "- removed: word2500\n- added: changed");
        round_trips(&a, &b);
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(diff("a b c d", "a c b d"), diff("a b c d", "a c b d"));
    }
}
