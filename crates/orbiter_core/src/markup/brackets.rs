//! Balanced-delimiter scanning for nested references and buttons.
//!
//! # Responsibility
//! - Locate `[[...]]` reference spans by pairing open and close markers.
//! - Locate `{{...}}` button spans, whose payloads may end in `}}}`.
//!
//! # Invariants
//! - Returned spans are sorted, non-overlapping byte ranges on char boundaries.
//! - No match yields an empty vec, never an error.
//! - Both scanners are iterative; input size never grows the call stack.

use std::ops::Range;

/// Open/close marker pair used by the scanners in this module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiters {
    pub open: &'static str,
    pub close: &'static str,
}

/// Page reference delimiters.
pub const REFERENCE: Delimiters = Delimiters {
    open: "[[",
    close: "]]",
};

/// Button delimiters.
pub const BUTTON: Delimiters = Delimiters {
    open: "{{",
    close: "}}",
};

/// Returns every maximal balanced span delimited by `delimiters`.
///
/// Each close marker pairs with the nearest unpaired open marker before it;
/// close markers with nothing to pair are ignored. Open markers that are never
/// closed do not hide the balanced spans nested inside them. Only spans not
/// enclosed by another balanced span are returned.
pub fn find_balanced(text: &str, delimiters: Delimiters) -> Vec<Range<usize>> {
    let mut opens: Vec<usize> = Vec::new();
    let mut pairs: Vec<Range<usize>> = Vec::new();
    let mut idx = 0usize;

    while idx < text.len() {
        let rest = &text[idx..];
        if rest.starts_with(delimiters.open) {
            opens.push(idx);
            idx += delimiters.open.len();
        } else if !opens.is_empty() && rest.starts_with(delimiters.close) {
            idx += delimiters.close.len();
            if let Some(start) = opens.pop() {
                pairs.push(start..idx);
            }
        } else {
            idx += rest.chars().next().map_or(1, char::len_utf8);
        }
    }

    pairs.sort_by_key(|span| span.start);
    let mut spans: Vec<Range<usize>> = Vec::with_capacity(pairs.len());
    for pair in pairs {
        if spans.last().map_or(true, |last| pair.start >= last.end) {
            spans.push(pair);
        }
    }
    spans
}

/// Returns button-style spans.
///
/// From each open marker the span extends to the last close marker that
/// appears before the next open marker, and must enclose at least one char.
/// This keeps `{{name: {"json": "payload"}}}` whole while still separating
/// adjacent buttons such as `{{a}} {{b}}`.
pub fn find_greedy(text: &str, delimiters: Delimiters) -> Vec<Range<usize>> {
    let open = delimiters.open;
    let close = delimiters.close;
    let mut spans = Vec::new();
    let mut from = 0usize;

    while let Some(found) = text[from..].find(open) {
        let start = from + found;
        let body = start + open.len();

        // Chars after the first body char may not directly follow another open
        // marker, so the match is bounded by the next (possibly overlapping) one.
        let overlap_from = body - 1;
        let limit = text[overlap_from..]
            .find(open)
            .map_or(text.len(), |offset| overlap_from + offset + open.len());
        let first_len = text[body..].chars().next().map_or(0, char::len_utf8);
        let search_from = body + first_len;

        let close_at = if first_len > 0 && search_from <= limit {
            text[search_from..limit].rfind(close)
        } else {
            None
        };

        match close_at {
            Some(offset) => {
                let end = search_from + offset + close.len();
                spans.push(start..end);
                from = end;
            }
            None => from = start + 1,
        }
    }

    spans
}

#[cfg(test)]
mod tests {
    use super::{find_balanced, find_greedy, BUTTON, REFERENCE};

    fn slices<'a>(text: &'a str, spans: &[std::ops::Range<usize>]) -> Vec<&'a str> {
        spans.iter().map(|span| &text[span.clone()]).collect()
    }

    #[test]
    fn balanced_handles_nesting() {
        let text = "x [[a [[b]] c]] y [[d]]";
        let spans = find_balanced(text, REFERENCE);
        assert_eq!(slices(text, &spans), vec!["[[a [[b]] c]]", "[[d]]"]);
    }

    #[test]
    fn balanced_ignores_unmatched_open_and_stray_close() {
        assert!(find_balanced("no refs here", REFERENCE).is_empty());
        assert!(find_balanced("]] [[ open", REFERENCE).is_empty());

        let text = "[[a [[b]]";
        let spans = find_balanced(text, REFERENCE);
        assert_eq!(slices(text, &spans), vec!["[[b]]"]);

        let text = "[[x [[y]] [[z";
        let spans = find_balanced(text, REFERENCE);
        assert_eq!(slices(text, &spans), vec!["[[y]]"]);
    }

    #[test]
    fn balanced_survives_many_unclosed_opens() {
        let mut text = "[[ ".repeat(50_000);
        assert!(find_balanced(&text, REFERENCE).is_empty());

        text.push_str("[[last]]");
        let spans = find_balanced(&text, REFERENCE);
        assert_eq!(slices(&text, &spans), vec!["[[last]]"]);
    }

    #[test]
    fn balanced_keeps_nested_key_value_spelling_whole() {
        let text = "#[[[[feed]]:ToReview]] tail";
        let spans = find_balanced(text, REFERENCE);
        assert_eq!(slices(text, &spans), vec!["[[[[feed]]:ToReview]]"]);
    }

    #[test]
    fn balanced_is_utf8_safe() {
        let text = "ü [[ä]] ↑";
        let spans = find_balanced(text, REFERENCE);
        assert_eq!(slices(text, &spans), vec!["[[ä]]"]);
    }

    #[test]
    fn greedy_separates_adjacent_buttons() {
        let text = "{{↑}} {{↓}}";
        let spans = find_greedy(text, BUTTON);
        assert_eq!(slices(text, &spans), vec!["{{↑}}", "{{↓}}"]);
    }

    #[test]
    fn greedy_keeps_json_payload_whole() {
        let text = r#"note {{Review History: {"Interval": 4}}} after"#;
        let spans = find_greedy(text, BUTTON);
        assert_eq!(
            slices(text, &spans),
            vec![r#"{{Review History: {"Interval": 4}}}"#]
        );
    }

    #[test]
    fn greedy_requires_content_and_close() {
        assert!(find_greedy("{{}}", BUTTON).is_empty());
        assert!(find_greedy("{{never closed", BUTTON).is_empty());

        let text = "{{{x}}";
        let spans = find_greedy(text, BUTTON);
        assert_eq!(slices(text, &spans), vec!["{{x}}"]);
    }
}
