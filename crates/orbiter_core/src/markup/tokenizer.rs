//! Text to fragment tokenizer.
//!
//! # Responsibility
//! - Find, split and parse each fragment kind.
//! - Run the kinds over a sequence in fixed priority order.
//!
//! # Invariants
//! - Pass order is Button, KeyValue, Tag, PageRef; a generic tag pass never
//!   sees text already claimed as a key-value.
//! - Each pass only splits `Text` fragments; typed fragments pass through.
//! - `tokenize(text)?.to_markup() == text`.
//! - Titles nest at most `MAX_NESTING` levels; deeper input is malformed.

use crate::markup::brackets::{find_balanced, find_greedy, BUTTON, REFERENCE};
use crate::markup::component::{
    Button, Component, ComponentKind, KeyValue, PageRef, Tag, KV_SEPARATOR,
};
use crate::markup::sequence::ComponentList;
use crate::markup::value::KvValue;
use crate::markup::{MarkupError, MarkupResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

/// Pass order of the tokenizer.
pub const PARSE_ORDER: &[ComponentKind] = &[
    ComponentKind::Button,
    ComponentKind::KeyValue,
    ComponentKind::Tag,
    ComponentKind::PageRef,
];

/// Deepest reference or tag nesting accepted inside one fragment.
pub const MAX_NESTING: usize = 256;

static SIMPLE_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#[\w\-@:]+").expect("valid simple tag regex"));
static KEY_VALUE_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#(\[\[)?[^:]+: ").expect("valid key-value tag regex"));

/// Tokenizes `text` into a fully typed sequence.
///
/// # Errors
/// - Returns `MarkupError::Malformed` when a matched substring cannot be parsed
///   as its kind, or nests deeper than `MAX_NESTING`; no partial sequence is
///   returned.
pub fn tokenize(text: &str) -> MarkupResult<ComponentList> {
    tokenize_nested(text, 0)
}

fn tokenize_nested(text: &str, depth: usize) -> MarkupResult<ComponentList> {
    if text.is_empty() {
        return Ok(ComponentList::new());
    }

    let mut list = ComponentList::from(vec![Component::text(text)]);
    for kind in PARSE_ORDER {
        list = expand_nested(list, *kind, depth)?;
    }
    Ok(list)
}

/// Replaces each text fragment by its matched and unmatched spans for `kind`.
pub fn expand_pass(list: ComponentList, kind: ComponentKind) -> MarkupResult<ComponentList> {
    expand_nested(list, kind, 0)
}

fn expand_nested(
    list: ComponentList,
    kind: ComponentKind,
    depth: usize,
) -> MarkupResult<ComponentList> {
    let mut expanded = ComponentList::new();
    for component in list {
        match component {
            Component::Text(text) => {
                let mut cursor = 0usize;
                for span in find_spans(kind, &text) {
                    if span.start > cursor {
                        expanded.push(Component::text(&text[cursor..span.start]));
                    }
                    expanded.push(parse_nested(kind, &text[span.clone()], depth)?);
                    cursor = span.end;
                }
                if cursor < text.len() {
                    expanded.push(Component::text(&text[cursor..]));
                }
            }
            other => expanded.push(other),
        }
    }
    Ok(expanded)
}

/// Byte spans of every `kind` match in `text`, in order.
pub fn find_spans(kind: ComponentKind, text: &str) -> Vec<Range<usize>> {
    match kind {
        ComponentKind::Text => Vec::new(),
        ComponentKind::Button => find_greedy(text, BUTTON),
        ComponentKind::KeyValue => tag_spans(text)
            .into_iter()
            .filter(|span| KEY_VALUE_TAG_RE.is_match(&text[span.clone()]))
            .collect(),
        ComponentKind::Tag => tag_spans(text),
        ComponentKind::PageRef => find_balanced(text, REFERENCE),
    }
}

/// Every `kind` match in `text`, in order.
pub fn find_all(kind: ComponentKind, text: &str) -> Vec<&str> {
    find_spans(kind, text)
        .into_iter()
        .map(|span| &text[span])
        .collect()
}

/// The non-empty text between `kind` matches, in order.
pub fn split(kind: ComponentKind, text: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut cursor = 0usize;
    for span in find_spans(kind, text) {
        if span.start > cursor {
            pieces.push(&text[cursor..span.start]);
        }
        cursor = span.end;
    }
    if cursor < text.len() {
        pieces.push(&text[cursor..]);
    }
    pieces
}

/// Parses one matched substring as `kind`.
pub fn parse_one(kind: ComponentKind, raw: &str) -> MarkupResult<Component> {
    parse_nested(kind, raw, 0)
}

fn parse_nested(kind: ComponentKind, raw: &str, depth: usize) -> MarkupResult<Component> {
    match kind {
        ComponentKind::Text => Ok(Component::text(raw)),
        ComponentKind::Button => parse_button(raw).map(Component::Button),
        ComponentKind::KeyValue => parse_key_value(raw).map(Component::KeyValue),
        ComponentKind::Tag => parse_tag(raw, depth).map(Component::Tag),
        ComponentKind::PageRef => parse_page_ref(raw, depth).map(Component::PageRef),
    }
}

fn parse_button(raw: &str) -> MarkupResult<Button> {
    let content = strip_delimiters(raw, "{{", "}}")
        .filter(|content| !content.is_empty())
        .ok_or_else(|| MarkupError::malformed(ComponentKind::Button, raw))?;

    Ok(match content.split_once(':') {
        Some((name, hidden)) => Button::with_hidden(name, hidden),
        None => Button::new(content),
    })
}

fn parse_key_value(raw: &str) -> MarkupResult<KeyValue> {
    let title = raw
        .strip_prefix('#')
        .and_then(|rest| strip_delimiters(rest, "[[", "]]"))
        .ok_or_else(|| MarkupError::malformed(ComponentKind::KeyValue, raw))?;
    let (key, value) = title
        .split_once(KV_SEPARATOR)
        .ok_or_else(|| MarkupError::malformed(ComponentKind::KeyValue, raw))?;

    let key = strip_delimiters(key, "[[", "]]").unwrap_or(key);
    Ok(KeyValue::parsed(key.to_string(), KvValue::infer(value), raw))
}

fn parse_tag(raw: &str, depth: usize) -> MarkupResult<Tag> {
    let title = raw
        .strip_prefix('#')
        .filter(|title| !title.is_empty())
        .ok_or_else(|| MarkupError::malformed(ComponentKind::Tag, raw))?;
    Ok(Tag {
        title: nested_title(ComponentKind::Tag, raw, title, depth)?,
    })
}

fn parse_page_ref(raw: &str, depth: usize) -> MarkupResult<PageRef> {
    let title = strip_delimiters(raw, "[[", "]]")
        .ok_or_else(|| MarkupError::malformed(ComponentKind::PageRef, raw))?;
    Ok(PageRef {
        title: nested_title(ComponentKind::PageRef, raw, title, depth)?,
    })
}

fn nested_title(
    kind: ComponentKind,
    raw: &str,
    title: &str,
    depth: usize,
) -> MarkupResult<ComponentList> {
    if depth >= MAX_NESTING {
        return Err(MarkupError::malformed(kind, raw));
    }
    tokenize_nested(title, depth + 1)
}

/// `#[[...]]` spans plus `#word` spans lying outside every reference.
fn tag_spans(text: &str) -> Vec<Range<usize>> {
    let references = find_balanced(text, REFERENCE);
    let mut spans: Vec<Range<usize>> = references
        .iter()
        .filter(|span| span.start > 0 && text.as_bytes()[span.start - 1] == b'#')
        .map(|span| span.start - 1..span.end)
        .collect();

    for found in SIMPLE_TAG_RE.find_iter(text) {
        let next = references.partition_point(|span| span.end <= found.start());
        let inside_reference = references
            .get(next)
            .is_some_and(|span| span.start <= found.start());
        if !inside_reference {
            spans.push(found.range());
        }
    }

    spans.sort_by_key(|span| span.start);
    let mut disjoint: Vec<Range<usize>> = Vec::with_capacity(spans.len());
    for span in spans {
        if disjoint.last().map_or(true, |last| span.start >= last.end) {
            disjoint.push(span);
        }
    }
    disjoint
}

fn strip_delimiters<'a>(raw: &'a str, open: &str, close: &str) -> Option<&'a str> {
    if raw.len() < open.len() + close.len() {
        return None;
    }
    raw.strip_prefix(open)?.strip_suffix(close)
}

#[cfg(test)]
mod tests {
    use super::{find_all, parse_one, split, tokenize, MAX_NESTING};
    use crate::markup::component::{Component, ComponentKind};
    use crate::markup::value::KvValue;
    use crate::markup::MarkupError;

    #[test]
    fn tokenize_types_every_fragment() {
        let list = tokenize("see [[Page]] #tag {{↑}} #[[interval: 4]]").unwrap();
        let kinds: Vec<ComponentKind> = list.iter().map(Component::kind).collect();
        assert_eq!(
            kinds,
            vec![
                ComponentKind::Text,
                ComponentKind::PageRef,
                ComponentKind::Text,
                ComponentKind::Tag,
                ComponentKind::Text,
                ComponentKind::Button,
                ComponentKind::Text,
                ComponentKind::KeyValue,
            ]
        );
    }

    #[test]
    fn key_value_pass_runs_before_tag_pass() {
        let list = tokenize("#[[due: 2020-06-30]]").unwrap();
        let kv = list.get(0).and_then(Component::as_key_value).expect("key-value");
        assert_eq!(kv.key(), "due");
        assert!(matches!(kv.value(), KvValue::Date(_)));
    }

    #[test]
    fn nested_key_spelling_with_separator_is_a_key_value() {
        let list = tokenize("#[[[[feed]]: ToReview]]").unwrap();
        let kv = list.get(0).and_then(Component::as_key_value).expect("key-value");
        assert_eq!(kv.key(), "feed");
        assert_eq!(kv.value(), &KvValue::Text("ToReview".into()));
        assert_eq!(list.to_markup(), "#[[[[feed]]: ToReview]]");
    }

    #[test]
    fn nested_key_spelling_without_separator_stays_a_tag() {
        let list = tokenize("#[[[[feed]]:ToReview]]").unwrap();
        let tag = list.get(0).and_then(Component::as_tag).expect("tag");
        let page = tag.page_ref().expect("bracketed tag");
        assert!(matches!(page.title.get(0), Some(Component::PageRef(_))));
        assert_eq!(page.title.get(1), Some(&Component::text(":ToReview")));
    }

    #[test]
    fn button_payload_splits_on_first_colon() {
        let button = parse_one(ComponentKind::Button, "{{a:b:c}}").unwrap();
        let button = button.as_button().expect("button");
        assert_eq!(button.name, "a");
        assert_eq!(button.hidden.as_deref(), Some("b:c"));
    }

    #[test]
    fn parse_one_rejects_unbalanced_button() {
        let err = parse_one(ComponentKind::Button, "{{open").unwrap_err();
        assert!(matches!(
            err,
            MarkupError::Malformed {
                kind: ComponentKind::Button,
                ..
            }
        ));
    }

    #[test]
    fn nesting_up_to_the_limit_parses() {
        let text = format!("{}x{}", "[[".repeat(MAX_NESTING), "]]".repeat(MAX_NESTING));
        let list = tokenize(&text).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list.to_markup(), text);
    }

    #[test]
    fn nesting_past_the_limit_is_malformed() {
        let depth = MAX_NESTING + 1;
        let text = format!("{}x{}", "[[".repeat(depth), "]]".repeat(depth));
        assert!(matches!(
            tokenize(&text),
            Err(MarkupError::Malformed {
                kind: ComponentKind::PageRef,
                ..
            })
        ));
    }

    #[test]
    fn find_all_and_split_are_complementary() {
        let text = "a #one b #[[two words]] c";
        assert_eq!(
            find_all(ComponentKind::Tag, text),
            vec!["#one", "#[[two words]]"]
        );
        assert_eq!(split(ComponentKind::Tag, text), vec!["a ", " b ", " c"]);
    }

    #[test]
    fn hash_inside_reference_is_not_a_tag() {
        let list = tokenize("[[issue #12]]").unwrap();
        assert_eq!(list.len(), 1);
        assert!(matches!(list.get(0), Some(Component::PageRef(_))));
    }

    #[test]
    fn tokenize_round_trips_text() {
        let samples = [
            "",
            "plain words only",
            "{{[[TODO]]}} Look into it #SomedayMaybe",
            r#"x {{Review History: {"Interval": 4, "Past Reviews": [], "Next Review": "[[due: 2020-06-30]]"}}}"#,
            "#[[[[due]]:[[August 8th, 2020]]]] #[[factor: 3.00]] [[a [[b]] c]]",
            "unbalanced [[ open and {{ brace",
        ];
        for sample in samples {
            assert_eq!(tokenize(sample).unwrap().to_markup(), sample);
        }
    }
}
