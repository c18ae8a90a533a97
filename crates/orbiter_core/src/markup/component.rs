//! Markup fragment types.
//!
//! # Responsibility
//! - Define the closed set of fragment kinds a note is made of.
//! - Serialize each fragment back to its markup spelling.
//!
//! # Invariants
//! - `Tag` and `PageRef` own their nested title sequence exclusively.
//! - A parsed `KeyValue` re-emits its source spelling until its value changes.
//!
//! # See also
//! - `markup::tokenizer` for the parsing side.

use crate::markup::sequence::ComponentList;
use crate::markup::value::KvValue;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::{Display, Formatter};

/// Separator between key and value inside a key-value tag.
pub const KV_SEPARATOR: &str = ": ";

static SIMPLE_TAG_TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w\-@:]+$").expect("valid simple tag title regex"));

/// Discriminant of [`Component`], used to drive the tokenizer passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    Text,
    Button,
    Tag,
    PageRef,
    KeyValue,
}

impl ComponentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Button => "button",
            Self::Tag => "tag",
            Self::PageRef => "page_ref",
            Self::KeyValue => "key_value",
        }
    }
}

impl Display for ComponentKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One fragment of a note.
#[derive(Debug, Clone, PartialEq)]
pub enum Component {
    /// Raw text without markup meaning.
    Text(String),
    Button(Button),
    Tag(Tag),
    PageRef(PageRef),
    KeyValue(KeyValue),
}

impl Component {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn kind(&self) -> ComponentKind {
        match self {
            Self::Text(_) => ComponentKind::Text,
            Self::Button(_) => ComponentKind::Button,
            Self::Tag(_) => ComponentKind::Tag,
            Self::PageRef(_) => ComponentKind::PageRef,
            Self::KeyValue(_) => ComponentKind::KeyValue,
        }
    }

    /// Markup spelling of this fragment.
    pub fn to_markup(&self) -> String {
        match self {
            Self::Text(value) => value.clone(),
            Self::Button(button) => button.to_markup(),
            Self::Tag(tag) => tag.to_markup(),
            Self::PageRef(page) => page.to_markup(),
            Self::KeyValue(kv) => kv.to_markup(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_button(&self) -> Option<&Button> {
        match self {
            Self::Button(button) => Some(button),
            _ => None,
        }
    }

    pub fn as_tag(&self) -> Option<&Tag> {
        match self {
            Self::Tag(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn as_key_value(&self) -> Option<&KeyValue> {
        match self {
            Self::KeyValue(kv) => Some(kv),
            _ => None,
        }
    }

    pub fn as_key_value_mut(&mut self) -> Option<&mut KeyValue> {
        match self {
            Self::KeyValue(kv) => Some(kv),
            _ => None,
        }
    }
}

impl Display for Component {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_markup())
    }
}

impl From<Button> for Component {
    fn from(value: Button) -> Self {
        Self::Button(value)
    }
}

impl From<Tag> for Component {
    fn from(value: Tag) -> Self {
        Self::Tag(value)
    }
}

impl From<PageRef> for Component {
    fn from(value: PageRef) -> Self {
        Self::PageRef(value)
    }
}

impl From<KeyValue> for Component {
    fn from(value: KeyValue) -> Self {
        Self::KeyValue(value)
    }
}

/// Interactive `{{name}}` / `{{name:hidden}}` fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub name: String,
    /// Everything after the first `:`, verbatim (may be JSON).
    pub hidden: Option<String>,
}

impl Button {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hidden: None,
        }
    }

    pub fn with_hidden(name: impl Into<String>, hidden: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hidden: Some(hidden.into()),
        }
    }

    pub fn to_markup(&self) -> String {
        match self.hidden.as_deref() {
            Some(hidden) => format!("{{{{{}:{}}}}}", self.name, hidden),
            None => format!("{{{{{}}}}}", self.name),
        }
    }
}

/// `[[title]]` reference; the title may hold further markup.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRef {
    /// Title fragments, brackets excluded.
    pub title: ComponentList,
}

impl PageRef {
    /// Builds a reference whose title is plain text.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: ComponentList::from(vec![Component::Text(title.into())]),
        }
    }

    pub fn title_text(&self) -> String {
        self.title.to_markup()
    }

    pub fn to_markup(&self) -> String {
        format!("[[{}]]", self.title.to_markup())
    }
}

/// `#word` or `#[[title]]` label.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    /// Everything after `#`; a bracketed tag holds a single `PageRef`.
    pub title: ComponentList,
}

impl Tag {
    /// Builds a tag, bracketing the title when it is not a single word.
    pub fn new(title: impl Into<String>) -> Self {
        let title = title.into();
        let component = if SIMPLE_TAG_TITLE_RE.is_match(&title) {
            Component::Text(title)
        } else {
            Component::PageRef(PageRef::new(title))
        };
        Self {
            title: ComponentList::from(vec![component]),
        }
    }

    /// Title with the reference brackets of a bracketed tag removed.
    pub fn title_text(&self) -> String {
        match self.title.as_slice() {
            [Component::PageRef(page)] => page.title_text(),
            _ => self.title.to_markup(),
        }
    }

    /// The wrapped reference of a bracketed tag.
    pub fn page_ref(&self) -> Option<&PageRef> {
        match self.title.as_slice() {
            [Component::PageRef(page)] => Some(page),
            _ => None,
        }
    }

    pub fn to_markup(&self) -> String {
        format!("#{}", self.title.to_markup())
    }
}

/// Typed metadata field spelled `#[[key: value]]`.
#[derive(Debug, Clone)]
pub struct KeyValue {
    key: String,
    value: KvValue,
    source: Option<String>,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<KvValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            source: None,
        }
    }

    /// Builds a field that re-emits `source` until its value is replaced.
    pub(crate) fn parsed(key: String, value: KvValue, source: &str) -> Self {
        Self {
            key,
            value,
            source: Some(source.to_string()),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &KvValue {
        &self.value
    }

    pub fn set_value(&mut self, value: impl Into<KvValue>) {
        self.value = value.into();
        self.source = None;
    }

    /// Replaces the key, dropping any preserved source spelling.
    pub fn rename(&mut self, key: impl Into<String>) {
        self.key = key.into();
        self.source = None;
    }

    /// Whether the field currently serializes in its canonical spelling.
    pub fn is_canonical(&self) -> bool {
        self.source
            .as_deref()
            .map_or(true, |source| source == self.canonical_markup())
    }

    pub fn canonical_markup(&self) -> String {
        format!("#[[{}{}{}]]", self.key, KV_SEPARATOR, self.value.encode())
    }

    pub fn to_markup(&self) -> String {
        match self.source.as_deref() {
            Some(source) => source.to_string(),
            None => self.canonical_markup(),
        }
    }

    /// Forgets the source spelling so the field serializes canonically.
    pub fn normalize(&mut self) {
        self.source = None;
    }
}

impl PartialEq for KeyValue {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.value == other.value
    }
}

#[cfg(test)]
mod tests {
    use super::{Button, Component, KeyValue, Tag};
    use crate::markup::value::KvValue;

    #[test]
    fn button_markup_includes_hidden_payload() {
        assert_eq!(Button::new("↑").to_markup(), "{{↑}}");
        assert_eq!(
            Button::with_hidden("Review History", " {}").to_markup(),
            "{{Review History: {}}}"
        );
    }

    #[test]
    fn tag_new_brackets_multi_word_titles() {
        assert_eq!(Tag::new("SomedayMaybe").to_markup(), "#SomedayMaybe");
        assert_eq!(Tag::new("Roam Orbiter").to_markup(), "#[[Roam Orbiter]]");
        assert_eq!(Tag::new("Roam Orbiter").title_text(), "Roam Orbiter");
    }

    #[test]
    fn key_value_keeps_source_until_value_changes() {
        let mut kv = KeyValue::parsed(
            "due".into(),
            KvValue::infer("August 8th, 2020"),
            "#[[due: August 8th, 2020]]",
        );
        assert_eq!(kv.to_markup(), "#[[due: August 8th, 2020]]");
        assert!(!kv.is_canonical());

        kv.set_value(3_i64);
        assert_eq!(kv.to_markup(), "#[[due: 3]]");
        assert!(kv.is_canonical());
    }

    #[test]
    fn key_value_equality_ignores_spelling() {
        let parsed = KeyValue::parsed("factor".into(), KvValue::Float(3.0), "#[[factor: 3.00]]");
        assert_eq!(
            Component::from(parsed),
            Component::from(KeyValue::new("factor", 3.0))
        );
    }
}
