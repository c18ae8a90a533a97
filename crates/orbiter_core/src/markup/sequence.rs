//! Ordered fragment sequence for one note.
//!
//! # Responsibility
//! - Own the fragments of a note in their literal text order.
//! - Offer lookup/insert/remove by equality and by predicate.
//! - Offer key-value field helpers used by the scheduling layer.
//!
//! # Invariants
//! - Concatenating every fragment's markup reproduces the parsed text until a
//!   fragment is edited.
//! - Appended fields are separated from preceding content by one space.

use crate::markup::component::{Component, KeyValue};
use crate::markup::tokenizer::tokenize;
use crate::markup::value::KvValue;
use crate::markup::MarkupResult;
use std::fmt::{Display, Formatter};

/// Ordered list of [`Component`]s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentList {
    items: Vec<Component>,
}

impl ComponentList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokenizes `text` into a fully typed sequence.
    pub fn parse(text: &str) -> MarkupResult<Self> {
        tokenize(text)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[Component] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Component> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Component> {
        self.items.iter_mut()
    }

    pub fn get(&self, index: usize) -> Option<&Component> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Component> {
        self.items.get_mut(index)
    }

    pub fn push(&mut self, component: Component) {
        self.items.push(component);
    }

    /// Inserts at `index`, clamped to the end of the list.
    pub fn insert(&mut self, index: usize, component: Component) {
        let index = index.min(self.items.len());
        self.items.insert(index, component);
    }

    pub fn remove(&mut self, index: usize) -> Option<Component> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    /// Removes the first fragment equal to `component`, returning its index.
    pub fn remove_item(&mut self, component: &Component) -> Option<usize> {
        let index = self.position(component)?;
        self.items.remove(index);
        Some(index)
    }

    pub fn retain(&mut self, keep: impl FnMut(&Component) -> bool) {
        self.items.retain(keep);
    }

    pub fn position(&self, component: &Component) -> Option<usize> {
        self.items.iter().position(|item| item == component)
    }

    pub fn position_where(&self, predicate: impl FnMut(&Component) -> bool) -> Option<usize> {
        self.items.iter().position(predicate)
    }

    pub fn contains(&self, component: &Component) -> bool {
        self.position(component).is_some()
    }

    pub fn find(&self, mut predicate: impl FnMut(&Component) -> bool) -> Option<&Component> {
        self.items.iter().find(|item| predicate(item))
    }

    pub fn find_all(&self, mut predicate: impl FnMut(&Component) -> bool) -> Vec<&Component> {
        self.items.iter().filter(|item| predicate(item)).collect()
    }

    /// Appends `component` unless an equal one exists.
    pub fn add(&mut self, component: Component) {
        if self.contains(&component) {
            return;
        }
        self.push_spaced(component);
    }

    /// Whether the list ends with a text fragment ending in a space.
    pub fn ends_in_whitespace(&self) -> bool {
        matches!(self.items.last(), Some(Component::Text(text)) if text.ends_with(' '))
    }

    pub fn key_value(&self, key: &str) -> Option<&KeyValue> {
        self.items
            .iter()
            .filter_map(Component::as_key_value)
            .find(|kv| kv.key() == key)
    }

    pub fn key_value_mut(&mut self, key: &str) -> Option<&mut KeyValue> {
        self.items
            .iter_mut()
            .filter_map(Component::as_key_value_mut)
            .find(|kv| kv.key() == key)
    }

    pub fn value(&self, key: &str) -> Option<&KvValue> {
        self.key_value(key).map(KeyValue::value)
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.key_value(key).is_some()
    }

    /// Updates the field in place, or appends it when missing.
    pub fn set_kv(&mut self, key: &str, value: impl Into<KvValue>) {
        let value = value.into();
        match self.key_value_mut(key) {
            Some(kv) => {
                if kv.value() != &value {
                    kv.set_value(value);
                }
            }
            None => self.push_spaced(Component::KeyValue(KeyValue::new(key, value))),
        }
    }

    /// Appends the field only when missing; returns the effective value.
    pub fn set_default_kv(&mut self, key: &str, value: impl Into<KvValue>) -> KvValue {
        if let Some(existing) = self.value(key) {
            return existing.clone();
        }
        let value = value.into();
        self.push_spaced(Component::KeyValue(KeyValue::new(key, value.clone())));
        value
    }

    /// Removes every field with `key`, returning the first one.
    pub fn remove_kv(&mut self, key: &str) -> Option<KeyValue> {
        let mut removed = None;
        self.items.retain(|item| match item {
            Component::KeyValue(kv) if kv.key() == key => {
                if removed.is_none() {
                    removed = Some(kv.clone());
                }
                false
            }
            _ => true,
        });
        removed
    }

    /// Renames a field in place; fails when `to` already exists.
    pub fn rename_kv(&mut self, from: &str, to: &str) -> bool {
        if self.has_key(to) {
            return false;
        }
        match self.key_value_mut(from) {
            Some(kv) => {
                kv.rename(to);
                true
            }
            None => false,
        }
    }

    pub fn first_key_value_index(&self) -> Option<usize> {
        self.position_where(|item| matches!(item, Component::KeyValue(_)))
    }

    /// Titles of every tag and page reference, in order.
    pub fn tags(&self) -> Vec<String> {
        self.items
            .iter()
            .filter_map(|item| match item {
                Component::Tag(tag) => Some(tag.title_text()),
                Component::PageRef(page) => Some(page.title_text()),
                _ => None,
            })
            .collect()
    }

    /// Markup spelling of the whole sequence.
    pub fn to_markup(&self) -> String {
        self.items.iter().map(Component::to_markup).collect()
    }

    fn push_spaced(&mut self, component: Component) {
        if !self.items.is_empty() && !self.ends_in_whitespace() {
            self.items.push(Component::text(" "));
        }
        self.items.push(component);
    }
}

impl Display for ComponentList {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_markup())
    }
}

impl From<Vec<Component>> for ComponentList {
    fn from(items: Vec<Component>) -> Self {
        Self { items }
    }
}

impl FromIterator<Component> for ComponentList {
    fn from_iter<T: IntoIterator<Item = Component>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ComponentList {
    type Item = Component;
    type IntoIter = std::vec::IntoIter<Component>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a ComponentList {
    type Item = &'a Component;
    type IntoIter = std::slice::Iter<'a, Component>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::ComponentList;
    use crate::markup::component::{Button, Component, KeyValue};
    use crate::markup::value::KvValue;

    #[test]
    fn set_kv_appends_with_single_space() {
        let mut list = ComponentList::from(vec![Component::text("note")]);
        list.set_kv("interval", 2_i64);
        assert_eq!(list.to_markup(), "note #[[interval: 2]]");

        list.set_kv("interval", 4_i64);
        assert_eq!(list.to_markup(), "note #[[interval: 4]]");
    }

    #[test]
    fn set_default_kv_keeps_existing_value() {
        let mut list = ComponentList::parse("x #[[factor: 3]]").unwrap();
        assert_eq!(list.set_default_kv("factor", 2.0), KvValue::Int(3));
        assert_eq!(list.to_markup(), "x #[[factor: 3]]");
    }

    #[test]
    fn set_kv_with_equal_value_keeps_source_spelling() {
        let mut list = ComponentList::parse("#[[factor: 3.00]]").unwrap();
        list.set_kv("factor", 3.0);
        assert_eq!(list.to_markup(), "#[[factor: 3.00]]");
    }

    #[test]
    fn remove_and_rename_fields() {
        let mut list = ComponentList::parse("a #[[count0: 1]] #[[not_count: 2]]").unwrap();
        let removed = list.remove_kv("count0").expect("count0 present");
        assert_eq!(removed, KeyValue::new("count0", 1_i64));
        assert!(list.rename_kv("not_count", "none_count"));
        assert!(!list.rename_kv("missing", "none_count"));
        assert_eq!(list.value("none_count"), Some(&KvValue::Int(2)));
    }

    #[test]
    fn add_skips_duplicates_and_remove_item_reports_index() {
        let mut list = ComponentList::parse("x {{↑}}").unwrap();
        list.add(Component::from(Button::new("↑")));
        list.add(Component::from(Button::new("↓")));
        assert_eq!(list.to_markup(), "x {{↑}} {{↓}}");

        let index = list.remove_item(&Component::from(Button::new("↑")));
        assert_eq!(index, Some(1));
    }

    #[test]
    fn tags_lists_tag_and_page_titles() {
        let list =
            ComponentList::parse("#SomedayMaybe see [[Other page]] #[[Roam Orbiter]]").unwrap();
        assert_eq!(
            list.tags(),
            vec!["SomedayMaybe", "Other page", "Roam Orbiter"]
        );
    }
}
