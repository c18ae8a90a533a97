//! Feedback handlers: response sets, counters and response buttons.
//!
//! # Responsibility
//! - Stamp the `feedback` field, one counter per response and `total_count`.
//! - Place one `{{response}}` button per response.
//! - Count a response.
//!
//! # Invariants
//! - `update_metadata` is idempotent.
//! - Missing buttons go immediately before the first key-value field.
//! - Labelled buttons (`{{2x (4d)}}`) always show the interval the response
//!   would schedule from the note's current `interval`.

use crate::markup::{Button, Component, ComponentList, KvValue, Tag};
use crate::orbit::error::{HandlerKind, OrbitError, OrbitResult};
use crate::orbit::schedule::{multiplied_interval, ScheduleKind, INTERVAL_KEY};
use crate::orbit::state::SchedulingState;
use once_cell::sync::Lazy;
use regex::Regex;

pub const FEEDBACK_KEY: &str = "feedback";
pub const TOTAL_COUNT_KEY: &str = "total_count";
/// Name tag carried by boomerang notes.
pub const BOOMERANG_TAG: &str = "Boomerang";

static INTERVAL_LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+(\.\d)?[dmy]$").expect("valid interval label regex"));

/// Counter field name for one response.
pub fn counter_key(response: &str) -> String {
    format!("{response}_count")
}

/// Short spelling of a day count: days up to a month, then months, then years.
pub fn interval_label(days: i64) -> String {
    if days <= 30 {
        format!("{days}d")
    } else if days <= 365 {
        format!("{:.1}m", days as f64 / 30.0)
    } else {
        format!("{:.1}y", days as f64 / 365.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackHandler {
    /// `↑` / `↓`.
    Vote,
    /// `thoughts` / `none`.
    ThoughtProvoking,
    /// `thought-provoking` / `not`, kept for notes written before the rename.
    OldThoughtProvoking,
    /// `cool` / `meh` / `boring`.
    Rating,
    /// `1x` / `2x` / `3x`, each button labelled with the interval it schedules.
    Boomerang,
}

impl FeedbackHandler {
    pub const ALL: [FeedbackHandler; 5] = [
        Self::Vote,
        Self::ThoughtProvoking,
        Self::OldThoughtProvoking,
        Self::Rating,
        Self::Boomerang,
    ];

    pub fn from_name(name: &str) -> OrbitResult<Self> {
        Self::ALL
            .into_iter()
            .find(|handler| handler.name() == name.trim())
            .ok_or_else(|| OrbitError::UnknownHandlerName {
                kind: HandlerKind::Feedback,
                name: name.to_string(),
            })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Vote => "Vote",
            Self::ThoughtProvoking => "ThoughtProvoking",
            Self::OldThoughtProvoking => "OldThoughtProvoking",
            Self::Rating => "Rating",
            Self::Boomerang => "Boomerang",
        }
    }

    pub fn responses(self) -> &'static [&'static str] {
        match self {
            Self::Vote => &["↑", "↓"],
            Self::ThoughtProvoking => &["thoughts", "none"],
            Self::OldThoughtProvoking => &["thought-provoking", "not"],
            Self::Rating => &["cool", "meh", "boring"],
            Self::Boomerang => &["1x", "2x", "3x"],
        }
    }

    pub fn response_name(self, response: usize) -> OrbitResult<&'static str> {
        let responses = self.responses();
        responses
            .get(response)
            .copied()
            .ok_or(OrbitError::InvalidResponse {
                response,
                available: responses.len(),
            })
    }

    /// Strategy that goes with this handler when it is newly chosen.
    pub fn paired_schedule(self) -> Option<ScheduleKind> {
        match self {
            Self::Boomerang => Some(ScheduleKind::Multiplier),
            _ => None,
        }
    }

    /// Tag stamped next to the marker, if any.
    pub fn name_tag(self) -> Option<&'static str> {
        match self {
            Self::Boomerang => Some(BOOMERANG_TAG),
            _ => None,
        }
    }

    fn labels_intervals(self) -> bool {
        matches!(self, Self::Boomerang)
    }

    /// Response whose counter takes over a `total_count` recorded without
    /// per-response counters.
    fn unattributed_response(self) -> Option<usize> {
        match self {
            Self::Boomerang => Some(1),
            _ => None,
        }
    }

    /// Per-response counters followed by `total_count`.
    pub fn counter_keys(self) -> Vec<String> {
        self.response_counter_keys()
            .chain(std::iter::once(TOTAL_COUNT_KEY.to_string()))
            .collect()
    }

    fn response_counter_keys(self) -> impl Iterator<Item = String> {
        self.responses()
            .iter()
            .map(|response| counter_key(response))
    }

    /// Every field this handler owns, in canonical order.
    pub fn keys(self) -> Vec<String> {
        std::iter::once(FEEDBACK_KEY.to_string())
            .chain(self.counter_keys())
            .collect()
    }

    /// Response buttons as they should read for the note in `list`.
    pub fn buttons(self, list: &ComponentList) -> Vec<Button> {
        let interval = list.value(INTERVAL_KEY).and_then(KvValue::as_int);
        self.responses()
            .iter()
            .enumerate()
            .map(|(index, response)| match interval {
                Some(interval) if self.labels_intervals() => Button::new(format!(
                    "{response} ({})",
                    interval_label(multiplied_interval(interval, index))
                )),
                _ => Button::new(*response),
            })
            .collect()
    }

    /// Index of the response `button` stands for, labelled or not.
    pub fn response_of(self, button: &Button) -> Option<usize> {
        if button.hidden.is_some() {
            return None;
        }
        self.responses().iter().position(|response| {
            button.name == *response
                || (self.labels_intervals()
                    && button
                        .name
                        .strip_prefix(response)
                        .and_then(|rest| rest.strip_prefix(" ("))
                        .and_then(|rest| rest.strip_suffix(')'))
                        .is_some_and(|label| INTERVAL_LABEL_RE.is_match(label)))
        })
    }

    pub fn is_response_button(self, component: &Component) -> bool {
        component
            .as_button()
            .is_some_and(|button| self.response_of(button).is_some())
    }

    fn is_name_tag(self, component: &Component) -> bool {
        let Some(name) = self.name_tag() else {
            return false;
        };
        component.as_tag().is_some_and(|tag| tag.title_text() == name)
    }

    /// Ensures the name field, counters, buttons and name tag exist.
    pub fn update_metadata(self, list: &mut ComponentList) {
        list.set_kv(FEEDBACK_KEY, self.name());
        self.attribute_total(list);
        for key in self.counter_keys() {
            list.set_default_kv(&key, 0_i64);
        }
        self.insert_buttons(list, None);
        self.refresh_buttons(list);
        if let Some(tag) = self.name_tag() {
            if !list.iter().any(|item| self.is_name_tag(item)) {
                list.add(Component::from(Tag::new(tag)));
            }
        }
    }

    fn attribute_total(self, list: &mut ComponentList) {
        let Some(response) = self.unattributed_response() else {
            return;
        };
        if self.response_counter_keys().any(|key| list.has_key(&key)) {
            return;
        }
        let total = list.value(TOTAL_COUNT_KEY).and_then(KvValue::as_int);
        if let (Some(total), Some(name)) = (total, self.responses().get(response)) {
            list.set_kv(&counter_key(name), total);
        }
    }

    /// Counts `response` and the total.
    ///
    /// # Errors
    /// - `InvalidResponse` when `response` is out of range; nothing is written.
    /// - `MissingField` / `InvalidField` when a counter is unusable.
    pub fn add_response(self, list: &mut ComponentList, response: usize) -> OrbitResult<()> {
        let key = counter_key(self.response_name(response)?);
        let mut state = SchedulingState::new(list);
        state.counter(&key)?;
        state.counter(TOTAL_COUNT_KEY)?;
        state.increment(&key)?;
        state.increment(TOTAL_COUNT_KEY)?;
        Ok(())
    }

    /// Inserts missing buttons at `at`, or before the first key-value field.
    ///
    /// Each button is followed by a single space. Without an insertion point
    /// and without any key-value field the buttons are appended.
    pub fn insert_buttons(self, list: &mut ComponentList, at: Option<usize>) {
        let present: Vec<usize> = list
            .iter()
            .filter_map(Component::as_button)
            .filter_map(|button| self.response_of(button))
            .collect();
        let missing: Vec<Component> = self
            .buttons(list)
            .into_iter()
            .enumerate()
            .filter(|(index, _)| !present.contains(index))
            .map(|(_, button)| Component::from(button))
            .collect();

        match at.or_else(|| list.first_key_value_index()) {
            Some(mut index) => {
                for button in missing {
                    list.insert(index, button);
                    list.insert(index + 1, Component::text(" "));
                    index += 2;
                }
            }
            None => {
                for button in missing {
                    list.add(button);
                }
            }
        }
    }

    /// Rewrites labelled buttons for the current interval.
    pub fn refresh_buttons(self, list: &mut ComponentList) {
        if !self.labels_intervals() {
            return;
        }
        let labels = self.buttons(list);
        for component in list.iter_mut() {
            if let Component::Button(button) = component {
                let label = self.response_of(button).and_then(|index| labels.get(index));
                if let Some(label) = label {
                    button.name = label.name.clone();
                }
            }
        }
    }

    /// Removes every response button, returning where the first one was.
    pub fn remove_buttons(self, list: &mut ComponentList) -> Option<usize> {
        let first = list.position_where(|item| self.is_response_button(item));
        list.retain(|item| !self.is_response_button(item));
        first
    }

    /// Removes buttons, the name field, every counter and the name tag.
    pub fn remove_metadata(self, list: &mut ComponentList) -> Option<usize> {
        let index = self.remove_buttons(list);
        for key in self.keys() {
            list.remove_kv(&key);
        }
        list.retain(|item| !self.is_name_tag(item));
        index
    }

    /// Counters `self` takes over from `previous`, as `(key, count)` pairs.
    ///
    /// Only boomerang notes keep history across a swap: the previous handler's
    /// counters map onto `1x`, `2x`, ... by position, and the total carries.
    pub fn carried_counts(
        self,
        previous: FeedbackHandler,
        list: &ComponentList,
    ) -> Vec<(String, i64)> {
        if self != Self::Boomerang || previous == self {
            return Vec::new();
        }
        self.response_counter_keys()
            .zip(previous.response_counter_keys())
            .chain(std::iter::once((
                TOTAL_COUNT_KEY.to_string(),
                TOTAL_COUNT_KEY.to_string(),
            )))
            .filter_map(|(key, old_key)| {
                let count = list.value(&old_key).and_then(KvValue::as_int)?;
                Some((key, count))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::FeedbackHandler;
    use crate::markup::ComponentList;
    use crate::orbit::error::OrbitError;

    #[test]
    fn buttons_go_before_first_key_value() {
        let mut list = ComponentList::parse("note #[[feed: ToReview]]").unwrap();
        FeedbackHandler::Vote.insert_buttons(&mut list, None);
        assert_eq!(list.to_markup(), "note {{↑}} {{↓}} #[[feed: ToReview]]");
    }

    #[test]
    fn buttons_are_appended_without_key_values() {
        let mut list = ComponentList::parse("note").unwrap();
        FeedbackHandler::ThoughtProvoking.insert_buttons(&mut list, None);
        assert_eq!(list.to_markup(), "note {{thoughts}} {{none}}");
    }

    #[test]
    fn response_name_rejects_out_of_range() {
        assert_eq!(FeedbackHandler::Rating.response_name(2).unwrap(), "boring");
        assert!(matches!(
            FeedbackHandler::Vote.response_name(2),
            Err(OrbitError::InvalidResponse {
                response: 2,
                available: 2
            })
        ));
    }

    #[test]
    fn remove_buttons_reports_first_index() {
        let mut list = ComponentList::parse("a {{↑}} {{↓}} b").unwrap();
        assert_eq!(FeedbackHandler::Vote.remove_buttons(&mut list), Some(1));
        assert_eq!(list.to_markup(), "a   b");
        assert_eq!(FeedbackHandler::Vote.remove_buttons(&mut list), None);
    }
}
