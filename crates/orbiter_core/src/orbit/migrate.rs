//! Legacy metadata migration registry.
//!
//! # Responsibility
//! - Rewrite historical metadata shapes into the current field layout.
//! - Run every migration in a fixed order before handlers are bound.
//!
//! # Invariants
//! - Each migration is a pure `ComponentList -> ComponentList` step and is a
//!   no-op on notes already in the current layout.
//! - Order matters: spelling fixes run before the migrations that read keys,
//!   and `review_history` runs before counters are inspected.

use crate::markup::{Button, Component, ComponentList, KeyValue, KvValue, Tag};
use crate::orbit::error::{OrbitError, OrbitResult};
use crate::orbit::feed::{FeedHandler, FEED_KEY};
use crate::orbit::feedback::{
    counter_key, FeedbackHandler, BOOMERANG_TAG, FEEDBACK_KEY, TOTAL_COUNT_KEY,
};
use crate::orbit::schedule::{
    ScheduleKind, DUE_KEY, FACTOR_KEY, FACTOR_LONG_KEY, FACTOR_SHORT_KEY, INTERVAL_KEY,
    SCHEDULE_KEY,
};
use chrono::NaiveDate;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

const LEGACY_TYPE_KEY: &str = "type";
const SOMEDAY_MAYBE_TAG: &str = "SomedayMaybe";
const REVIEW_HISTORY_BUTTON: &str = "Review History";
const NEXT_REVIEW_FORMAT: &str = "[[due: %Y-%m-%d]]";
const THOUGHT_PROVOKING_RENAMES: &[(&str, &str)] =
    &[("thought-provoking", "thoughts"), ("not", "none")];

static DEPRECATED_COUNTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^count\d+$").expect("valid deprecated counter regex"));

#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub name: &'static str,
    pub apply: fn(ComponentList) -> OrbitResult<ComponentList>,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        name: "nested_key_values",
        apply: nested_key_values,
    },
    Migration {
        name: "legacy_type_key",
        apply: legacy_type_key,
    },
    Migration {
        name: "someday_maybe",
        apply: someday_maybe,
    },
    Migration {
        name: "boomerang_tag",
        apply: boomerang_tag,
    },
    Migration {
        name: "review_history",
        apply: review_history,
    },
    Migration {
        name: "deprecated_counters",
        apply: deprecated_counters,
    },
    Migration {
        name: "thought_provoking_names",
        apply: thought_provoking_names,
    },
    Migration {
        name: "relocate_factor",
        apply: relocate_factor,
    },
];

/// Runs every migration in registry order.
pub fn apply_migrations(mut list: ComponentList) -> OrbitResult<ComponentList> {
    for migration in MIGRATIONS {
        let before = list.clone();
        list = (migration.apply)(list)?;
        if list != before {
            debug!(
                "event=migration_applied module=orbit status=ok migration={}",
                migration.name
            );
        }
    }
    Ok(list)
}

/// `#[[[[key]]:value]]` and `#[[[[key]]:[[value]]]]` become key-value fields.
pub fn nested_key_values(list: ComponentList) -> OrbitResult<ComponentList> {
    Ok(list
        .into_iter()
        .map(
            |component| match component.as_tag().and_then(nested_key_value) {
                Some(kv) => Component::KeyValue(kv),
                None => component,
            },
        )
        .collect())
}

fn nested_key_value(tag: &Tag) -> Option<KeyValue> {
    let inner = tag.page_ref()?;
    match inner.title.as_slice() {
        [Component::PageRef(key), Component::Text(rest)] => {
            let value = rest.strip_prefix(':')?.trim_start();
            (!value.is_empty()).then(|| KeyValue::new(key.title_text(), KvValue::infer(value)))
        }
        [Component::PageRef(key), Component::Text(separator), Component::PageRef(value)]
            if separator.trim_end() == ":" =>
        {
            Some(KeyValue::new(
                key.title_text(),
                KvValue::infer(&value.title_text()),
            ))
        }
        _ => None,
    }
}

/// `type: to-review|to-think` becomes the `feed` field.
pub fn legacy_type_key(mut list: ComponentList) -> OrbitResult<ComponentList> {
    let feed = match list.value(LEGACY_TYPE_KEY).and_then(KvValue::as_text) {
        Some("to-review") => Some(FeedHandler::ToReview),
        Some("to-think") => Some(FeedHandler::ToThink),
        _ => None,
    };
    let Some(feed) = feed else {
        return Ok(list);
    };

    if list.has_key(FEED_KEY) {
        list.remove_kv(LEGACY_TYPE_KEY);
    } else if let Some(kv) = list.key_value_mut(LEGACY_TYPE_KEY) {
        kv.rename(FEED_KEY);
        kv.set_value(feed.name());
    }
    Ok(list)
}

/// The `#SomedayMaybe` tag becomes `feed: ToReview`.
pub fn someday_maybe(list: ComponentList) -> OrbitResult<ComponentList> {
    let mut has_feed = list.has_key(FEED_KEY);
    Ok(list
        .into_iter()
        .filter_map(|component| {
            if !is_someday_maybe(&component) {
                return Some(component);
            }
            if has_feed {
                return None;
            }
            has_feed = true;
            Some(Component::KeyValue(KeyValue::new(
                FEED_KEY,
                FeedHandler::ToReview.name(),
            )))
        })
        .collect())
}

fn is_someday_maybe(component: &Component) -> bool {
    component
        .as_tag()
        .is_some_and(|tag| tag.title_text() == SOMEDAY_MAYBE_TAG)
}

/// A `#Boomerang` note without a `feedback` field gets the boomerang handler,
/// and the multiplier strategy unless it already names one.
pub fn boomerang_tag(mut list: ComponentList) -> OrbitResult<ComponentList> {
    let tagged = list
        .iter()
        .filter_map(Component::as_tag)
        .any(|tag| tag.title_text() == BOOMERANG_TAG);
    if !tagged || list.has_key(FEEDBACK_KEY) {
        return Ok(list);
    }
    list.set_kv(FEEDBACK_KEY, FeedbackHandler::Boomerang.name());
    if !list.has_key(SCHEDULE_KEY) {
        list.set_kv(SCHEDULE_KEY, ScheduleKind::Multiplier.name());
    }
    Ok(list)
}

/// JSON payload of a `{{Review History: ...}}` button.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReviewHistory {
    #[serde(rename = "Interval")]
    pub interval: Option<i64>,
    #[serde(rename = "Past Reviews", default)]
    pub past_reviews: Vec<String>,
    /// Spelled `[[due: YYYY-MM-DD]]`.
    #[serde(rename = "Next Review")]
    pub next_review: Option<String>,
}

impl ReviewHistory {
    pub fn parse(payload: &str) -> OrbitResult<Self> {
        serde_json::from_str(payload).map_err(|err| OrbitError::LegacyPayload(err.to_string()))
    }

    pub fn next_review_date(&self) -> OrbitResult<Option<NaiveDate>> {
        self.next_review
            .as_deref()
            .map(|raw| {
                NaiveDate::parse_from_str(raw.trim(), NEXT_REVIEW_FORMAT).map_err(|err| {
                    OrbitError::LegacyPayload(format!("next review `{raw}`: {err}"))
                })
            })
            .transpose()
    }
}

/// The review-history button becomes `interval`, `due` and `total_count`.
///
/// Fields already present in the note win over the payload.
pub fn review_history(mut list: ComponentList) -> OrbitResult<ComponentList> {
    let Some(index) = list.position_where(is_review_history) else {
        return Ok(list);
    };
    let payload = list
        .get(index)
        .and_then(Component::as_button)
        .and_then(|button| button.hidden.clone())
        .unwrap_or_default();
    let history = ReviewHistory::parse(&payload)?;
    let due = history.next_review_date()?;

    list.remove(index);
    if let Some(interval) = history.interval {
        list.set_default_kv(INTERVAL_KEY, interval);
    }
    if let Some(due) = due {
        list.set_default_kv(DUE_KEY, due);
    }
    let reviews = i64::try_from(history.past_reviews.len()).unwrap_or(i64::MAX);
    list.set_default_kv(TOTAL_COUNT_KEY, reviews);
    Ok(list)
}

fn is_review_history(component: &Component) -> bool {
    component
        .as_button()
        .is_some_and(|button| button.name == REVIEW_HISTORY_BUTTON)
}

/// Drops `count<N>` counters from the positional counter era.
pub fn deprecated_counters(mut list: ComponentList) -> OrbitResult<ComponentList> {
    list.retain(|component| {
        !component
            .as_key_value()
            .is_some_and(|kv| DEPRECATED_COUNTER_RE.is_match(kv.key()))
    });
    Ok(list)
}

/// `thought-provoking`/`not` become `thoughts`/`none` on thought-provoking notes.
///
/// Applies when the feedback is `ThoughtProvoking`, or when no feedback is
/// recorded yet and the feed is `ToThink`.
pub fn thought_provoking_names(mut list: ComponentList) -> OrbitResult<ComponentList> {
    let applies = match list.value(FEEDBACK_KEY).and_then(KvValue::as_text) {
        Some(name) => name == FeedbackHandler::ThoughtProvoking.name(),
        None => {
            list.value(FEED_KEY).and_then(KvValue::as_text) == Some(FeedHandler::ToThink.name())
        }
    };
    if !applies {
        return Ok(list);
    }

    for (old, new) in THOUGHT_PROVOKING_RENAMES {
        merge_counter(&mut list, &counter_key(old), &counter_key(new))?;
        rename_button(&mut list, old, new);
    }
    Ok(list)
}

fn merge_counter(list: &mut ComponentList, from: &str, to: &str) -> OrbitResult<()> {
    if !list.has_key(from) || list.rename_kv(from, to) {
        return Ok(());
    }
    let Some(old) = list.remove_kv(from) else {
        return Ok(());
    };
    let total = counter_value(from, old.value())?
        + list
            .value(to)
            .map(|value| counter_value(to, value))
            .transpose()?
            .unwrap_or(0);
    list.set_kv(to, total);
    Ok(())
}

fn counter_value(key: &str, value: &KvValue) -> OrbitResult<i64> {
    value
        .as_int()
        .ok_or_else(|| OrbitError::invalid_field(key, "an integer", value))
}

fn rename_button(list: &mut ComponentList, old: &str, new: &str) {
    let old_button = Component::from(Button::new(old));
    if list.contains(&Component::from(Button::new(new))) {
        list.remove_item(&old_button);
        return;
    }
    if let Some(Component::Button(button)) = list
        .position(&old_button)
        .and_then(|index| list.get_mut(index))
    {
        button.name = new.to_string();
    }
}

/// Aligns factor fields with the recorded strategy.
///
/// A lone `factor` under `ExpVarFactor` becomes `factor_long`; under
/// `ExpDefault`/`ExpReset` the split factors collapse into `factor`, preferring
/// `factor_long`.
pub fn relocate_factor(mut list: ComponentList) -> OrbitResult<ComponentList> {
    let kind = list
        .value(SCHEDULE_KEY)
        .and_then(KvValue::as_text)
        .and_then(|name| ScheduleKind::from_name(name).ok());

    match kind {
        Some(ScheduleKind::ExpVarFactor) => {
            if list.has_key(FACTOR_KEY) && !list.rename_kv(FACTOR_KEY, FACTOR_LONG_KEY) {
                list.remove_kv(FACTOR_KEY);
            }
        }
        Some(ScheduleKind::ExpDefault | ScheduleKind::ExpReset) => {
            if !list.rename_kv(FACTOR_LONG_KEY, FACTOR_KEY) {
                list.rename_kv(FACTOR_SHORT_KEY, FACTOR_KEY);
            }
            list.remove_kv(FACTOR_SHORT_KEY);
            list.remove_kv(FACTOR_LONG_KEY);
        }
        Some(ScheduleKind::Periodically | ScheduleKind::Multiplier) | None => {}
    }
    Ok(list)
}
