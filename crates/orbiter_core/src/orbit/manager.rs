//! Note lifecycle: parse, migrate, bind handlers, respond, serialize.
//!
//! # Responsibility
//! - Resolve the feed, strategy and feedback handler of a note.
//! - Apply one response on a working copy and commit it only on success.
//! - Emit canonical text with every metadata fragment at the tail.
//!
//! # Invariants
//! - Handler resolution is override, then the name stored in the note, then
//!   the feed default. Unknown stored names are errors, never defaulted.
//! - Swapping a strategy keeps `interval` and `due`.
//! - A newly chosen feedback handler with a paired strategy brings that
//!   strategy along unless one is requested explicitly.
//! - Canonical text is stable: serializing a parsed canonical note again
//!   yields the same text.
//!
//! # See also
//! - `orbit::migrate` for the legacy shapes rewritten before binding.

use crate::markup::{tokenize, Component, ComponentList, KvValue, Tag};
use crate::orbit::config::OrbitConfig;
use crate::orbit::error::{OrbitError, OrbitResult};
use crate::orbit::feed::{FeedHandler, FEED_KEY};
use crate::orbit::feedback::{FeedbackHandler, FEEDBACK_KEY};
use crate::orbit::migrate::apply_migrations;
use crate::orbit::schedule::{Jitter, ScheduleHandler, ScheduleKind, SCHEDULE_KEY};
use chrono::NaiveDate;
use log::debug;

/// Title of the tag appended to every managed note.
pub const MARKER_TAG: &str = "Roam Orbiter";

/// Handler choices that win over what the note records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandlerOverrides {
    pub feed: Option<FeedHandler>,
    pub schedule: Option<ScheduleKind>,
    pub feedback: Option<FeedbackHandler>,
}

/// A tokenized note whose legacy metadata has been rewritten.
#[derive(Debug, Clone, PartialEq)]
pub struct MigratedNote {
    list: ComponentList,
}

impl MigratedNote {
    pub fn parse(text: &str) -> OrbitResult<Self> {
        let list = apply_migrations(tokenize(text)?)?;
        Ok(Self { list })
    }

    pub fn components(&self) -> &ComponentList {
        &self.list
    }

    /// Resolves handlers and stamps their metadata.
    ///
    /// # Errors
    /// - `UnknownHandlerName` when the note names a handler that does not exist.
    /// - `InvalidField` when a handler field is not a plain name.
    pub fn bind(
        self,
        overrides: &HandlerOverrides,
        today: NaiveDate,
        config: &OrbitConfig,
    ) -> OrbitResult<OrbiterManager> {
        let mut list = self.list;

        let stored_feed = stored_name(&list, FEED_KEY)?
            .map(FeedHandler::from_name)
            .transpose()?;
        let feed = resolve(overrides.feed, stored_feed, FeedHandler::ToReview);
        if let Some(old) = stored_feed.filter(|old| *old != feed) {
            old.remove_metadata(&mut list);
        }
        let defaults = feed.defaults(config);

        let stored_feedback = stored_name(&list, FEEDBACK_KEY)?
            .map(FeedbackHandler::from_name)
            .transpose()?;
        let feedback = resolve(
            overrides.feedback,
            stored_feedback,
            feed.default_feedback(),
        );

        let stored_schedule = stored_name(&list, SCHEDULE_KEY)?
            .map(ScheduleKind::from_name)
            .transpose()?;
        let schedule_kind = overrides
            .schedule
            .or(overrides.feedback.and_then(FeedbackHandler::paired_schedule))
            .or(stored_schedule)
            .or(feedback.paired_schedule())
            .unwrap_or(feed.default_schedule_kind());
        if let Some(old) = stored_schedule.filter(|old| *old != schedule_kind) {
            ScheduleHandler::new(old, defaults).remove_metadata(&mut list);
        }
        let schedule = ScheduleHandler::new(schedule_kind, defaults);

        if let Some(old) = stored_feedback.filter(|old| *old != feedback) {
            let carried = feedback.carried_counts(old, &list);
            let at = old.remove_metadata(&mut list);
            for (key, count) in carried {
                list.set_kv(&key, count);
            }
            feedback.insert_buttons(&mut list, at);
        }

        feed.update_metadata(&mut list);
        schedule.update_metadata(&mut list, today)?;
        feedback.update_metadata(&mut list);

        debug!(
            "event=handlers_bound module=orbit status=ok feed={} schedule={} feedback={}",
            feed.name(),
            schedule.name(),
            feedback.name()
        );

        Ok(OrbiterManager {
            list,
            feed,
            schedule,
            feedback,
            today,
        })
    }
}

/// A note with bound handlers.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbiterManager {
    list: ComponentList,
    feed: FeedHandler,
    schedule: ScheduleHandler,
    feedback: FeedbackHandler,
    today: NaiveDate,
}

impl OrbiterManager {
    pub fn feed(&self) -> FeedHandler {
        self.feed
    }

    pub fn schedule(&self) -> &ScheduleHandler {
        &self.schedule
    }

    pub fn feedback(&self) -> FeedbackHandler {
        self.feedback
    }

    pub fn components(&self) -> &ComponentList {
        &self.list
    }

    /// Counts `response` and advances the schedule.
    ///
    /// On error the note is left exactly as it was.
    pub fn apply_response(&mut self, response: usize, jitter: &mut dyn Jitter) -> OrbitResult<()> {
        let mut working = self.list.clone();
        self.feedback.add_response(&mut working, response)?;
        self.schedule
            .schedule(&mut working, response, self.today, jitter)?;
        self.feedback.refresh_buttons(&mut working);
        self.list = working;

        debug!(
            "event=response_applied module=orbit status=ok feedback={} response={}",
            self.feedback.name(),
            response
        );
        Ok(())
    }

    /// Every metadata key owned by the bound handlers, in canonical order.
    pub fn metadata_keys(&self) -> Vec<String> {
        self.feed
            .keys()
            .iter()
            .chain(self.schedule.keys())
            .map(|key| key.to_string())
            .chain(self.feedback.keys())
            .collect()
    }

    /// Canonical serialization.
    ///
    /// The note body keeps its order; response buttons, metadata fields and the
    /// marker tag move to the tail in canonical order. Whitespace left at the
    /// seams of moved fragments collapses to a single run and trailing
    /// whitespace of the body is dropped.
    pub fn to_text(&self) -> String {
        let keys = self.metadata_keys();
        let is_metadata = |component: &Component| match component {
            Component::KeyValue(kv) => keys.iter().any(|key| key == kv.key()),
            Component::Tag(tag) => {
                let title = tag.title_text();
                title == MARKER_TAG || Some(title.as_str()) == self.feedback.name_tag()
            }
            other => self.feedback.is_response_button(other),
        };

        let mut body = String::new();
        let mut at_seam = false;
        for component in &self.list {
            if is_metadata(component) {
                at_seam = true;
                continue;
            }
            match component {
                Component::Text(text) => {
                    let joins_whitespace = body.is_empty() || body.ends_with(char::is_whitespace);
                    if at_seam && joins_whitespace {
                        body.push_str(text.trim_start());
                    } else {
                        body.push_str(text);
                    }
                    // Two adjacent text fragments only arise from edits.
                    at_seam = true;
                }
                other => {
                    body.push_str(&other.to_markup());
                    at_seam = false;
                }
            }
        }

        let mut tail: Vec<String> = self
            .feedback
            .buttons(&self.list)
            .iter()
            .map(|button| button.to_markup())
            .collect();
        tail.extend(
            keys.iter()
                .filter_map(|key| self.list.key_value(key))
                .map(|kv| kv.canonical_markup()),
        );
        if let Some(name) = self.feedback.name_tag() {
            tail.push(Tag::new(name).to_markup());
        }
        tail.push(Tag::new(MARKER_TAG).to_markup());

        let body = body.trim_end();
        if body.is_empty() {
            tail.join(" ")
        } else {
            format!("{body} {}", tail.join(" "))
        }
    }

    pub fn into_text(self) -> String {
        self.to_text()
    }
}

fn resolve<T>(overridden: Option<T>, stored: Option<T>, default: T) -> T {
    overridden.or(stored).unwrap_or(default)
}

/// The plain-name value stored under `key`.
fn stored_name<'a>(list: &'a ComponentList, key: &str) -> OrbitResult<Option<&'a str>> {
    match list.value(key) {
        None => Ok(None),
        Some(KvValue::Text(name)) => Ok(Some(name.as_str())),
        Some(other) => Err(OrbitError::invalid_field(key, "a handler name", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::{HandlerOverrides, MigratedNote};
    use crate::orbit::config::OrbitConfig;
    use crate::orbit::schedule::NoJitter;
    use chrono::NaiveDate;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
    }

    #[test]
    fn body_whitespace_collapses_at_removed_fragments() {
        let note = MigratedNote::parse("a {{↑}}  b   ").unwrap();
        let manager = note
            .bind(&HandlerOverrides::default(), today(), &OrbitConfig::default())
            .unwrap();
        assert!(manager.to_text().starts_with("a b {{↑}} {{↓}} #[[feed: ToReview]]"));
    }

    #[test]
    fn failed_response_leaves_note_unchanged() {
        let note = MigratedNote::parse("note").unwrap();
        let mut manager = note
            .bind(&HandlerOverrides::default(), today(), &OrbitConfig::default())
            .unwrap();
        let before = manager.to_text();
        assert!(manager.apply_response(5, &mut NoJitter).is_err());
        assert_eq!(manager.to_text(), before);
    }

    #[test]
    fn text_only_note_serializes_without_leading_space() {
        let note = MigratedNote::parse("{{↑}} {{↓}}").unwrap();
        let manager = note
            .bind(&HandlerOverrides::default(), today(), &OrbitConfig::default())
            .unwrap();
        assert!(manager.to_text().starts_with("{{↑}} {{↓}} #[[feed: ToReview]]"));
    }
}
