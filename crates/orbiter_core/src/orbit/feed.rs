//! Feeds bind a note category to its default strategy and feedback handler.

use crate::markup::ComponentList;
use crate::orbit::config::{FeedDefaults, OrbitConfig};
use crate::orbit::error::{HandlerKind, OrbitError, OrbitResult};
use crate::orbit::feedback::FeedbackHandler;
use crate::orbit::schedule::ScheduleKind;

pub const FEED_KEY: &str = "feed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedHandler {
    ToReview,
    ToThink,
}

impl FeedHandler {
    pub const ALL: [FeedHandler; 2] = [Self::ToReview, Self::ToThink];

    pub fn from_name(name: &str) -> OrbitResult<Self> {
        Self::ALL
            .into_iter()
            .find(|feed| feed.name() == name.trim())
            .ok_or_else(|| OrbitError::UnknownHandlerName {
                kind: HandlerKind::Feed,
                name: name.to_string(),
            })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::ToReview => "ToReview",
            Self::ToThink => "ToThink",
        }
    }

    pub fn keys(self) -> &'static [&'static str] {
        &[FEED_KEY]
    }

    /// Stamps the `feed` field when the note has none.
    pub fn update_metadata(self, list: &mut ComponentList) {
        list.set_default_kv(FEED_KEY, self.name());
    }

    pub fn remove_metadata(self, list: &mut ComponentList) {
        list.remove_kv(FEED_KEY);
    }

    pub fn default_schedule_kind(self) -> ScheduleKind {
        match self {
            Self::ToReview => ScheduleKind::ExpDefault,
            Self::ToThink => ScheduleKind::ExpReset,
        }
    }

    pub fn default_feedback(self) -> FeedbackHandler {
        match self {
            Self::ToReview => FeedbackHandler::Vote,
            Self::ToThink => FeedbackHandler::ThoughtProvoking,
        }
    }

    /// Strategy defaults configured for this feed.
    pub fn defaults(self, config: &OrbitConfig) -> &FeedDefaults {
        match self {
            Self::ToReview => &config.to_review,
            Self::ToThink => &config.to_think,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FeedHandler;
    use crate::markup::ComponentList;
    use crate::orbit::error::{HandlerKind, OrbitError};

    #[test]
    fn update_metadata_keeps_existing_feed() {
        let mut list = ComponentList::parse("x #[[feed: ToThink]]").unwrap();
        FeedHandler::ToReview.update_metadata(&mut list);
        assert_eq!(list.to_markup(), "x #[[feed: ToThink]]");
    }

    #[test]
    fn unknown_feed_name_is_reported() {
        let err = FeedHandler::from_name("ToSkim").unwrap_err();
        assert!(matches!(
            err,
            OrbitError::UnknownHandlerName {
                kind: HandlerKind::Feed,
                ..
            }
        ));
    }
}
