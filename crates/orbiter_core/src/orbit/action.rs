//! Action selectors and the one-shot note runner.
//!
//! # Responsibility
//! - Parse `init [feed]`, `update`/`add-response <index>`, `change-schedule`,
//!   `change-feed` and `change-feedback-type` selectors.
//! - Run one action over one note and return canonical text.

use crate::orbit::config::OrbitConfig;
use crate::orbit::error::{OrbitError, OrbitResult};
use crate::orbit::feed::FeedHandler;
use crate::orbit::feedback::FeedbackHandler;
use crate::orbit::manager::{HandlerOverrides, MigratedNote};
use crate::orbit::schedule::{Jitter, RandomJitter, ScheduleKind};
use chrono::NaiveDate;
use log::info;
use rand::rngs::ThreadRng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Stamp metadata, optionally choosing the feed.
    Init { feed: Option<FeedHandler> },
    /// Count a response and advance the schedule.
    AddResponse(usize),
    ChangeSchedule(ScheduleKind),
    ChangeFeed(FeedHandler),
    ChangeFeedbackType(FeedbackHandler),
}

impl Action {
    pub fn parse(selector: &str, arg: Option<&str>) -> OrbitResult<Self> {
        let arg = arg.map(str::trim).filter(|arg| !arg.is_empty());
        match selector.trim() {
            "init" => Ok(Self::Init {
                feed: arg.map(FeedHandler::from_name).transpose()?,
            }),
            "update" | "add-response" => {
                let raw = required(arg, "add-response")?;
                let response = raw.parse::<usize>().map_err(|_| OrbitError::InvalidArgument {
                    action: "add-response",
                    message: format!("`{raw}` is not a response index"),
                })?;
                Ok(Self::AddResponse(response))
            }
            "change-schedule" => Ok(Self::ChangeSchedule(ScheduleKind::from_name(
                required(arg, "change-schedule")?,
            )?)),
            "change-feed" => Ok(Self::ChangeFeed(FeedHandler::from_name(required(
                arg,
                "change-feed",
            )?)?)),
            "change-feedback-type" => Ok(Self::ChangeFeedbackType(FeedbackHandler::from_name(
                required(arg, "change-feedback-type")?,
            )?)),
            other => Err(OrbitError::UnknownAction(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::AddResponse(_) => "add-response",
            Self::ChangeSchedule(_) => "change-schedule",
            Self::ChangeFeed(_) => "change-feed",
            Self::ChangeFeedbackType(_) => "change-feedback-type",
        }
    }

    pub fn overrides(&self) -> HandlerOverrides {
        let mut overrides = HandlerOverrides::default();
        match *self {
            Self::Init { feed } => overrides.feed = feed,
            Self::AddResponse(_) => {}
            Self::ChangeSchedule(kind) => overrides.schedule = Some(kind),
            Self::ChangeFeed(feed) => overrides.feed = Some(feed),
            Self::ChangeFeedbackType(feedback) => overrides.feedback = Some(feedback),
        }
        overrides
    }
}

fn required<'a>(arg: Option<&'a str>, action: &'static str) -> OrbitResult<&'a str> {
    arg.ok_or_else(|| OrbitError::InvalidArgument {
        action,
        message: "argument is required".to_string(),
    })
}

/// Runs actions against notes with a fixed configuration and date.
pub struct Orbiter<J: Jitter> {
    config: OrbitConfig,
    today: NaiveDate,
    jitter: J,
}

impl Orbiter<RandomJitter<ThreadRng>> {
    pub fn with_thread_rng(config: OrbitConfig, today: NaiveDate) -> Self {
        Self::new(config, today, RandomJitter::thread())
    }
}

impl<J: Jitter> Orbiter<J> {
    pub fn new(config: OrbitConfig, today: NaiveDate, jitter: J) -> Self {
        Self {
            config,
            today,
            jitter,
        }
    }

    /// Applies `action` to `text` and returns the canonical result.
    pub fn run(&mut self, text: &str, action: &Action) -> OrbitResult<String> {
        let note = MigratedNote::parse(text)?;
        let mut manager = note.bind(&action.overrides(), self.today, &self.config)?;
        if let Action::AddResponse(response) = action {
            manager.apply_response(*response, &mut self.jitter)?;
        }

        info!(
            "event=action_applied module=orbit status=ok action={} feed={} schedule={} feedback={}",
            action.name(),
            manager.feed().name(),
            manager.schedule().name(),
            manager.feedback().name()
        );
        Ok(manager.into_text())
    }
}
