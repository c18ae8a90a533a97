//! Spaced-repetition metadata stored inline in a note.
//!
//! # Responsibility
//! - Read and write scheduling fields through the markup model.
//! - Bind feeds, strategies and feedback handlers to a note.
//! - Rewrite legacy metadata before anything else reads it.
//!
//! # Invariants
//! - All state lives in the note text; nothing is persisted elsewhere.
//! - Failed updates leave the note unmodified.

pub mod action;
pub mod config;
pub mod error;
pub mod feed;
pub mod feedback;
pub mod manager;
pub mod migrate;
pub mod schedule;
pub mod state;

pub use action::{Action, Orbiter};
pub use config::{ConfigError, FeedDefaults, OrbitConfig};
pub use error::{HandlerKind, OrbitError, OrbitResult};
pub use feed::FeedHandler;
pub use feedback::FeedbackHandler;
pub use manager::{HandlerOverrides, MigratedNote, OrbiterManager, MARKER_TAG};
pub use migrate::{apply_migrations, Migration, ReviewHistory, MIGRATIONS};
pub use schedule::{
    FixedJitter, Jitter, NoJitter, RandomJitter, ScheduleHandler, ScheduleKind, MAX_JITTER,
};
pub use state::SchedulingState;
