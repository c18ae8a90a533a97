//! Inline markup round-tripping and spaced-repetition metadata for notes.
//! The note text is the only store; this crate reads and rewrites it.

pub mod logging;
pub mod markup;
pub mod orbit;

pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use markup::{
    tokenize, Button, Component, ComponentKind, ComponentList, KeyValue, KvValue, MarkupError,
    MarkupResult, PageRef, Tag, ValueDecodeError,
};
pub use orbit::{
    Action, FeedHandler, FeedbackHandler, HandlerOverrides, MigratedNote, OrbitConfig, OrbitError,
    OrbitResult, Orbiter, OrbiterManager, ScheduleHandler, ScheduleKind,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
