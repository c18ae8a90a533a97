//! Typed view over the scheduling fields of a note.
//!
//! # Responsibility
//! - Read `interval`, `due`, factors and counters with their expected types.
//! - Write `interval` and `due` as one step.
//!
//! # Invariants
//! - The view owns no storage; every read and write goes to the borrowed list.
//! - `advance` validates both fields before writing either.

use crate::markup::{ComponentList, KvValue};
use crate::orbit::error::{OrbitError, OrbitResult};
use crate::orbit::schedule::{DUE_KEY, INTERVAL_KEY};
use chrono::NaiveDate;

pub struct SchedulingState<'a> {
    list: &'a mut ComponentList,
}

impl<'a> SchedulingState<'a> {
    pub fn new(list: &'a mut ComponentList) -> Self {
        Self { list }
    }

    /// Current interval in days.
    pub fn interval(&self) -> OrbitResult<i64> {
        let value = self.field(INTERVAL_KEY)?;
        value
            .as_int()
            .ok_or_else(|| OrbitError::invalid_field(INTERVAL_KEY, "an integer", value))
    }

    pub fn due(&self) -> OrbitResult<NaiveDate> {
        let value = self.field(DUE_KEY)?;
        value
            .as_date()
            .ok_or_else(|| OrbitError::invalid_field(DUE_KEY, "a date", value))
    }

    /// Growth factor stored under `key`; integers are accepted.
    pub fn factor(&self, key: &str) -> OrbitResult<f64> {
        let value = self.field(key)?;
        value
            .as_f64()
            .filter(|factor| factor.is_finite())
            .ok_or_else(|| OrbitError::invalid_field(key, "a number", value))
    }

    pub fn counter(&self, key: &str) -> OrbitResult<i64> {
        let value = self.field(key)?;
        value
            .as_int()
            .ok_or_else(|| OrbitError::invalid_field(key, "an integer", value))
    }

    /// Adds one to the counter under `key`, returning the new count.
    pub fn increment(&mut self, key: &str) -> OrbitResult<i64> {
        let next = self.counter(key)? + 1;
        self.list.set_kv(key, next);
        Ok(next)
    }

    /// Writes a new interval and due date.
    pub fn advance(&mut self, interval: i64, due: NaiveDate) -> OrbitResult<()> {
        self.interval()?;
        self.field(DUE_KEY)?;
        self.list.set_kv(INTERVAL_KEY, interval);
        self.list.set_kv(DUE_KEY, due);
        Ok(())
    }

    fn field(&self, key: &str) -> OrbitResult<&KvValue> {
        self.list
            .value(key)
            .ok_or_else(|| OrbitError::MissingField(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::SchedulingState;
    use crate::markup::ComponentList;
    use crate::orbit::error::OrbitError;
    use chrono::NaiveDate;

    #[test]
    fn reads_typed_fields() {
        let mut list =
            ComponentList::parse("#[[interval: 4]] #[[due: 2020-06-30]] #[[factor: 3]]").unwrap();
        let state = SchedulingState::new(&mut list);
        assert_eq!(state.interval().unwrap(), 4);
        assert_eq!(
            state.due().unwrap(),
            NaiveDate::from_ymd_opt(2020, 6, 30).unwrap()
        );
        assert_eq!(state.factor("factor").unwrap(), 3.0);
    }

    #[test]
    fn reports_missing_and_mistyped_fields() {
        let mut list = ComponentList::parse("#[[interval: soon]]").unwrap();
        let state = SchedulingState::new(&mut list);
        let err = state.interval().unwrap_err();
        assert!(matches!(
            err,
            OrbitError::InvalidField {
                expected: "an integer",
                ..
            }
        ));
        assert_eq!(
            err.to_string(),
            "metadata field `interval` must be an integer, found string `soon`"
        );
        assert!(matches!(state.due(), Err(OrbitError::MissingField(key)) if key == "due"));
    }

    #[test]
    fn advance_writes_nothing_when_due_is_missing() {
        let mut list = ComponentList::parse("#[[interval: 4]]").unwrap();
        let mut state = SchedulingState::new(&mut list);
        let due = NaiveDate::from_ymd_opt(2020, 7, 10).unwrap();
        assert!(state.advance(12, due).is_err());
        assert_eq!(list.to_markup(), "#[[interval: 4]]");
    }

    #[test]
    fn increment_counts_up() {
        let mut list = ComponentList::parse("#[[↑_count: 2]]").unwrap();
        let mut state = SchedulingState::new(&mut list);
        assert_eq!(state.increment("↑_count").unwrap(), 3);
        assert_eq!(list.to_markup(), "#[[↑_count: 3]]");
    }
}
