//! Scheduling strategies.
//!
//! # Responsibility
//! - Stamp a note with the fields its strategy needs.
//! - Compute the next `interval` and `due` from a response.
//!
//! # Invariants
//! - An interval of zero always advances to one day, before any jitter.
//! - Jitter is a relative offset in `[-MAX_JITTER, MAX_JITTER]`.
//! - `interval` and `due` change together or not at all.
//!
//! # See also
//! - `orbit::state` for the typed field view used here.

use crate::markup::ComponentList;
use crate::orbit::config::FeedDefaults;
use crate::orbit::error::{HandlerKind, OrbitError, OrbitResult};
use crate::orbit::state::SchedulingState;
use chrono::{Days, NaiveDate};
use rand::rngs::{StdRng, ThreadRng};
use rand::{Rng, SeedableRng};

pub const SCHEDULE_KEY: &str = "schedule";
pub const INTERVAL_KEY: &str = "interval";
pub const DUE_KEY: &str = "due";
pub const FACTOR_KEY: &str = "factor";
pub const FACTOR_SHORT_KEY: &str = "factor_short";
pub const FACTOR_LONG_KEY: &str = "factor_long";

/// Number of responses the multiplier strategy accepts.
pub const MULTIPLIER_RESPONSES: usize = 3;

/// Largest relative noise applied to interval growth.
pub const MAX_JITTER: f64 = 0.125;

/// Source of relative noise for interval growth.
pub trait Jitter {
    /// Returns a value in `[-MAX_JITTER, MAX_JITTER]`.
    fn sample(&mut self) -> f64;
}

/// Always zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoJitter;

impl Jitter for NoJitter {
    fn sample(&mut self) -> f64 {
        0.0
    }
}

/// Constant offset, clamped to the allowed range.
#[derive(Debug, Clone, Copy)]
pub struct FixedJitter(pub f64);

impl Jitter for FixedJitter {
    fn sample(&mut self) -> f64 {
        self.0.clamp(-MAX_JITTER, MAX_JITTER)
    }
}

/// Uniform noise drawn from `rng`.
#[derive(Debug, Clone)]
pub struct RandomJitter<R: Rng> {
    rng: R,
}

impl<R: Rng> RandomJitter<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RandomJitter<ThreadRng> {
    pub fn thread() -> Self {
        Self::new(rand::thread_rng())
    }
}

impl RandomJitter<StdRng> {
    /// Reproducible noise for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Jitter for RandomJitter<R> {
    fn sample(&mut self) -> f64 {
        self.rng.gen_range(-MAX_JITTER..=MAX_JITTER)
    }
}

/// Name of a scheduling strategy as stored in the `schedule` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleKind {
    ExpDefault,
    ExpReset,
    ExpVarFactor,
    Periodically,
    Multiplier,
}

impl ScheduleKind {
    pub const ALL: [ScheduleKind; 5] = [
        Self::ExpDefault,
        Self::ExpReset,
        Self::ExpVarFactor,
        Self::Periodically,
        Self::Multiplier,
    ];

    pub fn from_name(name: &str) -> OrbitResult<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == name.trim())
            .ok_or_else(|| OrbitError::UnknownHandlerName {
                kind: HandlerKind::Schedule,
                name: name.to_string(),
            })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::ExpDefault => "ExpDefault",
            Self::ExpReset => "ExpReset",
            Self::ExpVarFactor => "ExpVarFactor",
            Self::Periodically => "Periodically",
            Self::Multiplier => "Multiplier",
        }
    }
}

/// A strategy together with the defaults it stamps on first use.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScheduleHandler {
    /// Multiplies the interval by `factor` on every response.
    ExpDefault { init_interval: i64, factor: f64 },
    /// Like `ExpDefault`, but response 0 keeps the interval.
    ExpReset { init_interval: i64, factor: f64 },
    /// `factor_short` for response 0, `factor_long` for response 1.
    ExpVarFactor {
        init_interval: i64,
        factor_short: f64,
        factor_long: f64,
    },
    /// Moves the due date forward by the interval.
    Periodically { period: i64 },
    /// Response `n` multiplies the interval by `n + 1`, without jitter.
    Multiplier { init_interval: i64 },
}

impl ScheduleHandler {
    pub fn new(kind: ScheduleKind, defaults: &FeedDefaults) -> Self {
        match kind {
            ScheduleKind::ExpDefault => Self::ExpDefault {
                init_interval: defaults.init_interval,
                factor: defaults.factor,
            },
            ScheduleKind::ExpReset => Self::ExpReset {
                init_interval: defaults.init_interval,
                factor: defaults.factor,
            },
            ScheduleKind::ExpVarFactor => Self::ExpVarFactor {
                init_interval: defaults.init_interval,
                factor_short: defaults.factor_short,
                factor_long: defaults.factor_long,
            },
            ScheduleKind::Periodically => Self::Periodically {
                period: defaults.period,
            },
            ScheduleKind::Multiplier => Self::Multiplier {
                init_interval: defaults.init_interval,
            },
        }
    }

    pub fn kind(&self) -> ScheduleKind {
        match self {
            Self::ExpDefault { .. } => ScheduleKind::ExpDefault,
            Self::ExpReset { .. } => ScheduleKind::ExpReset,
            Self::ExpVarFactor { .. } => ScheduleKind::ExpVarFactor,
            Self::Periodically { .. } => ScheduleKind::Periodically,
            Self::Multiplier { .. } => ScheduleKind::Multiplier,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Every field this strategy owns, in canonical order.
    pub fn keys(&self) -> &'static [&'static str] {
        match self {
            Self::ExpDefault { .. } | Self::ExpReset { .. } => {
                &[SCHEDULE_KEY, INTERVAL_KEY, DUE_KEY, FACTOR_KEY]
            }
            Self::ExpVarFactor { .. } => &[
                SCHEDULE_KEY,
                INTERVAL_KEY,
                DUE_KEY,
                FACTOR_SHORT_KEY,
                FACTOR_LONG_KEY,
            ],
            Self::Periodically { .. } | Self::Multiplier { .. } => {
                &[SCHEDULE_KEY, INTERVAL_KEY, DUE_KEY]
            }
        }
    }

    /// Interval written when the note has none yet.
    pub fn init_interval(&self) -> i64 {
        match self {
            Self::ExpDefault { init_interval, .. }
            | Self::ExpReset { init_interval, .. }
            | Self::ExpVarFactor { init_interval, .. }
            | Self::Multiplier { init_interval } => *init_interval,
            Self::Periodically { period } => *period,
        }
    }

    /// Ensures the strategy's fields exist; existing values are kept.
    ///
    /// A missing `due` is set to `today` plus the effective interval.
    pub fn update_metadata(&self, list: &mut ComponentList, today: NaiveDate) -> OrbitResult<()> {
        list.set_kv(SCHEDULE_KEY, self.name());
        let interval = list
            .set_default_kv(INTERVAL_KEY, self.init_interval())
            .as_int()
            .unwrap_or_else(|| self.init_interval());
        if !list.has_key(DUE_KEY) {
            list.set_kv(DUE_KEY, add_days(today, interval)?);
        }

        match self {
            Self::ExpDefault { factor, .. } | Self::ExpReset { factor, .. } => {
                list.set_default_kv(FACTOR_KEY, *factor);
            }
            Self::ExpVarFactor {
                factor_short,
                factor_long,
                ..
            } => {
                list.set_default_kv(FACTOR_SHORT_KEY, *factor_short);
                list.set_default_kv(FACTOR_LONG_KEY, *factor_long);
            }
            Self::Periodically { .. } | Self::Multiplier { .. } => {}
        }
        Ok(())
    }

    /// Removes the strategy name and factors; `interval` and `due` survive.
    pub fn remove_metadata(&self, list: &mut ComponentList) {
        for key in self.keys() {
            if *key != INTERVAL_KEY && *key != DUE_KEY {
                list.remove_kv(key);
            }
        }
    }

    /// Advances `interval` and `due` for `response`.
    ///
    /// # Errors
    /// - `InvalidResponse` when the strategy does not accept `response`.
    /// - `MissingField` / `InvalidField` when a field it reads is unusable.
    pub fn schedule(
        &self,
        list: &mut ComponentList,
        response: usize,
        today: NaiveDate,
        jitter: &mut dyn Jitter,
    ) -> OrbitResult<()> {
        let mut state = SchedulingState::new(list);
        let interval = state.interval()?;

        let (next, due) = match self {
            Self::ExpDefault { .. } => {
                let next = next_interval(interval, state.factor(FACTOR_KEY)?, jitter);
                (next, add_days(today, next)?)
            }
            Self::ExpReset { .. } => {
                let next = if response == 0 {
                    interval.max(1)
                } else {
                    next_interval(interval, state.factor(FACTOR_KEY)?, jitter)
                };
                (next, add_days(today, next)?)
            }
            Self::ExpVarFactor { .. } => {
                let key = match response {
                    0 => FACTOR_SHORT_KEY,
                    1 => FACTOR_LONG_KEY,
                    _ => {
                        return Err(OrbitError::InvalidResponse {
                            response,
                            available: 2,
                        })
                    }
                };
                let next = next_interval(interval, state.factor(key)?, jitter);
                (next, add_days(today, next)?)
            }
            Self::Periodically { .. } => {
                let next = interval.max(1);
                (next, add_days(state.due()?, next)?)
            }
            Self::Multiplier { .. } => {
                if response >= MULTIPLIER_RESPONSES {
                    return Err(OrbitError::InvalidResponse {
                        response,
                        available: MULTIPLIER_RESPONSES,
                    });
                }
                let next = multiplied_interval(interval, response);
                (next, add_days(today, next)?)
            }
        };

        state.advance(next, due)
    }
}

/// Grows `interval` by `factor` with relative noise; zero bootstraps to one.
pub fn next_interval(interval: i64, factor: f64, jitter: &mut dyn Jitter) -> i64 {
    if interval == 0 {
        return 1;
    }
    let grown = interval as f64 * factor;
    let noise = grown * jitter.sample().clamp(-MAX_JITTER, MAX_JITTER);
    ((grown + noise).round() as i64).max(1)
}

/// Interval after `response` under the multiplier strategy.
pub fn multiplied_interval(interval: i64, response: usize) -> i64 {
    if interval == 0 {
        return 1;
    }
    let factor = i64::try_from(response).map_or(i64::MAX, |response| response.saturating_add(1));
    interval.saturating_mul(factor)
}

fn add_days(date: NaiveDate, days: i64) -> OrbitResult<NaiveDate> {
    u64::try_from(days)
        .ok()
        .and_then(|days| date.checked_add_days(Days::new(days)))
        .ok_or_else(|| OrbitError::InvalidField {
            key: INTERVAL_KEY.to_string(),
            expected: "a representable day count",
            found: format!("`{days}` days"),
        })
}

#[cfg(test)]
mod tests {
    use super::{
        multiplied_interval, next_interval, FixedJitter, Jitter, NoJitter, RandomJitter,
        MAX_JITTER,
    };

    #[test]
    fn zero_interval_bootstraps_to_one_day() {
        assert_eq!(next_interval(0, 3.0, &mut FixedJitter(MAX_JITTER)), 1);
    }

    #[test]
    fn growth_rounds_after_jitter() {
        assert_eq!(next_interval(4, 3.0, &mut NoJitter), 12);
        assert_eq!(next_interval(4, 3.0, &mut FixedJitter(0.125)), 14);
        assert_eq!(next_interval(4, 3.0, &mut FixedJitter(-0.125)), 11);
    }

    #[test]
    fn multiplier_scales_by_response_number() {
        assert_eq!(multiplied_interval(4, 0), 4);
        assert_eq!(multiplied_interval(4, 2), 12);
        assert_eq!(multiplied_interval(0, 2), 1);
        assert_eq!(multiplied_interval(i64::MAX, 1), i64::MAX);
    }

    #[test]
    fn fixed_jitter_is_clamped() {
        assert_eq!(FixedJitter(1.0).sample(), MAX_JITTER);
        assert_eq!(FixedJitter(-1.0).sample(), -MAX_JITTER);
    }

    #[test]
    fn seeded_jitter_stays_in_range() {
        let mut jitter = RandomJitter::seeded(7);
        for _ in 0..100 {
            let sample = jitter.sample();
            assert!((-MAX_JITTER..=MAX_JITTER).contains(&sample));
        }
    }
}
