//! Rolling daily emission window.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use carbonledger_core::{DomainError, DomainResult, ValueObject};

/// Length of the daily accumulation window.
pub const DAILY_WINDOW_SECS: i64 = 86_400;

pub fn daily_window() -> Duration {
    Duration::seconds(DAILY_WINDOW_SECS)
}

/// Accumulated CO2 for the window that started at `window_start`.
///
/// `accumulated_co2` is always the sum of `co2_emitted` over the trips
/// recorded since `window_start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyEmissionState {
    accumulated_co2: u64,
    window_start: DateTime<Utc>,
}

impl ValueObject for DailyEmissionState {}

impl DailyEmissionState {
    /// Open a fresh window at `at` holding a single trip's emissions.
    pub fn open(co2: u64, at: DateTime<Utc>) -> Self {
        Self {
            accumulated_co2: co2,
            window_start: at,
        }
    }

    pub fn accumulated_co2(&self) -> u64 {
        self.accumulated_co2
    }

    pub fn window_start(&self) -> DateTime<Utc> {
        self.window_start
    }

    /// End of the window, or `None` when it lies past the last representable instant.
    pub fn window_end(&self) -> Option<DateTime<Utc>> {
        self.window_start.checked_add_signed(daily_window())
    }

    /// Whether a trip at `now` falls outside this window.
    ///
    /// A window whose end is unrepresentable never expires.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.window_end().is_some_and(|end| now >= end)
    }

    /// State after recording `co2` grams at `now`.
    ///
    /// Returns the new state and whether the window was reset. A trip at or past
    /// `window_start + 24h` discards the old total and opens a window at `now`;
    /// anything earlier (including a clock that went backwards) accumulates.
    pub fn advance(
        current: Option<&DailyEmissionState>,
        co2: u64,
        now: DateTime<Utc>,
    ) -> DomainResult<(DailyEmissionState, bool)> {
        match current {
            None => Ok((Self::open(co2, now), false)),
            Some(state) if state.is_expired_at(now) => Ok((Self::open(co2, now), true)),
            Some(state) => {
                let accumulated_co2 = state.accumulated_co2.checked_add(co2).ok_or_else(|| {
                    DomainError::invalid_input("daily CO2 total would overflow")
                })?;
                Ok((
                    Self {
                        accumulated_co2,
                        window_start: state.window_start,
                    },
                    false,
                ))
            }
        }
    }
}
