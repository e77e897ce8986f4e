//! Typed scheduling preferences derived from a habit's raw fields.
//!
//! Habits keep their times exactly as the user entered them ("HH:mm").
//! The suggester only ever sees the parsed view built here.

use std::collections::BTreeSet;

use chrono::{NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};

use super::Habit;
use crate::error::ValidationError;

/// Parse a wall-clock time of day in `H:mm` or `HH:mm` form.
pub fn parse_time_of_day(input: &str) -> Result<NaiveTime, ValidationError> {
    let invalid = || ValidationError::InvalidTimeOfDay(input.to_string());

    let (hour, minute) = input.trim().split_once(':').ok_or_else(invalid)?;
    if hour.is_empty() || hour.len() > 2 || minute.len() != 2 {
        return Err(invalid());
    }
    if !hour.chars().chain(minute.chars()).all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let hour: u32 = hour.parse().map_err(|_| invalid())?;
    let minute: u32 = minute.parse().map_err(|_| invalid())?;

    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(invalid)
}

/// Index of a weekday with Sunday as 0 and Saturday as 6.
pub fn weekday_index(weekday: Weekday) -> u8 {
    weekday.num_days_from_sunday() as u8
}

/// Minutes elapsed since midnight for a time of day.
pub fn minutes_since_midnight(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// A same-day interval of wall-clock time a habit prefers to happen in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    start: NaiveTime,
    end: NaiveTime,
}

impl TimeWindow {
    /// Create a window; overnight windows (start after end) are rejected.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::ReversedWindow {
                start: start.format("%H:%M").to_string(),
                end: end.format("%H:%M").to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Parse a window from two `HH:mm` strings.
    pub fn parse(start: &str, end: &str) -> Result<Self, ValidationError> {
        Self::new(parse_time_of_day(start)?, parse_time_of_day(end)?)
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    /// Whether a time of day falls inside the window, both ends inclusive.
    /// Compared at minute resolution.
    pub fn contains(&self, time: NaiveTime) -> bool {
        let minutes = minutes_since_midnight(time);
        minutes_since_midnight(self.start) <= minutes && minutes <= minutes_since_midnight(self.end)
    }
}

/// The subset of a habit the slot suggester scores against.
///
/// Every field is optional; an absent preference contributes nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HabitPreferences {
    pub preferred_time: Option<NaiveTime>,
    pub days_of_week: Option<BTreeSet<u8>>,
    pub time_window: Option<TimeWindow>,
}

impl HabitPreferences {
    /// Build preferences from a stored habit.
    ///
    /// Malformed values drop the affected preference instead of failing,
    /// so scoring stays total even for data that bypassed validation.
    pub fn from_habit(habit: &Habit) -> Self {
        let preferred_time = habit.preferred_time.as_deref().and_then(|raw| {
            parse_time_of_day(raw)
                .map_err(|e| {
                    tracing::warn!(habit = %habit.id, error = %e, "ignoring preferred time");
                })
                .ok()
        });

        let time_window = habit.time_window.as_ref().and_then(|w| {
            TimeWindow::parse(&w.start, &w.end)
                .map_err(|e| {
                    tracing::warn!(habit = %habit.id, error = %e, "ignoring time window");
                })
                .ok()
        });

        let days_of_week = habit.days_of_week.as_ref().map(|days| {
            days.iter()
                .copied()
                .filter(|d| {
                    let valid = *d <= 6;
                    if !valid {
                        tracing::warn!(habit = %habit.id, day = d, "ignoring weekday index");
                    }
                    valid
                })
                .collect::<BTreeSet<u8>>()
        });

        Self {
            preferred_time,
            days_of_week,
            time_window,
        }
    }

    /// Builder: prefer a time of day.
    pub fn with_preferred_time(mut self, time: NaiveTime) -> Self {
        self.preferred_time = Some(time);
        self
    }

    /// Builder: prefer a set of weekdays (0 = Sunday).
    pub fn with_days(mut self, days: impl IntoIterator<Item = u8>) -> Self {
        self.days_of_week = Some(days.into_iter().collect());
        self
    }

    /// Builder: prefer a daily window.
    pub fn with_window(mut self, window: TimeWindow) -> Self {
        self.time_window = Some(window);
        self
    }

    /// True when no preference is set at all.
    pub fn is_empty(&self) -> bool {
        self.preferred_time.is_none() && self.days_of_week.is_none() && self.time_window.is_none()
    }

    /// Whether the habit asks to run on `weekday`.
    ///
    /// `None` when the habit has no day preference.
    pub fn is_scheduled_on(&self, weekday: Weekday) -> Option<bool> {
        self.days_of_week
            .as_ref()
            .map(|days| days.contains(&weekday_index(weekday)))
    }
}
