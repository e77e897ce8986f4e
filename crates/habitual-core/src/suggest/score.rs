//! Slot scoring against habit preferences and existing events.
//!
//! A slot that overlaps any event is a [`SlotScore::Conflict`]. Otherwise
//! its score is the plain sum of the preference terms that apply:
//! - preferred time proximity, `(24 - |preferred hour - slot hour|) / 24`
//! - day of week match, 1
//! - time window containment, 1
//!
//! Scores are only comparable within a single request.

use chrono::{DateTime, Datelike, FixedOffset, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::CalendarEvent;
use crate::habit::{weekday_index, HabitPreferences};

/// A half-open `[start, end)` interval being considered for a habit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl TimeSlot {
    pub fn new(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> Self {
        Self { start, end }
    }

    pub fn start_utc(&self) -> DateTime<Utc> {
        self.start.with_timezone(&Utc)
    }

    pub fn end_utc(&self) -> DateTime<Utc> {
        self.end.with_timezone(&Utc)
    }

    /// Whether the slot overlaps `event`. Abutting intervals do not.
    pub fn conflicts_with(&self, event: &CalendarEvent) -> bool {
        event.overlaps(self.start_utc(), self.end_utc())
    }
}

/// Outcome of scoring one slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SlotScore {
    Valid(f64),
    /// The slot overlaps an existing event and must not be offered.
    Conflict,
}

impl SlotScore {
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Valid(score) => Some(*score),
            Self::Conflict => None,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict)
    }
}

/// Score `slot` for a habit with `prefs` on a day holding `events`.
pub fn evaluate(slot: &TimeSlot, prefs: &HabitPreferences, events: &[CalendarEvent]) -> SlotScore {
    if events.iter().any(|event| slot.conflicts_with(event)) {
        return SlotScore::Conflict;
    }

    SlotScore::Valid(
        preferred_time_term(slot, prefs) + day_of_week_term(slot, prefs) + time_window_term(slot, prefs),
    )
}

/// Closeness of the slot's start hour to the preferred hour. Minutes are
/// ignored and the hour difference does not wrap around midnight.
fn preferred_time_term(slot: &TimeSlot, prefs: &HabitPreferences) -> f64 {
    match prefs.preferred_time {
        Some(preferred) => {
            let diff = (i64::from(preferred.hour()) - i64::from(slot.start.hour())).abs();
            (24 - diff) as f64 / 24.0
        }
        None => 0.0,
    }
}

fn day_of_week_term(slot: &TimeSlot, prefs: &HabitPreferences) -> f64 {
    match &prefs.days_of_week {
        Some(days) if days.contains(&weekday_index(slot.start.weekday())) => 1.0,
        _ => 0.0,
    }
}

fn time_window_term(slot: &TimeSlot, prefs: &HabitPreferences) -> f64 {
    match prefs.time_window {
        Some(window) if window.contains(slot.start.time()) => 1.0,
        _ => 0.0,
    }
}
