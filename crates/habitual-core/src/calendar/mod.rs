//! Calendar collaborator interface.
//!
//! The suggestion engine only ever reads events through [`CalendarReader`];
//! where those events live (local SQLite, a device calendar, a fixture) is
//! the implementor's business.

use chrono::{DateTime, Days, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CalendarError, ValidationError};

/// Identifier of the calendar events land in when none is given.
pub const DEFAULT_CALENDAR_ID: &str = "default";

/// A calendar entry. Only `start` and `end` matter for conflict checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub description: Option<String>,
    pub calendar_id: String,
    /// Set when the event books an occurrence of a habit.
    pub habit_id: Option<String>,
    pub completed: bool,
}

impl CalendarEvent {
    /// Create an event in the default calendar. `start` must precede `end`.
    pub fn new(
        title: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        if start >= end {
            return Err(ValidationError::InvalidTimeRange { start, end });
        }
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            start,
            end,
            description: None,
            calendar_id: DEFAULT_CALENDAR_ID.to_string(),
            habit_id: None,
            completed: false,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_calendar(mut self, calendar_id: impl Into<String>) -> Self {
        self.calendar_id = calendar_id.into();
        self
    }

    pub fn for_habit(mut self, habit_id: impl Into<String>) -> Self {
        self.habit_id = Some(habit_id.into());
        self
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Half-open overlap with `[start, end)`. Touching intervals do not overlap.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && self.end > start
    }
}

/// Read access to existing calendar events.
pub trait CalendarReader {
    /// Every event intersecting `[start, end)`.
    ///
    /// Permission, transport and provider failures come back as
    /// [`CalendarError`]; implementations must not block indefinitely.
    fn fetch_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, CalendarError>;
}

impl<R: CalendarReader + ?Sized> CalendarReader for &R {
    fn fetch_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        (**self).fetch_events(start, end)
    }
}

/// Write access to calendar events.
pub trait CalendarWriter {
    fn create_event(&self, event: &CalendarEvent) -> Result<(), CalendarError>;

    /// Replace the stored event with the same id.
    fn update_event(&self, event: &CalendarEvent) -> Result<(), CalendarError>;

    /// Returns whether an event was removed.
    fn delete_event(&self, event_id: &str) -> Result<bool, CalendarError>;
}

/// A fixed set of events held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticCalendar {
    events: Vec<CalendarEvent>,
}

impl StaticCalendar {
    pub fn new(events: Vec<CalendarEvent>) -> Self {
        Self { events }
    }

    pub fn events(&self) -> &[CalendarEvent] {
        &self.events
    }
}

impl CalendarReader for StaticCalendar {
    fn fetch_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        Ok(self
            .events
            .iter()
            .filter(|e| e.overlaps(start, end))
            .cloned()
            .collect())
    }
}

/// First instant of `date` in `tz`.
///
/// When local midnight is skipped by a DST transition the first existing
/// instant after it is used.
pub fn start_of_day<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Tz> {
    let midnight = date.and_time(NaiveTime::default());
    tz.from_local_datetime(&midnight)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(midnight + Duration::hours(1))).earliest())
        .unwrap_or_else(|| tz.from_utc_datetime(&midnight))
}

/// `[local midnight, next local midnight)` of `date` as UTC instants.
pub fn day_bounds<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let next = date.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX);
    (
        start_of_day(date, tz).with_timezone(&Utc),
        start_of_day(next, tz).with_timezone(&Utc),
    )
}
