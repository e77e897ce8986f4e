//! Habit entity, user input types and scheduling preferences.

pub mod preferences;
pub mod progress;

pub use preferences::{parse_time_of_day, weekday_index, HabitPreferences, TimeWindow};
pub use progress::{daily_completion_counts, DailyCount, HabitProgress, ProgressSummary};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// How often a habit is meant to happen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    #[default]
    Daily,
    Weekly,
    Custom,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Custom => "custom",
        }
    }
}

impl std::str::FromStr for Frequency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "custom" => Ok(Self::Custom),
            other => Err(ValidationError::InvalidValue {
                field: "frequency".into(),
                message: format!("unknown frequency '{other}'"),
            }),
        }
    }
}

/// Raw `HH:mm` bounds of a daily time window, as entered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindowSpec {
    pub start: String,
    pub end: String,
}

/// User-supplied fields for a new habit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewHabit {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub frequency: Frequency,
    /// 0 = Sunday .. 6 = Saturday
    #[serde(default)]
    pub days_of_week: Option<Vec<u8>>,
    #[serde(default)]
    pub preferred_time: Option<String>,
    #[serde(default)]
    pub time_window: Option<TimeWindowSpec>,
    #[serde(default)]
    pub steps: Vec<String>,
}

impl NewHabit {
    /// Reject input the store should never persist.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "name".into(),
                message: "must not be empty".into(),
            });
        }
        if let Some(time) = &self.preferred_time {
            parse_time_of_day(time)?;
        }
        if let Some(window) = &self.time_window {
            TimeWindow::parse(&window.start, &window.end)?;
        }
        if let Some(days) = &self.days_of_week {
            if let Some(bad) = days.iter().find(|d| **d > 6) {
                return Err(ValidationError::InvalidWeekday(*bad));
            }
        }
        Ok(())
    }
}

/// Partial update for an existing habit. `None` leaves a field untouched;
/// `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HabitPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub frequency: Option<Frequency>,
    pub days_of_week: Option<Option<Vec<u8>>>,
    pub preferred_time: Option<Option<String>>,
    pub time_window: Option<Option<TimeWindowSpec>>,
    pub steps: Option<Vec<String>>,
}

impl HabitPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A tracked habit together with its completion history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub frequency: Frequency,
    pub days_of_week: Option<Vec<u8>>,
    pub preferred_time: Option<String>,
    pub time_window: Option<TimeWindowSpec>,
    pub steps: Vec<String>,
    /// Sorted, unique.
    pub completed_dates: Vec<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Habit {
    /// Materialise a new habit with a fresh id.
    pub fn from_new(new: NewHabit, now: DateTime<Utc>) -> Self {
        let mut days = new.days_of_week;
        if let Some(d) = days.as_mut() {
            d.sort_unstable();
            d.dedup();
        }
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: new.name.trim().to_string(),
            description: new.description.filter(|d| !d.trim().is_empty()),
            frequency: new.frequency,
            days_of_week: days,
            preferred_time: new.preferred_time,
            time_window: new.time_window,
            steps: new.steps,
            completed_dates: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The user-editable part of this habit.
    pub fn to_new(&self) -> NewHabit {
        NewHabit {
            name: self.name.clone(),
            description: self.description.clone(),
            frequency: self.frequency,
            days_of_week: self.days_of_week.clone(),
            preferred_time: self.preferred_time.clone(),
            time_window: self.time_window.clone(),
            steps: self.steps.clone(),
        }
    }

    /// Apply a patch, validating the merged result before committing it.
    pub fn apply(&mut self, patch: HabitPatch, now: DateTime<Utc>) -> Result<(), ValidationError> {
        let mut merged = self.to_new();
        if let Some(name) = patch.name {
            merged.name = name;
        }
        if let Some(description) = patch.description {
            merged.description = description;
        }
        if let Some(frequency) = patch.frequency {
            merged.frequency = frequency;
        }
        if let Some(days) = patch.days_of_week {
            merged.days_of_week = days;
        }
        if let Some(time) = patch.preferred_time {
            merged.preferred_time = time;
        }
        if let Some(window) = patch.time_window {
            merged.time_window = window;
        }
        if let Some(steps) = patch.steps {
            merged.steps = steps;
        }
        merged.validate()?;

        let rebuilt = Habit::from_new(merged, self.created_at);
        self.name = rebuilt.name;
        self.description = rebuilt.description;
        self.frequency = rebuilt.frequency;
        self.days_of_week = rebuilt.days_of_week;
        self.preferred_time = rebuilt.preferred_time;
        self.time_window = rebuilt.time_window;
        self.steps = rebuilt.steps;
        self.updated_at = now;
        Ok(())
    }

    /// Scheduling view used by the slot suggester.
    pub fn preferences(&self) -> HabitPreferences {
        HabitPreferences::from_habit(self)
    }

    pub fn is_completed_on(&self, date: NaiveDate) -> bool {
        self.completed_dates.binary_search(&date).is_ok()
    }

    /// Flip completion for `date`. Returns the new state.
    pub fn toggle_completion(&mut self, date: NaiveDate) -> bool {
        match self.completed_dates.binary_search(&date) {
            Ok(pos) => {
                self.completed_dates.remove(pos);
                false
            }
            Err(pos) => {
                self.completed_dates.insert(pos, date);
                true
            }
        }
    }
}
