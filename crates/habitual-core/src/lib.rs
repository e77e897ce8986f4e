//! # Habitual Core Library
//!
//! Core logic for the Habitual habit tracker. All operations are available
//! through the `habitual` CLI, which is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Habits**: habit entity, strict input validation and the lenient
//!   scheduling view the suggester consumes
//! - **Progress**: streaks, completion rates and daily totals
//! - **Calendar**: the `CalendarReader`/`CalendarWriter` seam to whatever
//!   holds the user's events
//! - **Suggest**: ranks conflict-free time slots for a habit on a given day
//! - **Storage**: SQLite habit/event store and TOML configuration
//!
//! ## Key Components
//!
//! - [`SlotSuggester`]: time-slot suggestion engine
//! - [`HabitDb`]: habit, completion and event persistence
//! - [`Config`]: application configuration management

pub mod calendar;
pub mod error;
pub mod habit;
pub mod storage;
pub mod suggest;

pub use calendar::{CalendarEvent, CalendarReader, CalendarWriter, StaticCalendar};
pub use error::{CalendarError, ConfigError, CoreError, DatabaseError, SuggestError, ValidationError};
pub use habit::{
    Frequency, Habit, HabitPatch, HabitPreferences, HabitProgress, NewHabit, ProgressSummary,
    TimeWindow, TimeWindowSpec,
};
pub use storage::{data_dir, Config, HabitDb};
pub use suggest::{CandidateSlot, SlotScore, SlotSuggester, SuggestConfig, TimeSlot};
