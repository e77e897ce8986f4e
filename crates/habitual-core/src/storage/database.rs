//! SQLite-based storage for habits, completion history and local calendar
//! events.
//!
//! `HabitDb` is also the default [`CalendarReader`] handed to the slot
//! suggester by the CLI.

use std::path::Path;

use chrono::{DateTime, NaiveDate, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;

use super::{data_dir, migrations};
use crate::calendar::{CalendarEvent, CalendarReader, CalendarWriter};
use crate::error::{CalendarError, CoreError, DatabaseError, Result, ValidationError};
use crate::habit::{Frequency, Habit, HabitPatch, NewHabit};

const DB_FILE: &str = "habitual.db";
const DATE_FORMAT: &str = "%Y-%m-%d";

// === Helper Functions ===

/// Timestamps are stored in UTC with exactly nine fractional digits
/// (`...00.000000000Z`). The fixed width keeps lexicographic order equal to
/// chronological order for range queries, and no precision is lost.
fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_date(raw: &str, idx: usize) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn json_col<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        serde_json::from_str(&s)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn to_json<T: serde::Serialize>(value: &Option<T>) -> Result<Option<String>> {
    value
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(CoreError::from)
}

fn row_to_habit(row: &Row<'_>) -> rusqlite::Result<Habit> {
    let frequency: String = row.get(3)?;
    Ok(Habit {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        frequency: frequency.parse().unwrap_or(Frequency::Daily),
        days_of_week: json_col(row, 4)?,
        preferred_time: row.get(5)?,
        time_window: json_col(row, 6)?,
        steps: json_col(row, 7)?.unwrap_or_default(),
        completed_dates: Vec::new(),
        created_at: parse_ts(row, 8)?,
        updated_at: parse_ts(row, 9)?,
    })
}

fn row_to_event(row: &Row<'_>) -> rusqlite::Result<CalendarEvent> {
    let start = parse_ts(row, 2)?;
    let end = parse_ts(row, 3)?;
    if start >= end {
        return Err(rusqlite::Error::FromSqlConversionFailure(
            3,
            Type::Text,
            Box::new(ValidationError::InvalidTimeRange { start, end }),
        ));
    }
    Ok(CalendarEvent {
        id: row.get(0)?,
        title: row.get(1)?,
        start,
        end,
        description: row.get(4)?,
        calendar_id: row.get(5)?,
        habit_id: row.get(6)?,
        completed: row.get(7)?,
    })
}

const HABIT_COLUMNS: &str = "id, name, description, frequency, days_of_week, preferred_time,
     time_window, steps, created_at, updated_at";

const EVENT_COLUMNS: &str =
    "id, title, start_at, end_at, description, calendar_id, habit_id, completed";

/// SQLite database for habits and local calendar events.
pub struct HabitDb {
    conn: Connection,
}

impl HabitDb {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database in the data directory, creating it if needed.
    ///
    /// # Errors
    /// Returns an error if the data directory is unavailable or the
    /// database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join(DB_FILE);
        Self::open_at(&path)
    }

    /// Open (or create) the database at `path`.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::init(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    // === Habits ===

    /// Validate and persist a new habit.
    pub fn add_habit(&self, new: NewHabit) -> Result<Habit> {
        new.validate()?;
        let habit = Habit::from_new(new, Utc::now().trunc_subsecs(0));
        self.conn.execute(
            &format!("INSERT INTO habits ({HABIT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"),
            params![
                habit.id,
                habit.name,
                habit.description,
                habit.frequency.as_str(),
                to_json(&habit.days_of_week)?,
                habit.preferred_time,
                to_json(&habit.time_window)?,
                serde_json::to_string(&habit.steps)?,
                format_ts(habit.created_at),
                format_ts(habit.updated_at),
            ],
        )?;
        tracing::debug!(habit = %habit.id, name = %habit.name, "habit created");
        Ok(habit)
    }

    /// Fetch a habit with its completion history.
    pub fn get_habit(&self, id: &str) -> Result<Option<Habit>> {
        let habit = self
            .conn
            .query_row(
                &format!("SELECT {HABIT_COLUMNS} FROM habits WHERE id = ?1"),
                params![id],
                row_to_habit,
            )
            .optional()?;

        match habit {
            Some(mut habit) => {
                habit.completed_dates = self.completions(&habit.id)?;
                Ok(Some(habit))
            }
            None => Ok(None),
        }
    }

    /// Resolve a habit by full id or unique id prefix.
    pub fn find_habit(&self, id_or_prefix: &str) -> Result<Habit> {
        if let Some(habit) = self.get_habit(id_or_prefix)? {
            return Ok(habit);
        }
        let mut matches: Vec<Habit> = self
            .list_habits()?
            .into_iter()
            .filter(|h| h.id.starts_with(id_or_prefix))
            .collect();
        match matches.len() {
            0 => Err(CoreError::HabitNotFound(id_or_prefix.to_string())),
            1 => Ok(matches.remove(0)),
            n => Err(CoreError::AmbiguousHabit {
                prefix: id_or_prefix.to_string(),
                matches: n,
            }),
        }
    }

    /// All habits in creation order.
    pub fn list_habits(&self) -> Result<Vec<Habit>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {HABIT_COLUMNS} FROM habits ORDER BY created_at, id"
        ))?;
        let habits = stmt
            .query_map([], row_to_habit)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        habits
            .into_iter()
            .map(|mut habit| {
                habit.completed_dates = self.completions(&habit.id)?;
                Ok(habit)
            })
            .collect()
    }

    /// Apply a patch to a stored habit.
    pub fn update_habit(&self, id: &str, patch: HabitPatch) -> Result<Habit> {
        let mut habit = self
            .get_habit(id)?
            .ok_or_else(|| CoreError::HabitNotFound(id.to_string()))?;
        habit.apply(patch, Utc::now().trunc_subsecs(0))?;

        self.conn.execute(
            "UPDATE habits SET name = ?2, description = ?3, frequency = ?4, days_of_week = ?5,
                 preferred_time = ?6, time_window = ?7, steps = ?8, updated_at = ?9
             WHERE id = ?1",
            params![
                habit.id,
                habit.name,
                habit.description,
                habit.frequency.as_str(),
                to_json(&habit.days_of_week)?,
                habit.preferred_time,
                to_json(&habit.time_window)?,
                serde_json::to_string(&habit.steps)?,
                format_ts(habit.updated_at),
            ],
        )?;
        Ok(habit)
    }

    /// Remove a habit and its completion history. Returns whether it existed.
    pub fn delete_habit(&self, id: &str) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM completions WHERE habit_id = ?1", params![id])?;
        let removed = tx.execute("DELETE FROM habits WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(removed > 0)
    }

    /// Flip completion of a habit on `date`. Returns the new state.
    pub fn toggle_completion(&self, id: &str, date: NaiveDate) -> Result<bool> {
        if self.get_habit(id)?.is_none() {
            return Err(CoreError::HabitNotFound(id.to_string()));
        }
        let day = date.format(DATE_FORMAT).to_string();
        let removed = self.conn.execute(
            "DELETE FROM completions WHERE habit_id = ?1 AND date = ?2",
            params![id, day],
        )?;
        if removed > 0 {
            return Ok(false);
        }
        self.conn.execute(
            "INSERT INTO completions (habit_id, date) VALUES (?1, ?2)",
            params![id, day],
        )?;
        Ok(true)
    }

    fn completions(&self, habit_id: &str) -> Result<Vec<NaiveDate>> {
        let mut stmt = self
            .conn
            .prepare("SELECT date FROM completions WHERE habit_id = ?1 ORDER BY date")?;
        let dates = stmt
            .query_map(params![habit_id], |row| {
                let raw: String = row.get(0)?;
                parse_date(&raw, 0)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(dates)
    }

    // === Events ===

    /// Events intersecting `[start, end)`, ordered by start.
    pub fn list_events(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<CalendarEvent>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM events
             WHERE start_at < ?2 AND end_at > ?1
             ORDER BY start_at, id"
        ))?;
        let events = stmt
            .query_map(params![format_ts(start), format_ts(end)], row_to_event)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(events)
    }

    pub fn get_event(&self, id: &str) -> Result<Option<CalendarEvent>> {
        let event = self
            .conn
            .query_row(
                &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1"),
                params![id],
                row_to_event,
            )
            .optional()?;
        Ok(event)
    }
}

impl CalendarReader for HabitDb {
    fn fetch_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> std::result::Result<Vec<CalendarEvent>, CalendarError> {
        self.list_events(start, end).map_err(CalendarError::from)
    }
}

impl CalendarWriter for HabitDb {
    fn create_event(&self, event: &CalendarEvent) -> std::result::Result<(), CalendarError> {
        self.conn.execute(
            &format!("INSERT INTO events ({EVENT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
            params![
                event.id,
                event.title,
                format_ts(event.start),
                format_ts(event.end),
                event.description,
                event.calendar_id,
                event.habit_id,
                event.completed,
            ],
        )?;
        tracing::debug!(event = %event.id, title = %event.title, "event created");
        Ok(())
    }

    fn update_event(&self, event: &CalendarEvent) -> std::result::Result<(), CalendarError> {
        let updated = self.conn.execute(
            "UPDATE events SET title = ?2, start_at = ?3, end_at = ?4, description = ?5,
                 calendar_id = ?6, habit_id = ?7, completed = ?8
             WHERE id = ?1",
            params![
                event.id,
                event.title,
                format_ts(event.start),
                format_ts(event.end),
                event.description,
                event.calendar_id,
                event.habit_id,
                event.completed,
            ],
        )?;
        if updated == 0 {
            return Err(CalendarError::Storage(format!("no event with id {}", event.id)));
        }
        Ok(())
    }

    fn delete_event(&self, event_id: &str) -> std::result::Result<bool, CalendarError> {
        let removed = self
            .conn
            .execute("DELETE FROM events WHERE id = ?1", params![event_id])?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::habit::{HabitPreferences, TimeWindowSpec};
    use crate::suggest::SlotSuggester;
    use chrono::TimeZone;

    fn db() -> HabitDb {
        HabitDb::open_memory().unwrap()
    }

    fn new_habit(name: &str) -> NewHabit {
        NewHabit {
            name: name.into(),
            ..NewHabit::default()
        }
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 4, h, m, 0).unwrap()
    }

    #[test]
    fn add_and_get_roundtrip() {
        let db = db();
        let created = db
            .add_habit(NewHabit {
                name: "Stretch".into(),
                description: Some("5 minutes".into()),
                frequency: Frequency::Weekly,
                days_of_week: Some(vec![1, 3]),
                preferred_time: Some("07:30".into()),
                time_window: Some(TimeWindowSpec {
                    start: "06:00".into(),
                    end: "09:00".into(),
                }),
                steps: vec!["neck".into(), "back".into()],
            })
            .unwrap();

        let loaded = db.get_habit(&created.id).unwrap().unwrap();
        assert_eq!(loaded, created);
    }

    #[test]
    fn add_rejects_invalid_habit() {
        let db = db();
        let mut bad = new_habit("Run");
        bad.preferred_time = Some("7pm".into());
        assert!(matches!(db.add_habit(bad), Err(CoreError::Validation(_))));
        assert!(db.list_habits().unwrap().is_empty());
    }

    #[test]
    fn find_by_prefix() {
        let db = db();
        let habit = db.add_habit(new_habit("Read")).unwrap();
        let found = db.find_habit(&habit.id[..8]).unwrap();
        assert_eq!(found.id, habit.id);
        assert!(matches!(db.find_habit("zzzz"), Err(CoreError::HabitNotFound(_))));
    }

    #[test]
    fn shared_prefix_is_ambiguous() {
        let db = db();
        db.add_habit(new_habit("Read")).unwrap();
        db.add_habit(new_habit("Write")).unwrap();
        assert!(matches!(
            db.find_habit(""),
            Err(CoreError::AmbiguousHabit { matches: 2, .. })
        ));
    }

    #[test]
    fn update_and_delete() {
        let db = db();
        let habit = db.add_habit(new_habit("Read")).unwrap();
        let updated = db
            .update_habit(
                &habit.id,
                HabitPatch {
                    preferred_time: Some(Some("21:00".into())),
                    ..HabitPatch::default()
                },
            )
            .unwrap();
        assert_eq!(updated.preferred_time.as_deref(), Some("21:00"));
        assert_eq!(db.get_habit(&habit.id).unwrap().unwrap(), updated);

        db.toggle_completion(&habit.id, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
            .unwrap();
        assert!(db.delete_habit(&habit.id).unwrap());
        assert!(!db.delete_habit(&habit.id).unwrap());
        let leftover: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM completions", [], |r| r.get(0))
            .unwrap();
        assert_eq!(leftover, 0);
    }

    #[test]
    fn update_missing_habit_fails() {
        let db = db();
        let err = db.update_habit("nope", HabitPatch::default()).unwrap_err();
        assert!(matches!(err, CoreError::HabitNotFound(_)));
    }

    #[test]
    fn toggle_completion_persists() {
        let db = db();
        let habit = db.add_habit(new_habit("Walk")).unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 6, 4).unwrap();

        assert!(db.toggle_completion(&habit.id, day).unwrap());
        assert_eq!(db.get_habit(&habit.id).unwrap().unwrap().completed_dates, vec![day]);
        assert!(!db.toggle_completion(&habit.id, day).unwrap());
        assert!(db.get_habit(&habit.id).unwrap().unwrap().completed_dates.is_empty());
        assert!(db.toggle_completion("missing", day).is_err());
    }

    #[test]
    fn events_are_read_by_range() {
        let db = db();
        let morning = CalendarEvent::new("Standup", at(9, 0), at(9, 15)).unwrap();
        let evening = CalendarEvent::new("Dinner", at(19, 0), at(20, 0))
            .unwrap()
            .with_description("with friends");
        db.create_event(&morning).unwrap();
        db.create_event(&evening).unwrap();

        let found = db.fetch_events(at(8, 0), at(12, 0)).unwrap();
        assert_eq!(found, vec![morning.clone()]);

        // Touching the range boundary is not an intersection.
        assert!(db.fetch_events(at(9, 15), at(19, 0)).unwrap().is_empty());
        assert_eq!(db.fetch_events(at(0, 0), at(23, 59)).unwrap().len(), 2);
    }

    #[test]
    fn update_and_delete_events() {
        let db = db();
        let mut ev = CalendarEvent::new("Gym", at(7, 0), at(8, 0)).unwrap();
        db.create_event(&ev).unwrap();

        ev.completed = true;
        ev.title = "Gym (legs)".into();
        db.update_event(&ev).unwrap();
        assert_eq!(db.get_event(&ev.id).unwrap().unwrap(), ev);

        assert!(db.delete_event(&ev.id).unwrap());
        assert!(!db.delete_event(&ev.id).unwrap());
        assert!(db.update_event(&ev).is_err());
    }

    #[test]
    fn sub_second_event_bounds_survive_storage() {
        let db = db();
        let start = Utc.with_ymd_and_hms(2024, 6, 4, 8, 59, 0).unwrap();
        let end = at(9, 0) + chrono::Duration::milliseconds(500);
        let ev = CalendarEvent::new("Call", start, end).unwrap();
        db.create_event(&ev).unwrap();

        assert_eq!(db.get_event(&ev.id).unwrap().unwrap(), ev);
        let found = db.fetch_events(at(9, 0), at(9, 30)).unwrap();
        assert_eq!(found, vec![ev]);

        let tiny = CalendarEvent::new(
            "Blip",
            start + chrono::Duration::milliseconds(100),
            start + chrono::Duration::milliseconds(600),
        )
        .unwrap();
        db.create_event(&tiny).unwrap();
        let loaded = db.get_event(&tiny.id).unwrap().unwrap();
        assert!(loaded.start < loaded.end);
        assert_eq!(loaded, tiny);
    }

    #[test]
    fn suggester_reading_db_skips_sub_second_overlap() {
        let db = db();
        let ev = CalendarEvent::new(
            "Call",
            Utc.with_ymd_and_hms(2024, 6, 4, 8, 59, 0).unwrap(),
            at(9, 0) + chrono::Duration::milliseconds(500),
        )
        .unwrap();
        db.create_event(&ev).unwrap();

        let prefs = HabitPreferences::default()
            .with_preferred_time(chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        let slots = SlotSuggester::new(&db)
            .suggest(&prefs, NaiveDate::from_ymd_opt(2024, 6, 4).unwrap(), &Utc, 30)
            .unwrap();
        let starts: Vec<DateTime<Utc>> = slots.iter().map(|s| s.slot().start_utc()).collect();
        assert_eq!(starts, vec![at(9, 30), at(8, 0), at(10, 0), at(10, 30), at(7, 0)]);
    }

    #[test]
    fn stored_event_with_empty_range_is_rejected() {
        let db = db();
        db.conn()
            .execute(
                "INSERT INTO events (id, title, start_at, end_at)
                 VALUES ('bad', 'Empty', ?1, ?1)",
                params![format_ts(at(9, 0))],
            )
            .unwrap();
        assert!(db.get_event("bad").is_err());
        assert!(matches!(
            db.fetch_events(at(8, 0), at(10, 0)),
            Err(CalendarError::Storage(_))
        ));
    }
}
