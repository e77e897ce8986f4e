//! Local calendar event commands.

use chrono::{Duration, Local};
use clap::Subcommand;
use habitual_core::calendar::day_bounds;
use habitual_core::{CalendarEvent, CalendarWriter, HabitDb};

use super::{parse_date, parse_local_datetime, CmdResult};

#[derive(Subcommand)]
pub enum EventAction {
    /// Add an event to the local calendar
    Add {
        /// Event title
        title: String,
        /// Start, "YYYY-MM-DD HH:MM" local time or RFC 3339
        #[arg(long)]
        start: String,
        /// End, same formats as --start
        #[arg(long, conflicts_with = "minutes")]
        end: Option<String>,
        /// Length in minutes instead of --end
        #[arg(long)]
        minutes: Option<u32>,
        #[arg(long)]
        description: Option<String>,
    },
    /// List events on a day
    List {
        /// Day to list (today, tomorrow or YYYY-MM-DD)
        #[arg(long, default_value = "today")]
        date: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete an event
    Delete {
        /// Event ID
        id: String,
    },
}

pub fn run(action: EventAction) -> CmdResult {
    let db = HabitDb::open()?;

    match action {
        EventAction::Add {
            title,
            start,
            end,
            minutes,
            description,
        } => {
            let start = parse_local_datetime(&start)?;
            let end = match (end, minutes) {
                (Some(end), _) => parse_local_datetime(&end)?,
                (None, Some(minutes)) => start + Duration::minutes(i64::from(minutes)),
                (None, None) => return Err("either --end or --minutes is required".into()),
            };
            let mut event = CalendarEvent::new(title, start, end)?;
            if let Some(description) = description {
                event = event.with_description(description);
            }
            db.create_event(&event)?;
            println!("Event created: {}", event.id);
        }
        EventAction::List { date, json } => {
            let date = parse_date(&date)?;
            let (start, end) = day_bounds(date, &Local);
            let events = db.list_events(start, end)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&events)?);
            } else if events.is_empty() {
                println!("No events on {date}.");
            } else {
                for event in &events {
                    println!(
                        "{}-{}  {}  ({})",
                        event.start.with_timezone(&Local).format("%H:%M"),
                        event.end.with_timezone(&Local).format("%H:%M"),
                        event.title,
                        event.id
                    );
                }
            }
        }
        EventAction::Delete { id } => {
            if db.delete_event(&id)? {
                println!("Event deleted: {id}");
            } else {
                return Err(habitual_core::CoreError::EventNotFound(id).into());
            }
        }
    }
    Ok(())
}
