//! Time slot suggestions for a habit.

use chrono::{Datelike, Local};
use clap::Args;
use habitual_core::{CalendarEvent, CalendarWriter, Config, HabitDb, SlotSuggester};

use super::{parse_date, CmdResult};

#[derive(Args)]
pub struct SuggestArgs {
    /// Habit ID or unique prefix
    habit: String,
    /// Day to plan (today, tomorrow or YYYY-MM-DD)
    #[arg(long, default_value = "today")]
    date: String,
    /// Slot length in minutes (default from config)
    #[arg(long)]
    duration: Option<u32>,
    /// Output as JSON
    #[arg(long)]
    json: bool,
    /// Book the Nth suggestion (1 = best) into the local calendar
    #[arg(long, value_name = "N")]
    book: Option<usize>,
}

pub fn run(args: SuggestArgs) -> CmdResult {
    let config = Config::load_or_default();
    let db = HabitDb::open()?;
    let habit = db.find_habit(&args.habit)?;
    let date = parse_date(&args.date)?;
    let duration = args
        .duration
        .unwrap_or(config.suggestions.default_duration_minutes);

    let prefs = habit.preferences();
    if prefs.is_scheduled_on(date.weekday()) == Some(false) {
        eprintln!(
            "note: {} is not scheduled on {}s",
            habit.name,
            date.format("%A")
        );
    }

    let suggester = SlotSuggester::with_config(&db, config.suggestions.suggest_config())?;
    let slots = suggester.suggest(&prefs, date, &Local, duration)?;

    if let Some(n) = args.book {
        let slot = n
            .checked_sub(1)
            .and_then(|i| slots.get(i))
            .ok_or_else(|| format!("no suggestion #{n} (have {})", slots.len()))?;
        let event = CalendarEvent::new(
            habit.name.clone(),
            slot.slot().start_utc(),
            slot.slot().end_utc(),
        )?
        .for_habit(habit.id.clone());
        db.create_event(&event)?;
        println!(
            "Booked {} {}-{}: {}",
            date,
            slot.start.format("%H:%M"),
            slot.end.format("%H:%M"),
            event.id
        );
        return Ok(());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&slots)?);
    } else if slots.is_empty() {
        println!("No free {duration}-minute slots on {date}.");
    } else {
        for (i, slot) in slots.iter().enumerate() {
            println!(
                "{}. {}-{}  score {:.2}",
                i + 1,
                slot.start.format("%H:%M"),
                slot.end.format("%H:%M"),
                slot.score
            );
        }
    }
    Ok(())
}
