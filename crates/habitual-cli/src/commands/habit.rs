//! Habit management commands for CLI.

use clap::Subcommand;
use habitual_core::{Frequency, Habit, HabitDb, HabitPatch, NewHabit, TimeWindowSpec};

use super::{day_name, parse_date, parse_days, split_window, CmdResult};

#[derive(Subcommand)]
pub enum HabitAction {
    /// Create a new habit
    Add {
        /// Habit name
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// daily, weekly or custom
        #[arg(long, default_value = "daily")]
        frequency: Frequency,
        /// Scheduled weekdays, e.g. "mon,wed,fri" or "1,3,5"
        #[arg(long)]
        days: Option<String>,
        /// Preferred start time (HH:MM)
        #[arg(long)]
        time: Option<String>,
        /// Allowed start window (HH:MM-HH:MM)
        #[arg(long)]
        window: Option<String>,
        /// A step of the routine; repeat for several
        #[arg(long = "step")]
        steps: Vec<String>,
    },
    /// List habits
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one habit
    Show {
        /// Habit ID or unique prefix
        id: String,
    },
    /// Update a habit
    Edit {
        /// Habit ID or unique prefix
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        frequency: Option<Frequency>,
        #[arg(long)]
        days: Option<String>,
        #[arg(long)]
        time: Option<String>,
        #[arg(long)]
        window: Option<String>,
        /// Remove the weekday restriction
        #[arg(long, conflicts_with = "days")]
        clear_days: bool,
        /// Remove the preferred time
        #[arg(long, conflicts_with = "time")]
        clear_time: bool,
        /// Remove the time window
        #[arg(long, conflicts_with = "window")]
        clear_window: bool,
    },
    /// Delete a habit and its history
    Delete {
        /// Habit ID or unique prefix
        id: String,
    },
    /// Toggle completion for a day
    Done {
        /// Habit ID or unique prefix
        id: String,
        /// Day to toggle (today, tomorrow or YYYY-MM-DD)
        #[arg(long, default_value = "today")]
        date: String,
    },
}

fn window_spec(raw: &str) -> Result<TimeWindowSpec, String> {
    let (start, end) = split_window(raw)?;
    Ok(TimeWindowSpec { start, end })
}

fn print_habit(habit: &Habit) {
    println!("{}  {}", habit.id, habit.name);
    if let Some(description) = &habit.description {
        println!("  {description}");
    }
    println!("  frequency: {}", habit.frequency.as_str());
    if let Some(days) = &habit.days_of_week {
        let names: Vec<&str> = days.iter().map(|d| day_name(*d)).collect();
        println!("  days:      {}", names.join(","));
    }
    if let Some(time) = &habit.preferred_time {
        println!("  time:      {time}");
    }
    if let Some(window) = &habit.time_window {
        println!("  window:    {}-{}", window.start, window.end);
    }
    for (i, step) in habit.steps.iter().enumerate() {
        println!("  {}. {step}", i + 1);
    }
    println!("  completions: {}", habit.completed_dates.len());
}

pub fn run(action: HabitAction) -> CmdResult {
    let db = HabitDb::open()?;

    match action {
        HabitAction::Add {
            name,
            description,
            frequency,
            days,
            time,
            window,
            steps,
        } => {
            let habit = db.add_habit(NewHabit {
                name,
                description,
                frequency,
                days_of_week: days.as_deref().map(parse_days).transpose()?,
                preferred_time: time,
                time_window: window.as_deref().map(window_spec).transpose()?,
                steps,
            })?;
            println!("Habit created: {}", habit.id);
        }
        HabitAction::List { json } => {
            let habits = db.list_habits()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&habits)?);
            } else if habits.is_empty() {
                println!("No habits yet.");
            } else {
                for habit in &habits {
                    let short: String = habit.id.chars().take(8).collect();
                    let when = habit.preferred_time.as_deref().unwrap_or("-");
                    println!("{short}  {:<24} {:<7} {when}", habit.name, habit.frequency.as_str());
                }
            }
        }
        HabitAction::Show { id } => {
            let habit = db.find_habit(&id)?;
            print_habit(&habit);
        }
        HabitAction::Edit {
            id,
            name,
            description,
            frequency,
            days,
            time,
            window,
            clear_days,
            clear_time,
            clear_window,
        } => {
            let habit = db.find_habit(&id)?;
            let mut patch = HabitPatch {
                name,
                description: description.map(Some),
                frequency,
                ..HabitPatch::default()
            };
            if let Some(days) = days {
                patch.days_of_week = Some(Some(parse_days(&days)?));
            } else if clear_days {
                patch.days_of_week = Some(None);
            }
            if let Some(time) = time {
                patch.preferred_time = Some(Some(time));
            } else if clear_time {
                patch.preferred_time = Some(None);
            }
            if let Some(window) = window {
                patch.time_window = Some(Some(window_spec(&window)?));
            } else if clear_window {
                patch.time_window = Some(None);
            }

            if patch.is_empty() {
                println!("Nothing to update.");
                return Ok(());
            }
            let updated = db.update_habit(&habit.id, patch)?;
            println!("Habit updated: {}", updated.id);
        }
        HabitAction::Delete { id } => {
            let habit = db.find_habit(&id)?;
            db.delete_habit(&habit.id)?;
            println!("Habit deleted: {}", habit.id);
        }
        HabitAction::Done { id, date } => {
            let habit = db.find_habit(&id)?;
            let date = parse_date(&date)?;
            if db.toggle_completion(&habit.id, date)? {
                println!("{} done on {date}", habit.name);
            } else {
                println!("{} no longer done on {date}", habit.name);
            }
        }
    }
    Ok(())
}
