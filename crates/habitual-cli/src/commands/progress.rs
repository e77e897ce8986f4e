use chrono::Local;
use clap::Args;
use habitual_core::{HabitDb, ProgressSummary};

use super::CmdResult;

#[derive(Args)]
pub struct ProgressArgs {
    /// Number of days in the daily breakdown
    #[arg(long, default_value_t = 7)]
    days: u32,
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(args: ProgressArgs) -> CmdResult {
    let db = HabitDb::open()?;
    let habits = db.list_habits()?;
    let summary = ProgressSummary::build(&habits, Local::now().date_naive(), args.days);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!(
        "{} habits, {} active, best streak {}",
        summary.total_habits, summary.active_habits, summary.best_streak
    );
    for p in &summary.habits {
        println!(
            "  {:<24} streak {:>3} (best {:>3})  {:>5.1}%  {} done",
            p.name, p.current_streak, p.best_streak, p.completion_rate, p.total_completions
        );
    }
    if !summary.daily.is_empty() {
        println!();
        for day in &summary.daily {
            println!("  {}  {}", day.date.format("%a %m-%d"), "#".repeat(day.completed as usize));
        }
    }
    Ok(())
}
