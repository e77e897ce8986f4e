//! Completion history summaries.
//!
//! Streaks, completion rates and per-day totals over a habit's
//! `completed_dates`.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use super::Habit;

/// Per-habit progress figures as of a given day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitProgress {
    pub habit_id: String,
    pub name: String,
    /// Consecutive completed days ending today, or ending yesterday when
    /// today is still open.
    pub current_streak: u32,
    pub best_streak: u32,
    pub total_completions: u32,
    /// Percentage (0-100) of days completed since the habit was created.
    pub completion_rate: f64,
}

impl HabitProgress {
    pub fn for_habit(habit: &Habit, today: NaiveDate) -> Self {
        Self {
            habit_id: habit.id.clone(),
            name: habit.name.clone(),
            current_streak: current_streak(habit, today),
            best_streak: best_streak(&habit.completed_dates),
            total_completions: habit.completed_dates.len() as u32,
            completion_rate: completion_rate(habit, today),
        }
    }
}

fn current_streak(habit: &Habit, today: NaiveDate) -> u32 {
    let mut day = if habit.is_completed_on(today) {
        today
    } else {
        match today.checked_sub_days(Days::new(1)) {
            Some(d) => d,
            None => return 0,
        }
    };

    let mut streak = 0;
    while habit.is_completed_on(day) {
        streak += 1;
        match day.checked_sub_days(Days::new(1)) {
            Some(prev) => day = prev,
            None => break,
        }
    }
    streak
}

fn best_streak(dates: &[NaiveDate]) -> u32 {
    let mut best = 0;
    let mut run = 0;
    let mut prev: Option<NaiveDate> = None;

    for &date in dates {
        run = match prev {
            Some(p) if p.succ_opt() == Some(date) => run + 1,
            Some(p) if p == date => run,
            _ => 1,
        };
        best = best.max(run);
        prev = Some(date);
    }
    best
}

fn completion_rate(habit: &Habit, today: NaiveDate) -> f64 {
    let created = habit.created_at.date_naive();
    if today < created {
        return 0.0;
    }
    let tracked_days = (today - created).num_days() + 1;
    let completed = habit
        .completed_dates
        .iter()
        .filter(|d| **d >= created && **d <= today)
        .count();
    (completed as f64 / tracked_days as f64) * 100.0
}

/// Number of habits completed on a single day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub completed: u32,
}

/// Completion totals for the last `days` days, oldest first, ending today.
pub fn daily_completion_counts(habits: &[Habit], today: NaiveDate, days: u32) -> Vec<DailyCount> {
    (0..days)
        .rev()
        .filter_map(|offset| today.checked_sub_days(Days::new(u64::from(offset))))
        .map(|date| DailyCount {
            date,
            completed: habits.iter().filter(|h| h.is_completed_on(date)).count() as u32,
        })
        .collect()
}

/// Overview across every habit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub total_habits: u32,
    /// Habits with at least one completion.
    pub active_habits: u32,
    pub best_streak: u32,
    pub habits: Vec<HabitProgress>,
    pub daily: Vec<DailyCount>,
}

impl ProgressSummary {
    pub fn build(habits: &[Habit], today: NaiveDate, days: u32) -> Self {
        let per_habit: Vec<HabitProgress> = habits
            .iter()
            .map(|h| HabitProgress::for_habit(h, today))
            .collect();

        Self {
            total_habits: habits.len() as u32,
            active_habits: habits.iter().filter(|h| !h.completed_dates.is_empty()).count() as u32,
            best_streak: per_habit.iter().map(|p| p.best_streak).max().unwrap_or(0),
            habits: per_habit,
            daily: daily_completion_counts(habits, today, days),
        }
    }
}
