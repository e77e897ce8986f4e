pub mod config;
pub mod event;
pub mod habit;
pub mod progress;
pub mod suggest;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

type CmdResult = Result<(), Box<dyn std::error::Error>>;

const DAY_NAMES: [&str; 7] = ["sun", "mon", "tue", "wed", "thu", "fri", "sat"];

/// `today`, `tomorrow` or `YYYY-MM-DD`.
pub(crate) fn parse_date(input: &str) -> Result<NaiveDate, String> {
    let today = Local::now().date_naive();
    match input {
        "today" => Ok(today),
        "tomorrow" => today.succ_opt().ok_or_else(|| "date out of range".to_string()),
        other => NaiveDate::parse_from_str(other, "%Y-%m-%d")
            .map_err(|_| format!("invalid date '{other}', expected YYYY-MM-DD")),
    }
}

/// Comma-separated weekdays, as names (`mon,wed`) or numbers (0 = Sunday).
pub(crate) fn parse_days(input: &str) -> Result<Vec<u8>, String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|part| {
            let lower = part.to_ascii_lowercase();
            if let Some(idx) = DAY_NAMES.iter().position(|d| lower.starts_with(d)) {
                return Ok(idx as u8);
            }
            match lower.parse::<u8>() {
                Ok(n) if n <= 6 => Ok(n),
                _ => Err(format!("invalid weekday '{part}'")),
            }
        })
        .collect()
}

pub(crate) fn day_name(day: u8) -> &'static str {
    DAY_NAMES.get(day as usize).copied().unwrap_or("?")
}

/// `HH:MM-HH:MM` into its two halves.
pub(crate) fn split_window(input: &str) -> Result<(String, String), String> {
    let (start, end) = input
        .split_once('-')
        .ok_or_else(|| format!("invalid window '{input}', expected HH:MM-HH:MM"))?;
    Ok((start.trim().to_string(), end.trim().to_string()))
}

/// RFC 3339, or `YYYY-MM-DD HH:MM` in local time.
pub(crate) fn parse_local_datetime(input: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M"))
        .map_err(|_| format!("invalid time '{input}', expected 'YYYY-MM-DD HH:MM'"))?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| format!("'{input}' does not exist in the local time zone"))
}
