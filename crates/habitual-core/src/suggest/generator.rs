//! Slot generation and ranking.
//!
//! Walks a day in fixed steps from local midnight, scores each candidate
//! against the day's events and returns the best few, earliest first among
//! equal scores.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::score::{evaluate, SlotScore, TimeSlot};
use crate::calendar::{day_bounds, CalendarEvent, CalendarReader};
use crate::error::SuggestError;
use crate::habit::HabitPreferences;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Suggester settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestConfig {
    /// Step between candidate start times, in minutes.
    pub granularity_minutes: u32,
    /// Maximum number of slots returned.
    pub max_results: usize,
    /// Keep slots whose end spills past the next local midnight.
    pub allow_cross_midnight: bool,
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self {
            granularity_minutes: 30,
            max_results: 5,
            allow_cross_midnight: true,
        }
    }
}

impl SuggestConfig {
    pub fn validate(&self) -> Result<(), SuggestError> {
        if self.granularity_minutes == 0 || self.granularity_minutes > MINUTES_PER_DAY {
            return Err(SuggestError::InvalidConfig(format!(
                "granularity_minutes must be between 1 and {MINUTES_PER_DAY}, got {}",
                self.granularity_minutes
            )));
        }
        if self.max_results == 0 {
            return Err(SuggestError::InvalidConfig(
                "max_results must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Number of candidate start times generated per day.
    pub fn candidates_per_day(&self) -> u32 {
        MINUTES_PER_DAY.div_ceil(self.granularity_minutes.max(1))
    }
}

/// A ranked, conflict-free slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSlot {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub score: f64,
}

impl CandidateSlot {
    pub fn slot(&self) -> TimeSlot {
        TimeSlot::new(self.start, self.end)
    }
}

/// Suggests time slots for a habit using an injected calendar reader.
pub struct SlotSuggester<R> {
    reader: R,
    config: SuggestConfig,
}

impl<R: CalendarReader> SlotSuggester<R> {
    /// Create a suggester with default settings.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            config: SuggestConfig::default(),
        }
    }

    /// Create with custom settings.
    pub fn with_config(reader: R, config: SuggestConfig) -> Result<Self, SuggestError> {
        config.validate()?;
        Ok(Self { reader, config })
    }

    pub fn config(&self) -> &SuggestConfig {
        &self.config
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// Rank slots of `duration_minutes` on `date` (local to `tz`).
    ///
    /// Events are fetched once for the local day. A failed fetch is an
    /// error rather than an empty day, so a slot that might conflict is
    /// never offered. `Ok(vec![])` means every candidate conflicted.
    pub fn suggest<Tz: TimeZone>(
        &self,
        prefs: &HabitPreferences,
        date: NaiveDate,
        tz: &Tz,
        duration_minutes: u32,
    ) -> Result<Vec<CandidateSlot>, SuggestError> {
        if duration_minutes == 0 {
            return Err(SuggestError::InvalidDuration(duration_minutes));
        }

        let (day_start, day_end) = day_bounds(date, tz);
        let events = self.reader.fetch_events(day_start, day_end).map_err(|e| {
            tracing::warn!(%date, error = %e, "calendar fetch failed, suggesting nothing");
            SuggestError::from(e)
        })?;

        let mut candidates = candidate_slots(
            date,
            tz,
            self.config.granularity_minutes,
            duration_minutes,
        );
        if !self.config.allow_cross_midnight {
            candidates.retain(|slot| slot.end_utc() <= day_end);
        }
        let generated = candidates.len();

        let ranked = rank_slots(candidates, prefs, &events, self.config.max_results);
        tracing::debug!(
            %date,
            events = events.len(),
            generated,
            returned = ranked.len(),
            "ranked candidate slots"
        );
        Ok(ranked)
    }

    /// Like [`suggest`](Self::suggest) but any failure yields no slots.
    pub fn suggest_or_empty<Tz: TimeZone>(
        &self,
        prefs: &HabitPreferences,
        date: NaiveDate,
        tz: &Tz,
        duration_minutes: u32,
    ) -> Vec<CandidateSlot> {
        self.suggest(prefs, date, tz, duration_minutes)
            .unwrap_or_default()
    }
}

/// Candidate slots for `date` at every `granularity_minutes` of local wall
/// clock time, in increasing start order. Wall clock times skipped by a DST
/// transition produce no slot; repeated ones use their first occurrence.
pub fn candidate_slots<Tz: TimeZone>(
    date: NaiveDate,
    tz: &Tz,
    granularity_minutes: u32,
    duration_minutes: u32,
) -> Vec<TimeSlot> {
    let midnight = date.and_time(NaiveTime::default());
    let step = granularity_minutes.max(1) as usize;

    (0..MINUTES_PER_DAY)
        .step_by(step)
        .filter_map(|offset| {
            let local = midnight + Duration::minutes(i64::from(offset));
            let start = tz.from_local_datetime(&local).earliest()?;
            let start = to_fixed(&start);
            Some(TimeSlot::new(
                start,
                start + Duration::minutes(i64::from(duration_minutes)),
            ))
        })
        .collect()
}

/// Score every slot, drop conflicts, and keep the top `max_results`.
///
/// The sort is stable, so equal scores keep generation order.
pub fn rank_slots(
    slots: Vec<TimeSlot>,
    prefs: &HabitPreferences,
    events: &[CalendarEvent],
    max_results: usize,
) -> Vec<CandidateSlot> {
    let mut ranked: Vec<CandidateSlot> = slots
        .into_iter()
        .filter_map(|slot| match evaluate(&slot, prefs, events) {
            SlotScore::Valid(score) => Some(CandidateSlot {
                start: slot.start,
                end: slot.end,
                score,
            }),
            SlotScore::Conflict => None,
        })
        .collect();

    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked.truncate(max_results);
    ranked
}

fn to_fixed<Tz: TimeZone>(dt: &DateTime<Tz>) -> DateTime<FixedOffset> {
    dt.with_timezone(&dt.offset().fix())
}

/// Convenience: the UTC instant a slot starts at.
pub fn slot_start_utc(slot: &CandidateSlot) -> DateTime<Utc> {
    slot.start.with_timezone(&Utc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::StaticCalendar;
    use crate::error::CalendarError;
    use chrono::{Timelike, Utc};

    struct FailingReader;

    impl CalendarReader for FailingReader {
        fn fetch_events(
            &self,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> Result<Vec<CalendarEvent>, CalendarError> {
            Err(CalendarError::Unavailable("provider offline".into()))
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 4).unwrap()
    }

    fn utc(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 4, h, m, 0).unwrap()
    }

    #[test]
    fn default_config_yields_48_candidates() {
        let config = SuggestConfig::default();
        assert_eq!(config.candidates_per_day(), 48);
        let slots = candidate_slots(date(), &Utc, 30, 30);
        assert_eq!(slots.len(), 48);
        assert_eq!(slots[0].start.hour(), 0);
        assert_eq!(slots[47].start.hour(), 23);
        assert_eq!(slots[47].start.minute(), 30);
        assert!(slots.windows(2).all(|w| w[0].start < w[1].start));
    }

    #[test]
    fn config_validation() {
        assert!(SuggestConfig::default().validate().is_ok());
        let bad = SuggestConfig {
            granularity_minutes: 0,
            ..SuggestConfig::default()
        };
        assert!(matches!(bad.validate(), Err(SuggestError::InvalidConfig(_))));
        let bad = SuggestConfig {
            max_results: 0,
            ..SuggestConfig::default()
        };
        assert!(SlotSuggester::with_config(StaticCalendar::default(), bad).is_err());
    }

    #[test]
    fn no_preferences_returns_first_five_in_order() {
        let suggester = SlotSuggester::new(StaticCalendar::default());
        let slots = suggester
            .suggest(&HabitPreferences::default(), date(), &Utc, 30)
            .unwrap();
        assert_eq!(slots.len(), 5);
        for (i, slot) in slots.iter().enumerate() {
            assert_eq!(slot.score, 0.0);
            assert_eq!(slot_start_utc(slot), utc(0, 0) + Duration::minutes(30 * i as i64));
        }
    }

    #[test]
    fn zero_duration_is_rejected() {
        let suggester = SlotSuggester::new(StaticCalendar::default());
        assert_eq!(
            suggester.suggest(&HabitPreferences::default(), date(), &Utc, 0),
            Err(SuggestError::InvalidDuration(0))
        );
    }

    #[test]
    fn fetch_failure_is_reported_not_treated_as_free() {
        let suggester = SlotSuggester::new(FailingReader);
        let prefs = HabitPreferences::default()
            .with_preferred_time(NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        let err = suggester.suggest(&prefs, date(), &Utc, 30).unwrap_err();
        assert!(matches!(err, SuggestError::CalendarUnavailable(_)));
        assert!(suggester.suggest_or_empty(&prefs, date(), &Utc, 30).is_empty());
    }

    #[test]
    fn fully_booked_day_is_empty_not_error() {
        let busy = CalendarEvent::new("all day", utc(0, 0), utc(0, 0) + Duration::days(1)).unwrap();
        let suggester = SlotSuggester::new(StaticCalendar::new(vec![busy]));
        let slots = suggester
            .suggest(&HabitPreferences::default(), date(), &Utc, 30)
            .unwrap();
        assert!(slots.is_empty());
    }

    #[test]
    fn cross_midnight_slots_can_be_excluded() {
        let config = SuggestConfig {
            allow_cross_midnight: false,
            max_results: 48,
            ..SuggestConfig::default()
        };
        let suggester = SlotSuggester::with_config(StaticCalendar::default(), config).unwrap();
        let slots = suggester
            .suggest(&HabitPreferences::default(), date(), &Utc, 60)
            .unwrap();
        // 23:30 would end at 00:30 the next day.
        assert_eq!(slots.len(), 47);
        assert!(slots
            .iter()
            .all(|s| s.slot().end_utc() <= utc(0, 0) + Duration::days(1)));

        let allowing = SlotSuggester::with_config(
            StaticCalendar::default(),
            SuggestConfig {
                max_results: 48,
                ..SuggestConfig::default()
            },
        )
        .unwrap();
        let slots = allowing
            .suggest(&HabitPreferences::default(), date(), &Utc, 60)
            .unwrap();
        assert_eq!(slots.len(), 48);
    }

    #[test]
    fn candidates_follow_the_local_day() {
        let tz = FixedOffset::west_opt(5 * 3600).unwrap();
        let slots = candidate_slots(date(), &tz, 30, 30);
        assert_eq!(slots[0].start.hour(), 0);
        assert_eq!(slots[0].start_utc(), utc(5, 0));
    }

    #[test]
    fn rank_keeps_generation_order_for_ties() {
        let slots = candidate_slots(date(), &Utc, 60, 30);
        let ranked = rank_slots(slots, &HabitPreferences::default().with_days([2]), &[], 3);
        assert_eq!(ranked.len(), 3);
        assert!(ranked.iter().all(|s| s.score == 1.0));
        assert_eq!(ranked[0].start.hour(), 0);
        assert_eq!(ranked[1].start.hour(), 1);
        assert_eq!(ranked[2].start.hour(), 2);
    }
}
