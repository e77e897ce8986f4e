//! Integration tests for the slot suggestion engine.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use habitual_core::suggest::{candidate_slots, evaluate};
use habitual_core::{
    CalendarError, CalendarEvent, CalendarReader, HabitPreferences, SlotScore, SlotSuggester,
    StaticCalendar, SuggestConfig, SuggestError, TimeWindow,
};
use proptest::prelude::*;

/// 2024-06-04 is a Tuesday.
fn tuesday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 4).unwrap()
}

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 4, h, m, 0).unwrap()
}

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn all_slots(reader: StaticCalendar) -> SlotSuggester<StaticCalendar> {
    SlotSuggester::with_config(
        reader,
        SuggestConfig {
            max_results: 48,
            ..SuggestConfig::default()
        },
    )
    .unwrap()
}

struct DeniedReader;

impl CalendarReader for DeniedReader {
    fn fetch_events(
        &self,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        Err(CalendarError::PermissionDenied)
    }
}

#[test]
fn preferred_nine_am_on_an_empty_day() {
    let prefs = HabitPreferences::default().with_preferred_time(t(9, 0));

    let top = SlotSuggester::new(StaticCalendar::default())
        .suggest(&prefs, tuesday(), &Utc, 30)
        .unwrap();
    let starts: Vec<(u32, u32)> = top.iter().map(|s| (s.start.hour(), s.start.minute())).collect();
    assert_eq!(starts, vec![(9, 0), (9, 30), (8, 0), (8, 30), (10, 0)]);
    assert_eq!(top[0].score, 1.0);

    let every = all_slots(StaticCalendar::default())
        .suggest(&prefs, tuesday(), &Utc, 30)
        .unwrap();
    assert_eq!(every.len(), 48);
    for slot in &every {
        let h = i64::from(slot.start.hour());
        let expected = (24 - (9 - h).abs()) as f64 / 24.0;
        assert!((slot.score - expected).abs() < 1e-12);
    }
    assert!(every.windows(2).all(|w| w[0].score >= w[1].score));
}

#[test]
fn meeting_at_nine_excludes_overlapping_slots() {
    let meeting = CalendarEvent::new("Meeting", at(9, 0), at(10, 0)).unwrap();
    let prefs = HabitPreferences::default().with_preferred_time(t(9, 0));

    let every = all_slots(StaticCalendar::new(vec![meeting.clone()]))
        .suggest(&prefs, tuesday(), &Utc, 30)
        .unwrap();
    assert_eq!(every.len(), 46);
    assert!(every.iter().all(|s| s.start != at(9, 0) && s.start != at(9, 30)));
    assert!(every.iter().any(|s| s.start == at(8, 30) && s.end == at(9, 0)));

    let top = SlotSuggester::new(StaticCalendar::new(vec![meeting]))
        .suggest(&prefs, tuesday(), &Utc, 30)
        .unwrap();
    let starts: Vec<(u32, u32)> = top.iter().map(|s| (s.start.hour(), s.start.minute())).collect();
    assert_eq!(starts, vec![(8, 0), (8, 30), (10, 0), (10, 30), (7, 0)]);
}

#[test]
fn denied_calendar_suggests_nothing() {
    let prefs = HabitPreferences::default()
        .with_preferred_time(t(9, 0))
        .with_days([2])
        .with_window(TimeWindow::new(t(6, 0), t(12, 0)).unwrap());
    let suggester = SlotSuggester::new(DeniedReader);

    assert_eq!(
        suggester.suggest(&prefs, tuesday(), &Utc, 30),
        Err(SuggestError::CalendarUnavailable(CalendarError::PermissionDenied))
    );
    assert!(suggester.suggest_or_empty(&prefs, tuesday(), &Utc, 30).is_empty());
}

#[test]
fn unmatched_weekday_adds_nothing() {
    let prefs = HabitPreferences::default().with_days([1, 3, 5]);
    let every = all_slots(StaticCalendar::default())
        .suggest(&prefs, tuesday(), &Utc, 30)
        .unwrap();
    assert!(every.iter().all(|s| s.score == 0.0));

    let top = SlotSuggester::new(StaticCalendar::default())
        .suggest(&prefs, tuesday(), &Utc, 30)
        .unwrap();
    let expected: Vec<DateTime<Utc>> = (0..5).map(|i| at(0, 0) + Duration::minutes(30 * i)).collect();
    let got: Vec<DateTime<Utc>> = top.iter().map(|s| s.start.with_timezone(&Utc)).collect();
    assert_eq!(got, expected);
}

#[test]
fn window_and_preferred_time_combine() {
    let prefs = HabitPreferences::default()
        .with_preferred_time(t(7, 0))
        .with_window(TimeWindow::new(t(6, 0), t(8, 0)).unwrap());
    let top = SlotSuggester::new(StaticCalendar::default())
        .suggest(&prefs, tuesday(), &Utc, 30)
        .unwrap();
    // 07:00 and 07:30 score 2, then 06:00, 06:30 and 08:00 with 1 + 23/24.
    assert_eq!(top[0].start.hour(), 7);
    assert_eq!(top[0].score, 2.0);
    assert_eq!(top[1].start.minute(), 30);
    let third = top[2].score;
    assert!((third - (1.0 + 23.0 / 24.0)).abs() < 1e-12);
    assert_eq!((top[2].start.hour(), top[3].start.hour(), top[4].start.hour()), (6, 6, 8));
}

#[test]
fn abutting_and_same_start_boundaries() {
    let event = CalendarEvent::new("Call", at(12, 0), at(13, 0)).unwrap();
    let prefs = HabitPreferences::default();
    let slots = candidate_slots(tuesday(), &Utc, 30, 30);

    let before = slots.iter().find(|s| s.start == at(11, 30)).unwrap();
    let same = slots.iter().find(|s| s.start == at(12, 0)).unwrap();
    let after = slots.iter().find(|s| s.start == at(13, 0)).unwrap();

    assert_eq!(evaluate(before, &prefs, std::slice::from_ref(&event)), SlotScore::Valid(0.0));
    assert_eq!(evaluate(same, &prefs, std::slice::from_ref(&event)), SlotScore::Conflict);
    assert_eq!(evaluate(after, &prefs, std::slice::from_ref(&event)), SlotScore::Valid(0.0));
}

// === Properties ===

fn event_strategy() -> impl Strategy<Value = CalendarEvent> {
    (0i64..1440, 1i64..240).prop_map(|(start, len)| {
        let start = at(0, 0) + Duration::minutes(start);
        CalendarEvent::new("busy", start, start + Duration::minutes(len)).unwrap()
    })
}

fn prefs_strategy() -> impl Strategy<Value = HabitPreferences> {
    (
        proptest::option::of((0u32..24, 0u32..60)),
        proptest::option::of(proptest::collection::btree_set(0u8..7, 0..7)),
        proptest::option::of((0u32..1440, 0u32..1440)),
    )
        .prop_map(|(time, days, window)| HabitPreferences {
            preferred_time: time.map(|(h, m)| t(h, m)),
            days_of_week: days,
            time_window: window.map(|(a, b)| {
                let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
                TimeWindow::new(t(lo / 60, lo % 60), t(hi / 60, hi % 60)).unwrap()
            }),
        })
}

proptest! {
    #[test]
    fn suggestions_never_conflict(
        events in proptest::collection::vec(event_strategy(), 0..12),
        prefs in prefs_strategy(),
        duration in 1u32..180,
    ) {
        let suggester = SlotSuggester::new(StaticCalendar::new(events.clone()));
        let slots = suggester.suggest(&prefs, tuesday(), &Utc, duration).unwrap();

        prop_assert!(slots.len() <= 5);
        for slot in &slots {
            for event in &events {
                prop_assert!(!slot.slot().conflicts_with(event));
            }
            prop_assert_eq!(slot.end - slot.start, Duration::minutes(i64::from(duration)));
        }
        prop_assert!(slots.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn suggestions_are_idempotent(
        events in proptest::collection::vec(event_strategy(), 0..8),
        prefs in prefs_strategy(),
        duration in 1u32..120,
    ) {
        let suggester = SlotSuggester::new(StaticCalendar::new(events));
        let first = suggester.suggest(&prefs, tuesday(), &Utc, duration).unwrap();
        let second = suggester.suggest(&prefs, tuesday(), &Utc, duration).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn equal_scores_keep_time_order(
        events in proptest::collection::vec(event_strategy(), 0..8),
        prefs in prefs_strategy(),
    ) {
        let slots = all_slots(StaticCalendar::new(events))
            .suggest(&prefs, tuesday(), &Utc, 30)
            .unwrap();
        for w in slots.windows(2) {
            if w[0].score == w[1].score {
                prop_assert!(w[0].start < w[1].start);
            }
        }
    }

    #[test]
    fn satisfied_preference_never_lowers_score(
        prefs in prefs_strategy(),
        minute in 0i64..1440,
    ) {
        let slot = candidate_slots(tuesday(), &Utc, 1, 30)[minute as usize];
        let base = evaluate(&slot, &prefs, &[]).value().unwrap();

        let with_day = HabitPreferences { days_of_week: Some([2u8].into()), ..prefs.clone() };
        let day_score = evaluate(&slot, &with_day, &[]).value().unwrap();
        prop_assert!(day_score >= base);

        let start = slot.start.time();
        let with_window = HabitPreferences {
            time_window: Some(TimeWindow::new(start, start).unwrap()),
            ..prefs
        };
        let window_score = evaluate(&slot, &with_window, &[]).value().unwrap();
        prop_assert!(window_score >= base);
    }
}
