//! Integration tests for the free-slot calculator's reference scenarios.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use freeslot_core::{compute_free_slots, ConfigError, FreeSlot, TimeWindow, WorkingWindowConfig};

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 6).unwrap()
}

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 6, hour, minute, 0).unwrap()
}

fn busy(sh: u32, sm: u32, eh: u32, em: u32) -> TimeWindow {
    TimeWindow::new(at(sh, sm), at(eh, em)).unwrap()
}

fn spans(slots: &[FreeSlot]) -> Vec<(DateTime<Utc>, DateTime<Utc>, i64)> {
    slots
        .iter()
        .map(|s| (s.start_time, s.end_time, s.duration_minutes))
        .collect()
}

fn nine_to_five() -> WorkingWindowConfig {
    WorkingWindowConfig::new(9, 0, 17, 0)
}

#[test]
fn no_busy_intervals_gives_one_full_slot() {
    let slots = compute_free_slots(date(), &nine_to_five(), &[], &Utc).unwrap();
    assert_eq!(spans(&slots), vec![(at(9, 0), at(17, 0), 480)]);
}

#[test]
fn lunch_splits_the_day() {
    let slots = compute_free_slots(date(), &nine_to_five(), &[busy(12, 0, 13, 0)], &Utc).unwrap();
    assert_eq!(
        spans(&slots),
        vec![(at(9, 0), at(12, 0), 180), (at(13, 0), at(17, 0), 240)]
    );
    assert_eq!(slots[0].date, date());
    assert_eq!((slots[1].start_hour, slots[1].end_hour), (13, 17));
}

#[test]
fn overlapping_busy_intervals_are_merged() {
    let slots = compute_free_slots(
        date(),
        &nine_to_five(),
        &[busy(10, 0, 10, 30), busy(10, 15, 11, 0)],
        &Utc,
    )
    .unwrap();
    assert_eq!(
        spans(&slots),
        vec![(at(9, 0), at(10, 0), 60), (at(11, 0), at(17, 0), 360)]
    );
}

#[test]
fn fully_covered_window_has_no_slots() {
    let slots = compute_free_slots(date(), &nine_to_five(), &[busy(9, 0, 17, 0)], &Utc).unwrap();
    assert!(slots.is_empty());

    let wider = compute_free_slots(date(), &nine_to_five(), &[busy(7, 0, 20, 0)], &Utc).unwrap();
    assert!(wider.is_empty());
}

#[test]
fn gaps_below_threshold_are_dropped() {
    let slots = compute_free_slots(
        date(),
        &WorkingWindowConfig::new(9, 0, 10, 0),
        &[busy(9, 30, 9, 45)],
        &Utc,
    )
    .unwrap();
    assert!(slots.is_empty());
}

#[test]
fn empty_working_window_is_a_configuration_error() {
    let result = compute_free_slots(date(), &WorkingWindowConfig::new(9, 0, 9, 0), &[], &Utc);
    match result {
        Err(ConfigError::InvalidWorkingWindow { date: d, start, end }) => {
            assert_eq!(d, date());
            assert_eq!(start, end);
        }
        other => panic!("expected InvalidWorkingWindow, got {other:?}"),
    }
}

#[test]
fn unsorted_and_zero_length_inputs_are_normalized() {
    let slots = compute_free_slots(
        date(),
        &nine_to_five(),
        &[
            busy(15, 0, 16, 0),
            busy(11, 0, 11, 0),
            busy(10, 0, 12, 0),
            busy(11, 30, 12, 30),
        ],
        &Utc,
    )
    .unwrap();
    assert_eq!(
        spans(&slots),
        vec![
            (at(9, 0), at(10, 0), 60),
            (at(12, 30), at(15, 0), 150),
            (at(16, 0), at(17, 0), 60),
        ]
    );
}
