//! Property tests: schedule encoding normalises once and never invents fields.

use proptest::prelude::*;
use trigger_control::codec::{decode, encode};
use trigger_types::{DayOfWeek, MonthlyOccurrence, RecurrenceSchedule};

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn arb_day_of_week() -> impl Strategy<Value = DayOfWeek> {
    prop_oneof![
        Just(DayOfWeek::Sunday),
        Just(DayOfWeek::Monday),
        Just(DayOfWeek::Tuesday),
        Just(DayOfWeek::Wednesday),
        Just(DayOfWeek::Thursday),
        Just(DayOfWeek::Friday),
        Just(DayOfWeek::Saturday),
    ]
}

fn arb_day_of_month() -> impl Strategy<Value = i32> {
    prop_oneof![-31i32..=-1, 1i32..=31]
}

fn arb_monthly() -> impl Strategy<Value = MonthlyOccurrence> {
    (
        arb_day_of_week(),
        prop::option::of(prop_oneof![-5i32..=-1, 1i32..=5]),
    )
        .prop_map(|(weekday, week)| MonthlyOccurrence { weekday, week })
}

/// Any schedule, including the all-empty one.
fn arb_schedule() -> impl Strategy<Value = RecurrenceSchedule> {
    (
        prop::collection::vec(arb_day_of_month(), 0..4),
        prop::collection::vec(arb_day_of_week(), 0..7),
        prop::collection::vec(0i32..=24, 0..4),
        prop::collection::vec(0i32..=60, 0..4),
        prop::collection::vec(arb_monthly(), 0..3),
    )
        .prop_map(
            |(days_of_month, days_of_week, hours, minutes, monthly)| RecurrenceSchedule {
                days_of_month,
                days_of_week,
                hours,
                minutes,
                monthly,
            },
        )
}

// ---------------------------------------------------------------------------
// Property Tests
// ---------------------------------------------------------------------------

proptest! {
    /// A second encode/decode pass changes nothing.
    #[test]
    fn normalisation_is_idempotent(schedule in arb_schedule()) {
        let once = decode(encode(Some(&schedule)).as_ref());
        let twice = decode(encode(Some(&once)).as_ref());
        prop_assert_eq!(twice, once);
    }

    /// Fields unset in the input stay unset after one pass.
    #[test]
    fn no_field_is_invented(schedule in arb_schedule()) {
        let round = decode(encode(Some(&schedule)).as_ref());

        prop_assert_eq!(round.days_of_month.is_empty(), schedule.days_of_month.is_empty());
        prop_assert_eq!(round.days_of_week.is_empty(), schedule.days_of_week.is_empty());
        prop_assert_eq!(round.hours.is_empty(), schedule.hours.is_empty());
        prop_assert_eq!(round.minutes.is_empty(), schedule.minutes.is_empty());
        prop_assert_eq!(round.monthly.is_empty(), schedule.monthly.is_empty());
    }

    /// Values pass through verbatim and in order.
    #[test]
    fn values_are_copied_verbatim(schedule in arb_schedule()) {
        prop_assert_eq!(decode(encode(Some(&schedule)).as_ref()), schedule);
    }

    /// The remote never receives an empty list.
    #[test]
    fn encoded_lists_are_never_empty(schedule in arb_schedule()) {
        match encode(Some(&schedule)) {
            None => prop_assert!(schedule.is_empty()),
            Some(remote) => {
                prop_assert!(remote.minutes.map_or(true, |v| !v.is_empty()));
                prop_assert!(remote.hours.map_or(true, |v| !v.is_empty()));
                prop_assert!(remote.week_days.map_or(true, |v| !v.is_empty()));
                prop_assert!(remote.month_days.map_or(true, |v| !v.is_empty()));
                prop_assert!(remote.monthly_occurrences.map_or(true, |v| !v.is_empty()));
            }
        }
    }
}

#[test]
fn test_absent_schedule_decodes_to_empty() {
    assert_eq!(decode(None), RecurrenceSchedule::default());
    assert!(encode(None).is_none());
}
