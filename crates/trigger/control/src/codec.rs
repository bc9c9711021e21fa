//! Translation between the declarative schedule and the remote schedule
//!
//! The declarative side uses empty vectors for "unset"; the remote side
//! distinguishes an absent field from an empty one. Encoding never sends an
//! empty list and decoding never yields an absent schedule.

use chrono::{DateTime, SubsecRound, Utc};
use trigger_types::{
    MonthlyOccurrence, Recurrence, RecurrenceSchedule, RecurrenceScheduleOccurrence,
    RemoteRecurrenceSchedule, ScheduleTriggerRecurrence,
};

/// Encode a declarative schedule for the remote API
///
/// Returns `None` when the input is absent or no field is populated.
pub fn encode(schedule: Option<&RecurrenceSchedule>) -> Option<RemoteRecurrenceSchedule> {
    let schedule = schedule.filter(|s| !s.is_empty())?;

    let monthly_occurrences = schedule
        .monthly
        .iter()
        .map(|m| RecurrenceScheduleOccurrence {
            day: m.weekday,
            occurrence: m.week,
        })
        .collect::<Vec<_>>();

    Some(RemoteRecurrenceSchedule {
        minutes: present(&schedule.minutes),
        hours: present(&schedule.hours),
        week_days: present(&schedule.days_of_week),
        month_days: present(&schedule.days_of_month),
        monthly_occurrences: (!monthly_occurrences.is_empty()).then_some(monthly_occurrences),
    })
}

/// Decode a remote schedule into the declarative form
///
/// An absent schedule decodes to an all-empty one.
pub fn decode(schedule: Option<&RemoteRecurrenceSchedule>) -> RecurrenceSchedule {
    let Some(schedule) = schedule else {
        return RecurrenceSchedule::default();
    };

    RecurrenceSchedule {
        days_of_month: schedule.month_days.clone().unwrap_or_default(),
        days_of_week: schedule.week_days.clone().unwrap_or_default(),
        hours: schedule.hours.clone().unwrap_or_default(),
        minutes: schedule.minutes.clone().unwrap_or_default(),
        monthly: schedule
            .monthly_occurrences
            .iter()
            .flatten()
            .map(|o| MonthlyOccurrence {
                weekday: o.day,
                week: o.occurrence,
            })
            .collect(),
    }
}

/// Build the remote recurrence block
///
/// A missing start time becomes `now`, truncated to whole seconds so that it
/// survives the remote's RFC3339 round trip unchanged.
pub fn encode_recurrence(recurrence: &Recurrence, now: DateTime<Utc>) -> ScheduleTriggerRecurrence {
    ScheduleTriggerRecurrence {
        frequency: recurrence.frequency,
        interval: Some(recurrence.interval),
        start_time: Some(recurrence.start_time.unwrap_or_else(|| now.trunc_subsecs(0))),
        end_time: recurrence.end_time,
        time_zone: None,
        schedule: encode(recurrence.schedule.as_ref()),
    }
}

fn present<T: Clone>(values: &[T]) -> Option<Vec<T>> {
    (!values.is_empty()).then(|| values.to_vec())
}
