//! Declarative recurrence rule of a schedule trigger

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Time unit a recurrence repeats in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    #[default]
    Minute,
    Hour,
    Day,
    Week,
    Month,
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Frequency::Minute => "Minute",
            Frequency::Hour => "Hour",
            Frequency::Day => "Day",
            Frequency::Week => "Week",
            Frequency::Month => "Month",
        };
        f.write_str(name)
    }
}

/// Day of the week, named the way the remote API spells it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DayOfWeek {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DayOfWeek::Sunday => "Sunday",
            DayOfWeek::Monday => "Monday",
            DayOfWeek::Tuesday => "Tuesday",
            DayOfWeek::Wednesday => "Wednesday",
            DayOfWeek::Thursday => "Thursday",
            DayOfWeek::Friday => "Friday",
            DayOfWeek::Saturday => "Saturday",
        };
        f.write_str(name)
    }
}

/// The n-th weekday of a month, e.g. the last Friday (`week = -1`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyOccurrence {
    pub weekday: DayOfWeek,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week: Option<i32>,
}

/// Fine-grained constraints narrowing a recurrence
///
/// An empty list means the constraint is unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecurrenceSchedule {
    pub days_of_month: Vec<i32>,
    pub days_of_week: Vec<DayOfWeek>,
    pub hours: Vec<i32>,
    pub minutes: Vec<i32>,
    pub monthly: Vec<MonthlyOccurrence>,
}

impl RecurrenceSchedule {
    /// True when no constraint is populated
    pub fn is_empty(&self) -> bool {
        self.days_of_month.is_empty()
            && self.days_of_week.is_empty()
            && self.hours.is_empty()
            && self.minutes.is_empty()
            && self.monthly.is_empty()
    }
}

/// Frequency/interval rule with an optional window and schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recurrence {
    #[serde(default)]
    pub frequency: Frequency,

    #[serde(default = "default_interval")]
    pub interval: u32,

    /// Defaults to the time of creation when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<RecurrenceSchedule>,
}

impl Default for Recurrence {
    fn default() -> Self {
        Self {
            frequency: Frequency::default(),
            interval: default_interval(),
            start_time: None,
            end_time: None,
            schedule: None,
        }
    }
}

impl Recurrence {
    pub fn every(interval: u32, frequency: Frequency) -> Self {
        Self {
            frequency,
            interval,
            ..Default::default()
        }
    }

    pub fn with_schedule(mut self, schedule: RecurrenceSchedule) -> Self {
        self.schedule = Some(schedule);
        self
    }

    pub fn with_window(
        mut self,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
    ) -> Self {
        self.start_time = start_time;
        self.end_time = end_time;
        self
    }
}

fn default_interval() -> u32 {
    1
}
