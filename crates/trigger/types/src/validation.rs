//! Intake validation for declarative triggers
//!
//! Reconciliation assumes input already passed these checks.

use crate::desired::DesiredTrigger;
use crate::ids::FactorySelector;
use crate::recurrence::RecurrenceSchedule;
use std::fmt;
use thiserror::Error;

/// Upper bound for `hours`. The remote API documents 0..=23, but 24 has
/// always been accepted; kept until the remote contract is confirmed.
pub const MAX_HOUR: i32 = 24;

/// Upper bound for `minutes`, inclusive for the same reason as [`MAX_HOUR`]
pub const MAX_MINUTE: i32 = 60;

pub const MAX_DAYS_OF_WEEK: usize = 7;

/// A single rule violation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} value {value} is out of range")]
    OutOfRange { field: &'static str, value: i64 },

    #[error("days_of_week accepts at most {MAX_DAYS_OF_WEEK} entries, got {0}")]
    TooManyWeekDays(usize),

    #[error("end_time must be after start_time")]
    EndBeforeStart,
}

/// Every violation found in one trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "invalid trigger: {}", messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

impl DesiredTrigger {
    /// Check the declarative field rules
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push(ValidationError::Empty { field: "name" });
        }
        if self.pipeline.name.trim().is_empty() {
            errors.push(ValidationError::Empty {
                field: "pipeline_name",
            });
        }
        if let FactorySelector::Name {
            resource_group,
            factory_name,
        } = &self.factory
        {
            if resource_group.trim().is_empty() {
                errors.push(ValidationError::Empty {
                    field: "resource_group_name",
                });
            }
            if factory_name.trim().is_empty() {
                errors.push(ValidationError::Empty {
                    field: "data_factory_name",
                });
            }
        }
        if matches!(&self.description, Some(d) if d.is_empty()) {
            errors.push(ValidationError::Empty {
                field: "description",
            });
        }
        if self.annotations.iter().any(|a| a.is_empty()) {
            errors.push(ValidationError::Empty {
                field: "annotations",
            });
        }

        let recurrence = &self.recurrence;
        if recurrence.interval < 1 {
            errors.push(ValidationError::OutOfRange {
                field: "interval",
                value: i64::from(recurrence.interval),
            });
        }
        if let (Some(start), Some(end)) = (recurrence.start_time, recurrence.end_time) {
            if end <= start {
                errors.push(ValidationError::EndBeforeStart);
            }
        }
        if let Some(schedule) = &recurrence.schedule {
            validate_schedule(schedule, &mut errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors(errors))
        }
    }
}

fn validate_schedule(schedule: &RecurrenceSchedule, errors: &mut Vec<ValidationError>) {
    for &day in &schedule.days_of_month {
        if !matches!(day, -31..=-1 | 1..=31) {
            errors.push(ValidationError::OutOfRange {
                field: "days_of_month",
                value: i64::from(day),
            });
        }
    }

    if schedule.days_of_week.len() > MAX_DAYS_OF_WEEK {
        errors.push(ValidationError::TooManyWeekDays(
            schedule.days_of_week.len(),
        ));
    }

    for &hour in &schedule.hours {
        if !(0..=MAX_HOUR).contains(&hour) {
            errors.push(ValidationError::OutOfRange {
                field: "hours",
                value: i64::from(hour),
            });
        }
    }

    for &minute in &schedule.minutes {
        if !(0..=MAX_MINUTE).contains(&minute) {
            errors.push(ValidationError::OutOfRange {
                field: "minutes",
                value: i64::from(minute),
            });
        }
    }

    for occurrence in &schedule.monthly {
        if let Some(week) = occurrence.week {
            if !matches!(week, -5..=-1 | 1..=5) {
                errors.push(ValidationError::OutOfRange {
                    field: "monthly.week",
                    value: i64::from(week),
                });
            }
        }
    }
}
