//! Drift detection between desired and projected state

use crate::codec;
use crate::projector::Projection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trigger_types::{DesiredTrigger, TriggerIdentity};

/// Names of the declarative fields whose remote value differs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftReport {
    pub fields: Vec<String>,
}

impl DriftReport {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    fn note(&mut self, field: &str, changed: bool) {
        if changed {
            self.fields.push(field.to_string());
        }
    }
}

/// Compare desired state against a projection of the remote trigger
///
/// `identity` is the resolved identity of `desired`. Resource groups compare
/// case-insensitively, timestamps compare as instants, and a start time that
/// was never desired is not drift.
pub fn detect_drift(
    desired: &DesiredTrigger,
    identity: &TriggerIdentity,
    projection: &Projection,
) -> DriftReport {
    let mut report = DriftReport::default();
    let recurrence = &desired.recurrence;

    report.note(
        "identity",
        !identity.matches_ignoring_group_case(&projection.identity),
    );
    report.note("description", desired.description != projection.description);
    report.note("frequency", recurrence.frequency != projection.frequency);
    report.note("interval", recurrence.interval != projection.interval);
    if let Some(start) = recurrence.start_time {
        report.note(
            "start_time",
            !same_instant(Some(start), projection.start_time.as_deref()),
        );
    }
    report.note(
        "end_time",
        !same_instant(recurrence.end_time, projection.end_time.as_deref()),
    );

    let normalised = codec::decode(codec::encode(recurrence.schedule.as_ref()).as_ref());
    report.note("schedule", normalised != projection.schedule);

    report.note(
        "pipeline",
        projection.pipeline_name.as_deref() != Some(desired.pipeline.name.as_str()),
    );
    report.note(
        "pipeline_parameters",
        desired.pipeline.parameters != projection.pipeline_parameters,
    );
    report.note("annotations", desired.annotations != projection.annotations);
    report.note("activated", desired.activated != projection.activated);

    report
}

fn same_instant(desired: Option<DateTime<Utc>>, projected: Option<&str>) -> bool {
    match (desired, projected) {
        (None, None) => true,
        (Some(want), Some(have)) => DateTime::parse_from_rfc3339(have)
            .map(|have| have.with_timezone(&Utc) == want)
            .unwrap_or(false),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projector::format_timestamp;
    use chrono::TimeZone;
    use std::collections::BTreeMap;
    use trigger_types::{
        DayOfWeek, FactorySelector, Frequency, PipelineTarget, Recurrence, RecurrenceSchedule,
        RuntimeState,
    };

    fn desired() -> DesiredTrigger {
        DesiredTrigger::new(
            "nightly",
            FactorySelector::Name {
                resource_group: "My-Group".into(),
                factory_name: "factory".into(),
            },
            PipelineTarget::new("load"),
        )
        .with_recurrence(Recurrence::every(2, Frequency::Week).with_schedule(
            RecurrenceSchedule {
                days_of_week: vec![DayOfWeek::Monday],
                ..Default::default()
            },
        ))
        .activated(true)
    }

    fn identity() -> TriggerIdentity {
        TriggerIdentity::new("sub", "My-Group", "factory", "nightly")
    }

    fn matching_projection() -> Projection {
        Projection {
            identity: identity(),
            description: None,
            frequency: Frequency::Week,
            interval: 2,
            start_time: Some("2024-01-01T00:00:00Z".into()),
            end_time: None,
            schedule: RecurrenceSchedule {
                days_of_week: vec![DayOfWeek::Monday],
                ..Default::default()
            },
            pipeline_name: Some("load".into()),
            pipeline_parameters: BTreeMap::new(),
            annotations: vec![],
            activated: true,
            runtime_state: RuntimeState::Started,
        }
    }

    #[test]
    fn test_converged_has_no_drift() {
        let report = detect_drift(&desired(), &identity(), &matching_projection());
        assert!(report.is_empty(), "unexpected drift: {:?}", report.fields);
    }

    #[test]
    fn test_group_case_is_not_drift() {
        let mut projection = matching_projection();
        projection.identity.resource_group = "my-group".into();

        let report = detect_drift(&desired(), &identity(), &projection);
        assert!(report.is_empty());
    }

    #[test]
    fn test_other_identity_is_drift() {
        let mut projection = matching_projection();
        projection.identity.factory_name = "other".into();

        let report = detect_drift(&desired(), &identity(), &projection);
        assert!(report.contains("identity"));
    }

    #[test]
    fn test_start_time_compared_as_instant() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut wanted = desired();
        wanted.recurrence.start_time = Some(start);

        let mut projection = matching_projection();
        projection.start_time = Some("2024-01-01T01:00:00+01:00".into());
        assert!(detect_drift(&wanted, &identity(), &projection).is_empty());

        projection.start_time = Some(format_timestamp(&(start + chrono::Duration::hours(1))));
        assert!(detect_drift(&wanted, &identity(), &projection).contains("start_time"));
    }

    #[test]
    fn test_activation_only_drift() {
        let mut projection = matching_projection();
        projection.activated = false;

        let report = detect_drift(&desired(), &identity(), &projection);
        assert_eq!(report.fields, vec!["activated".to_string()]);
    }

    #[test]
    fn test_empty_schedule_matches_absent() {
        let mut wanted = desired();
        wanted.recurrence.schedule = Some(RecurrenceSchedule::default());

        let mut projection = matching_projection();
        projection.schedule = RecurrenceSchedule::default();

        assert!(!detect_drift(&wanted, &identity(), &projection).contains("schedule"));
    }
}
