//! Reconciliation cycles driven against the in-memory remote.

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use trigger_client::{ClientError, InMemoryTriggerClient, RemoteOperation, RemoteTriggerClient};
use trigger_control::{
    ControllerConfig, FixedClock, Observation, Projection, ReconcileController, ReconcileError,
    ReconcileOperation, RequestContext, TimeoutConfig, TriggerEvent, TriggerPhase,
};
use trigger_types::{
    DayOfWeek, DesiredTrigger, FactoryId, FactorySelector, Frequency, OtherTriggerProperties,
    PipelineTarget, Recurrence, RecurrenceSchedule, RuntimeState, TriggerIdentity,
    TriggerProperties,
};

const SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000001";

struct Harness {
    client: Arc<InMemoryTriggerClient>,
    clock: Arc<FixedClock>,
    controller: ReconcileController,
}

fn start_of_test() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, 8, 9, 15, 0).unwrap()
}

fn harness_with(client: InMemoryTriggerClient, timeouts: TimeoutConfig) -> Harness {
    let client = Arc::new(client);
    let clock = Arc::new(FixedClock::new(start_of_test()));
    let config = ControllerConfig {
        timeouts,
        ..Default::default()
    };
    let controller = ReconcileController::new(client.clone(), clock.clone(), config);
    Harness {
        client,
        clock,
        controller,
    }
}

fn harness() -> Harness {
    harness_with(InMemoryTriggerClient::new(), TimeoutConfig::default())
}

fn weekly(activated: bool) -> DesiredTrigger {
    DesiredTrigger::new(
        "weekly-load",
        FactorySelector::Name {
            resource_group: "Analytics-RG".into(),
            factory_name: "warehouse".into(),
        },
        PipelineTarget::new("p1"),
    )
    .with_recurrence(Recurrence::every(2, Frequency::Week).with_schedule(
        RecurrenceSchedule {
            days_of_week: vec![DayOfWeek::Monday, DayOfWeek::Wednesday],
            ..Default::default()
        },
    ))
    .activated(activated)
}

async fn projection(h: &Harness, identity: &TriggerIdentity) -> Projection {
    match h
        .controller
        .read(identity, &RequestContext::default())
        .await
        .unwrap()
    {
        Observation::Present(projection) => projection,
        Observation::Absent => panic!("trigger {identity} is absent"),
    }
}

// ========== Create ==========

#[tokio::test]
async fn test_weekly_scenario() {
    let h = harness();
    let identity = h
        .controller
        .create(&weekly(true), SUBSCRIPTION, &RequestContext::default())
        .await
        .unwrap();

    let state = projection(&h, &identity).await;
    assert_eq!(state.frequency, Frequency::Week);
    assert_eq!(state.interval, 2);
    assert_eq!(
        state.schedule.days_of_week,
        vec![DayOfWeek::Monday, DayOfWeek::Wednesday]
    );
    assert!(state.schedule.hours.is_empty());
    assert!(state.activated);
    assert_eq!(state.pipeline_name.as_deref(), Some("p1"));
    assert_eq!(state.start_time.as_deref(), Some("2024-04-08T09:15:00Z"));

    // Unset schedule fields are never sent
    let remote = h.client.trigger(&identity).await.unwrap();
    let schedule = remote
        .properties
        .as_schedule()
        .and_then(|p| p.recurrence.as_ref())
        .and_then(|r| r.schedule.as_ref())
        .cloned()
        .unwrap();
    assert!(schedule.hours.is_none());
    assert!(schedule.minutes.is_none());
}

#[tokio::test]
async fn test_create_inactive_never_starts() {
    let h = harness();
    let identity = h
        .controller
        .create(&weekly(false), SUBSCRIPTION, &RequestContext::default())
        .await
        .unwrap();

    assert_eq!(
        h.client.operations().await,
        vec![RemoteOperation::Get, RemoteOperation::CreateOrUpdate]
    );
    assert!(!projection(&h, &identity).await.activated);
}

#[tokio::test]
async fn test_create_active_starts_after_definition() {
    let h = harness();
    let identity = h
        .controller
        .create(&weekly(true), SUBSCRIPTION, &RequestContext::default())
        .await
        .unwrap();

    assert_eq!(
        h.client.operations().await,
        vec![
            RemoteOperation::Get,
            RemoteOperation::CreateOrUpdate,
            RemoteOperation::Start
        ]
    );
    assert!(projection(&h, &identity).await.activated);
}

#[tokio::test]
async fn test_create_existing_is_already_exists() {
    let h = harness();
    let identity = weekly(false)
        .factory
        .resolve(SUBSCRIPTION, "weekly-load");
    h.client
        .insert(
            &identity,
            TriggerProperties::ScheduleTrigger(Default::default()),
        )
        .await;

    let err = h
        .controller
        .create(&weekly(false), SUBSCRIPTION, &RequestContext::default())
        .await
        .unwrap_err();

    match &err {
        ReconcileError::AlreadyExists { id } => assert_eq!(id, &identity.address_path()),
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("needs to be imported"));
    assert_eq!(h.client.operations().await, vec![RemoteOperation::Get]);
}

#[tokio::test]
async fn test_create_by_factory_id() {
    let h = harness();
    let factory: FactoryId = format!(
        "/subscriptions/{SUBSCRIPTION}/resourceGroups/rg/providers/Microsoft.DataFactory/factories/warehouse"
    )
    .parse()
    .unwrap();
    let mut desired = weekly(false);
    desired.factory = FactorySelector::Id {
        factory_id: factory.clone(),
    };

    let identity = h
        .controller
        .create(&desired, "ignored-subscription", &RequestContext::default())
        .await
        .unwrap();
    assert_eq!(identity, factory.trigger("weekly-load"));
}

#[tokio::test]
async fn test_start_failure_keeps_definition() {
    let h = harness();
    h.client
        .fail_on(RemoteOperation::Start, ClientError::remote(409, "busy"))
        .await;

    let err = h
        .controller
        .create(&weekly(true), SUBSCRIPTION, &RequestContext::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::StartFailed { .. }));

    let identity = weekly(true).factory.resolve(SUBSCRIPTION, "weekly-load");
    let remote = h.client.trigger(&identity).await.unwrap();
    assert_eq!(remote.properties.runtime_state(), RuntimeState::Stopped);
}

// ========== Update ==========

#[tokio::test]
async fn test_deactivation_stops_without_delete() {
    let h = harness();
    let ctx = RequestContext::default();
    let identity = h
        .controller
        .create(&weekly(true), SUBSCRIPTION, &ctx)
        .await
        .unwrap();
    let before = projection(&h, &identity).await;
    h.client.clear_calls().await;

    h.controller
        .update(&identity, &weekly(false), &ctx)
        .await
        .unwrap();

    let operations = h.client.operations().await;
    assert!(operations.contains(&RemoteOperation::Stop));
    assert!(!operations.contains(&RemoteOperation::Delete));
    assert!(!operations.contains(&RemoteOperation::CreateOrUpdate));

    let after = projection(&h, &identity).await;
    assert!(!after.activated);
    assert_eq!(
        Projection {
            activated: true,
            runtime_state: RuntimeState::Started,
            ..after
        },
        before
    );
}

#[tokio::test]
async fn test_update_keeps_remote_start_time() {
    let h = harness();
    let ctx = RequestContext::default();
    let identity = h
        .controller
        .create(&weekly(false), SUBSCRIPTION, &ctx)
        .await
        .unwrap();

    h.clock.advance(Duration::from_secs(3600));
    let mut changed = weekly(false);
    changed.recurrence.interval = 3;
    h.controller.update(&identity, &changed, &ctx).await.unwrap();

    let state = projection(&h, &identity).await;
    assert_eq!(state.interval, 3);
    assert_eq!(state.start_time.as_deref(), Some("2024-04-08T09:15:00Z"));
}

#[tokio::test]
async fn test_update_activates_and_rewrites_definition() {
    let h = harness();
    let ctx = RequestContext::default();
    let identity = h
        .controller
        .create(&weekly(false), SUBSCRIPTION, &ctx)
        .await
        .unwrap();
    h.client.clear_calls().await;

    let desired = weekly(true)
        .with_description("twice a month")
        .with_annotations(["team:data"]);
    h.controller.update(&identity, &desired, &ctx).await.unwrap();

    assert_eq!(
        h.client.operations().await,
        vec![
            RemoteOperation::Get,
            RemoteOperation::CreateOrUpdate,
            RemoteOperation::Start
        ]
    );
    let state = projection(&h, &identity).await;
    assert!(state.activated);
    assert_eq!(state.description.as_deref(), Some("twice a month"));
    assert_eq!(state.annotations, vec!["team:data".to_string()]);
}

#[tokio::test]
async fn test_update_foreign_kind_is_classification_error() {
    let h = harness();
    let identity = TriggerIdentity::new(SUBSCRIPTION, "rg", "warehouse", "blob");
    h.client
        .insert(
            &identity,
            TriggerProperties::BlobEventsTrigger(OtherTriggerProperties::default()),
        )
        .await;

    let err = h
        .controller
        .update(&identity, &weekly(true), &RequestContext::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::Classification { .. }));
    assert!(!err.is_retryable());
    assert_eq!(h.client.operations().await, vec![RemoteOperation::Get]);
}

// ========== Delete ==========

#[tokio::test]
async fn test_delete_stops_even_when_stopped() {
    let h = harness();
    let ctx = RequestContext::default();
    let identity = h
        .controller
        .create(&weekly(false), SUBSCRIPTION, &ctx)
        .await
        .unwrap();
    h.client.clear_calls().await;

    h.controller.delete(&identity, &ctx).await.unwrap();

    assert_eq!(
        h.client.operations().await,
        vec![RemoteOperation::Stop, RemoteOperation::Delete]
    );
    assert!(h.client.trigger(&identity).await.is_none());
    assert_eq!(
        h.controller.read(&identity, &ctx).await.unwrap(),
        Observation::Absent
    );
}

#[tokio::test]
async fn test_delete_running_trigger() {
    let h = harness();
    let ctx = RequestContext::default();
    let identity = h
        .controller
        .create(&weekly(true), SUBSCRIPTION, &ctx)
        .await
        .unwrap();

    h.controller.delete(&identity, &ctx).await.unwrap();
    assert!(h.client.trigger(&identity).await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_stop_timeout_fails_closed() {
    let h = harness_with(
        InMemoryTriggerClient::new(),
        TimeoutConfig::uniform(Duration::from_secs(60)),
    );
    let ctx = RequestContext::default();
    let identity = h
        .controller
        .create(&weekly(true), SUBSCRIPTION, &ctx)
        .await
        .unwrap();
    h.client.stall(RemoteOperation::Stop).await;
    h.client.clear_calls().await;

    let err = h.controller.delete(&identity, &ctx).await.unwrap_err();

    assert!(matches!(
        err,
        ReconcileError::Timeout {
            operation: ReconcileOperation::Stop,
            ..
        }
    ));
    assert_eq!(h.client.operations().await, vec![RemoteOperation::Stop]);
    assert!(h.client.trigger(&identity).await.is_some());
}

#[tokio::test]
async fn test_cancelled_delete_fails_closed() {
    let h = harness();
    let identity = h
        .controller
        .create(&weekly(true), SUBSCRIPTION, &RequestContext::default())
        .await
        .unwrap();
    h.client.stall(RemoteOperation::Stop).await;

    let ctx = RequestContext::user("operator");
    let cancel = ctx.cancellation.clone();
    let delete = h.controller.delete(&identity, &ctx);
    tokio::pin!(delete);

    tokio::select! {
        _ = &mut delete => panic!("delete finished while stop was stalled"),
        _ = tokio::time::sleep(Duration::from_millis(20)) => cancel.cancel(),
    }
    let err = delete.await.unwrap_err();

    assert!(err.is_timeout());
    assert!(h.client.trigger(&identity).await.is_some());
}

#[tokio::test]
async fn test_cancelled_caller_stops_waiting_for_busy_trigger() {
    let h = harness();
    let identity = h
        .controller
        .create(&weekly(true), SUBSCRIPTION, &RequestContext::default())
        .await
        .unwrap();
    h.client.stall(RemoteOperation::Stop).await;

    let delete_ctx = RequestContext::default();
    let delete = h.controller.delete(&identity, &delete_ctx);
    tokio::pin!(delete);
    tokio::select! {
        _ = &mut delete => panic!("delete finished while stop was stalled"),
        _ = tokio::time::sleep(Duration::from_millis(20)) => {}
    }

    let read_ctx = RequestContext::user("operator");
    read_ctx.cancel();
    let err = h.controller.read(&identity, &read_ctx).await.unwrap_err();

    assert!(matches!(
        err,
        ReconcileError::Timeout {
            operation: ReconcileOperation::LockWait,
            ..
        }
    ));
    assert_eq!(err.identity(), Some(&identity));
}

#[tokio::test]
async fn test_unbounded_budgets_still_reconcile() {
    let h = harness_with(
        InMemoryTriggerClient::new(),
        TimeoutConfig::uniform(Duration::from_secs(u64::MAX)),
    );
    let ctx = RequestContext::default();

    let identity = h
        .controller
        .create(&weekly(true), SUBSCRIPTION, &ctx)
        .await
        .unwrap();
    assert!(projection(&h, &identity).await.activated);

    h.controller.delete(&identity, &ctx).await.unwrap();
    assert!(h.client.trigger(&identity).await.is_none());
}

#[tokio::test]
async fn test_stop_failure_skips_delete() {
    let h = harness();
    let ctx = RequestContext::default();
    let identity = h
        .controller
        .create(&weekly(true), SUBSCRIPTION, &ctx)
        .await
        .unwrap();
    h.client
        .fail_on(RemoteOperation::Stop, ClientError::Transport("reset".into()))
        .await;
    h.client.clear_calls().await;

    let err = h.controller.delete(&identity, &ctx).await.unwrap_err();
    assert!(matches!(err, ReconcileError::StopFailed { .. }));
    assert_eq!(h.client.operations().await, vec![RemoteOperation::Stop]);
    assert!(h.client.trigger(&identity).await.is_some());
}

// ========== Read, import and drift ==========

#[tokio::test]
async fn test_group_case_echo_is_not_drift() {
    let h = harness_with(
        InMemoryTriggerClient::with_lowercase_group_echo(),
        TimeoutConfig::default(),
    );
    let ctx = RequestContext::default();
    let desired = weekly(true);
    let identity = h
        .controller
        .create(&desired, SUBSCRIPTION, &ctx)
        .await
        .unwrap();

    let remote = h.client.get(&identity).await.unwrap().unwrap();
    assert!(remote.id.contains("/resourceGroups/analytics-rg/"));

    let state = projection(&h, &identity).await;
    assert_eq!(state.identity.resource_group, "Analytics-RG");

    let phase = h
        .controller
        .observe(&identity, &desired, &ctx)
        .await
        .unwrap();
    assert_eq!(phase, TriggerPhase::Converged { activated: true });
}

#[tokio::test]
async fn test_observe_reports_drift_and_absence() {
    let h = harness();
    let ctx = RequestContext::default();
    let identity = h
        .controller
        .create(&weekly(true), SUBSCRIPTION, &ctx)
        .await
        .unwrap();
    let mut rx = h.controller.subscribe();

    let mut wanted = weekly(true);
    wanted.recurrence.interval = 4;
    match h.controller.observe(&identity, &wanted, &ctx).await.unwrap() {
        TriggerPhase::DefinitionOnly { drift } => {
            assert_eq!(drift.fields, vec!["interval".to_string()]);
        }
        other => panic!("unexpected phase: {other:?}"),
    }
    let envelope = rx.try_recv().unwrap();
    assert!(matches!(envelope.event, TriggerEvent::DriftDetected { .. }));

    h.controller.delete(&identity, &ctx).await.unwrap();
    assert_eq!(
        h.controller.observe(&identity, &wanted, &ctx).await.unwrap(),
        TriggerPhase::Absent
    );
}

#[tokio::test]
async fn test_import_existing_trigger() {
    let h = harness();
    let ctx = RequestContext::default();
    let identity = h
        .controller
        .create(&weekly(true), SUBSCRIPTION, &ctx)
        .await
        .unwrap();

    let imported = h
        .controller
        .import(&identity.address_path(), &ctx)
        .await
        .unwrap();
    assert_eq!(imported.identity, identity);
    assert!(imported.activated);
}

#[tokio::test]
async fn test_import_validates_path_before_reading() {
    let h = harness();
    let ctx = RequestContext::default();

    let err = h
        .controller
        .import("/subscriptions/s/resourceGroups/rg", &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::Parse(_)));
    assert!(h.client.calls().await.is_empty());

    let missing = TriggerIdentity::new(SUBSCRIPTION, "rg", "warehouse", "missing");
    let err = h
        .controller
        .import(&missing.address_path(), &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::NotFound { .. }));
}

#[tokio::test]
async fn test_read_failure_is_surfaced() {
    let h = harness();
    let identity = TriggerIdentity::new(SUBSCRIPTION, "rg", "warehouse", "t");
    h.client
        .fail_on(RemoteOperation::Get, ClientError::remote(500, "internal"))
        .await;

    let err = h
        .controller
        .read(&identity, &RequestContext::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::ReadFailed { .. }));
    assert!(err.is_retryable());
}

// ========== Events and concurrency ==========

#[tokio::test]
async fn test_events_follow_remote_changes() {
    let h = harness();
    let mut rx = h.controller.subscribe();
    let ctx = RequestContext::service("deployer");

    let identity = h
        .controller
        .create(&weekly(true), SUBSCRIPTION, &ctx)
        .await
        .unwrap();
    h.controller.delete(&identity, &ctx).await.unwrap();

    let mut events = Vec::new();
    while let Ok(envelope) = rx.try_recv() {
        assert_eq!(envelope.request_id, ctx.request_id);
        assert_eq!(envelope.actor, "service:deployer");
        events.push(envelope.event);
    }

    assert!(matches!(
        events[0],
        TriggerEvent::DefinitionApplied { created: true, .. }
    ));
    assert!(matches!(events[1], TriggerEvent::Started { .. }));
    assert!(matches!(events[2], TriggerEvent::Stopped { .. }));
    assert!(matches!(events[3], TriggerEvent::Deleted { .. }));
    assert_eq!(events.len(), 4);
}

#[tokio::test]
async fn test_distinct_identities_reconcile_concurrently() {
    let h = harness();
    let ctx = RequestContext::default();
    let mut second = weekly(true);
    second.name = "weekly-backfill".into();
    let first = weekly(true);

    let (a, b) = tokio::join!(
        h.controller.create(&first, SUBSCRIPTION, &ctx),
        h.controller.create(&second, SUBSCRIPTION, &ctx),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_ne!(a, b);
    assert!(projection(&h, &a).await.activated);
    assert!(projection(&h, &b).await.activated);
}
