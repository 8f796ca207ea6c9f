//! Pipeline coordinator behaviour against the in-memory registry.

mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::*;
use farm_orchestrator::config::PipelineConfig;
use farm_orchestrator::constants::PeriodKind;
use farm_orchestrator::error::OrchestratorError;
use farm_orchestrator::models::{Enrollment, Farm};
use farm_orchestrator::orchestration::{PipelineCoordinator, StageRunner};
use farm_orchestrator::registry::{EntityRegistry, InMemoryFarmStore};
use farm_orchestrator::state_machine::PipelineState;

#[tokio::test]
async fn test_weekly_run_skips_farm_without_coordinates_and_aggregates_once() {
    let aggregation = Arc::new(RecordingAggregation::new());
    let coordinator = PipelineCoordinator::new(
        three_farm_store(),
        aggregation.clone(),
        &PipelineConfig::default(),
    );

    let run = coordinator.run_scheduled(PeriodKind::Week).await.unwrap();

    assert_eq!(run.state(), PipelineState::Done);
    assert_eq!(run.target_count(), 3);

    let stats = run.stats_stage().unwrap();
    assert_eq!(stats.succeeded, 3);
    assert!(stats.failed.is_empty());

    let weather = run.weather_stage().unwrap();
    assert_eq!(weather.succeeded, 3);
    assert_eq!(weather.skipped, 1);
    assert!(weather.failed.is_empty());

    assert_eq!(aggregation.calls(), vec![(PeriodKind::Week, 4)]);
}

#[tokio::test]
async fn test_aggregation_runs_even_when_weather_fails_for_every_farm() {
    let aggregation = Arc::new(RecordingAggregation::new());
    let coordinator = PipelineCoordinator::new(
        three_farm_store(),
        aggregation.clone(),
        &PipelineConfig::default(),
    )
    .with_operations(
        Arc::new(ScriptedOperation::succeeding()),
        Arc::new(ScriptedOperation::failing_all()),
    );

    let run = coordinator.run_scheduled(PeriodKind::Month).await.unwrap();

    assert_eq!(run.state(), PipelineState::Done);
    let weather = run.weather_stage().unwrap();
    assert_eq!(weather.succeeded, 0);
    assert_eq!(weather.failed_farm_ids(), vec![1, 2, 3]);
    assert_eq!(aggregation.calls().len(), 1);
}

#[tokio::test]
async fn test_aggregation_failure_ends_run_in_failed_state() {
    let aggregation = Arc::new(RecordingAggregation::failing("deadlock detected"));
    let coordinator = PipelineCoordinator::new(
        three_farm_store(),
        aggregation.clone(),
        &PipelineConfig::default(),
    );

    let error = coordinator
        .run_scheduled(PeriodKind::Quarter)
        .await
        .unwrap_err();

    assert!(matches!(error, OrchestratorError::AggregationFailed { .. }));
    assert!(error.is_fatal_to_run());
    assert_eq!(aggregation.calls(), vec![(PeriodKind::Quarter, 4)]);

    let runs = coordinator.recent_runs();
    assert_eq!(runs.len(), 1);
    let run = &runs[0];
    assert_eq!(run.state(), PipelineState::Failed);
    assert!(run.failure_reason().unwrap().contains("deadlock detected"));
    assert!(run.ended_at().is_some());
    // Ingest stages had already completed before aggregation failed
    assert!(run.stats_stage().is_some());
    assert!(run.weather_stage().is_some());
}

#[tokio::test]
async fn test_partial_stage_failures_are_recorded_not_propagated() {
    let aggregation = Arc::new(RecordingAggregation::new());
    let stats = Arc::new(ScriptedOperation::failing_for([2]));
    let coordinator = PipelineCoordinator::new(
        three_farm_store(),
        aggregation.clone(),
        &PipelineConfig::default(),
    )
    .with_operations(stats.clone(), Arc::new(ScriptedOperation::succeeding()));

    let run = coordinator.run_scheduled(PeriodKind::Week).await.unwrap();

    let stats_stage = run.stats_stage().unwrap();
    assert_eq!(stats_stage.succeeded, 2);
    assert_eq!(stats_stage.failed_farm_ids(), vec![2]);
    assert!(stats_stage.is_degraded());

    let mut seen = stats.seen();
    seen.sort_unstable();
    assert_eq!(seen, vec![1, 2, 3]);
    assert_eq!(aggregation.calls().len(), 1);
}

#[tokio::test]
async fn test_bounded_stage_runner_produces_same_outcome() {
    let aggregation = Arc::new(RecordingAggregation::new());
    let coordinator = PipelineCoordinator::new(
        three_farm_store(),
        aggregation.clone(),
        &PipelineConfig::default(),
    )
    .with_stage_runner(
        StageRunner::new()
            .with_max_concurrency(1)
            .with_operation_timeout(std::time::Duration::from_secs(5)),
    );

    let run = coordinator.run_scheduled(PeriodKind::Week).await.unwrap();

    assert_eq!(run.state(), PipelineState::Done);
    assert_eq!(run.stats_stage().unwrap().succeeded, 3);
}

#[tokio::test]
async fn test_only_active_auto_enrollments_are_targeted_in_id_order() {
    let store = Arc::new(InMemoryFarmStore::new());
    let today = Utc::now().date_naive();

    store.insert_auto_enrolled(Farm::new(30, "Thirty"));
    store.insert_auto_enrolled(Farm::new(10, "Ten"));
    store.insert_auto_enrolled(Farm::new(20, "Twenty"));

    // Inactive farm
    store.insert_auto_enrolled(Farm::new(5, "Fallow").inactive());

    // Stopped today
    store.insert_farm(Farm::new(40, "Stopped"));
    let mut stopped = Enrollment::auto(40, today - Duration::days(30));
    stopped.stopped_on = Some(today);
    store.insert_enrollment(stopped);

    // Expired yesterday
    store.insert_farm(Farm::new(50, "Expired"));
    let mut expired = Enrollment::auto(50, today - Duration::days(30));
    expired.expires_on = Some(today - Duration::days(1));
    store.insert_enrollment(expired);

    // Activates tomorrow
    store.insert_farm(Farm::new(60, "Future"));
    store.insert_enrollment(Enrollment::auto(60, today + Duration::days(1)));

    // Manual enrollment is excluded from the schedule
    store.insert_farm(Farm::new(70, "Manual"));
    let mut manual = Enrollment::auto(70, today);
    manual.registration_mode = "MANUAL".to_string();
    store.insert_enrollment(manual);

    let first = store.list_scheduled_targets(PeriodKind::Week).await.unwrap();
    let second = store.list_scheduled_targets(PeriodKind::Week).await.unwrap();

    let ids: Vec<i64> = first.iter().map(|farm| farm.farm_id).collect();
    assert_eq!(ids, vec![10, 20, 30]);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_registry_outage_is_fatal_and_skips_aggregation() {
    let store = three_farm_store();
    store.set_registry_unavailable(true);
    let aggregation = Arc::new(RecordingAggregation::new());
    let coordinator =
        PipelineCoordinator::new(store, aggregation.clone(), &PipelineConfig::default());

    let error = coordinator.run_scheduled(PeriodKind::Week).await.unwrap_err();

    assert!(matches!(error, OrchestratorError::RegistryUnavailable(_)));
    assert!(aggregation.calls().is_empty());
    assert_eq!(coordinator.recent_runs()[0].state(), PipelineState::Failed);
}

#[tokio::test]
async fn test_stages_run_strictly_in_sequence() {
    let log = EventLog::new();
    let step = std::time::Duration::from_millis(20);
    let coordinator = PipelineCoordinator::new(
        three_farm_store(),
        Arc::new(LoggingAggregation::new(log.clone())),
        &PipelineConfig::default(),
    )
    .with_operations(
        Arc::new(LoggingOperation::new("stats", log.clone(), step)),
        Arc::new(LoggingOperation::new("weather", log.clone(), step)),
    );

    let run = coordinator.run_scheduled(PeriodKind::Week).await.unwrap();
    assert_eq!(run.state(), PipelineState::Done);

    let stats_done = log.positions("stats_done:");
    let weather_start = log.positions("weather_start:");
    let weather_done = log.positions("weather_done:");
    let aggregate = log.positions("aggregate:");

    assert_eq!(stats_done.len(), 3, "events: {:?}", log.events());
    assert_eq!(weather_start.len(), 3, "events: {:?}", log.events());
    assert_eq!(aggregate.len(), 1, "events: {:?}", log.events());
    assert!(
        stats_done.iter().max() < weather_start.iter().min(),
        "weather started before stats finished: {:?}",
        log.events()
    );
    assert!(
        weather_done.iter().max() < aggregate.iter().min(),
        "aggregation started before weather finished: {:?}",
        log.events()
    );
}
