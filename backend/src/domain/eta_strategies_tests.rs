//! Tests for the schedule and telemetry ETA strategies.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use rstest::rstest;

use super::*;
use crate::domain::ports::{
    MockStopLookup, MockVehiclePositionSource, StopLookupError, VehiclePosition,
    VehiclePositionSourceError,
};
use crate::domain::{Coordinate, StopLocation};
use crate::test_support::{MutableClock, at_local_hour};

fn stop_id(raw: i32) -> StopId {
    StopId::new(raw).expect("valid id")
}

fn simple_at_hour(hour: u32) -> SimpleEtaStrategy {
    SimpleEtaStrategy::new(
        EtaSchedule::default(),
        Arc::new(MutableClock::new(at_local_hour(hour))),
    )
}

#[rstest]
#[case::off_peak_wraps_to_base(60, 12, 180)]
#[case::off_peak_offset(1, 12, 181)]
#[case::off_peak_max_offset(59, 3, 239)]
#[case::morning_peak(60, 7, 360)]
#[case::evening_peak(75, 18, 375)]
#[case::hour_after_peak(75, 19, 195)]
#[tokio::test]
async fn simple_strategy_adds_stop_offset_to_base(
    #[case] raw: i32,
    #[case] hour: u32,
    #[case] expected: u32,
) {
    let estimate = simple_at_hour(hour)
        .estimate(stop_id(raw))
        .await
        .expect("estimate");

    assert_eq!(estimate.seconds, expected);
    assert_eq!(estimate.source.as_str(), SIMPLE_SOURCE);
}

#[tokio::test]
async fn stop_sixty_one_matches_stop_one() {
    let strategy = simple_at_hour(12);
    let first = strategy.estimate(stop_id(1)).await.expect("estimate");
    let wrapped = strategy.estimate(stop_id(61)).await.expect("estimate");
    assert_eq!(first, wrapped);
}

#[test]
fn custom_schedule_uses_configured_bases() {
    let schedule = EtaSchedule::new(100, 500, [22]).expect("valid");
    let strategy = SimpleEtaStrategy::new(schedule, Arc::new(MutableClock::new(Utc::now())));
    assert_eq!(strategy.seconds_at_hour(stop_id(5), 22), 505);
    assert_eq!(strategy.seconds_at_hour(stop_id(5), 7), 105);
}

#[rstest]
#[case(24)]
#[case(99)]
fn schedule_rejects_hours_past_midnight(#[case] hour: u32) {
    let error = EtaSchedule::new(180, 360, [7, hour]).expect_err("invalid hour");
    assert_eq!(error, EtaScheduleError::HourOutOfRange { hour });
}

#[test]
fn default_schedule_peaks_at_commute_hours() {
    let schedule = EtaSchedule::default();
    assert_eq!(schedule.peak_hours().collect::<Vec<_>>(), vec![7, 8, 17, 18]);
}

// Telemetry strategy

const NOW: i64 = 1_780_000_000;

fn now() -> DateTime<Utc> {
    DateTime::from_timestamp(NOW, 0).expect("valid timestamp")
}

fn stop_coordinate() -> Coordinate {
    Coordinate::new(-12.0464, -77.0428).expect("valid")
}

fn stops_returning_stop() -> MockStopLookup {
    let mut stops = MockStopLookup::new();
    stops.expect_find_stop().returning(|id| {
        Ok(Some(StopLocation {
            id,
            name: "Estación Central".to_owned(),
            coordinate: stop_coordinate(),
        }))
    });
    stops
}

fn position(vehicle_id: i32, latitude_offset: f64, age_secs: i64) -> VehiclePosition {
    VehiclePosition {
        vehicle_id,
        coordinate: Coordinate::new(
            stop_coordinate().latitude() + latitude_offset,
            stop_coordinate().longitude(),
        )
        .expect("valid"),
        reported_at: now() - TimeDelta::seconds(age_secs),
    }
}

fn telemetry(
    positions: MockVehiclePositionSource,
    stops: MockStopLookup,
) -> TelemetryEtaStrategy<MockVehiclePositionSource, MockStopLookup> {
    TelemetryEtaStrategy::new(
        Arc::new(positions),
        Arc::new(stops),
        Arc::new(MutableClock::new(now())),
    )
}

#[tokio::test]
async fn telemetry_uses_nearest_fresh_vehicle() {
    let near = position(1, 0.01, 30);
    let far = position(2, 0.05, 10);
    let stale_but_closer = position(3, 0.001, 900);
    let expected_metres = haversine_meters(near.coordinate, stop_coordinate());
    let mut positions = MockVehiclePositionSource::new();
    positions
        .expect_positions_for_stop()
        .times(1)
        .return_once(move |_| Ok(vec![far, near, stale_but_closer]));

    let estimate = telemetry(positions, stops_returning_stop())
        .estimate(stop_id(4))
        .await
        .expect("estimate");

    assert_eq!(estimate.source.as_str(), TELEMETRY_SOURCE);
    assert_eq!(
        estimate.seconds,
        (expected_metres / URBAN_FALLBACK_SPEED_MPS).ceil() as u32
    );
}

#[tokio::test]
async fn telemetry_without_fresh_positions_reports_no_data() {
    let mut positions = MockVehiclePositionSource::new();
    positions
        .expect_positions_for_stop()
        .return_once(|_| Ok(vec![position(1, 0.01, 301), position(2, 0.02, 3_600)]));

    let error = telemetry(positions, stops_returning_stop())
        .estimate(stop_id(4))
        .await
        .expect_err("no data");

    assert!(error.is_no_data());
}

#[tokio::test]
async fn telemetry_freshness_window_is_configurable() {
    let mut positions = MockVehiclePositionSource::new();
    positions
        .expect_positions_for_stop()
        .return_once(|_| Ok(vec![position(1, 0.01, 90)]));

    let error = telemetry(positions, stops_returning_stop())
        .with_freshness(Duration::from_secs(60))
        .estimate(stop_id(4))
        .await
        .expect_err("stale under a one-minute window");

    assert!(error.is_no_data());
}

#[tokio::test]
async fn telemetry_source_failure_is_a_hard_error() {
    let mut positions = MockVehiclePositionSource::new();
    positions
        .expect_positions_for_stop()
        .return_once(|_| Err(VehiclePositionSourceError::connection("pool exhausted")));

    let error = telemetry(positions, stops_returning_stop())
        .estimate(stop_id(4))
        .await
        .expect_err("hard failure");

    assert!(matches!(error, EtaStrategyError::Failed { .. }));
}

#[rstest]
#[case(Ok(None))]
#[case(Err(StopLookupError::query("relation missing")))]
#[tokio::test]
async fn telemetry_requires_a_known_stop(
    #[case] lookup: Result<Option<StopLocation>, StopLookupError>,
) {
    let mut stops = MockStopLookup::new();
    stops.expect_find_stop().return_once(move |_| lookup);
    let mut positions = MockVehiclePositionSource::new();
    positions.expect_positions_for_stop().times(0);

    let error = telemetry(positions, stops)
        .estimate(stop_id(4))
        .await
        .expect_err("hard failure");

    assert!(matches!(error, EtaStrategyError::Failed { .. }));
}
