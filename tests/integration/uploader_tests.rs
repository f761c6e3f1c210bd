//! Telemetry uploader against the simulated collector: retry budget,
//! per-attempt sessions, link waiting and input validation.

use aquamon::adapters::http::SimCollector;
use aquamon::alerts::{AlertSnapshot, AlertThresholds};
use aquamon::app::ports::{AlertSender, TelemetryPort, TransportError};
use aquamon::config::SystemConfig;
use aquamon::control::ControlState;
use aquamon::error::{DeliveryFailure, SensorFault, UploadError};
use aquamon::network::ConnectivityFlag;
use aquamon::retry::RetryPolicy;
use aquamon::sensors::{SensorKind, SensorReading, SensorSnapshot};
use aquamon::telemetry::{ApiCredentials, AttemptOutcome, TelemetryUploader, UploadAttempt};

use crate::mock_hw::{MockClock, healthy};

fn uploader(
    collector: &SimCollector,
    clock: &MockClock,
    online: bool,
    config: &SystemConfig,
) -> TelemetryUploader<SimCollector, MockClock> {
    TelemetryUploader::new(
        collector.clone(),
        clock.clone(),
        ConnectivityFlag::new(online),
        ApiCredentials::new("anon-key", "jwt").unwrap(),
        config,
    )
}

fn upload(
    u: &mut TelemetryUploader<SimCollector, MockClock>,
    snapshot: &SensorSnapshot,
) -> Result<UploadAttempt, UploadError> {
    u.upload(snapshot, &ControlState::default())
        .and_then(UploadAttempt::into_result)
}

#[test]
fn three_server_errors_exhaust_the_budget() {
    let collector = SimCollector::new();
    collector.reply(Ok(500)).reply(Ok(500)).reply(Ok(500));
    let clock = MockClock::new();
    let mut u = uploader(&collector, &clock, true, &SystemConfig::default());

    let err = upload(&mut u, &healthy()).unwrap_err();
    assert_eq!(
        err,
        UploadError::PermanentUploadFailure {
            attempts: 3,
            last: DeliveryFailure::Rejected(500),
        }
    );
    assert!(err.reached_collector());
    assert_eq!(collector.sessions(), 3);
    assert_eq!(clock.sleeps(), vec![1000, 2000]);
}

#[test]
fn transport_failures_are_not_collector_rejections() {
    let collector = SimCollector::new();
    for _ in 0..3 {
        collector.reply(Err(TransportError));
    }
    let clock = MockClock::new();
    let mut u = uploader(&collector, &clock, true, &SystemConfig::default());

    let attempt = u.upload(&healthy(), &ControlState::default()).unwrap();
    assert_eq!(attempt.outcome(), AttemptOutcome::PermanentFailure);
    assert_eq!(attempt.last_failure(), Some(DeliveryFailure::Transport));
    assert!(!attempt.clone().into_result().unwrap_err().reached_collector());
    assert_eq!(attempt.retries_used(), 2);
}

#[test]
fn recovers_on_second_attempt() {
    let collector = SimCollector::new();
    collector.reply(Ok(502));
    let clock = MockClock::new();
    let mut u = uploader(&collector, &clock, true, &SystemConfig::default());

    let attempt = upload(&mut u, &healthy()).unwrap();
    assert_eq!(attempt.attempts(), 2);
    assert_eq!(attempt.retries_used(), 1);
    assert_eq!(collector.sessions(), 2);
    assert_eq!(clock.sleeps(), vec![1000]);
    // Both attempts carried the same document.
    let reqs = collector.requests();
    assert_eq!(reqs[0].body, reqs[1].body);
}

#[test]
fn policy_comes_from_config() {
    let collector = SimCollector::new();
    for _ in 0..5 {
        collector.reply(Ok(503));
    }
    let clock = MockClock::new();
    let config = SystemConfig {
        upload_policy: RetryPolicy::new(5, 200, 3),
        ..Default::default()
    };
    let mut u = uploader(&collector, &clock, true, &config);

    let err = upload(&mut u, &healthy()).unwrap_err();
    assert!(matches!(
        err,
        UploadError::PermanentUploadFailure { attempts: 5, .. }
    ));
    assert_eq!(clock.sleeps(), vec![200, 600, 1800, 5400]);
}

#[test]
fn offline_never_touches_http() {
    let collector = SimCollector::new();
    let clock = MockClock::new();
    let mut u = uploader(&collector, &clock, false, &SystemConfig::default());

    assert_eq!(
        upload(&mut u, &healthy()),
        Err(UploadError::ConnectivityUnavailable)
    );
    assert_eq!(collector.sessions(), 0);
    assert_eq!(clock.sleeps(), vec![1000, 1000, 1000]);
}

#[test]
fn out_of_range_value_is_refused_before_sending() {
    let collector = SimCollector::new();
    let clock = MockClock::new();
    let mut u = uploader(&collector, &clock, true, &SystemConfig::default());

    let mut snapshot = healthy();
    snapshot.set(SensorReading {
        kind: SensorKind::Humidity,
        outcome: Ok(140.0),
    });
    assert_eq!(
        upload(&mut u, &snapshot),
        Err(UploadError::InvalidReading(SensorKind::Humidity))
    );
    assert_eq!(collector.sessions(), 0);
}

#[test]
fn readings_in_error_are_still_uploaded() {
    let collector = SimCollector::new();
    let clock = MockClock::new();
    let mut u = uploader(&collector, &clock, true, &SystemConfig::default());

    let snapshot = SensorSnapshot::all_failed(SensorFault::ChecksumMismatch);
    assert!(upload(&mut u, &snapshot).is_ok());
    assert_eq!(collector.requests().len(), 1);
}

#[test]
fn alerts_go_to_the_alert_endpoint() {
    let collector = SimCollector::new();
    let clock = MockClock::new();
    let mut u = uploader(&collector, &clock, true, &SystemConfig::default());

    let alert = AlertSnapshot::evaluate(
        &healthy().with(SensorKind::Ph, 9.0),
        &AlertThresholds::default(),
    );
    let attempt = u.send_alert(&alert).unwrap();
    assert!(attempt.delivered());

    let reqs = collector.requests();
    assert_eq!(reqs[0].url, u.alert_url());
    assert!(u.alert_url().ends_with("/alerts"));
    assert_eq!(reqs[0].header("apikey"), Some("anon-key"));
}
