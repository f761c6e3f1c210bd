//! Full monitoring cycles: sample → control → upload → alert, against the
//! simulated collector and recording mocks.

use aquamon::adapters::http::SimCollector;
use aquamon::alerts::AlertFlag;
use aquamon::app::events::AppEvent;
use aquamon::app::ports::TransportError;
use aquamon::app::service::{CycleOutcome, MonitorService};
use aquamon::config::SystemConfig;
use aquamon::error::{SensorFault, UploadError};
use aquamon::network::ConnectivityFlag;
use aquamon::pins;
use aquamon::sensors::{SensorKind, SensorSnapshot};
use aquamon::telemetry::{ApiCredentials, TelemetryUploader};

use crate::mock_hw::{
    CountingLiveness, MockClock, RecordingOutputs, RecordingSink, ScriptedSensors, healthy,
};

struct Rig {
    service: MonitorService,
    sensors: ScriptedSensors,
    outputs: RecordingOutputs,
    uplink: TelemetryUploader<SimCollector, MockClock>,
    liveness: CountingLiveness,
    sink: RecordingSink,
    collector: SimCollector,
    clock: MockClock,
    link: ConnectivityFlag,
}

impl Rig {
    fn new(snapshots: impl IntoIterator<Item = SensorSnapshot>, online: bool) -> Self {
        let config = SystemConfig::default();
        let collector = SimCollector::new();
        let clock = MockClock::new();
        let link = ConnectivityFlag::new(online);
        let uplink = TelemetryUploader::new(
            collector.clone(),
            clock.clone(),
            link.clone(),
            ApiCredentials::new("anon-key", "jwt").unwrap(),
            &config,
        );
        Self {
            service: MonitorService::new(config),
            sensors: ScriptedSensors::new(snapshots),
            outputs: RecordingOutputs::default(),
            uplink,
            liveness: CountingLiveness::default(),
            sink: RecordingSink::default(),
            collector,
            clock,
            link,
        }
    }

    fn cycle(&mut self) -> aquamon::app::service::CycleReport {
        self.service.run_cycle(
            &mut self.sensors,
            &mut self.outputs,
            &mut self.uplink,
            &mut self.liveness,
            &mut self.sink,
        )
    }
}

fn too_warm() -> SensorSnapshot {
    healthy().with(SensorKind::WaterTemperature, 32.0)
}

#[test]
fn healthy_cycle_uploads_telemetry_only() {
    let mut rig = Rig::new([healthy()], true);
    let report = rig.cycle();

    assert_eq!(report.cycle, 1);
    assert_eq!(report.outcome, CycleOutcome::Delivered { retries: 0 });
    assert!(report.alert.is_none());

    let reqs = rig.collector.requests();
    assert_eq!(reqs.len(), 1);
    assert_eq!(reqs[0].url, SystemConfig::default().collector_url.as_str());
    assert_eq!(reqs[0].header("Content-Type"), Some("application/json"));
    assert_eq!(reqs[0].header("apikey"), Some("anon-key"));
    assert_eq!(reqs[0].header("Authorization"), Some("Bearer jwt"));

    let doc: serde_json::Value = serde_json::from_slice(&reqs[0].body).unwrap();
    assert_eq!(doc["air_temperature"], serde_json::json!(24.5));
    assert_eq!(doc["ph"], serde_json::json!(7.2));
    assert_eq!(doc["pump"], serde_json::json!(false));
    assert!(rig.clock.sleeps().is_empty());
}

#[test]
fn outputs_written_every_cycle() {
    let mut rig = Rig::new([healthy(), healthy()], true);
    rig.cycle();
    rig.cycle();
    assert_eq!(rig.outputs.writes.len(), 8);
    assert!(rig.outputs.writes.iter().all(|(_, high)| !high));
    assert_eq!(
        rig.sink
            .count(|e| matches!(e, AppEvent::ControlChanged { .. })),
        0
    );
}

#[test]
fn high_ammonia_switches_pump_and_alerts() {
    let mut rig = Rig::new([healthy().with(SensorKind::Ammonia, 2.0)], true);
    let report = rig.cycle();

    assert!(report.control.pump);
    assert_eq!(rig.outputs.level(pins::PUMP_GPIO), Some(true));
    assert_eq!(rig.outputs.level(pins::AERATOR_GPIO), Some(false));

    let alert = report.alert.unwrap();
    assert!(alert.is_set(AlertFlag::HighAmmonia));
    assert!(report.alert_delivered);
    assert_eq!(rig.service.last_alert_flags(), AlertFlag::HighAmmonia.mask());

    let reqs = rig.collector.requests();
    assert_eq!(reqs.len(), 2);
    assert!(reqs[1].url.ends_with("/alerts"));
    let doc: serde_json::Value = serde_json::from_slice(&reqs[1].body).unwrap();
    assert_eq!(doc["type"], "alert");
    assert_eq!(doc["alerts"]["high_ammonia"], true);
    assert_eq!(doc["ammonia"], serde_json::json!(2.0));
}

#[test]
fn unchanged_alert_is_sent_once() {
    let mut rig = Rig::new([too_warm(), too_warm(), healthy()], true);

    let first = rig.cycle();
    assert!(first.alert_delivered);
    assert_eq!(rig.collector.requests().len(), 2);

    let second = rig.cycle();
    assert!(second.alert.is_none());
    assert_eq!(rig.collector.requests().len(), 3);

    // Back to normal: the all-clear is a change too.
    let third = rig.cycle();
    assert!(third.alert.unwrap().is_clear());
    assert_eq!(rig.collector.requests().len(), 5);
    assert_eq!(rig.service.last_alert_flags(), 0);
}

#[test]
fn undelivered_alert_is_retried_next_cycle() {
    let mut rig = Rig::new([too_warm(), too_warm()], true);
    rig.collector
        .reply(Ok(201))
        .reply(Ok(500))
        .reply(Err(TransportError))
        .reply(Ok(503));

    let first = rig.cycle();
    assert_eq!(first.outcome, CycleOutcome::Delivered { retries: 0 });
    assert!(first.alert.is_some());
    assert!(!first.alert_delivered);
    assert_eq!(rig.clock.sleeps(), vec![1000, 2000]);
    assert_eq!(rig.service.last_alert_flags(), 0);

    let second = rig.cycle();
    assert!(second.alert_delivered);
    assert_eq!(
        rig.service.last_alert_flags(),
        AlertFlag::HighTemperature.mask()
    );
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::AlertDeferred { .. })),
        1
    );
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::AlertSent { .. })), 1);
}

#[test]
fn rejected_telemetry_does_not_stop_the_cycle() {
    let mut rig = Rig::new([healthy(), healthy()], true);
    rig.collector.reply(Ok(500)).reply(Ok(500)).reply(Ok(500));

    let first = rig.cycle();
    assert_eq!(first.outcome, CycleOutcome::Rejected { status: 500 });
    assert_eq!(rig.collector.sessions(), 3);

    let second = rig.cycle();
    assert_eq!(second.outcome, CycleOutcome::Delivered { retries: 0 });
    assert_eq!(
        rig.sink.count(|e| matches!(
            e,
            AppEvent::UploadFailed {
                cycle: 1,
                error: UploadError::PermanentUploadFailure { attempts: 3, .. }
            }
        )),
        1
    );
}

#[test]
fn offline_cycle_still_controls_and_skips_http() {
    let mut rig = Rig::new([healthy().with(SensorKind::DissolvedOxygen, 3.0)], false);
    let report = rig.cycle();

    assert_eq!(
        report.outcome,
        CycleOutcome::NotDelivered(UploadError::ConnectivityUnavailable)
    );
    assert!(report.control.aerator);
    assert_eq!(rig.outputs.level(pins::AERATOR_GPIO), Some(true));
    assert!(!report.alert_delivered);
    assert_eq!(rig.collector.sessions(), 0);
    // Telemetry and alert each poll the link three times.
    assert_eq!(rig.clock.sleeps(), vec![1000; 6]);
}

#[test]
fn link_recovering_mid_wait_delivers() {
    let mut rig = Rig::new([healthy()], false);
    rig.clock.link_up_after(2, rig.link.clone());

    let report = rig.cycle();
    assert!(report.outcome.is_delivered());
    assert_eq!(rig.clock.sleeps(), vec![1000, 1000]);
    assert_eq!(rig.collector.sessions(), 1);
}

#[test]
fn sensor_faults_are_reported_and_force_outputs_off() {
    let snapshot = SensorSnapshot::all_failed(SensorFault::ProtocolTimeout)
        .with(SensorKind::Ph, 5.0);
    let mut rig = Rig::new([snapshot], true);
    let report = rig.cycle();

    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::SensorFault { .. })),
        6
    );
    assert!(report.control.ph_relay);
    assert!(!report.control.pump && !report.control.aerator && !report.control.filter);
    assert!(report.outcome.is_delivered());

    let doc: serde_json::Value =
        serde_json::from_slice(&rig.collector.requests()[0].body).unwrap();
    assert!(doc["air_temperature"].is_null());
    assert!(doc.get("water_temperature").is_none());
}

#[test]
fn liveness_reset_at_every_stage() {
    let mut rig = Rig::new([healthy()], true);
    rig.cycle();
    assert!(rig.liveness.resets >= 4);
    assert!(matches!(
        rig.sink.events.first(),
        Some(AppEvent::CycleStarted { cycle: 1 })
    ));
}
