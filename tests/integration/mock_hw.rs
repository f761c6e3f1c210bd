//! Mock hardware adapters for integration tests.
//!
//! Records every output write, sleep and event so tests can assert on the
//! full history without touching real GPIO, radio or timer registers.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use aquamon::app::events::AppEvent;
use aquamon::app::ports::{
    EventSink, LivenessPort, OutputPort, ScanResult, SensorPort, Timebase, WifiError, WifiPort,
};
use aquamon::error::SensorFault;
use aquamon::network::ConnectivityFlag;
use aquamon::sensors::{SensorKind, SensorSnapshot};

// ── Snapshots ─────────────────────────────────────────────────

/// Every sensor reading, all inside alert and control limits.
pub fn healthy() -> SensorSnapshot {
    SensorSnapshot::all_failed(SensorFault::DeviceAbsent)
        .with(SensorKind::AirTemperature, 24.5)
        .with(SensorKind::Humidity, 61.0)
        .with(SensorKind::WaterTemperature, 25.0)
        .with(SensorKind::Ph, 7.2)
        .with(SensorKind::DissolvedOxygen, 7.0)
        .with(SensorKind::Turbidity, 5.0)
        .with(SensorKind::Ammonia, 0.2)
}

// ── Clock ─────────────────────────────────────────────────────

#[derive(Default)]
struct ClockState {
    now_us: u64,
    sleeps: Vec<u32>,
    link_up_after: Option<(usize, ConnectivityFlag)>,
}

/// Virtual clock that records every millisecond sleep.
#[derive(Clone, Default)]
pub struct MockClock {
    state: Rc<RefCell<ClockState>>,
}

#[allow(dead_code)]
impl MockClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sleeps(&self) -> Vec<u32> {
        self.state.borrow().sleeps.clone()
    }

    pub fn clear(&self) {
        self.state.borrow_mut().sleeps.clear();
    }

    /// Raise `flag` once `sleeps` millisecond sleeps have elapsed.
    pub fn link_up_after(&self, sleeps: usize, flag: ConnectivityFlag) {
        self.state.borrow_mut().link_up_after = Some((sleeps, flag));
    }
}

impl Timebase for MockClock {
    fn now_us(&self) -> u64 {
        self.state.borrow().now_us
    }

    fn delay_us(&mut self, us: u32) {
        self.state.borrow_mut().now_us += u64::from(us);
    }

    fn delay_ms(&mut self, ms: u32) {
        let mut s = self.state.borrow_mut();
        s.now_us += u64::from(ms) * 1000;
        s.sleeps.push(ms);
        if let Some((after, flag)) = &s.link_up_after {
            if s.sleeps.len() >= *after {
                flag.set_connected(true);
            }
        }
    }
}

// ── Sensors ───────────────────────────────────────────────────

/// Replays scripted snapshots; the last one repeats.
pub struct ScriptedSensors {
    script: VecDeque<SensorSnapshot>,
    last: SensorSnapshot,
}

impl ScriptedSensors {
    pub fn new(snapshots: impl IntoIterator<Item = SensorSnapshot>) -> Self {
        Self {
            script: snapshots.into_iter().collect(),
            last: healthy(),
        }
    }
}

impl SensorPort for ScriptedSensors {
    fn sample(&mut self) -> SensorSnapshot {
        if let Some(next) = self.script.pop_front() {
            self.last = next;
        }
        self.last
    }
}

// ── Outputs ───────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingOutputs {
    pub writes: Vec<(i32, bool)>,
}

impl RecordingOutputs {
    /// Last level written to `pin`.
    pub fn level(&self, pin: i32) -> Option<bool> {
        self.writes.iter().rev().find(|(p, _)| *p == pin).map(|(_, l)| *l)
    }
}

impl OutputPort for RecordingOutputs {
    fn set_pin_level(&mut self, pin: i32, high: bool) {
        self.writes.push((pin, high));
    }
}

// ── Liveness ──────────────────────────────────────────────────

#[derive(Default)]
pub struct CountingLiveness {
    pub resets: u32,
}

impl LivenessPort for CountingLiveness {
    fn reset_liveness_timer(&mut self) {
        self.resets += 1;
    }
}

// ── Events ────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Wi-Fi ─────────────────────────────────────────────────────

/// Radio whose scans are scripted and which accepts a fixed set of SSIDs.
#[derive(Default)]
pub struct ScriptedWifi {
    pub scans: VecDeque<Result<Vec<ScanResult>, WifiError>>,
    pub accepts: Vec<&'static str>,
    pub attempts: Vec<String>,
    pub disconnects: u32,
    pub connected: bool,
}

#[allow(dead_code)]
impl ScriptedWifi {
    pub fn seeing(aps: &[(&str, i8)]) -> Self {
        let mut w = Self::default();
        w.scans.push_back(Ok(scan(aps)));
        w
    }

    pub fn accepting(mut self, ssids: &[&'static str]) -> Self {
        self.accepts = ssids.to_vec();
        self
    }
}

pub fn scan(aps: &[(&str, i8)]) -> Vec<ScanResult> {
    aps.iter()
        .map(|(ssid, rssi)| {
            let mut s = heapless::String::new();
            s.push_str(ssid).unwrap();
            ScanResult { ssid: s, rssi: *rssi }
        })
        .collect()
}

impl WifiPort for ScriptedWifi {
    fn scan(&mut self) -> Result<Vec<ScanResult>, WifiError> {
        self.scans.pop_front().unwrap_or(Ok(Vec::new()))
    }

    fn connect(&mut self, ssid: &str, _password: &str, _timeout_ms: u32) -> Result<(), WifiError> {
        self.attempts.push(ssid.to_string());
        if self.accepts.contains(&ssid) {
            self.connected = true;
            Ok(())
        } else {
            Err(WifiError::Timeout)
        }
    }

    fn disconnect(&mut self) {
        self.disconnects += 1;
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
