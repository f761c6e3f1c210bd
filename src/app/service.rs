//! Monitoring service: the hexagonal core.
//!
//! [`MonitorService`] owns the per-process state (last applied outputs,
//! alert deduplication, cycle counter) and runs one
//! sample → control → upload → alert cycle per call.  All I/O flows through
//! port traits injected at call sites, so the whole cycle is testable with
//! mock adapters.
//!
//! ```text
//!   SensorPort ──▶ ┌─────────────────────────┐ ──▶ TelemetryPort
//!                  │     MonitorService      │ ──▶ AlertSender
//!   OutputPort ◀── │ control · dedup · cycle │ ──▶ EventSink
//!                  └─────────────────────────┘ ──▶ LivenessPort
//! ```
//!
//! No error leaves a cycle: sensor faults mark their reading, upload
//! failures become a [`CycleOutcome`], and the next cycle always runs.

use log::{info, warn};

use crate::alerts::{AlertDeduplicator, AlertSnapshot};
use crate::config::SystemConfig;
use crate::control::ControlState;
use crate::error::{DeliveryFailure, UploadError};
use crate::sensors::SensorSnapshot;
use crate::telemetry::UploadAttempt;

use super::events::AppEvent;
use super::ports::{
    AlertSender, EventSink, LivenessPort, OutputPort, SensorPort, TelemetryPort, Timebase,
};

/// Longest sleep between liveness resets while idling.
pub const LIVENESS_SLICE_MS: u32 = 1000;

// ───────────────────────────────────────────────────────────────
// Cycle results
// ───────────────────────────────────────────────────────────────

/// What happened to this cycle's telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Delivered { retries: u8 },
    /// The collector answered every attempt with a non-success status.
    Rejected { status: u16 },
    /// The data never reached the collector.
    NotDelivered(UploadError),
}

impl CycleOutcome {
    pub fn from_result(result: &Result<UploadAttempt, UploadError>) -> Self {
        match result {
            Ok(attempt) => Self::Delivered {
                retries: attempt.retries_used(),
            },
            Err(UploadError::PermanentUploadFailure {
                last: DeliveryFailure::Rejected(status),
                ..
            }) => Self::Rejected { status: *status },
            Err(e) => Self::NotDelivered(*e),
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub cycle: u32,
    pub snapshot: SensorSnapshot,
    pub control: ControlState,
    pub outcome: CycleOutcome,
    /// Alert state a send was attempted for, if it changed.
    pub alert: Option<AlertSnapshot>,
    pub alert_delivered: bool,
}

// ───────────────────────────────────────────────────────────────
// MonitorService
// ───────────────────────────────────────────────────────────────

pub struct MonitorService {
    config: SystemConfig,
    control: ControlState,
    dedup: AlertDeduplicator,
    cycle: u32,
}

impl MonitorService {
    pub fn new(config: SystemConfig) -> Self {
        Self {
            config,
            control: ControlState::default(),
            dedup: AlertDeduplicator::new(),
            cycle: 0,
        }
    }

    // ── Per-cycle orchestration ───────────────────────────────

    /// Run one full cycle: sample → control → upload → alert.
    ///
    /// `uplink` satisfies both [`TelemetryPort`] and [`AlertSender`]; one
    /// uploader serves both endpoints under the same retry policy.
    pub fn run_cycle(
        &mut self,
        sensors: &mut impl SensorPort,
        outputs: &mut impl OutputPort,
        uplink: &mut (impl TelemetryPort + AlertSender),
        liveness: &mut impl LivenessPort,
        sink: &mut impl EventSink,
    ) -> CycleReport {
        self.cycle = self.cycle.wrapping_add(1);
        let cycle = self.cycle;
        sink.emit(&AppEvent::CycleStarted { cycle });
        liveness.reset_liveness_timer();

        // 1. Sample
        let snapshot = sensors.sample();
        for r in snapshot.iter() {
            if let Some(fault) = r.fault() {
                sink.emit(&AppEvent::SensorFault {
                    kind: r.kind,
                    fault,
                });
            }
        }
        liveness.reset_liveness_timer();

        // 2. Control
        let control = ControlState::derive(&snapshot, &self.config.control);
        control.apply(outputs);
        if control != self.control {
            sink.emit(&AppEvent::ControlChanged {
                from: self.control,
                to: control,
            });
            self.control = control;
        }

        // 3. Upload
        let result = uplink
            .upload(&snapshot, &control)
            .and_then(UploadAttempt::into_result);
        let outcome = CycleOutcome::from_result(&result);
        match result {
            Ok(attempt) => sink.emit(&AppEvent::UploadCompleted {
                cycle,
                bytes: attempt.payload().len(),
                retries: attempt.retries_used(),
            }),
            Err(error) => {
                warn!("Cycle {}: telemetry not delivered ({})", cycle, error);
                sink.emit(&AppEvent::UploadFailed { cycle, error });
            }
        }
        liveness.reset_liveness_timer();

        // 4. Alerts
        let alert = self.dedup.evaluate(&snapshot, &self.config.alerts, uplink);
        let alert_delivered = alert.is_some_and(|a| a.flags() == self.dedup.last_sent());
        if let Some(a) = alert {
            if alert_delivered {
                sink.emit(&AppEvent::AlertSent { flags: a.flags() });
            } else {
                sink.emit(&AppEvent::AlertDeferred { flags: a.flags() });
            }
        }
        liveness.reset_liveness_timer();

        info!(
            "Cycle {} done: {} faults, outputs=0b{:04b}, delivered={}",
            cycle,
            snapshot.fault_count(),
            control.bits(),
            outcome.is_delivered()
        );

        CycleReport {
            cycle,
            snapshot,
            control,
            outcome,
            alert,
            alert_delivered,
        }
    }

    /// Sleep out the rest of the sample period, resetting the liveness
    /// timer at least every [`LIVENESS_SLICE_MS`].
    pub fn idle_until_next_cycle(
        &self,
        elapsed_ms: u32,
        time: &mut impl Timebase,
        liveness: &mut impl LivenessPort,
    ) {
        let mut remaining = self.config.sample_period_ms.saturating_sub(elapsed_ms);
        while remaining > 0 {
            let slice = remaining.min(LIVENESS_SLICE_MS);
            time.delay_ms(slice);
            liveness.reset_liveness_timer();
            remaining -= slice;
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// Cycles run since boot.
    pub fn cycle_count(&self) -> u32 {
        self.cycle
    }

    /// Outputs applied by the last cycle.
    pub fn control(&self) -> ControlState {
        self.control
    }

    /// Alert mask last accepted by the collector.
    pub fn last_alert_flags(&self) -> u8 {
        self.dedup.last_sent()
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }
}
