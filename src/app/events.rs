//! Outbound application events.
//!
//! The [`MonitorService`](super::service::MonitorService) emits these through
//! the [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial today, anything else
//! tomorrow.

use crate::control::ControlState;
use crate::error::{SensorFault, UploadError};
use crate::sensors::SensorKind;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// A monitoring cycle began.
    CycleStarted { cycle: u32 },

    /// One sensor produced no usable reading this cycle.
    SensorFault { kind: SensorKind, fault: SensorFault },

    /// The relay outputs changed.
    ControlChanged { from: ControlState, to: ControlState },

    /// Telemetry reached the collector and was accepted.
    UploadCompleted { cycle: u32, bytes: usize, retries: u8 },

    /// Telemetry was not delivered this cycle.
    UploadFailed { cycle: u32, error: UploadError },

    /// A changed alert state was accepted by the collector.
    AlertSent { flags: u8 },

    /// A changed alert state could not be delivered; it is retried next cycle.
    AlertDeferred { flags: u8 },
}
