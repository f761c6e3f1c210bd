//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).
//! Records are single lines of pipe-separated fields so they can be
//! grepped from a serial capture.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

fn on_off(v: bool) -> &'static str {
    if v { "ON" } else { "off" }
}

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::CycleStarted { cycle } => {
                info!("CYCLE | #{} | start", cycle);
            }
            AppEvent::SensorFault { kind, fault } => {
                warn!("FAULT | {} | {}", kind.label(), fault);
            }
            AppEvent::ControlChanged { from, to } => {
                info!(
                    "CONTROL | 0b{:04b} -> 0b{:04b} | ph_relay={} aerator={} filter={} pump={}",
                    from.bits(),
                    to.bits(),
                    on_off(to.ph_relay),
                    on_off(to.aerator),
                    on_off(to.filter),
                    on_off(to.pump),
                );
            }
            AppEvent::UploadCompleted {
                cycle,
                bytes,
                retries,
            } => {
                info!("UPLOAD | #{} | ok | {} bytes | retries={}", cycle, bytes, retries);
            }
            AppEvent::UploadFailed { cycle, error } => {
                let kind = if error.reached_collector() {
                    "rejected"
                } else {
                    "undelivered"
                };
                warn!("UPLOAD | #{} | {} | {}", cycle, kind, error);
            }
            AppEvent::AlertSent { flags } => {
                info!("ALERT | sent | flags=0b{:07b}", flags);
            }
            AppEvent::AlertDeferred { flags } => {
                warn!("ALERT | deferred | flags=0b{:07b}", flags);
            }
        }
    }
}
