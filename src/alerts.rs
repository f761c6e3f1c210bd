//! Water-quality alert evaluation and deduplication.
//!
//! Seven independent conditions are accumulated in a bitmask, the same way
//! fault flags are tracked elsewhere in the firmware.  An alert is sent
//! only when the mask differs from the last mask the collector accepted,
//! so a persistent condition produces one notification, and the return to
//! all-clear produces another.
//!
//! ## Lifecycle
//!
//! 1. Each cycle, [`AlertSnapshot::evaluate`] builds the mask from the
//!    readings.  A reading in error never sets a flag, and its flags are
//!    marked unknown.
//! 2. [`AlertDeduplicator::evaluate`] keeps the last delivered state for
//!    unknown flags, then compares bit-for-bit with the last delivered mask.
//!    A sensor glitch therefore neither clears nor raises an alert.
//! 3. On a difference it sends; the stored mask advances only after the
//!    collector confirms, so a failed send is retried next cycle.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::AlertSender;
use crate::sensors::{SensorKind, SensorSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AlertFlag {
    HighTemperature = 0b0000_0001,
    LowTemperature = 0b0000_0010,
    LowDissolvedOxygen = 0b0000_0100,
    HighPh = 0b0000_1000,
    LowPh = 0b0001_0000,
    HighAmmonia = 0b0010_0000,
    HighTurbidity = 0b0100_0000,
}

impl AlertFlag {
    pub const ALL: [Self; 7] = [
        Self::HighTemperature,
        Self::LowTemperature,
        Self::LowDissolvedOxygen,
        Self::HighPh,
        Self::LowPh,
        Self::HighAmmonia,
        Self::HighTurbidity,
    ];

    pub const fn mask(self) -> u8 {
        self as u8
    }

    /// Key used in the alert document.
    pub const fn key(self) -> &'static str {
        match self {
            Self::HighTemperature => "high_temperature",
            Self::LowTemperature => "low_temperature",
            Self::LowDissolvedOxygen => "low_dissolved_oxygen",
            Self::HighPh => "high_ph",
            Self::LowPh => "low_ph",
            Self::HighAmmonia => "high_ammonia",
            Self::HighTurbidity => "high_turbidity",
        }
    }

    /// Reading the condition is evaluated on.
    pub const fn source(self) -> SensorKind {
        match self {
            Self::HighTemperature | Self::LowTemperature => SensorKind::WaterTemperature,
            Self::LowDissolvedOxygen => SensorKind::DissolvedOxygen,
            Self::HighPh | Self::LowPh => SensorKind::Ph,
            Self::HighAmmonia => SensorKind::Ammonia,
            Self::HighTurbidity => SensorKind::Turbidity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertThresholds {
    pub water_temp_min: f32,
    pub water_temp_max: f32,
    pub dissolved_oxygen_min: f32,
    pub ph_min: f32,
    pub ph_max: f32,
    pub ammonia_max: f32,
    pub turbidity_max: f32,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            water_temp_min: 20.0,
            water_temp_max: 30.0,
            dissolved_oxygen_min: 5.0,
            ph_min: 6.5,
            ph_max: 8.5,
            ammonia_max: 1.0,
            turbidity_max: 20.0,
        }
    }
}

/// Alert flags plus the values that were evaluated (absent when in error).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AlertSnapshot {
    flags: u8,
    /// Flags whose source reading was available.
    known: u8,
    pub water_temp: Option<f32>,
    pub dissolved_oxygen: Option<f32>,
    pub ph: Option<f32>,
    pub ammonia: Option<f32>,
    pub turbidity: Option<f32>,
}

impl AlertSnapshot {
    pub fn evaluate(snapshot: &SensorSnapshot, t: &AlertThresholds) -> Self {
        let known = AlertFlag::ALL
            .iter()
            .filter(|f| snapshot.value(f.source()).is_some())
            .fold(0, |acc, f| acc | f.mask());
        let mut s = Self {
            flags: 0,
            known,
            water_temp: snapshot.value(SensorKind::WaterTemperature),
            dissolved_oxygen: snapshot.value(SensorKind::DissolvedOxygen),
            ph: snapshot.value(SensorKind::Ph),
            ammonia: snapshot.value(SensorKind::Ammonia),
            turbidity: snapshot.value(SensorKind::Turbidity),
        };

        s.raise(AlertFlag::HighTemperature, s.water_temp.is_some_and(|v| v > t.water_temp_max));
        s.raise(AlertFlag::LowTemperature, s.water_temp.is_some_and(|v| v < t.water_temp_min));
        s.raise(
            AlertFlag::LowDissolvedOxygen,
            s.dissolved_oxygen.is_some_and(|v| v < t.dissolved_oxygen_min),
        );
        s.raise(AlertFlag::HighPh, s.ph.is_some_and(|v| v > t.ph_max));
        s.raise(AlertFlag::LowPh, s.ph.is_some_and(|v| v < t.ph_min));
        s.raise(AlertFlag::HighAmmonia, s.ammonia.is_some_and(|v| v > t.ammonia_max));
        s.raise(AlertFlag::HighTurbidity, s.turbidity.is_some_and(|v| v > t.turbidity_max));
        s
    }

    fn raise(&mut self, flag: AlertFlag, condition: bool) {
        if condition {
            self.flags |= flag.mask();
        }
    }

    pub fn flags(&self) -> u8 {
        self.flags
    }

    pub fn known(&self) -> u8 {
        self.known
    }

    /// Take `previous` for every flag whose reading is in error.
    #[must_use]
    pub fn carry_unknown(mut self, previous: u8) -> Self {
        self.flags = (self.flags & self.known) | (previous & !self.known);
        self
    }

    pub fn is_set(&self, flag: AlertFlag) -> bool {
        self.flags & flag.mask() != 0
    }

    pub fn is_clear(&self) -> bool {
        self.flags == 0
    }
}

/// Remembers the last alert mask the collector accepted.
pub struct AlertDeduplicator {
    last_sent: u8,
}

impl Default for AlertDeduplicator {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertDeduplicator {
    /// Starts from all-clear: a healthy first cycle sends nothing.
    pub const fn new() -> Self {
        Self { last_sent: 0 }
    }

    pub fn last_sent(&self) -> u8 {
        self.last_sent
    }

    /// Evaluate `snapshot` and send when the alert mask changed.
    ///
    /// Returns the new snapshot if a send was attempted, `None` when
    /// nothing changed.  Check [`last_sent`](Self::last_sent) against the
    /// returned flags to learn whether delivery succeeded.
    pub fn evaluate(
        &mut self,
        snapshot: &SensorSnapshot,
        thresholds: &AlertThresholds,
        sender: &mut impl AlertSender,
    ) -> Option<AlertSnapshot> {
        let current = AlertSnapshot::evaluate(snapshot, thresholds).carry_unknown(self.last_sent);
        if current.flags == self.last_sent {
            return None;
        }

        match sender.send_alert(&current) {
            Ok(attempt) if attempt.delivered() => {
                info!(
                    "Alerts: state 0b{:07b} -> 0b{:07b} delivered",
                    self.last_sent, current.flags
                );
                self.last_sent = current.flags;
            }
            Ok(attempt) => {
                warn!(
                    "Alerts: 0b{:07b} not delivered after {} attempts, retrying next cycle",
                    current.flags,
                    attempt.attempts()
                );
            }
            Err(e) => {
                warn!("Alerts: 0b{:07b} not sent ({}), retrying next cycle", current.flags, e);
            }
        }
        Some(current)
    }
}
