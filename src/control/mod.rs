//! Actuator control state derived from the latest readings.
//!
//! Pure threshold logic; the relay driver applies the result.  A reading
//! in error never switches an output on.

use serde::{Deserialize, Serialize};

use crate::app::ports::OutputPort;
use crate::pins;
use crate::sensors::{SensorKind, SensorSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlThresholds {
    /// pH relay engages below this.
    pub ph_low: f32,
    /// Aerator engages below this (mg/L).
    pub dissolved_oxygen_low: f32,
    /// Filter engages above this (NTU).
    pub turbidity_high: f32,
    /// Pump engages above this (mg/L).
    pub ammonia_high: f32,
}

impl Default for ControlThresholds {
    fn default() -> Self {
        Self {
            ph_low: 6.5,
            dissolved_oxygen_low: 5.0,
            turbidity_high: 20.0,
            ammonia_high: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlState {
    pub ph_relay: bool,
    pub aerator: bool,
    pub filter: bool,
    pub pump: bool,
}

impl ControlState {
    pub fn derive(snapshot: &SensorSnapshot, t: &ControlThresholds) -> Self {
        let below = |kind, limit: f32| snapshot.value(kind).is_some_and(|v| v < limit);
        let above = |kind, limit: f32| snapshot.value(kind).is_some_and(|v| v > limit);

        Self {
            ph_relay: below(SensorKind::Ph, t.ph_low),
            aerator: below(SensorKind::DissolvedOxygen, t.dissolved_oxygen_low),
            filter: above(SensorKind::Turbidity, t.turbidity_high),
            pump: above(SensorKind::Ammonia, t.ammonia_high),
        }
    }

    /// `(gpio, level)` for every relay, in the order they are written.
    pub fn levels(self) -> [(i32, bool); 4] {
        [
            (pins::PUMP_GPIO, self.pump),
            (pins::PH_RELAY_GPIO, self.ph_relay),
            (pins::AERATOR_GPIO, self.aerator),
            (pins::FILTER_GPIO, self.filter),
        ]
    }

    /// Drive every relay; called each cycle whether or not anything changed.
    pub fn apply(self, outputs: &mut impl OutputPort) {
        for (pin, high) in self.levels() {
            outputs.set_pin_level(pin, high);
        }
    }

    /// Packed `pump|filter|aerator|ph_relay` for compact logging.
    pub fn bits(self) -> u8 {
        u8::from(self.ph_relay)
            | u8::from(self.aerator) << 1
            | u8::from(self.filter) << 2
            | u8::from(self.pump) << 3
    }
}
