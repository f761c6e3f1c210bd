//! Sensor subsystem: protocol engines and the aggregating [`SensorHub`].
//!
//! Every reading is a tagged result: either a value inside the sensor's
//! physical domain or the [`SensorFault`] that prevented it.  There are no
//! sentinel values; a failed sensor never aborts the cycle, it just marks
//! its own slot in the [`SensorSnapshot`].

pub mod analog;
pub mod dht22;
pub mod ds18b20;

use embedded_hal::digital::{InputPin, OutputPin};
use log::warn;

use crate::app::ports::{AdcPort, SensorPort, Timebase};
use crate::bus::OneWireBus;
use crate::error::SensorFault;
use analog::{AnalogChannel, AnalogSampler};
use dht22::Dht22;
use ds18b20::Ds18b20;

// ───────────────────────────────────────────────────────────────
// Kinds
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    AirTemperature,
    Humidity,
    WaterTemperature,
    Ph,
    DissolvedOxygen,
    Turbidity,
    Ammonia,
}

impl SensorKind {
    pub const ALL: [Self; 7] = [
        Self::AirTemperature,
        Self::Humidity,
        Self::WaterTemperature,
        Self::Ph,
        Self::DissolvedOxygen,
        Self::Turbidity,
        Self::Ammonia,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::AirTemperature => "air temperature",
            Self::Humidity => "humidity",
            Self::WaterTemperature => "water temperature",
            Self::Ph => "pH",
            Self::DissolvedOxygen => "dissolved oxygen",
            Self::Turbidity => "turbidity",
            Self::Ammonia => "ammonia",
        }
    }

    pub const fn unit(self) -> &'static str {
        match self {
            Self::AirTemperature | Self::WaterTemperature => "\u{00b0}C",
            Self::Humidity => "%",
            Self::Ph => "pH",
            Self::DissolvedOxygen | Self::Ammonia => "mg/L",
            Self::Turbidity => "NTU",
        }
    }

    /// Inclusive physical domain `(min, max)` of the sensing element.
    pub const fn physical_range(self) -> (f32, f32) {
        match self {
            Self::AirTemperature => (-40.0, 80.0),
            Self::Humidity => (0.0, 100.0),
            Self::WaterTemperature => (-55.0, 125.0),
            Self::Ph => (0.0, 14.0),
            Self::DissolvedOxygen => (0.0, 20.0),
            Self::Turbidity => (0.0, 1000.0),
            Self::Ammonia => (0.0, 10.0),
        }
    }

    pub fn contains(self, value: f32) -> bool {
        let (min, max) = self.physical_range();
        value.is_finite() && (min..=max).contains(&value)
    }

    const fn index(self) -> usize {
        self as usize
    }
}

// ───────────────────────────────────────────────────────────────
// Readings
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingStatus {
    Ok,
    SensorError,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub kind: SensorKind,
    pub outcome: Result<f32, SensorFault>,
}

impl SensorReading {
    pub const fn failed(kind: SensorKind, fault: SensorFault) -> Self {
        Self {
            kind,
            outcome: Err(fault),
        }
    }

    /// Wrap a decoded value, rejecting anything outside the physical domain.
    pub fn checked(kind: SensorKind, value: f32) -> Self {
        if kind.contains(value) {
            Self {
                kind,
                outcome: Ok(value),
            }
        } else {
            Self::failed(kind, SensorFault::OutOfPhysicalRange)
        }
    }

    pub fn from_result(kind: SensorKind, result: Result<f32, SensorFault>) -> Self {
        match result {
            Ok(v) => Self::checked(kind, v),
            Err(fault) => Self::failed(kind, fault),
        }
    }

    pub fn value(&self) -> Option<f32> {
        self.outcome.ok()
    }

    pub fn fault(&self) -> Option<SensorFault> {
        self.outcome.err()
    }

    pub fn status(&self) -> ReadingStatus {
        if self.outcome.is_ok() {
            ReadingStatus::Ok
        } else {
            ReadingStatus::SensorError
        }
    }

    pub const fn unit(&self) -> &'static str {
        self.kind.unit()
    }
}

/// One reading per [`SensorKind`], taken in the same cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSnapshot {
    readings: [SensorReading; 7],
}

impl SensorSnapshot {
    /// A snapshot where every slot carries `fault`.
    pub fn all_failed(fault: SensorFault) -> Self {
        Self {
            readings: SensorKind::ALL.map(|k| SensorReading::failed(k, fault)),
        }
    }

    pub fn set(&mut self, reading: SensorReading) {
        self.readings[reading.kind.index()] = reading;
    }

    /// Builder form of [`set`](Self::set) for a successful value.
    #[must_use]
    pub fn with(mut self, kind: SensorKind, value: f32) -> Self {
        self.set(SensorReading::checked(kind, value));
        self
    }

    pub fn get(&self, kind: SensorKind) -> &SensorReading {
        &self.readings[kind.index()]
    }

    pub fn value(&self, kind: SensorKind) -> Option<f32> {
        self.get(kind).value()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SensorReading> {
        self.readings.iter()
    }

    pub fn fault_count(&self) -> usize {
        self.readings.iter().filter(|r| r.outcome.is_err()).count()
    }
}

// ───────────────────────────────────────────────────────────────
// Hub
// ───────────────────────────────────────────────────────────────

/// Owns every sensor engine and produces one snapshot per cycle.
pub struct SensorHub<P, T, W, A> {
    air: Dht22<P, T>,
    water: Ds18b20<W>,
    analog: AnalogSampler<A, T>,
    channels: [AnalogChannel; 4],
}

impl<P, T, W, A> SensorHub<P, T, W, A>
where
    P: InputPin + OutputPin,
    T: Timebase,
    W: OneWireBus,
    A: AdcPort,
{
    pub fn new(
        air: Dht22<P, T>,
        water: Ds18b20<W>,
        analog: AnalogSampler<A, T>,
        channels: [AnalogChannel; 4],
    ) -> Self {
        Self {
            air,
            water,
            analog,
            channels,
        }
    }

    /// Read every sensor in turn.  Individual failures are logged and
    /// recorded in their slot; the remaining sensors are still read.
    pub fn read_all(&mut self) -> SensorSnapshot {
        let mut snapshot = SensorSnapshot::all_failed(SensorFault::DeviceAbsent);

        for reading in self.air.readings() {
            snapshot.set(reading);
        }
        snapshot.set(self.water.reading());
        for channel in &self.channels {
            snapshot.set(self.analog.sample(channel));
        }

        for r in snapshot.iter() {
            if let Some(fault) = r.fault() {
                warn!("SensorHub: {} unavailable ({})", r.kind.label(), fault);
            }
        }
        snapshot
    }
}

impl<P, T, W, A> SensorPort for SensorHub<P, T, W, A>
where
    P: InputPin + OutputPin,
    T: Timebase,
    W: OneWireBus,
    A: AdcPort,
{
    fn sample(&mut self) -> SensorSnapshot {
        self.read_all()
    }
}
