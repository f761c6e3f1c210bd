//! JSON documents posted to the collector.
//!
//! Values are rounded to two decimals.  Readings in error never carry a
//! number: air temperature and humidity are sent as `null`, the water
//! sensors are omitted, so the receiver can tell "missing" from "zero".

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::alerts::{AlertFlag, AlertSnapshot};
use crate::control::ControlState;
use crate::error::UploadError;
use crate::sensors::{SensorKind, SensorSnapshot};

/// Upper bound on any serialised document.
pub const MAX_PAYLOAD_BYTES: usize = 384;

fn round2(v: f32) -> f32 {
    (v * 100.0).round() / 100.0
}

fn rounded(snapshot: &SensorSnapshot, kind: SensorKind) -> Option<f32> {
    snapshot.value(kind).map(round2)
}

/// Reject any successful reading outside its physical domain.
///
/// Readings in error pass; they are carried as absent values.
pub fn validate(snapshot: &SensorSnapshot) -> Result<(), UploadError> {
    for reading in snapshot.iter() {
        if let Ok(value) = reading.outcome {
            if !reading.kind.contains(value) {
                return Err(UploadError::InvalidReading(reading.kind));
            }
        }
    }
    Ok(())
}

fn bounded<T: Serialize>(doc: &T) -> Result<Vec<u8>, UploadError> {
    let body = serde_json::to_vec(doc).map_err(|_| UploadError::Encode)?;
    if body.len() > MAX_PAYLOAD_BYTES {
        return Err(UploadError::PayloadTooLarge);
    }
    Ok(body)
}

// ───────────────────────────────────────────────────────────────
// Telemetry
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryDocument {
    pub air_temperature: Option<f32>,
    pub humidity: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub water_temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ph: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dissolved_oxygen: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turbidity: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ammonia: Option<f32>,
    pub ph_relay: bool,
    pub aerator: bool,
    pub filter: bool,
    pub pump: bool,
}

impl TelemetryDocument {
    pub fn new(snapshot: &SensorSnapshot, control: &ControlState) -> Self {
        Self {
            air_temperature: rounded(snapshot, SensorKind::AirTemperature),
            humidity: rounded(snapshot, SensorKind::Humidity),
            water_temperature: rounded(snapshot, SensorKind::WaterTemperature),
            ph: rounded(snapshot, SensorKind::Ph),
            dissolved_oxygen: rounded(snapshot, SensorKind::DissolvedOxygen),
            turbidity: rounded(snapshot, SensorKind::Turbidity),
            ammonia: rounded(snapshot, SensorKind::Ammonia),
            ph_relay: control.ph_relay,
            aerator: control.aerator,
            filter: control.filter,
            pump: control.pump,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, UploadError> {
        bounded(self)
    }
}

// ───────────────────────────────────────────────────────────────
// Alerts
// ───────────────────────────────────────────────────────────────

/// Alert mask rendered as one boolean per [`AlertFlag::key`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertFlags(pub u8);

impl Serialize for AlertFlags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(AlertFlag::ALL.len()))?;
        for flag in AlertFlag::ALL {
            map.serialize_entry(flag.key(), &(self.0 & flag.mask() != 0))?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertDocument {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub alerts: AlertFlags,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub water_temp: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub do_level: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ph: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ammonia: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turbidity: Option<f32>,
}

impl AlertDocument {
    pub fn new(alert: &AlertSnapshot) -> Self {
        Self {
            kind: "alert",
            alerts: AlertFlags(alert.flags()),
            water_temp: alert.water_temp.map(round2),
            do_level: alert.dissolved_oxygen.map(round2),
            ph: alert.ph.map(round2),
            ammonia: alert.ammonia.map(round2),
            turbidity: alert.turbidity.map(round2),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, UploadError> {
        bounded(self)
    }
}
