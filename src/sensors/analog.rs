//! Oversampled analog sensors: pH, dissolved oxygen, turbidity, ammonia.
//!
//! Each channel is read `N ≥ 8` times with a short gap, averaged in
//! millivolts, then mapped through a linear calibration
//! `value = slope · mV + offset` and checked against the sensor's domain.

use serde::{Deserialize, Serialize};

use crate::app::ports::{AdcPort, Timebase};
use crate::error::SensorFault;
use crate::pins;

use super::{SensorKind, SensorReading};

pub const MIN_SAMPLES: u8 = 8;

/// Electrode output at pH 7.
pub const PH_NEUTRAL_MV: f32 = 2500.0;
/// Electrode sensitivity at 25 °C (Nernst slope).
pub const PH_MV_PER_UNIT: f32 = 59.16;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearCalibration {
    pub slope: f32,
    pub offset: f32,
}

impl LinearCalibration {
    pub const fn new(slope: f32, offset: f32) -> Self {
        Self { slope, offset }
    }

    /// Glass electrode behind a mid-rail offset amplifier: the output
    /// falls by `mv_per_unit` per pH unit around `neutral_mv`.
    pub fn ph_electrode(neutral_mv: f32, mv_per_unit: f32) -> Self {
        Self {
            slope: -1.0 / mv_per_unit,
            offset: 7.0 + neutral_mv / mv_per_unit,
        }
    }

    pub fn apply(&self, millivolts: f32) -> f32 {
        self.slope * millivolts + self.offset
    }
}

/// Per-sensor calibration, persisted with the rest of the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalogCalibrations {
    pub ph: LinearCalibration,
    pub dissolved_oxygen: LinearCalibration,
    pub turbidity: LinearCalibration,
    pub ammonia: LinearCalibration,
}

impl Default for AnalogCalibrations {
    fn default() -> Self {
        Self {
            ph: LinearCalibration::ph_electrode(PH_NEUTRAL_MV, PH_MV_PER_UNIT),
            dissolved_oxygen: LinearCalibration::new(0.2, 0.0),
            turbidity: LinearCalibration::new(0.5, 0.0),
            ammonia: LinearCalibration::new(0.1, 0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalogChannel {
    pub kind: SensorKind,
    pub adc_channel: u8,
    pub calibration: LinearCalibration,
}

/// The four sensor channels wired on the board.
pub fn board_channels(cal: &AnalogCalibrations) -> [AnalogChannel; 4] {
    [
        AnalogChannel {
            kind: SensorKind::Ph,
            adc_channel: pins::PH_ADC_CHANNEL,
            calibration: cal.ph,
        },
        AnalogChannel {
            kind: SensorKind::DissolvedOxygen,
            adc_channel: pins::DO_ADC_CHANNEL,
            calibration: cal.dissolved_oxygen,
        },
        AnalogChannel {
            kind: SensorKind::Turbidity,
            adc_channel: pins::TURBIDITY_ADC_CHANNEL,
            calibration: cal.turbidity,
        },
        AnalogChannel {
            kind: SensorKind::Ammonia,
            adc_channel: pins::AMMONIA_ADC_CHANNEL,
            calibration: cal.ammonia,
        },
    ]
}

pub struct AnalogSampler<A, T> {
    adc: A,
    time: T,
    samples: u8,
    interval_ms: u32,
}

impl<A: AdcPort, T: Timebase> AnalogSampler<A, T> {
    /// `samples` below [`MIN_SAMPLES`] is raised to it.
    pub fn new(adc: A, time: T, samples: u8, interval_ms: u32) -> Self {
        Self {
            adc,
            time,
            samples: samples.max(MIN_SAMPLES),
            interval_ms,
        }
    }

    /// Mean of `samples` conversions in millivolts.
    pub fn average_mv(&mut self, adc_channel: u8) -> Result<f32, SensorFault> {
        let mut sum = 0u64;
        for i in 0..self.samples {
            if i > 0 {
                self.time.delay_ms(self.interval_ms);
            }
            sum += u64::from(self.adc.read_raw_adc(adc_channel)?);
        }
        Ok(sum as f32 / f32::from(self.samples))
    }

    pub fn sample(&mut self, channel: &AnalogChannel) -> SensorReading {
        let value = self
            .average_mv(channel.adc_channel)
            .map(|mv| channel.calibration.apply(mv));
        SensorReading::from_result(channel.kind, value)
    }
}
