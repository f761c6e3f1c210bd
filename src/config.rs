//! System configuration parameters
//!
//! All tunable parameters for the AquaMon node.  Defaults are compiled in;
//! a validated copy may be persisted to NVS as a postcard blob.  Wi-Fi
//! credentials and the collector URL can be baked in at build time with
//! the `WIFI_SSID`, `WIFI_PASS` and `COLLECTOR_URL` environment variables.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::alerts::AlertThresholds;
use crate::app::ports::ConfigError;
use crate::control::ControlThresholds;
use crate::network::selector::{MAX_NETWORKS, WifiCredential};
use crate::retry::RetryPolicy;
use crate::sensors::analog::{AnalogCalibrations, LinearCalibration, MIN_SAMPLES};

const DEFAULT_COLLECTOR_URL: &str = match option_env!("COLLECTOR_URL") {
    Some(url) => url,
    None => "https://collector.local/rest/v1/sensor_data",
};

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Network ---
    /// Known networks, tried in ranked order
    pub networks: heapless::Vec<WifiCredential, MAX_NETWORKS>,
    /// Always tried first when in range (empty = none)
    pub preferred_ssid: heapless::String<32>,
    /// Scan retries when a scan fails or sees nothing
    pub scan_policy: RetryPolicy,
    /// Per-candidate association timeout (milliseconds)
    pub connect_timeout_ms: u32,

    // --- Sampling ---
    /// Period of one sample → control → upload → alert cycle (milliseconds)
    pub sample_period_ms: u32,
    /// ADC conversions averaged per analog reading
    pub adc_samples: u8,
    /// Gap between ADC conversions (milliseconds)
    pub adc_sample_interval_ms: u32,
    pub calibration: AnalogCalibrations,

    // --- Thresholds ---
    pub control: ControlThresholds,
    pub alerts: AlertThresholds,

    // --- Uplink ---
    pub collector_url: heapless::String<128>,
    /// Appended to `collector_url` for alert documents
    pub alert_path: heapless::String<32>,
    pub upload_policy: RetryPolicy,
    /// Connectivity polls before an upload gives up
    pub link_wait_attempts: u8,
    pub link_wait_interval_ms: u32,
    pub http_timeout_ms: u32,
}

/// Copy `s` into a fixed buffer.  Input that does not fit is dropped
/// entirely, leaving the field empty so `validate` rejects it.
fn fixed<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    if out.push_str(s).is_err() {
        warn!("Config: '{}' exceeds {} bytes, ignored", s, N);
        out.clear();
    }
    out
}

fn baked_networks() -> heapless::Vec<WifiCredential, MAX_NETWORKS> {
    let mut networks = heapless::Vec::new();
    if let Some(ssid) = option_env!("WIFI_SSID") {
        let password = option_env!("WIFI_PASS").unwrap_or("");
        if let Ok(cred) = WifiCredential::new(ssid, password) {
            let _ = networks.push(cred);
        }
    }
    networks
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Network
            networks: baked_networks(),
            preferred_ssid: heapless::String::new(),
            scan_policy: RetryPolicy::new(3, 500, 2),
            connect_timeout_ms: 10_000,

            // Sampling
            sample_period_ms: 10_000,
            adc_samples: 10,
            adc_sample_interval_ms: 10,
            calibration: AnalogCalibrations::default(),

            // Thresholds
            control: ControlThresholds::default(),
            alerts: AlertThresholds::default(),

            // Uplink
            collector_url: fixed(DEFAULT_COLLECTOR_URL),
            alert_path: fixed("/alerts"),
            upload_policy: RetryPolicy::default(),
            link_wait_attempts: 3,
            link_wait_interval_ms: 1000,
            http_timeout_ms: 20_000,
        }
    }
}

fn check(ok: bool, msg: &'static str) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::ValidationFailed(msg))
    }
}

fn calibration_ok(c: &LinearCalibration) -> bool {
    c.slope.is_finite() && c.offset.is_finite() && c.slope.abs() > f32::EPSILON
}

impl SystemConfig {
    /// Range-check every field.  Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for net in &self.networks {
            check(net.validate().is_ok(), "network credential invalid")?;
        }
        check(
            (1..=5).contains(&self.scan_policy.max_attempts),
            "scan attempts must be 1–5",
        )?;
        check(
            (1000..=60_000).contains(&self.connect_timeout_ms),
            "connect_timeout_ms must be 1000–60000",
        )?;

        check(self.sample_period_ms >= 1000, "sample_period_ms must be >= 1000")?;
        check(self.adc_samples >= MIN_SAMPLES, "adc_samples must be >= 8")?;
        check(self.adc_sample_interval_ms <= 100, "adc_sample_interval_ms must be <= 100")?;
        let cal = &self.calibration;
        check(
            [cal.ph, cal.dissolved_oxygen, cal.turbidity, cal.ammonia]
                .iter()
                .all(calibration_ok),
            "calibration slope must be finite and non-zero",
        )?;

        let a = &self.alerts;
        check(a.water_temp_min < a.water_temp_max, "water_temp_min must be < water_temp_max")?;
        check(a.ph_min < a.ph_max, "ph_min must be < ph_max")?;
        check(
            [a.dissolved_oxygen_min, a.ammonia_max, a.turbidity_max]
                .iter()
                .all(|v| v.is_finite() && *v >= 0.0),
            "alert limits must be non-negative",
        )?;
        let c = &self.control;
        check((0.0..=14.0).contains(&c.ph_low), "control ph_low must be 0–14")?;

        check(!self.collector_url.is_empty(), "collector_url must be set (max 128 bytes)")?;
        check(
            self.collector_url.starts_with("http://") || self.collector_url.starts_with("https://"),
            "collector_url must be http(s)",
        )?;
        check(
            (1..=5).contains(&self.upload_policy.max_attempts),
            "upload attempts must be 1–5",
        )?;
        check(self.upload_policy.multiplier >= 1, "backoff multiplier must be >= 1")?;
        check(self.link_wait_attempts <= 10, "link_wait_attempts must be <= 10")?;
        check(self.http_timeout_ms >= 1000, "http_timeout_ms must be >= 1000")?;
        Ok(())
    }
}
