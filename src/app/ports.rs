//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ MonitorService (domain)
//! ```
//!
//! Driven adapters (pins, ADC, radio, HTTP, storage) implement these traits.
//! Protocol engines, the uploader and the [`MonitorService`](super::service::MonitorService)
//! consume them via generics, so the domain core never touches hardware
//! directly and every path runs on the host against mocks.
//!
//! ## Security notes
//!
//! - **ConfigPort** implementations MUST validate before persisting.
//! - **SecretStore** values (API key, bearer token) are never logged.

use crate::alerts::AlertSnapshot;
use crate::config::SystemConfig;
use crate::control::ControlState;
use crate::error::{SensorFault, UploadError};
use crate::sensors::SensorSnapshot;
use crate::telemetry::UploadAttempt;

// ───────────────────────────────────────────────────────────────
// Time (driven adapter: hardware timer → domain)
// ───────────────────────────────────────────────────────────────

/// Monotonic microsecond clock plus blocking delays.
///
/// The bit-timing primitive measures every timeout against `now_us`, so an
/// implementation must never go backwards.
pub trait Timebase {
    /// Microseconds since boot.
    fn now_us(&self) -> u64;

    /// Busy-wait for `us` microseconds (used inside timing-critical frames).
    fn delay_us(&mut self, us: u32);

    /// Yielding sleep for `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32);
}

// ───────────────────────────────────────────────────────────────
// Analog input / digital output
// ───────────────────────────────────────────────────────────────

/// One-shot ADC access, already converted to calibrated millivolts.
pub trait AdcPort {
    fn read_raw_adc(&mut self, channel: u8) -> Result<u32, SensorFault>;
}

/// Plain push-pull outputs driving relays.
pub trait OutputPort {
    fn set_pin_level(&mut self, pin: i32, high: bool);
}

// ───────────────────────────────────────────────────────────────
// Liveness
// ───────────────────────────────────────────────────────────────

/// Hardware liveness timer; the node restarts if it is not reset in time.
pub trait LivenessPort {
    fn reset_liveness_timer(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the domain calls this once per cycle.
pub trait SensorPort {
    /// Read every sensor.  Never fails as a whole; each reading carries its
    /// own status.
    fn sample(&mut self) -> SensorSnapshot;
}

// ───────────────────────────────────────────────────────────────
// Wi-Fi radio
// ───────────────────────────────────────────────────────────────

/// One access point seen by a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub ssid: heapless::String<32>,
    pub rssi: i8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiError {
    /// The radio refused or aborted the scan.
    ScanFailed,
    /// The association attempt was rejected (auth, AP gone).
    ConnectFailed,
    /// The association did not complete within its window.
    Timeout,
}

impl core::fmt::Display for WifiError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ScanFailed => write!(f, "scan failed"),
            Self::ConnectFailed => write!(f, "connect failed"),
            Self::Timeout => write!(f, "connect timed out"),
        }
    }
}

/// Station-mode radio.
pub trait WifiPort {
    fn scan(&mut self) -> Result<Vec<ScanResult>, WifiError>;

    /// Associate and wait until the interface is up or `timeout_ms` elapses.
    fn connect(&mut self, ssid: &str, password: &str, timeout_ms: u32) -> Result<(), WifiError>;

    fn disconnect(&mut self);

    fn is_connected(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// HTTP
// ───────────────────────────────────────────────────────────────

/// The request produced no HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportError;

impl core::fmt::Display for TransportError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "HTTP transport error")
    }
}

/// A live HTTP connection.  Released when dropped.
pub trait HttpSession {
    /// POST `body` and return the response status code.
    fn post(&mut self, url: &str, headers: &[(&str, &str)], body: &[u8])
    -> Result<u16, TransportError>;
}

/// Creates a fresh [`HttpSession`] for every delivery attempt.
pub trait HttpConnector {
    type Session: HttpSession;

    fn open(&mut self) -> Result<Self::Session, TransportError>;
}

// ───────────────────────────────────────────────────────────────
// Telemetry and alerts (driven adapter: domain → collector)
// ───────────────────────────────────────────────────────────────

pub trait TelemetryPort {
    fn upload(
        &mut self,
        snapshot: &SensorSnapshot,
        control: &ControlState,
    ) -> Result<UploadAttempt, UploadError>;
}

pub trait AlertSender {
    fn send_alert(&mut self, alert: &AlertSnapshot) -> Result<UploadAttempt, UploadError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration and secrets (driven adapter: domain ↔ NVS)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST call [`SystemConfig::validate`] before persisting;
/// invalid values are rejected, never clamped.
pub trait ConfigPort {
    /// Returns [`SystemConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

/// Persistent credential storage (API key, bearer token, certificates).
pub trait SecretStore {
    /// Copy the secret into `buf` and return its length.
    fn load_secret(&self, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    fn store_secret(&mut self, key: &str, value: &[u8]) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`SecretStore`] operations.
#[derive(Debug, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Stored value does not fit the caller's buffer.
    TooLarge,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::TooLarge => write!(f, "value too large for buffer"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
