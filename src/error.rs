//! Error types for the AquaMon firmware.
//!
//! One enum per failure domain.  All variants are `Copy` so they can ride
//! inside readings, events and upload reports without allocation.  Boot
//! failures in `main` go through `anyhow`; nothing in a cycle escapes.

use core::fmt;

use crate::sensors::SensorKind;

// ---------------------------------------------------------------------------
// Sensor faults
// ---------------------------------------------------------------------------

/// Why a single reading could not be produced.
///
/// Every variant maps to [`ReadingStatus::SensorError`](crate::sensors::ReadingStatus)
/// on the reading it belongs to; none of them aborts a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorFault {
    /// An expected line transition did not occur within its time window.
    ProtocolTimeout,
    /// Frame checksum or CRC did not match the payload.
    ChecksumMismatch,
    /// No presence pulse after a bus reset.
    DeviceAbsent,
    /// Decoded value lies outside the sensor's physical domain.
    OutOfPhysicalRange,
    /// The GPIO driver reported an error while sampling or driving the line.
    PinIo,
    /// The ADC driver reported an error.
    AdcReadFailed,
}

impl fmt::Display for SensorFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProtocolTimeout => write!(f, "protocol timeout"),
            Self::ChecksumMismatch => write!(f, "checksum mismatch"),
            Self::DeviceAbsent => write!(f, "device absent"),
            Self::OutOfPhysicalRange => write!(f, "out of physical range"),
            Self::PinIo => write!(f, "GPIO error"),
            Self::AdcReadFailed => write!(f, "ADC read failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Upload errors
// ---------------------------------------------------------------------------

/// Why the last delivery attempt of a retried upload did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryFailure {
    /// The collector answered with a non-success status.
    Rejected(u16),
    /// The request never produced a response (connect, TLS, write, read).
    Transport,
}

impl fmt::Display for DeliveryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected(status) => write!(f, "HTTP {status}"),
            Self::Transport => write!(f, "transport error"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadError {
    /// The link stayed down through every reconnect wait.
    ConnectivityUnavailable,
    /// A reading carried a value outside its physical bounds.
    InvalidReading(SensorKind),
    /// The serialised document exceeded the payload bound.
    PayloadTooLarge,
    /// The document could not be serialised.
    Encode,
    /// Every attempt allowed by the retry policy failed.
    PermanentUploadFailure { attempts: u8, last: DeliveryFailure },
}

impl UploadError {
    /// `true` when the collector answered and refused the data, as opposed
    /// to the data never reaching it.
    pub const fn reached_collector(&self) -> bool {
        matches!(
            self,
            Self::PermanentUploadFailure {
                last: DeliveryFailure::Rejected(_),
                ..
            }
        )
    }
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectivityUnavailable => write!(f, "connectivity unavailable"),
            Self::InvalidReading(kind) => write!(f, "{} outside physical bounds", kind.label()),
            Self::PayloadTooLarge => write!(f, "payload exceeds bound"),
            Self::Encode => write!(f, "payload encoding failed"),
            Self::PermanentUploadFailure { attempts, last } => {
                write!(f, "gave up after {attempts} attempts ({last})")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Network errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkError {
    /// Every scan attempt failed.
    ScanFailed,
    /// No configured SSID appeared in the scan.
    NoKnownNetworks,
    /// Every ranked candidate failed to associate in time.
    AllCandidatesFailed,
    /// A configured SSID or password is malformed.
    InvalidCredential,
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ScanFailed => write!(f, "scan failed"),
            Self::NoKnownNetworks => write!(f, "no configured network in range"),
            Self::AllCandidatesFailed => write!(f, "all candidates failed to connect"),
            Self::InvalidCredential => write!(f, "invalid Wi-Fi credential"),
        }
    }
}
