//! Telemetry and alert delivery to the remote collector.

pub mod payload;
pub mod uploader;

pub use payload::{AlertDocument, MAX_PAYLOAD_BYTES, TelemetryDocument};
pub use uploader::{ApiCredentials, AttemptOutcome, TelemetryUploader, UploadAttempt};
