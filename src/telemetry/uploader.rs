//! Collector uplink with bounded retry.
//!
//! Each call: validate, wait (bounded) for the link, encode, then POST
//! under the shared [`RetryPolicy`].  Every attempt opens a fresh session
//! from the [`HttpConnector`] and drops it before the backoff sleep, so a
//! poisoned connection is never reused.

use log::{debug, info, warn};

use crate::alerts::AlertSnapshot;
use crate::app::ports::{
    AlertSender, HttpConnector, HttpSession, SecretStore, StorageError, TelemetryPort, Timebase,
};
use crate::config::SystemConfig;
use crate::control::ControlState;
use crate::error::{DeliveryFailure, UploadError};
use crate::network::ConnectivityFlag;
use crate::retry::RetryPolicy;
use crate::sensors::SensorSnapshot;

use super::payload::{self, AlertDocument, TelemetryDocument};

/// NVS keys of the collector credentials.
pub const API_KEY_SECRET: &str = "api_key";
pub const BEARER_TOKEN_SECRET: &str = "bearer_token";

// ───────────────────────────────────────────────────────────────
// Attempt record
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    /// This attempt failed; another may follow.
    TransientFailure,
    /// Every attempt allowed by the policy failed.
    PermanentFailure,
}

/// Per-attempt classification: 200 and 201 are the only successes.
pub const fn classify_status(status: u16) -> AttemptOutcome {
    match status {
        200 | 201 => AttemptOutcome::Success,
        _ => AttemptOutcome::TransientFailure,
    }
}

/// What one `upload` call sent and how it ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadAttempt {
    payload: Vec<u8>,
    attempts: u8,
    outcome: AttemptOutcome,
    last_failure: Option<DeliveryFailure>,
}

impl UploadAttempt {
    pub fn new(
        payload: Vec<u8>,
        attempts: u8,
        outcome: AttemptOutcome,
        last_failure: Option<DeliveryFailure>,
    ) -> Self {
        Self {
            payload,
            attempts,
            outcome,
            last_failure,
        }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn attempts(&self) -> u8 {
        self.attempts
    }

    pub fn retries_used(&self) -> u8 {
        self.attempts.saturating_sub(1)
    }

    pub fn outcome(&self) -> AttemptOutcome {
        self.outcome
    }

    pub fn last_failure(&self) -> Option<DeliveryFailure> {
        self.last_failure
    }

    pub fn delivered(&self) -> bool {
        self.outcome == AttemptOutcome::Success
    }

    /// `Err(PermanentUploadFailure)` unless delivered.
    pub fn into_result(self) -> Result<Self, UploadError> {
        if self.delivered() {
            return Ok(self);
        }
        Err(UploadError::PermanentUploadFailure {
            attempts: self.attempts,
            last: self.last_failure.unwrap_or(DeliveryFailure::Transport),
        })
    }
}

// ───────────────────────────────────────────────────────────────
// Credentials
// ───────────────────────────────────────────────────────────────

/// Collector API key and bearer token.  Never logged.
#[derive(Clone, Default)]
pub struct ApiCredentials {
    api_key: heapless::String<128>,
    authorization: heapless::String<520>,
}

impl core::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("ApiCredentials { .. }")
    }
}

fn load_str<const N: usize>(
    store: &impl SecretStore,
    key: &str,
    out: &mut heapless::String<N>,
) -> Result<(), StorageError> {
    let mut buf = [0u8; 512];
    let len = store.load_secret(key, &mut buf)?;
    let text = core::str::from_utf8(&buf[..len]).map_err(|_| StorageError::IoError)?;
    out.push_str(text.trim()).map_err(|_| StorageError::TooLarge)
}

impl ApiCredentials {
    pub fn new(api_key: &str, bearer_token: &str) -> Result<Self, StorageError> {
        let mut c = Self::default();
        c.api_key.push_str(api_key).map_err(|_| StorageError::TooLarge)?;
        c.authorization
            .push_str("Bearer ")
            .and_then(|()| c.authorization.push_str(bearer_token))
            .map_err(|_| StorageError::TooLarge)?;
        Ok(c)
    }

    pub fn load(store: &impl SecretStore) -> Result<Self, StorageError> {
        let mut api_key = heapless::String::<128>::new();
        let mut token = heapless::String::<512>::new();
        load_str(store, API_KEY_SECRET, &mut api_key)?;
        load_str(store, BEARER_TOKEN_SECRET, &mut token)?;
        Self::new(&api_key, &token)
    }
}

// ───────────────────────────────────────────────────────────────
// Uploader
// ───────────────────────────────────────────────────────────────

pub struct TelemetryUploader<C, T> {
    connector: C,
    time: T,
    telemetry_url: heapless::String<128>,
    alert_url: heapless::String<160>,
    credentials: ApiCredentials,
    policy: RetryPolicy,
    link: ConnectivityFlag,
    link_wait_attempts: u8,
    link_wait_interval_ms: u32,
}

impl<C: HttpConnector, T: Timebase> TelemetryUploader<C, T> {
    pub fn new(
        connector: C,
        time: T,
        link: ConnectivityFlag,
        credentials: ApiCredentials,
        cfg: &SystemConfig,
    ) -> Self {
        let mut alert_url = heapless::String::new();
        if alert_url.push_str(&cfg.collector_url).is_err()
            || alert_url.push_str(&cfg.alert_path).is_err()
        {
            warn!("Uploader: alert URL truncated");
        }
        Self {
            connector,
            time,
            telemetry_url: cfg.collector_url.clone(),
            alert_url,
            credentials,
            policy: cfg.upload_policy,
            link,
            link_wait_attempts: cfg.link_wait_attempts,
            link_wait_interval_ms: cfg.link_wait_interval_ms,
        }
    }

    pub fn alert_url(&self) -> &str {
        &self.alert_url
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Poll the connectivity flag a bounded number of times.
    fn await_link(&mut self) -> Result<(), UploadError> {
        for wait in 0..=self.link_wait_attempts {
            if self.link.is_connected() {
                return Ok(());
            }
            if wait < self.link_wait_attempts {
                debug!(
                    "Uploader: link down, waiting {} ms ({}/{})",
                    self.link_wait_interval_ms,
                    wait + 1,
                    self.link_wait_attempts
                );
                self.time.delay_ms(self.link_wait_interval_ms);
            }
        }
        warn!("Uploader: link still down, skipping upload");
        Err(UploadError::ConnectivityUnavailable)
    }

    /// POST `body` to `url` under the retry policy, one session per attempt.
    fn deliver(&mut self, url: &str, body: Vec<u8>) -> UploadAttempt {
        let headers = [
            ("Content-Type", "application/json"),
            ("apikey", self.credentials.api_key.as_str()),
            ("Authorization", self.credentials.authorization.as_str()),
        ];
        let connector = &mut self.connector;

        let out = self.policy.run(&mut self.time, |attempt| {
            let mut session = connector.open().map_err(|e| {
                warn!("Uploader: attempt {} could not connect ({})", attempt, e);
                DeliveryFailure::Transport
            })?;
            match session.post(url, &headers, &body) {
                Ok(status) if classify_status(status) == AttemptOutcome::Success => {
                    debug!("Uploader: attempt {} accepted (HTTP {})", attempt, status);
                    Ok(status)
                }
                Ok(status) => {
                    warn!("Uploader: attempt {} rejected (HTTP {})", attempt, status);
                    Err(DeliveryFailure::Rejected(status))
                }
                Err(e) => {
                    warn!("Uploader: attempt {} failed ({})", attempt, e);
                    Err(DeliveryFailure::Transport)
                }
            }
        });

        match out.result {
            Ok(_) => UploadAttempt::new(body, out.attempts, AttemptOutcome::Success, None),
            Err(last) => UploadAttempt::new(
                body,
                out.attempts,
                AttemptOutcome::PermanentFailure,
                Some(last),
            ),
        }
    }
}

impl<C: HttpConnector, T: Timebase> TelemetryPort for TelemetryUploader<C, T> {
    fn upload(
        &mut self,
        snapshot: &SensorSnapshot,
        control: &ControlState,
    ) -> Result<UploadAttempt, UploadError> {
        payload::validate(snapshot)?;
        self.await_link()?;
        let body = TelemetryDocument::new(snapshot, control).encode()?;

        let url = self.telemetry_url.clone();
        let attempt = self.deliver(&url, body);
        if attempt.delivered() {
            info!(
                "Uploader: telemetry delivered ({} bytes, {} retries)",
                attempt.payload().len(),
                attempt.retries_used()
            );
        }
        Ok(attempt)
    }
}

impl<C: HttpConnector, T: Timebase> AlertSender for TelemetryUploader<C, T> {
    fn send_alert(&mut self, alert: &AlertSnapshot) -> Result<UploadAttempt, UploadError> {
        self.await_link()?;
        let body = AlertDocument::new(alert).encode()?;
        let url = self.alert_url.clone();
        Ok(self.deliver(&url, body))
    }
}
