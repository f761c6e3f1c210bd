//! Known-network selection.
//!
//! Scan (retried under a [`RetryPolicy`]), keep the configured SSIDs that
//! are in range, rank them (preferred SSID first, then strongest signal)
//! and try each in turn with a per-candidate association timeout.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{ScanResult, Timebase, WifiPort};
use crate::config::SystemConfig;
use crate::error::NetworkError;
use crate::retry::RetryPolicy;

/// Maximum number of configured networks.
pub const MAX_NETWORKS: usize = 4;

// ───────────────────────────────────────────────────────────────
// Credentials
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiCredential {
    pub ssid: heapless::String<32>,
    pub password: heapless::String<64>,
}

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

/// 1–32 printable ASCII bytes.
pub fn validate_ssid(ssid: &str) -> Result<(), NetworkError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(NetworkError::InvalidCredential);
    }
    Ok(())
}

/// Empty (open network) or 8–64 bytes (WPA2).
pub fn validate_password(password: &str) -> Result<(), NetworkError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(NetworkError::InvalidCredential);
    }
    Ok(())
}

impl WifiCredential {
    pub fn new(ssid: &str, password: &str) -> Result<Self, NetworkError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        let mut c = Self {
            ssid: heapless::String::new(),
            password: heapless::String::new(),
        };
        c.ssid
            .push_str(ssid)
            .map_err(|_| NetworkError::InvalidCredential)?;
        c.password
            .push_str(password)
            .map_err(|_| NetworkError::InvalidCredential)?;
        Ok(c)
    }

    pub fn validate(&self) -> Result<(), NetworkError> {
        validate_ssid(&self.ssid)?;
        validate_password(&self.password)
    }
}

// ───────────────────────────────────────────────────────────────
// Ranking
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkCandidate {
    pub ssid: heapless::String<32>,
    pub password: heapless::String<64>,
    pub rssi: i8,
    pub preferred: bool,
}

/// Configured networks present in `scan`, best first.
///
/// Several access points sharing an SSID count once, at their strongest
/// signal.  Unconfigured SSIDs are ignored.
pub fn rank_candidates(
    scan: &[ScanResult],
    known: &[WifiCredential],
    preferred_ssid: &str,
) -> heapless::Vec<NetworkCandidate, MAX_NETWORKS> {
    let mut ranked: heapless::Vec<NetworkCandidate, MAX_NETWORKS> = heapless::Vec::new();

    for cred in known {
        let strongest = scan
            .iter()
            .filter(|ap| ap.ssid == cred.ssid)
            .map(|ap| ap.rssi)
            .max();
        if let Some(rssi) = strongest {
            let candidate = NetworkCandidate {
                ssid: cred.ssid.clone(),
                password: cred.password.clone(),
                rssi,
                preferred: !preferred_ssid.is_empty() && cred.ssid == preferred_ssid,
            };
            if ranked.push(candidate).is_err() {
                break;
            }
        }
    }

    ranked.sort_by(|a, b| b.preferred.cmp(&a.preferred).then(b.rssi.cmp(&a.rssi)));
    ranked
}

// ───────────────────────────────────────────────────────────────
// Selector
// ───────────────────────────────────────────────────────────────

pub struct NetworkSelector {
    networks: heapless::Vec<WifiCredential, MAX_NETWORKS>,
    preferred_ssid: heapless::String<32>,
    scan_policy: RetryPolicy,
    connect_timeout_ms: u32,
}

impl NetworkSelector {
    pub fn new(
        networks: heapless::Vec<WifiCredential, MAX_NETWORKS>,
        preferred_ssid: heapless::String<32>,
        scan_policy: RetryPolicy,
        connect_timeout_ms: u32,
    ) -> Self {
        Self {
            networks,
            preferred_ssid,
            scan_policy,
            connect_timeout_ms,
        }
    }

    pub fn from_config(cfg: &SystemConfig) -> Self {
        Self::new(
            cfg.networks.clone(),
            cfg.preferred_ssid.clone(),
            cfg.scan_policy,
            cfg.connect_timeout_ms,
        )
    }

    /// Scan until at least one access point is seen or the policy is spent.
    pub fn scan(
        &self,
        wifi: &mut impl WifiPort,
        time: &mut impl Timebase,
    ) -> Result<Vec<ScanResult>, NetworkError> {
        let out = self.scan_policy.run(time, |attempt| match wifi.scan() {
            Ok(aps) if !aps.is_empty() => Ok(aps),
            Ok(_) => {
                warn!("Selector: scan {} saw no access points", attempt);
                Err(NetworkError::NoKnownNetworks)
            }
            Err(e) => {
                warn!("Selector: scan {} failed ({})", attempt, e);
                Err(NetworkError::ScanFailed)
            }
        });
        out.result
    }

    /// Scan and rank.
    pub fn candidates(
        &self,
        wifi: &mut impl WifiPort,
        time: &mut impl Timebase,
    ) -> Result<heapless::Vec<NetworkCandidate, MAX_NETWORKS>, NetworkError> {
        if self.networks.is_empty() {
            return Err(NetworkError::NoKnownNetworks);
        }
        let scan = self.scan(wifi, time)?;
        let ranked = rank_candidates(&scan, &self.networks, &self.preferred_ssid);
        if ranked.is_empty() {
            return Err(NetworkError::NoKnownNetworks);
        }
        Ok(ranked)
    }

    /// Connect to the best reachable configured network.
    pub fn select_and_connect(
        &self,
        wifi: &mut impl WifiPort,
        time: &mut impl Timebase,
    ) -> Result<NetworkCandidate, NetworkError> {
        for candidate in self.candidates(wifi, time)? {
            info!(
                "Selector: trying '{}' (RSSI {} dBm{})",
                candidate.ssid,
                candidate.rssi,
                if candidate.preferred { ", preferred" } else { "" }
            );
            match wifi.connect(&candidate.ssid, &candidate.password, self.connect_timeout_ms) {
                Ok(()) => {
                    info!("Selector: connected to '{}'", candidate.ssid);
                    return Ok(candidate);
                }
                Err(e) => {
                    warn!("Selector: '{}' failed ({})", candidate.ssid, e);
                    wifi.disconnect();
                }
            }
        }
        Err(NetworkError::AllCandidatesFailed)
    }
}
