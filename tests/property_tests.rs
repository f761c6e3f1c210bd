//! Property tests for the integrity checks and ranking rules.
//!
//! Host only; proptest is not built for the ESP32 target.

#![cfg(not(target_os = "espidf"))]

use aquamon::app::ports::{ScanResult, Timebase};
use aquamon::bus::crc::crc8;
use aquamon::error::SensorFault;
use aquamon::network::{WifiCredential, rank_candidates};
use aquamon::retry::RetryPolicy;
use aquamon::sensors::dht22::decode_frame;
use aquamon::sensors::ds18b20::decode_scratchpad;
use proptest::prelude::*;

// ── DS18B20 scratchpad ────────────────────────────────────────

/// Raw readings inside the sensor's -55..=125 °C range, in 1/16 °C.
fn raw_temperature() -> impl Strategy<Value = i16> {
    (-55 * 16i16)..=(125 * 16i16)
}

fn scratchpad(raw: i16, tail: [u8; 6]) -> [u8; 9] {
    let mut pad = [0u8; 9];
    pad[..2].copy_from_slice(&raw.to_le_bytes());
    pad[2..8].copy_from_slice(&tail);
    pad[8] = crc8(&pad[..8]);
    pad
}

proptest! {
    #[test]
    fn valid_scratchpad_decodes_exactly(raw in raw_temperature(), tail in any::<[u8; 6]>()) {
        let pad = scratchpad(raw, tail);
        prop_assert_eq!(decode_scratchpad(&pad), Ok(f32::from(raw) / 16.0));
    }

    #[test]
    fn any_single_byte_corruption_is_caught(
        raw in raw_temperature(),
        tail in any::<[u8; 6]>(),
        index in 0usize..9,
        mask in 1u8..=255,
    ) {
        let mut pad = scratchpad(raw, tail);
        pad[index] ^= mask;
        prop_assert_eq!(decode_scratchpad(&pad), Err(SensorFault::ChecksumMismatch));
    }
}

// ── DHT22 frame ───────────────────────────────────────────────

fn dht_frame(humidity_tenths: u16, temp_tenths: i16) -> [u8; 5] {
    let t = if temp_tenths < 0 {
        temp_tenths.unsigned_abs() | 0x8000
    } else {
        temp_tenths as u16
    };
    let [h0, h1] = humidity_tenths.to_be_bytes();
    let [t0, t1] = t.to_be_bytes();
    let sum = h0.wrapping_add(h1).wrapping_add(t0).wrapping_add(t1);
    [h0, h1, t0, t1, sum]
}

proptest! {
    #[test]
    fn in_range_frames_decode(humidity in 0u16..=1000, temp in -400i16..=800) {
        let r = decode_frame(&dht_frame(humidity, temp)).unwrap();
        prop_assert!((r.humidity_pct - f32::from(humidity) / 10.0).abs() < 1e-3);
        prop_assert!((r.temperature_c - f32::from(temp) / 10.0).abs() < 1e-3);
    }

    #[test]
    fn corrupted_frame_never_decodes(
        humidity in 0u16..=1000,
        temp in -400i16..=800,
        index in 0usize..5,
        mask in 1u8..=255,
    ) {
        let mut frame = dht_frame(humidity, temp);
        frame[index] ^= mask;
        prop_assert_eq!(decode_frame(&frame), Err(SensorFault::ChecksumMismatch));
    }
}

// ── Candidate ranking ─────────────────────────────────────────

const POOL: [&str; 6] = ["Farm", "Barn", "Shed", "Pond", "Cafe", "Road"];

fn ap(index: usize, rssi: i8) -> ScanResult {
    let mut ssid = heapless::String::new();
    ssid.push_str(POOL[index]).unwrap();
    ScanResult { ssid, rssi }
}

proptest! {
    #[test]
    fn ranking_rules_hold(
        seen in proptest::collection::vec((0usize..6, -100i8..=-20), 0..12),
        known_count in 0usize..=4,
        preferred in proptest::option::of(0usize..6),
    ) {
        let scan: Vec<ScanResult> = seen.iter().map(|&(i, rssi)| ap(i, rssi)).collect();
        let known: Vec<WifiCredential> = POOL[..known_count]
            .iter()
            .map(|ssid| WifiCredential::new(ssid, "password123").unwrap())
            .collect();
        let preferred_ssid = preferred.map_or("", |i| POOL[i]);

        let ranked = rank_candidates(&scan, &known, preferred_ssid);

        // Exactly the configured SSIDs that were seen, once each.
        let expected = known.iter().filter(|k| scan.iter().any(|s| s.ssid == k.ssid)).count();
        prop_assert_eq!(ranked.len(), expected);
        for (i, c) in ranked.iter().enumerate() {
            prop_assert!(known.iter().any(|k| k.ssid == c.ssid));
            prop_assert!(ranked[i + 1..].iter().all(|o| o.ssid != c.ssid));
            let strongest = scan.iter().filter(|s| s.ssid == c.ssid).map(|s| s.rssi).max();
            prop_assert_eq!(Some(c.rssi), strongest);
        }

        // Preferred leads; the rest by descending signal.
        if let Some(pos) = ranked.iter().position(|c| c.preferred) {
            prop_assert_eq!(pos, 0);
            prop_assert_eq!(ranked[0].ssid.as_str(), preferred_ssid);
        }
        let rest: Vec<i8> = ranked.iter().filter(|c| !c.preferred).map(|c| c.rssi).collect();
        prop_assert!(rest.windows(2).all(|w| w[0] >= w[1]));
    }
}

// ── Retry policy ──────────────────────────────────────────────

#[derive(Default)]
struct Sleeps(Vec<u32>);

impl Timebase for Sleeps {
    fn now_us(&self) -> u64 {
        0
    }
    fn delay_us(&mut self, _us: u32) {}
    fn delay_ms(&mut self, ms: u32) {
        self.0.push(ms);
    }
}

proptest! {
    #[test]
    fn retries_are_bounded_and_backoff_grows(
        max_attempts in 1u8..=5,
        base in 1u32..=5_000,
        multiplier in 1u32..=4,
        succeed_on in proptest::option::of(1u8..=6),
    ) {
        let policy = RetryPolicy::new(max_attempts, base, multiplier);
        let mut time = Sleeps::default();
        let mut calls = 0u8;

        let out = policy.run(&mut time, |attempt| {
            calls += 1;
            if Some(attempt) == succeed_on { Ok(()) } else { Err(()) }
        });

        prop_assert!(calls <= max_attempts);
        prop_assert_eq!(out.attempts, calls);
        prop_assert_eq!(time.0.len(), usize::from(calls) - 1);
        prop_assert!(time.0.windows(2).all(|w| w[0] <= w[1]));
        prop_assert!(time.0.iter().all(|&d| d >= base && d <= policy.max_delay_ms));
        let should_succeed = succeed_on.is_some_and(|n| n <= max_attempts);
        prop_assert_eq!(out.result.is_ok(), should_succeed);
    }
}
