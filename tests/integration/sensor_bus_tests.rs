//! Both sensor protocols end to end over the simulated open-drain line.

use aquamon::bus::BitBanger;
use aquamon::bus::sim::{SimBus, SimClock, SimLine, Waveform};
use aquamon::error::SensorFault;
use aquamon::sensors::SensorKind;
use aquamon::sensors::dht22::Dht22;
use aquamon::sensors::ds18b20::Ds18b20;

const POND_21_25: [u8; 9] = [0x54, 0x01, 0x4B, 0x46, 0x7F, 0xFF, 0x0C, 0x10, 0xFD];
const POWER_ON_85: [u8; 9] = [0x50, 0x05, 0x4B, 0x46, 0x7F, 0xFF, 0x0C, 0x10, 0x1C];
const ICE_MINUS_10_125: [u8; 9] = [0x5E, 0xFF, 0x4B, 0x46, 0x7F, 0xFF, 0x0C, 0x10, 0x6A];

fn ds18b20(bus: &SimBus) -> Ds18b20<BitBanger<SimLine, SimClock>> {
    Ds18b20::new(BitBanger::new(bus.line(), bus.clock()))
}

// ── DS18B20 ───────────────────────────────────────────────────

#[test]
fn water_temperature_over_one_wire() {
    let bus = SimBus::new();
    bus.script_ds18b20(POND_21_25);

    let reading = ds18b20(&bus).reading();
    assert_eq!(reading.kind, SensorKind::WaterTemperature);
    assert_eq!(reading.value(), Some(21.25));
    // Two resets plus the fixed conversion wait.
    assert!(bus.now_us() >= 750_000);
}

#[test]
fn sub_zero_water_temperature() {
    let bus = SimBus::new();
    bus.script_ds18b20(ICE_MINUS_10_125);
    assert_eq!(ds18b20(&bus).read_celsius(), Ok(-10.125));
}

#[test]
fn power_on_value_is_passed_through() {
    let bus = SimBus::new();
    bus.script_ds18b20(POWER_ON_85);
    assert_eq!(ds18b20(&bus).read_celsius(), Ok(85.0));
}

#[test]
fn corrupted_scratchpad_is_rejected() {
    let mut pad = POND_21_25;
    pad[0] ^= 0x04;
    let bus = SimBus::new();
    bus.script_ds18b20(pad);

    let reading = ds18b20(&bus).reading();
    assert_eq!(reading.fault(), Some(SensorFault::ChecksumMismatch));
}

#[test]
fn silent_bus_means_no_device() {
    let bus = SimBus::new();
    assert_eq!(
        ds18b20(&bus).read_celsius(),
        Err(SensorFault::DeviceAbsent)
    );
}

// ── DHT22 ─────────────────────────────────────────────────────

#[test]
fn frost_frame_over_the_line() {
    let bus = SimBus::new();
    bus.push_response(Waveform::dht22_response([0x02, 0x8C, 0x80, 0x65, 0x73]));
    let mut dht = Dht22::new(BitBanger::new(bus.line(), bus.clock()));

    let r = dht.read().unwrap();
    assert!((r.temperature_c + 10.1).abs() < 1e-4);
    assert!((r.humidity_pct - 65.2).abs() < 1e-4);
}

#[test]
fn corrupted_frame_marks_both_readings() {
    let bus = SimBus::new();
    bus.push_response(Waveform::dht22_response([0x02, 0x8C, 0x01, 0x5F, 0xEF]));
    let mut dht = Dht22::new(BitBanger::new(bus.line(), bus.clock()));

    let [air, humidity] = dht.readings();
    assert_eq!(air.fault(), Some(SensorFault::ChecksumMismatch));
    assert_eq!(humidity.fault(), Some(SensorFault::ChecksumMismatch));
}

#[test]
fn consecutive_reads_use_fresh_start_signals() {
    let bus = SimBus::new();
    bus.push_response(Waveform::dht22_response([0x02, 0x8C, 0x01, 0x5F, 0xEE]));
    bus.push_response(Waveform::dht22_response([0x02, 0x8C, 0x80, 0x65, 0x73]));
    let mut dht = Dht22::new(BitBanger::new(bus.line(), bus.clock()));

    assert!(dht.read().unwrap().temperature_c > 0.0);
    assert!(dht.read().unwrap().temperature_c < 0.0);
    assert_eq!(bus.host_pulses().len(), 2);
}
