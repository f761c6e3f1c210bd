//! AquaMon firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod alerts;
pub mod app;
pub mod bus;
pub mod config;
pub mod control;
pub mod error;
pub mod network;
pub mod pins;
pub mod retry;
pub mod sensors;
pub mod telemetry;

// Hardware-facing modules; the real implementations are guarded by cfg
// attributes inside and fall back to simulation stubs on the host.
pub mod adapters;
pub mod drivers;
