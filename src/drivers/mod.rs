//! Hardware initialisation, liveness timer and task helpers.

pub mod hw_init;
pub mod task_pin;
pub mod watchdog;
