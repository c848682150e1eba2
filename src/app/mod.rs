//! Application core: pure domain logic, zero I/O.
//!
//! This module holds the roast state machine and the command surface the
//! network and touchscreen layers drive. All interaction with hardware
//! happens through **port traits** defined in [`ports`], keeping this
//! layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
