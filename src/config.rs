//! System configuration parameters
//!
//! All tunable parameters for the roaster controller.
//! Values can be overridden via NVS (non-volatile storage).
//! All temperatures are in Fahrenheit.

use serde::{Deserialize, Serialize};

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoasterConfig {
    // --- Storage ---
    /// NVS namespace holding profiles and the catalog index
    pub storage_namespace: heapless::String<15>,
    /// Extra write attempts after a failed profile write (before eviction)
    pub write_retries: u8,

    // --- Safety ---
    /// Absolute maximum safe temperature (°F)
    pub max_safe_temp_f: f32,
    /// Maximum temperature during a roast (°F)
    pub max_roast_temp_f: f32,
    /// Thermocouple reads far above this when disconnected (°F)
    pub sensor_fault_temp_f: f32,
    /// Consecutive bad readings before a sensor failure is declared
    pub max_bad_readings: u8,

    // --- Cooling ---
    /// Cooling ends once the bean mass drops to this temperature (°F)
    pub cooling_target_temp_f: u32,
    /// Hard cap on the cooling phase (milliseconds)
    pub max_cooling_ms: u32,

    // --- Timing ---
    /// Control loop interval (milliseconds)
    pub control_loop_interval_ms: u32,
}

impl Default for RoasterConfig {
    fn default() -> Self {
        let mut ns = heapless::String::new();
        let _ = ns.push_str("roaster");
        Self {
            // Storage
            storage_namespace: ns,
            write_retries: 3,

            // Safety
            max_safe_temp_f: 500.0,
            max_roast_temp_f: 460.0,
            sensor_fault_temp_f: 600.0,
            max_bad_readings: 5,

            // Cooling
            cooling_target_temp_f: 145,
            max_cooling_ms: 1_800_000, // 30 min

            // Timing
            control_loop_interval_ms: 250,
        }
    }
}
