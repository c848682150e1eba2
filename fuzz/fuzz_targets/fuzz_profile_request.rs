//! Fuzz target: profile request JSON → curve assembly
//!
//! Parses arbitrary bytes as a create/save request body and, when it
//! parses, builds the curve. Either step may reject; neither may panic,
//! and an accepted curve must hold only in-range setpoints.
//!
//! cargo fuzz run fuzz_profile_request

#![no_main]

use libfuzzer_sys::fuzz_target;
use roaster::catalog::ProfileRequest;
use roaster::profile::{MAX_FAN_PERCENT, MAX_SETPOINTS, MAX_TEMPERATURE_F};

fuzz_target!(|data: &[u8]| {
    let Ok(req) = serde_json::from_slice::<ProfileRequest>(data) else {
        return;
    };
    if let Ok(curve) = req.build_curve() {
        assert!(curve.setpoint_count() <= MAX_SETPOINTS);
        for sp in curve.setpoints() {
            assert!(sp.temperature <= MAX_TEMPERATURE_F);
            assert!(sp.fan_speed <= MAX_FAN_PERCENT);
        }
    }
});
