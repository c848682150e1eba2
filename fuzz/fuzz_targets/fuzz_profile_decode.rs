//! Fuzz target: `ProfileCurve::deserialize`
//!
//! Feeds arbitrary bytes as a stored curve blob and asserts the decoder
//! never panics, never leaves an empty or oversized curve, and that any
//! accepted blob re-encodes to the same bytes it was decoded from.
//!
//! cargo fuzz run fuzz_profile_decode

#![no_main]

use libfuzzer_sys::fuzz_target;
use roaster::profile::codec::{HEADER_LEN, SETPOINT_LEN};
use roaster::profile::{MAX_SETPOINTS, ProfileCurve};

fuzz_target!(|data: &[u8]| {
    let mut curve = ProfileCurve::new();
    let before = curve.clone();
    curve.deserialize(data);

    let n = curve.setpoint_count();
    assert!((1..=MAX_SETPOINTS).contains(&n), "decoded {} setpoints", n);

    if curve != before {
        let used = HEADER_LEN + n * SETPOINT_LEN;
        assert_eq!(&curve.serialize()[..], &data[..used]);
    }

    // Evaluating the decoded curve must be panic-free at any time.
    for t in [0, 1, u32::MAX / 2, u32::MAX] {
        let _ = curve.target_temperature(t);
        assert!(curve.target_fan_duty(t) <= 255);
        assert!(curve.progress(t) <= 100);
    }
});
