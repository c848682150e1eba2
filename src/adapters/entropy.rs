//! Entropy adapter for profile id generation.
//!
//! - **`target_os = "espidf"`**: the hardware RNG via `esp_fill_random`.
//!   True entropy once the RF subsystem is up; before that it degrades to
//!   a PRNG, which is still fine for ids.
//! - **`not(target_os = "espidf")`**: `RandomState` hashing, good enough
//!   for the simulator and tests.

use crate::app::ports::EntropyPort;

pub struct HardwareRng;

impl HardwareRng {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HardwareRng {
    fn default() -> Self {
        Self::new()
    }
}

impl EntropyPort for HardwareRng {
    #[cfg(target_os = "espidf")]
    fn next_u64(&mut self) -> u64 {
        let mut buf = [0u8; 8];
        // SAFETY: esp_fill_random writes exactly `len` bytes into the
        // provided buffer, which is valid and exclusively owned.
        unsafe {
            esp_idf_sys::esp_fill_random(buf.as_mut_ptr().cast(), buf.len());
        }
        u64::from_le_bytes(buf)
    }

    #[cfg(not(target_os = "espidf"))]
    fn next_u64(&mut self) -> u64 {
        use std::collections::hash_map::RandomState;
        use std::hash::{BuildHasher, Hasher};

        RandomState::new().build_hasher().finish()
    }
}
