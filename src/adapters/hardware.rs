//! Hardware adapter: bridges the thermocouple and touchscreen tasks to
//! the domain port traits.
//!
//! The thermocouple amplifier is polled by its own task, which publishes
//! the latest reading into a [`ThermocoupleCell`]. The touchscreen task
//! reads back whatever the control loop last pushed into a
//! [`DisplayMirror`]. Both are lock-free so neither task can stall the
//! control loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::app::ports::{DisplayPort, ThermalPort};

use super::time::Esp32TimeAdapter;

// ── Thermocouple ──────────────────────────────────────────────

/// Latest thermocouple reading (°F) as `f32` bits. NaN means "no reading
/// yet", which the safety check counts as a bad reading.
pub struct ThermocoupleCell {
    bits: AtomicU32,
}

impl ThermocoupleCell {
    pub fn new() -> Self {
        Self {
            bits: AtomicU32::new(f32::NAN.to_bits()),
        }
    }

    pub fn publish(&self, temp_f: f32) {
        self.bits.store(temp_f.to_bits(), Ordering::Release);
    }

    pub fn latest(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Acquire))
    }
}

impl Default for ThermocoupleCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Concrete [`ThermalPort`]: system clock plus the shared thermocouple cell.
pub struct HardwareAdapter {
    clock: Esp32TimeAdapter,
    thermocouple: Arc<ThermocoupleCell>,
}

impl HardwareAdapter {
    pub fn new(clock: Esp32TimeAdapter, thermocouple: Arc<ThermocoupleCell>) -> Self {
        Self {
            clock,
            thermocouple,
        }
    }
}

impl ThermalPort for HardwareAdapter {
    fn elapsed_millis(&self) -> u32 {
        self.clock.millis()
    }

    fn current_temperature(&mut self) -> f64 {
        f64::from(self.thermocouple.latest())
    }
}

// ── Touchscreen ───────────────────────────────────────────────

/// Values the touchscreen renders on its roast page.
#[derive(Debug, Default)]
pub struct DisplayMirror {
    final_target: AtomicU32,
    progress: AtomicU32,
}

impl DisplayMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(final_target °F, progress %)` as last pushed by the control loop.
    pub fn snapshot(&self) -> (u32, u32) {
        (
            self.final_target.load(Ordering::Relaxed),
            self.progress.load(Ordering::Relaxed),
        )
    }
}

impl DisplayPort for Arc<DisplayMirror> {
    fn show_targets(&mut self, final_target: u32, progress: u32) {
        self.final_target.store(final_target, Ordering::Relaxed);
        self.progress.store(progress, Ordering::Relaxed);
    }
}
