//! Roast profile curve.
//!
//! A [`ProfileCurve`] is an ordered list of up to [`MAX_SETPOINTS`]
//! (time, temperature, fan-speed) anchors. The control loop asks it for
//! the target temperature and fan duty at the current elapsed time; the
//! answer is a linear interpolation between the two surrounding anchors.
//!
//! ```text
//!  temp │            ●────────●
//!       │      ●────╯
//!       │  ●──╯
//!       └──┴───┴────────┴────────┴──▶ time (ms since start_profile)
//! ```
//!
//! All temperatures are in Fahrenheit. Times are milliseconds.

pub mod codec;
pub mod id;

use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::error::{ProfileError, Result};

/// Maximum setpoints a curve can hold.
pub const MAX_SETPOINTS: usize = 10;

/// Upper bound for setpoint temperatures (°F).
pub const MAX_TEMPERATURE_F: u32 = 500;

/// Upper bound for setpoint fan speeds (%).
pub const MAX_FAN_PERCENT: u32 = 100;

/// Full-scale PWM duty for the fan output.
pub const FAN_PWM_MAX: u32 = 255;

/// A single anchor on the roast curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Setpoint {
    /// Milliseconds from the curve origin.
    pub time_ms: u32,
    /// Target temperature (°F, 0–500).
    pub temperature: u32,
    /// Fan speed (%, 0–100).
    pub fan_speed: u32,
}

impl Setpoint {
    pub const fn new(time_ms: u32, temperature: u32, fan_speed: u32) -> Self {
        Self {
            time_ms,
            temperature,
            fan_speed,
        }
    }

    /// The placeholder anchor a cleared curve starts with.
    pub const fn is_dummy(&self) -> bool {
        self.time_ms == 0 && self.temperature == 0 && self.fan_speed == 0
    }
}

/// Piecewise-linear temperature/fan target over elapsed time.
///
/// Invariant: always holds at least one setpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileCurve {
    setpoints: Vec<Setpoint, MAX_SETPOINTS>,
    /// Elapsed-time origin set by [`start_profile`](Self::start_profile). Not persisted.
    start_time: u32,
    version: u8,
}

impl Default for ProfileCurve {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileCurve {
    /// A curve holding only the dummy `(0, 0, 0)` setpoint.
    pub fn new() -> Self {
        let mut curve = Self {
            setpoints: Vec::new(),
            start_time: 0,
            version: codec::FORMAT_VERSION,
        };
        curve.add_setpoint(0, 0, 0);
        curve
    }

    /// Build a curve holding exactly `setpoints`, in order.
    ///
    /// Rejects an empty or oversized list with [`ProfileError::InvalidInput`]
    /// and any out-of-range value with [`ProfileError::SetpointOutOfBounds`].
    /// Nothing is clamped here: validation happens before assembly.
    pub fn from_setpoints(setpoints: &[Setpoint]) -> Result<Self> {
        if setpoints.is_empty() || setpoints.len() > MAX_SETPOINTS {
            return Err(ProfileError::InvalidInput);
        }
        if !setpoints
            .iter()
            .all(|sp| Self::validate_setpoint(sp.temperature, sp.fan_speed))
        {
            return Err(ProfileError::SetpointOutOfBounds);
        }

        let mut curve = Self {
            setpoints: Vec::new(),
            start_time: 0,
            version: codec::FORMAT_VERSION,
        };
        for sp in setpoints {
            curve.add_setpoint(sp.time_ms, sp.temperature, sp.fan_speed);
        }
        Ok(curve)
    }

    /// Reset to the single dummy setpoint.
    pub fn clear(&mut self) {
        self.setpoints.clear();
        self.add_setpoint(0, 0, 0);
    }

    /// Append a setpoint, clamping temperature and fan speed into range.
    ///
    /// A full curve silently drops the setpoint. Callers that care check
    /// [`is_full`](Self::is_full) first; the catalog validates counts
    /// before it ever gets here.
    pub fn add_setpoint(&mut self, time_ms: u32, temperature: u32, fan_speed: u32) {
        let sp = Setpoint::new(
            time_ms,
            temperature.min(MAX_TEMPERATURE_F),
            fan_speed.min(MAX_FAN_PERCENT),
        );
        let _ = self.setpoints.push(sp);
    }

    /// `false` if temperature or fan speed is above its limit.
    pub const fn validate_setpoint(temperature: u32, fan_speed: u32) -> bool {
        temperature <= MAX_TEMPERATURE_F && fan_speed <= MAX_FAN_PERCENT
    }

    /// Anchor the curve at `origin_ms` and the measured starting temperature.
    ///
    /// Setpoint 0 takes `current_temp` and borrows setpoint 1's fan speed so
    /// the first segment does not ramp up from a stopped fan.
    pub fn start_profile(&mut self, current_temp: u32, origin_ms: u32) {
        self.start_time = origin_ms;
        let next_fan = self.setpoints.get(1).map(|sp| sp.fan_speed);
        if let Some(first) = self.setpoints.first_mut() {
            first.temperature = current_temp;
            if let Some(fan) = next_fan {
                first.fan_speed = fan;
            }
        }
    }

    /// Target temperature (°F) at `now_ms`, measured from the start origin.
    pub fn target_temperature(&self, now_ms: u32) -> u32 {
        self.target_temperature_at(now_ms.wrapping_sub(self.start_time))
    }

    /// Target temperature (°F) at an origin-independent time, for plotting.
    pub fn target_temperature_at(&self, time_ms: u32) -> u32 {
        self.interpolate(time_ms, Boundary::Exclusive, |sp| sp.temperature) as u32
    }

    /// Target fan output at `now_ms` as a 0–255 PWM duty.
    ///
    /// The segment scan uses `>=` here but `>` for temperature, so at an
    /// exact anchor time the fan reads the segment *ending* at that anchor.
    /// Both land on the same value; the difference only matters for
    /// duplicate anchor times.
    ///
    /// The scaled duty is truncated on purpose, not rounded: 90 % gives 229
    /// and 70 % gives 178.
    pub fn target_fan_duty(&self, now_ms: u32) -> u32 {
        let t = now_ms.wrapping_sub(self.start_time);
        let percent = self.interpolate(t, Boundary::Inclusive, |sp| sp.fan_speed);
        // Decoded blobs are not range-checked; keep the duty inside the PWM range.
        ((percent * FAN_PWM_MAX as f32 / 100.0) as u32).min(FAN_PWM_MAX)
    }

    /// Percent of the curve's duration elapsed at `now_ms` (0–100, truncated).
    pub fn progress(&self, now_ms: u32) -> u32 {
        let t = now_ms.wrapping_sub(self.start_time);
        let end = self.last().time_ms;
        if t >= end {
            100
        } else {
            (t as f32 / end as f32 * 100.0) as u32
        }
    }

    /// Temperature of the last setpoint.
    pub fn final_target_temperature(&self) -> u32 {
        self.last().temperature
    }

    pub fn setpoint_count(&self) -> usize {
        self.setpoints.len()
    }

    pub fn setpoint(&self, index: usize) -> Option<Setpoint> {
        self.setpoints.get(index).copied()
    }

    pub fn setpoints(&self) -> &[Setpoint] {
        &self.setpoints
    }

    pub fn start_time(&self) -> u32 {
        self.start_time
    }

    pub fn is_full(&self) -> bool {
        self.setpoints.is_full()
    }

    /// Format version the curve was decoded from (or will be encoded as).
    pub fn version(&self) -> u8 {
        self.version
    }

    fn last(&self) -> &Setpoint {
        // Every constructor and decoder keeps at least one setpoint.
        &self.setpoints[self.setpoints.len() - 1]
    }

    fn interpolate(&self, t: u32, boundary: Boundary, value: impl Fn(&Setpoint) -> u32) -> f32 {
        let next = self.setpoints.iter().position(|sp| match boundary {
            Boundary::Exclusive => sp.time_ms > t,
            Boundary::Inclusive => sp.time_ms >= t,
        });

        match next {
            None => value(self.last()) as f32,
            Some(0) => value(&self.setpoints[0]) as f32,
            Some(i) => {
                let prev = &self.setpoints[i - 1];
                let next = &self.setpoints[i];
                if next.time_ms == prev.time_ms {
                    return value(next) as f32;
                }
                let ratio = (t - prev.time_ms) as f32 / (next.time_ms - prev.time_ms) as f32;
                let from = value(prev) as f32;
                let to = value(next) as f32;
                from + (to - from) * ratio
            }
        }
    }
}

/// Which anchor ends the segment containing `t`.
#[derive(Clone, Copy)]
enum Boundary {
    /// First anchor strictly after `t`.
    Exclusive,
    /// First anchor at or after `t`.
    Inclusive,
}
