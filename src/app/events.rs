//! Outbound application events.
//!
//! The [`RoasterService`](super::service::RoasterService) emits these through
//! the [`EventSink`](super::ports::EventSink) port. Adapters on the other
//! side decide what to do with them: log to serial or push over WebSocket.

use crate::error::SafetyFault;

use super::service::RoastState;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Periodic telemetry snapshot.
    Telemetry(TelemetryData),

    /// The roast state machine moved.
    StateChanged { from: RoastState, to: RoastState },

    /// The live curve was anchored and the roast began.
    RoastStarted { start_temp: u32, final_target: u32 },

    /// The bean temperature reached the curve's final target.
    RoastComplete { elapsed_ms: u32 },

    /// A profile was written to the catalog.
    ProfileSaved { id: String, activated: bool },

    ProfileActivated(String),

    ProfileDeleted(String),

    /// A safety fault forced the roaster into the error state.
    FaultDetected(SafetyFault),

    /// The operator cleared the error state.
    FaultCleared,
}

/// A point-in-time telemetry snapshot suitable for logging or transmission.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryData {
    pub state: RoastState,
    pub current_temp_f: f64,
    pub target_temp_f: u32,
    pub fan_duty: u32,
    pub progress: u32,
    pub setpoint_count: usize,
    pub final_temp_f: u32,
}
