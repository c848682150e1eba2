//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).
//! A WebSocket push adapter would implement the same trait.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => {
                info!(
                    "TELEM | state={:?} | T={:.1}\u{00b0}F target={}\u{00b0}F final={}\u{00b0}F | \
                     fan={} | progress={}% | setpoints={}",
                    t.state,
                    t.current_temp_f,
                    t.target_temp_f,
                    t.final_temp_f,
                    t.fan_duty,
                    t.progress,
                    t.setpoint_count,
                );
            }
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {:?} -> {:?}", from, to);
            }
            AppEvent::RoastStarted {
                start_temp,
                final_target,
            } => {
                info!("ROAST | start={}\u{00b0}F final={}\u{00b0}F", start_temp, final_target);
            }
            AppEvent::RoastComplete { elapsed_ms } => {
                info!("ROAST | complete after {}s", elapsed_ms / 1_000);
            }
            AppEvent::ProfileSaved { id, activated } => {
                info!("PROFILE | saved id={} activated={}", id, activated);
            }
            AppEvent::ProfileActivated(id) => {
                info!("PROFILE | active id={}", id);
            }
            AppEvent::ProfileDeleted(id) => {
                info!("PROFILE | deleted id={}", id);
            }
            AppEvent::FaultDetected(fault) => {
                warn!("FAULT | {}", fault);
            }
            AppEvent::FaultCleared => {
                info!("FAULT | cleared");
            }
        }
    }
}
