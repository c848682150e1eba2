//! Application service: the hexagonal core.
//!
//! [`RoasterService`] owns the roast state machine and a handle to the
//! profile catalog. Each control tick it samples the [`ThermalPort`], asks
//! the live curve for the current targets, and hands them back to the
//! caller's PID/PWM layer. Catalog commands from the network task arrive
//! through [`handle_command`](RoasterService::handle_command).
//!
//! ```text
//!  ThermalPort ──▶ ┌────────────────────────────┐ ──▶ EventSink
//!                  │       RoasterService        │
//!  DisplayPort ◀── │  state machine · live curve │ ──▶ ControlOutput
//!                  └─────────────┬──────────────┘
//!                                ▼
//!                         SharedCatalog
//! ```

use std::sync::Arc;

use log::{info, warn};

use crate::catalog::shared::SharedCatalog;
use crate::config::RoasterConfig;
use crate::error::{ProfileError, Result, SafetyFault};
use crate::profile::FAN_PWM_MAX;

use super::commands::{AppCommand, CommandReply};
use super::events::{AppEvent, TelemetryData};
use super::ports::{DisplayPort, EntropyPort, EventSink, StoragePort, ThermalPort};

// ───────────────────────────────────────────────────────────────
// Roast state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoastState {
    Idle,
    /// One tick: anchor the live curve at the measured temperature.
    StartRoast,
    Roasting,
    Cooling,
    Error,
}

impl RoastState {
    /// States during which the live curve must not be swapped.
    pub fn is_roasting(self) -> bool {
        matches!(self, Self::StartRoast | Self::Roasting)
    }
}

/// Outcome of the per-tick sensor check.
enum Reading {
    Valid,
    /// Implausible, but not yet enough in a row to call it a failure.
    Suspect,
    Fault(SafetyFault),
}

/// What the heater PID and fan PWM should do this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlOutput {
    /// Heater PID setpoint (°F). Meaningless while the heater is disabled.
    pub target_temp: u32,
    /// Fan PWM duty (0–255).
    pub fan_duty: u32,
    /// Roast progress (0–100).
    pub progress: u32,
    pub heater_enabled: bool,
}

// ───────────────────────────────────────────────────────────────
// RoasterService
// ───────────────────────────────────────────────────────────────

pub struct RoasterService<S: StoragePort, R: EntropyPort> {
    catalog: Arc<SharedCatalog<S, R>>,
    config: RoasterConfig,
    state: RoastState,
    /// Consecutive implausible thermocouple readings.
    bad_readings: u8,
    cooling_since: u32,
    /// Clock of the most recent tick, used to time commands that arrive
    /// between ticks.
    last_now: u32,
    last_temp: f64,
    output: ControlOutput,
}

impl<S: StoragePort, R: EntropyPort> RoasterService<S, R> {
    pub fn new(catalog: Arc<SharedCatalog<S, R>>, config: RoasterConfig) -> Self {
        Self {
            catalog,
            config,
            state: RoastState::Idle,
            bad_readings: 0,
            cooling_since: 0,
            last_now: 0,
            last_temp: 0.0,
            output: ControlOutput::default(),
        }
    }

    /// Reconcile the catalog and load the active profile. Call once at boot.
    pub fn start(&mut self, sink: &mut impl EventSink) -> Result<()> {
        let active = self.catalog.with(|c| {
            c.ensure_default()?;
            Ok::<_, ProfileError>(c.active_id())
        })?;
        if let Some(id) = active {
            sink.emit(&AppEvent::ProfileActivated(id));
        }
        info!("RoasterService started in {:?}", self.state);
        Ok(())
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one control cycle: sample → safety → state machine → display.
    pub fn tick(
        &mut self,
        thermal: &mut impl ThermalPort,
        display: &mut impl DisplayPort,
        sink: &mut impl EventSink,
    ) -> ControlOutput {
        let now = thermal.elapsed_millis();
        let temp = thermal.current_temperature();
        self.last_now = now;
        self.last_temp = temp;

        match self.check_safety(temp) {
            Reading::Valid => {}
            // Hold the previous output rather than act on a bogus value.
            Reading::Suspect => return self.output,
            Reading::Fault(fault) => {
                if self.state != RoastState::Error {
                    warn!("Safety fault: {} at {:.1}\u{00b0}F", fault, temp);
                    self.transition(RoastState::Error, sink);
                    sink.emit(&AppEvent::FaultDetected(fault));
                }
            }
        }

        self.output = match self.state {
            RoastState::Idle | RoastState::Error => ControlOutput::default(),
            RoastState::StartRoast => self.begin_roast(temp, now, sink),
            RoastState::Roasting => self.follow_curve(temp, now, display, sink),
            RoastState::Cooling => self.cool(temp, now, sink),
        };
        self.output
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an external command (HTTP API, WebSocket, touchscreen).
    pub fn handle_command(&mut self, cmd: AppCommand, sink: &mut impl EventSink) -> Result<CommandReply> {
        match cmd {
            AppCommand::CreateProfile(req) => {
                self.guard_live_swap(req.activate)?;
                let id = self.catalog.with(|c| c.create(&req))?;
                sink.emit(&AppEvent::ProfileSaved {
                    id: id.clone(),
                    activated: req.activate,
                });
                Ok(CommandReply::Saved(id))
            }
            AppCommand::SaveProfile { id, request } => {
                self.guard_live_swap(request.activate)?;
                self.catalog.with(|c| c.save_existing(&id, &request))?;
                sink.emit(&AppEvent::ProfileSaved {
                    id: id.clone(),
                    activated: request.activate,
                });
                Ok(CommandReply::Saved(id))
            }
            AppCommand::ActivateProfile(id) => {
                self.guard_live_swap(true)?;
                self.catalog.with(|c| c.activate(&id))?;
                sink.emit(&AppEvent::ProfileActivated(id));
                Ok(CommandReply::Done)
            }
            AppCommand::DeleteProfile(id) => {
                self.catalog.with(|c| c.delete(&id))?;
                sink.emit(&AppEvent::ProfileDeleted(id));
                Ok(CommandReply::Done)
            }
            AppCommand::RenameProfile { id, name } => {
                self.catalog.with(|c| c.rename(&id, &name))?;
                Ok(CommandReply::Done)
            }
            AppCommand::GetProfile(id) => {
                let detail = self.catalog.with(|c| c.get(&id))?;
                Ok(CommandReply::Profile(detail))
            }
            AppCommand::ListProfiles => self.catalog.with(|c| c.list()).map(CommandReply::List),
            AppCommand::DeleteAllProfiles => {
                self.guard_live_swap(true)?;
                self.catalog.with(|c| c.delete_all())?;
                Ok(CommandReply::Done)
            }
            AppCommand::StartRoast => {
                if self.state != RoastState::Idle {
                    return Err(ProfileError::InvalidInput);
                }
                self.transition(RoastState::StartRoast, sink);
                Ok(CommandReply::Done)
            }
            AppCommand::StopRoast => {
                if self.state.is_roasting() {
                    self.cooling_since = self.last_now;
                    self.transition(RoastState::Cooling, sink);
                }
                Ok(CommandReply::Done)
            }
            AppCommand::ClearFault => {
                if self.state == RoastState::Error {
                    self.bad_readings = 0;
                    self.transition(RoastState::Idle, sink);
                    sink.emit(&AppEvent::FaultCleared);
                }
                Ok(CommandReply::Done)
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> RoastState {
        self.state
    }

    pub fn last_output(&self) -> ControlOutput {
        self.output
    }

    pub fn catalog(&self) -> &Arc<SharedCatalog<S, R>> {
        &self.catalog
    }

    /// Build a telemetry snapshot from the last tick.
    pub fn build_telemetry(&self) -> TelemetryData {
        let (setpoint_count, final_temp_f) = self
            .catalog
            .with(|c| (c.live().setpoint_count(), c.live().final_target_temperature()));
        TelemetryData {
            state: self.state,
            current_temp_f: self.last_temp,
            target_temp_f: self.output.target_temp,
            fan_duty: self.output.fan_duty,
            progress: self.output.progress,
            setpoint_count,
            final_temp_f,
        }
    }

    // ── Internal ──────────────────────────────────────────────

    fn begin_roast(&mut self, temp: f64, now: u32, sink: &mut impl EventSink) -> ControlOutput {
        let start_temp = temp as u32;
        let (final_target, out) = self.catalog.with(|c| {
            let live = c.live_mut();
            live.start_profile(start_temp, now);
            (
                live.final_target_temperature(),
                ControlOutput {
                    target_temp: live.target_temperature(now),
                    fan_duty: live.target_fan_duty(now),
                    progress: live.progress(now),
                    heater_enabled: true,
                },
            )
        });
        info!("Roast started at {}\u{00b0}F, final target {}\u{00b0}F", start_temp, final_target);
        sink.emit(&AppEvent::RoastStarted {
            start_temp,
            final_target,
        });
        self.transition(RoastState::Roasting, sink);
        self.clamp_target(out)
    }

    fn follow_curve(
        &mut self,
        temp: f64,
        now: u32,
        display: &mut impl DisplayPort,
        sink: &mut impl EventSink,
    ) -> ControlOutput {
        let (final_target, elapsed, out) = self.catalog.with(|c| {
            let live = c.live();
            (
                live.final_target_temperature(),
                now.wrapping_sub(live.start_time()),
                ControlOutput {
                    target_temp: live.target_temperature(now),
                    fan_duty: live.target_fan_duty(now),
                    progress: live.progress(now),
                    heater_enabled: true,
                },
            )
        });
        display.show_targets(final_target, out.progress);

        if temp >= f64::from(final_target) {
            info!("Roast complete after {} ms -> cooling", elapsed);
            sink.emit(&AppEvent::RoastComplete { elapsed_ms: elapsed });
            self.cooling_since = now;
            self.transition(RoastState::Cooling, sink);
            return self.cooling_output();
        }
        self.clamp_target(out)
    }

    fn cool(&mut self, temp: f64, now: u32, sink: &mut impl EventSink) -> ControlOutput {
        let cooled = temp <= f64::from(self.config.cooling_target_temp_f);
        let timed_out = now.wrapping_sub(self.cooling_since) >= self.config.max_cooling_ms;
        if cooled || timed_out {
            if timed_out && !cooled {
                warn!("Cooling timed out at {:.1}\u{00b0}F", temp);
            }
            self.transition(RoastState::Idle, sink);
            return ControlOutput::default();
        }
        self.cooling_output()
    }

    fn cooling_output(&self) -> ControlOutput {
        ControlOutput {
            target_temp: self.config.cooling_target_temp_f,
            fan_duty: FAN_PWM_MAX,
            progress: 0,
            heater_enabled: false,
        }
    }

    fn clamp_target(&self, mut out: ControlOutput) -> ControlOutput {
        out.target_temp = out.target_temp.min(self.config.max_roast_temp_f as u32);
        out
    }

    fn check_safety(&mut self, temp: f64) -> Reading {
        let implausible = temp.is_nan() || temp >= f64::from(self.config.sensor_fault_temp_f);
        if implausible {
            self.bad_readings = self.bad_readings.saturating_add(1);
            if self.bad_readings >= self.config.max_bad_readings {
                return Reading::Fault(SafetyFault::SensorFailure);
            }
            return Reading::Suspect;
        }
        self.bad_readings = 0;

        if self.state.is_roasting() && temp >= f64::from(self.config.max_safe_temp_f) {
            return Reading::Fault(SafetyFault::OverTemperature);
        }
        Reading::Valid
    }

    fn transition(&mut self, to: RoastState, sink: &mut impl EventSink) {
        let from = self.state;
        if from != to {
            self.state = to;
            info!("Roast state {:?} -> {:?}", from, to);
            sink.emit(&AppEvent::StateChanged { from, to });
        }
    }

    fn guard_live_swap(&self, swaps_live: bool) -> Result<()> {
        if swaps_live && self.state.is_roasting() {
            warn!("Rejecting live profile change during a roast");
            return Err(ProfileError::InvalidInput);
        }
        Ok(())
    }
}
