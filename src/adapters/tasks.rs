//! Background tasks around the control loop.
//!
//! ```text
//!   thermocouple task ──publish──▶ ThermocoupleCell ──▶ control loop
//!   command task      ──mpsc────▶ AppCommand queue  ──▶ control loop
//!   control loop      ──push────▶ DisplayMirror     ──▶ display task
//! ```
//!
//! Each task owns one driver. The MAX6675 driver, the HTTP /
//! WebSocket bridge and the touchscreen driver implement these traits;
//! [`Unwired`] stands in for any of them that a build does not link.

use std::io;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{info, warn};

use crate::app::commands::AppCommand;

use super::hardware::{DisplayMirror, ThermocoupleCell};

// ── Driver traits ─────────────────────────────────────────────

/// A thermocouple amplifier.
pub trait TemperatureSource: Send {
    /// One conversion in °F, or `None` if the thermocouple is open or the bus failed.
    fn read_fahrenheit(&mut self) -> Option<f32>;
}

/// Anything that turns operator input into commands (HTTP API, WebSocket,
/// touchscreen buttons).
pub trait CommandSource: Send {
    /// Block until the next command. `None` means the source has closed.
    fn next_command(&mut self) -> Option<AppCommand>;
}

/// The touchscreen's roast page.
pub trait Touchscreen: Send {
    fn render(&mut self, final_target: u32, progress: u32);
}

/// Placeholder for a driver this build does not link.
///
/// Reads nothing, produces no commands and renders nowhere. With it in the
/// thermocouple slot the control loop sees NaN and faults after the
/// bad-reading limit.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unwired;

impl TemperatureSource for Unwired {
    fn read_fahrenheit(&mut self) -> Option<f32> {
        None
    }
}

impl CommandSource for Unwired {
    fn next_command(&mut self) -> Option<AppCommand> {
        None
    }
}

impl Touchscreen for Unwired {
    fn render(&mut self, _final_target: u32, _progress: u32) {}
}

// ── Spawning ──────────────────────────────────────────────────

/// Spawn a named task with an explicit stack size.
///
/// ESP-IDF maps `std::thread` onto FreeRTOS tasks, so the same call works
/// on the device and on the host.
pub fn spawn_task(
    name: &'static str,
    stack_kb: usize,
    f: impl FnOnce() + Send + 'static,
) -> io::Result<JoinHandle<()>> {
    info!("Spawning '{}' (stack={}KB)", name, stack_kb);
    thread::Builder::new()
        .name(name.into())
        .stack_size(stack_kb * 1024)
        .spawn(f)
}

// ── Thermocouple ──────────────────────────────────────────────

/// Take one reading and publish it. A failed conversion publishes NaN so
/// the control loop does not keep acting on a stale value.
pub fn sample_thermocouple(source: &mut impl TemperatureSource, cell: &ThermocoupleCell) {
    cell.publish(source.read_fahrenheit().unwrap_or(f32::NAN));
}

pub fn spawn_thermocouple_task(
    mut source: impl TemperatureSource + 'static,
    cell: Arc<ThermocoupleCell>,
    period: Duration,
) -> io::Result<JoinHandle<()>> {
    spawn_task("thermocouple", 4, move || {
        loop {
            sample_thermocouple(&mut source, &cell);
            thread::sleep(period);
        }
    })
}

// ── Commands ──────────────────────────────────────────────────

/// Forward commands until the source closes or the control loop is gone.
/// Returns how many were forwarded.
pub fn forward_commands(source: &mut impl CommandSource, tx: &Sender<AppCommand>) -> usize {
    let mut forwarded = 0;
    while let Some(cmd) = source.next_command() {
        if tx.send(cmd).is_err() {
            warn!("command task: control loop has stopped");
            break;
        }
        forwarded += 1;
    }
    forwarded
}

pub fn spawn_command_task(
    mut source: impl CommandSource + 'static,
    tx: Sender<AppCommand>,
) -> io::Result<JoinHandle<()>> {
    spawn_task("commands", 8, move || {
        let n = forward_commands(&mut source, &tx);
        info!("command task: source closed after {} commands", n);
    })
}

// ── Touchscreen ───────────────────────────────────────────────

/// Render the mirror if it changed since `last`.
pub fn refresh_display(
    screen: &mut impl Touchscreen,
    mirror: &DisplayMirror,
    last: &mut Option<(u32, u32)>,
) {
    let now = mirror.snapshot();
    if *last != Some(now) {
        screen.render(now.0, now.1);
        *last = Some(now);
    }
}

pub fn spawn_display_task(
    mut screen: impl Touchscreen + 'static,
    mirror: Arc<DisplayMirror>,
    period: Duration,
) -> io::Result<JoinHandle<()>> {
    spawn_task("display", 4, move || {
        let mut last = None;
        loop {
            refresh_display(&mut screen, &mirror, &mut last);
            thread::sleep(period);
        }
    })
}
