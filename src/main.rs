//! Roaster firmware: main entry point.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                     Adapters (outer ring)                     │
//! │                                                               │
//! │  HardwareAdapter   DisplayMirror   LogEventSink   NvsAdapter  │
//! │  (ThermalPort)     (DisplayPort)   (EventSink)    (Config+NVS)│
//! │  HardwareRng                                                  │
//! │  (EntropyPort)                                                │
//! │                                                               │
//! │  ──────────────── Port Trait Boundary ───────────────────     │
//! │                                                               │
//! │  ┌────────────────────────────────────────────────────────┐   │
//! │  │          RoasterService (pure logic)                   │   │
//! │  │  roast state machine · safety · live curve             │   │
//! │  └───────────────────────────┬────────────────────────────┘   │
//! │                              ▼                                │
//! │              SharedCatalog ─▶ ProfileCatalog                  │
//! └───────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::Result;
use log::{info, warn};

use roaster::adapters::entropy::HardwareRng;
use roaster::adapters::hardware::{DisplayMirror, HardwareAdapter, ThermocoupleCell};
use roaster::adapters::log_sink::LogEventSink;
use roaster::adapters::nvs::NvsAdapter;
use roaster::adapters::tasks::{self, Unwired};
use roaster::adapters::time::Esp32TimeAdapter;
use roaster::app::commands::AppCommand;
use roaster::app::events::AppEvent;
use roaster::app::ports::{ConfigPort, EventSink};
use roaster::app::service::RoasterService;
use roaster::catalog::ProfileCatalog;
use roaster::catalog::shared::SharedCatalog;
use roaster::config::RoasterConfig;

/// Telemetry is logged roughly once a second.
const TELEMETRY_PERIOD_MS: u32 = 1_000;
/// MAX6675 needs ~220 ms per conversion.
const THERMOCOUPLE_PERIOD: Duration = Duration::from_millis(250);
const DISPLAY_PERIOD: Duration = Duration::from_millis(200);

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Roaster v{}                         ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let nvs = NvsAdapter::new().map_err(|e| anyhow::anyhow!("NVS init failed: {}", e))?;
    let config = match nvs.load() {
        Ok(cfg) => {
            info!("Config loaded from NVS");
            cfg
        }
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            RoasterConfig::default()
        }
    };

    // ── 3. Profile catalog + service ──────────────────────────
    let catalog = Arc::new(SharedCatalog::new(ProfileCatalog::new(
        nvs,
        HardwareRng::new(),
        &config,
    )));
    let mut log_sink = LogEventSink::new();
    let mut app = RoasterService::new(Arc::clone(&catalog), config.clone());
    if let Err(e) = app.start(&mut log_sink) {
        // Flash is left as it was. The live curve stays the single dummy
        // setpoint until a profile is activated.
        warn!("Profile catalog init failed: {} ({})", e, e.code());
    }

    // ── 4. Peripherals and driver tasks ───────────────────────
    // Readings are NaN until the thermocouple task publishes; the safety
    // check counts them as bad readings.
    let thermocouple = Arc::new(ThermocoupleCell::new());
    let mut hw = HardwareAdapter::new(Esp32TimeAdapter::new(), Arc::clone(&thermocouple));
    let mirror = Arc::new(DisplayMirror::new());
    let mut display = Arc::clone(&mirror);
    let (cmd_tx, cmd_rx) = mpsc::channel::<AppCommand>();

    // TODO: swap `Unwired` for the MAX6675, HTTP/WebSocket and touchscreen
    // drivers once they are ported to this board support package.
    warn!("Thermocouple, command and display drivers are not linked in this build");
    tasks::spawn_thermocouple_task(Unwired, thermocouple, THERMOCOUPLE_PERIOD)?;
    tasks::spawn_command_task(Unwired, cmd_tx)?;
    tasks::spawn_display_task(Unwired, mirror, DISPLAY_PERIOD)?;

    info!("System ready. Entering control loop.");

    // ── 5. Control loop ───────────────────────────────────────
    let interval = Duration::from_millis(u64::from(config.control_loop_interval_ms));
    let telemetry_every = (TELEMETRY_PERIOD_MS / config.control_loop_interval_ms).max(1);
    let mut telemetry_counter: u32 = 0;

    loop {
        while let Ok(cmd) = cmd_rx.try_recv() {
            if let Err(e) = app.handle_command(cmd, &mut log_sink) {
                warn!("Command rejected: {} ({})", e, e.code());
            }
        }

        let out = app.tick(&mut hw, &mut display, &mut log_sink);
        log::debug!(
            "heater={} target={} fan={}",
            out.heater_enabled,
            out.target_temp,
            out.fan_duty
        );

        telemetry_counter += 1;
        if telemetry_counter >= telemetry_every {
            telemetry_counter = 0;
            log_sink.emit(&AppEvent::Telemetry(app.build_telemetry()));
        }

        std::thread::sleep(interval);
    }
}
