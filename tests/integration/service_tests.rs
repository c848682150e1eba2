//! Integration tests for the RoasterService → catalog → live curve pipeline.
//!
//! These run on the host (x86_64) and drive the service with scripted
//! thermocouple readings, checking what the heater and fan are told and
//! which events reach the sink.

use std::sync::Arc;

use roaster::app::commands::{AppCommand, CommandReply};
use roaster::app::events::AppEvent;
use roaster::app::service::{RoastState, RoasterService};
use roaster::catalog::keys::IDS_KEY;
use roaster::catalog::shared::SharedCatalog;
use roaster::catalog::{ProfileCatalog, ProfileRequest, SetpointSpec};
use roaster::config::RoasterConfig;
use roaster::error::ProfileError;

use crate::mock_store::{MockDisplay, MockNvs, MockThermal, RecordingSink, ScriptedRng, WriteFault};

type Service = RoasterService<MockNvs, ScriptedRng>;

fn make_app() -> (Service, MockThermal, MockDisplay, RecordingSink) {
    let config = RoasterConfig::default();
    let catalog = ProfileCatalog::new(MockNvs::new(), ScriptedRng::counting(), &config);
    let mut app = RoasterService::new(Arc::new(SharedCatalog::new(catalog)), config);
    let mut sink = RecordingSink::default();
    app.start(&mut sink).unwrap();
    (
        app,
        MockThermal { now: 0, temp: 72.0 },
        MockDisplay::default(),
        sink,
    )
}

/// Two-segment curve: 100 s up to 300 °F, 100 s more up to 400 °F.
fn short_roast() -> ProfileRequest {
    ProfileRequest::new(
        "Short",
        &[
            SetpointSpec::new(0, 150, 40),
            SetpointSpec::new(100, 300, 60),
            SetpointSpec::new(200, 400, 80),
        ],
        true,
    )
}

// ── Full roast cycle ──────────────────────────────────────────

#[test]
fn full_roast_cycle_with_saved_profile() {
    let (mut app, mut bench, mut display, mut sink) = make_app();

    let reply = app
        .handle_command(AppCommand::CreateProfile(short_roast()), &mut sink)
        .unwrap();
    let CommandReply::Saved(id) = reply else {
        panic!("expected Saved, got {:?}", reply);
    };
    assert!(sink.events.contains(&AppEvent::ProfileSaved {
        id: id.clone(),
        activated: true
    }));

    // Start at 100 °F, ten seconds after boot.
    bench.now = 10_000;
    bench.temp = 100.0;
    app.handle_command(AppCommand::StartRoast, &mut sink).unwrap();
    let out = app.tick(&mut bench, &mut display, &mut sink);
    assert_eq!(app.state(), RoastState::Roasting);
    assert_eq!(out.target_temp, 100);
    // Setpoint 0 borrows setpoint 1's 60 % fan.
    assert_eq!(out.fan_duty, 153);

    // Halfway through the first segment.
    bench.now = 60_000;
    bench.temp = 180.0;
    let out = app.tick(&mut bench, &mut display, &mut sink);
    assert_eq!(out.target_temp, 200);
    assert_eq!(out.progress, 25);
    assert!(out.heater_enabled);
    assert_eq!(display.shown.last(), Some(&(400, 25)));

    // Beans reach the final target: cooling with full fan and no heat.
    bench.now = 215_000;
    bench.temp = 401.0;
    let out = app.tick(&mut bench, &mut display, &mut sink);
    assert_eq!(app.state(), RoastState::Cooling);
    assert!(!out.heater_enabled);
    assert_eq!(out.fan_duty, 255);
    assert!(sink.events.contains(&AppEvent::RoastComplete { elapsed_ms: 205_000 }));

    bench.now = 400_000;
    bench.temp = 144.0;
    app.tick(&mut bench, &mut display, &mut sink);
    assert_eq!(app.state(), RoastState::Idle);

    let states: Vec<RoastState> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::StateChanged { to, .. } => Some(*to),
            _ => None,
        })
        .collect();
    assert_eq!(
        states,
        vec![
            RoastState::StartRoast,
            RoastState::Roasting,
            RoastState::Cooling,
            RoastState::Idle
        ]
    );
}

#[test]
fn stored_curve_is_not_disturbed_by_start_profile() {
    let (mut app, mut bench, mut display, mut sink) = make_app();
    let CommandReply::Saved(id) = app
        .handle_command(AppCommand::CreateProfile(short_roast()), &mut sink)
        .unwrap()
    else {
        panic!("expected Saved");
    };

    bench.temp = 90.0;
    app.handle_command(AppCommand::StartRoast, &mut sink).unwrap();
    app.tick(&mut bench, &mut display, &mut sink);

    let Ok(CommandReply::Profile(detail)) =
        app.handle_command(AppCommand::GetProfile(id), &mut sink)
    else {
        panic!("expected Profile");
    };
    assert_eq!(detail.setpoints[0], SetpointSpec::new(0, 150, 40));
    assert!(detail.active);
}

// ── Command surface ───────────────────────────────────────────

#[test]
fn list_reports_default_and_new_profiles() {
    let (mut app, _, _, mut sink) = make_app();
    let mut req = short_roast();
    req.activate = false;
    app.handle_command(AppCommand::CreateProfile(req), &mut sink)
        .unwrap();

    let Ok(CommandReply::List(list)) = app.handle_command(AppCommand::ListProfiles, &mut sink)
    else {
        panic!("expected List");
    };
    assert_eq!(list.profiles.len(), 2);
    assert_eq!(list.profiles[0].name, "Default");
    assert!(list.profiles[0].active);
    assert_eq!(list.profiles[1].name, "Short");
    assert!(!list.profiles[1].active);
}

#[test]
fn rename_and_delete_through_commands() {
    let (mut app, _, _, mut sink) = make_app();
    let mut req = short_roast();
    req.activate = false;
    let Ok(CommandReply::Saved(id)) = app.handle_command(AppCommand::CreateProfile(req), &mut sink)
    else {
        panic!("expected Saved");
    };

    app.handle_command(
        AppCommand::RenameProfile {
            id: id.clone(),
            name: "Espresso".into(),
        },
        &mut sink,
    )
    .unwrap();
    let names: Vec<String> = app
        .catalog()
        .with(|c| c.list())
        .unwrap()
        .profiles
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert!(names.contains(&"Espresso".to_owned()));

    app.handle_command(AppCommand::DeleteProfile(id.clone()), &mut sink)
        .unwrap();
    assert!(sink.events.contains(&AppEvent::ProfileDeleted(id.clone())));
    assert_eq!(
        app.handle_command(AppCommand::GetProfile(id), &mut sink),
        Err(ProfileError::NotFound)
    );
}

#[test]
fn activate_switches_live_curve_between_roasts() {
    let (mut app, _, _, mut sink) = make_app();
    let mut req = short_roast();
    req.activate = false;
    let Ok(CommandReply::Saved(id)) = app.handle_command(AppCommand::CreateProfile(req), &mut sink)
    else {
        panic!("expected Saved");
    };
    assert_eq!(app.build_telemetry().final_temp_f, 444);

    app.handle_command(AppCommand::ActivateProfile(id.clone()), &mut sink)
        .unwrap();
    assert_eq!(app.build_telemetry().final_temp_f, 400);
    assert!(sink.events.contains(&AppEvent::ProfileActivated(id)));
}

#[test]
fn profile_changes_that_touch_live_curve_wait_for_idle() {
    let (mut app, mut bench, mut display, mut sink) = make_app();
    app.handle_command(AppCommand::StartRoast, &mut sink).unwrap();
    app.tick(&mut bench, &mut display, &mut sink);

    assert_eq!(
        app.handle_command(AppCommand::CreateProfile(short_roast()), &mut sink),
        Err(ProfileError::InvalidInput)
    );
    assert_eq!(app.build_telemetry().final_temp_f, 444);

    app.handle_command(AppCommand::StopRoast, &mut sink).unwrap();
    assert_eq!(app.state(), RoastState::Cooling);
    assert!(
        app.handle_command(AppCommand::CreateProfile(short_roast()), &mut sink)
            .is_ok()
    );
}

#[test]
fn storage_failure_surfaces_as_typed_error() {
    let (mut app, _, _, mut sink) = make_app();
    app.catalog()
        .with(|c| c.store_mut().fail_writes("pf_", WriteFault::Full));

    let err = app
        .handle_command(AppCommand::CreateProfile(short_roast()), &mut sink)
        .unwrap_err();
    assert_eq!(err, ProfileError::StorageWriteFailed);
    assert_eq!(err.code(), "nvs_write_failed");
    assert_eq!(app.build_telemetry().final_temp_f, 444);
}

#[test]
fn unreadable_index_is_reported_not_listed_as_empty() {
    let (mut app, _, _, mut sink) = make_app();
    app.catalog().with(|c| c.store_mut().fail_reads(IDS_KEY));

    let err = app
        .handle_command(AppCommand::ListProfiles, &mut sink)
        .unwrap_err();
    assert_eq!(err, ProfileError::StorageReadFailed);
    assert_eq!(err.code(), "nvs_read_failed");
    assert_eq!(
        app.handle_command(AppCommand::DeleteAllProfiles, &mut sink),
        Err(ProfileError::StorageReadFailed)
    );

    app.catalog().with(|c| c.store_mut().clear_faults());
    let Ok(CommandReply::List(list)) = app.handle_command(AppCommand::ListProfiles, &mut sink)
    else {
        panic!("expected List");
    };
    assert_eq!(list.profiles.len(), 1);
}

// ── Safety ────────────────────────────────────────────────────

#[test]
fn disconnected_thermocouple_faults_from_idle() {
    let (mut app, mut bench, mut display, mut sink) = make_app();
    bench.temp = 2048.0;
    for _ in 0..5 {
        app.tick(&mut bench, &mut display, &mut sink);
    }
    assert_eq!(app.state(), RoastState::Error);
    assert_eq!(
        app.handle_command(AppCommand::StartRoast, &mut sink),
        Err(ProfileError::InvalidInput)
    );

    bench.temp = 70.0;
    app.tick(&mut bench, &mut display, &mut sink);
    app.handle_command(AppCommand::ClearFault, &mut sink).unwrap();
    assert_eq!(app.state(), RoastState::Idle);
    assert!(sink.events.contains(&AppEvent::FaultCleared));
}
