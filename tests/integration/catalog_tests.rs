//! Integration tests for the persistent profile catalog.
//!
//! Every test drives [`ProfileCatalog`] against [`MockNvs`], inspecting the
//! raw store afterwards to check what actually reached flash.

use std::sync::Arc;
use std::thread;

use roaster::catalog::keys::{ACTIVE_KEY, IDS_KEY, data_key, meta_key};
use roaster::catalog::shared::SharedCatalog;
use roaster::catalog::{ProfileCatalog, ProfileRequest, SetpointSpec};
use roaster::config::RoasterConfig;
use roaster::error::ProfileError;
use roaster::profile::ProfileCurve;

use crate::mock_store::{MockNvs, ScriptedRng, WriteFault};

const NS: &str = "roaster";

type Catalog = ProfileCatalog<MockNvs, ScriptedRng>;

fn catalog() -> Catalog {
    ProfileCatalog::new(MockNvs::new(), ScriptedRng::counting(), &RoasterConfig::default())
}

fn request(name: &str, points: &[(u32, u32, u32)], activate: bool) -> ProfileRequest {
    let specs: Vec<SetpointSpec> = points
        .iter()
        .map(|&(t, temp, fan)| SetpointSpec::new(t, temp, fan))
        .collect();
    ProfileRequest::new(name, &specs, activate)
}

fn light(activate: bool) -> ProfileRequest {
    request("Light", &[(0, 200, 40), (240, 380, 60), (420, 410, 70)], activate)
}

/// Active profile A followed by inactive B and C, in that order.
fn three_profiles(cat: &mut Catalog) -> (String, String, String) {
    let a = cat.create(&light(true)).unwrap();
    let b = cat.create(&light(false)).unwrap();
    let c = cat.create(&light(false)).unwrap();
    (a, b, c)
}

// ── Boot / default ────────────────────────────────────────────

#[test]
fn ensure_default_on_empty_catalog_creates_one_active_profile() {
    let mut cat = catalog();
    cat.ensure_default().unwrap();

    let list = cat.list().unwrap();
    assert_eq!(list.profiles.len(), 1);
    let entry = &list.profiles[0];
    assert!(entry.active);
    assert_eq!(entry.name, "Default");
    assert_eq!(list.active.as_deref(), Some(entry.id.as_str()));

    let curve = cat.load(&entry.id).unwrap();
    assert_eq!(curve.setpoint_count(), 4);
    assert_eq!(curve.final_target_temperature(), 444);
    assert_eq!(cat.live(), &curve);
}

#[test]
fn ensure_default_is_idempotent() {
    let mut cat = catalog();
    cat.ensure_default().unwrap();
    let first = cat.list().unwrap();
    cat.ensure_default().unwrap();
    assert_eq!(cat.list().unwrap(), first);
}

#[test]
fn ensure_default_drops_orphan_ids() {
    let mut cat = catalog();
    let (a, b, c) = three_profiles(&mut cat);
    cat.store_mut().remove_raw(NS, &data_key(&b));

    cat.ensure_default().unwrap();

    assert_eq!(cat.ids().unwrap(), vec![a.clone(), c]);
    assert_eq!(cat.active_id(), Some(a));
    assert_eq!(cat.list().unwrap().profiles.len(), 2);
}

#[test]
fn ensure_default_defaults_active_to_first_survivor() {
    let mut cat = catalog();
    let (a, _, _) = three_profiles(&mut cat);
    cat.store_mut().remove_raw(NS, ACTIVE_KEY);

    cat.ensure_default().unwrap();
    assert_eq!(cat.active_id(), Some(a.clone()));
    assert_eq!(cat.live(), &cat.load(&a).unwrap());
}

#[test]
fn ensure_default_repairs_dangling_active_id() {
    let mut cat = catalog();
    let (a, _, _) = three_profiles(&mut cat);
    cat.store_mut().put_raw(NS, ACTIVE_KEY, b"GHOST123");

    cat.ensure_default().unwrap();
    assert_eq!(cat.active_id(), Some(a));
}

#[test]
fn ensure_default_recreates_default_when_every_id_is_orphaned() {
    let mut cat = catalog();
    let (a, b, _) = three_profiles(&mut cat);
    let ids = cat.ids().unwrap();
    for id in &ids {
        cat.store_mut().remove_raw(NS, &data_key(id));
    }

    cat.ensure_default().unwrap();
    let list = cat.list().unwrap();
    assert_eq!(list.profiles.len(), 1);
    assert_ne!(list.profiles[0].id, a);
    assert_ne!(list.profiles[0].id, b);
    assert_eq!(list.profiles[0].name, "Default");
}

// ── Create / save ─────────────────────────────────────────────

#[test]
fn create_writes_blob_metadata_and_index() {
    let mut cat = catalog();
    let id = cat.create(&light(false)).unwrap();

    assert_eq!(id.len(), 8);
    let blob = cat.store().raw(NS, &data_key(&id)).unwrap();
    assert_eq!(blob.len(), 5 + 3 * 12);
    assert_eq!(blob[0], 1);
    assert_eq!(&blob[1..5], &[0, 0, 0, 3]);

    let meta = cat.store().raw(NS, &meta_key(&id)).unwrap();
    let json: serde_json::Value = serde_json::from_slice(meta).unwrap();
    assert_eq!(json["id"], id.as_str());
    assert_eq!(json["name"], "Light");

    assert_eq!(cat.ids().unwrap(), vec![id]);
    assert_eq!(cat.active_id(), None);
}

#[test]
fn create_with_eleven_setpoints_writes_nothing() {
    let mut cat = catalog();
    let points: Vec<(u32, u32, u32)> = (0..11).map(|i| (i * 60, 200 + i, 50)).collect();
    let mark = cat.store().write_log.len();

    assert_eq!(
        cat.create(&request("Too long", &points, true)),
        Err(ProfileError::InvalidInput)
    );
    assert!(cat.store().writes_since(mark).is_empty());
    assert!(cat.ids().unwrap().is_empty());
}

#[test]
fn out_of_bounds_setpoint_aborts_without_writing() {
    let mut cat = catalog();
    let mark = cat.store().write_log.len();

    let hot = request("Hot", &[(0, 200, 40), (300, 501, 60)], false);
    assert_eq!(cat.create(&hot), Err(ProfileError::SetpointOutOfBounds));

    let windy = request("Windy", &[(0, 200, 101)], false);
    assert_eq!(cat.create(&windy), Err(ProfileError::SetpointOutOfBounds));

    assert!(cat.store().writes_since(mark).is_empty());
}

#[test]
fn empty_setpoint_list_is_invalid_input() {
    let mut cat = catalog();
    assert_eq!(
        cat.create(&request("Empty", &[], false)),
        Err(ProfileError::InvalidInput)
    );
}

#[test]
fn save_existing_overwrites_without_duplicating_index_entry() {
    let mut cat = catalog();
    let id = cat.create(&light(false)).unwrap();

    let dark = request("Dark", &[(0, 220, 50), (600, 460, 90)], false);
    cat.save_existing(&id, &dark).unwrap();

    assert_eq!(cat.ids().unwrap(), vec![id.clone()]);
    let detail = cat.get(&id).unwrap();
    assert_eq!(detail.name, "Dark");
    assert_eq!(
        detail.setpoints,
        vec![SetpointSpec::new(0, 220, 50), SetpointSpec::new(600, 460, 90)]
    );
}

#[test]
fn save_existing_rejects_empty_id() {
    let mut cat = catalog();
    assert_eq!(cat.save_existing("", &light(false)), Err(ProfileError::EmptyId));
}

#[test]
fn save_with_activate_replaces_live_curve() {
    let mut cat = catalog();
    let id = cat.create(&light(true)).unwrap();
    assert_eq!(cat.active_id(), Some(id.clone()));
    assert_eq!(cat.live().final_target_temperature(), 410);
}

#[test]
fn unnamed_request_gets_placeholder_name() {
    let mut cat = catalog();
    let mut req = light(false);
    req.name = None;
    let id = cat.create(&req).unwrap();
    assert_eq!(cat.get(&id).unwrap().name, "Unnamed");
}

#[test]
fn long_names_are_clamped() {
    let mut cat = catalog();
    let id = cat
        .create(&request("A very long roast profile name", &[(0, 200, 40)], false))
        .unwrap();
    assert_eq!(cat.get(&id).unwrap().name.chars().count(), 20);
}

#[test]
fn colliding_id_is_redrawn() {
    let draw = 0x1234_5678_9ABC_DEF0;
    let mut cat = ProfileCatalog::new(
        MockNvs::new(),
        ScriptedRng::new(&[draw, draw, !draw]),
        &RoasterConfig::default(),
    );
    let first = cat.create(&light(false)).unwrap();
    let second = cat.create(&light(false)).unwrap();
    assert_ne!(first, second);
    assert_eq!(cat.ids().unwrap(), vec![first, second]);
}

// ── Retry and eviction ────────────────────────────────────────

#[test]
fn transient_zero_byte_writes_are_retried() {
    let mut cat = catalog();
    cat.store_mut().fail_next_writes("pf_", 3, WriteFault::ZeroBytes);

    let id = cat.create(&light(false)).unwrap();

    let key = format!("{}::{}", NS, data_key(&id));
    let deletes = cat.store().delete_log.iter().filter(|k| **k == key).count();
    assert_eq!(deletes, 3, "the key is erased before every retry");
    assert!(cat.store().raw(NS, &data_key(&id)).is_some());
    assert_eq!(cat.ids().unwrap(), vec![id]);
}

#[test]
fn eviction_frees_space_for_new_profile() {
    let mut cat = catalog();
    let (a, b, c) = three_profiles(&mut cat);
    // Initial attempt plus three retries fail; the post-eviction write lands.
    cat.store_mut().fail_next_writes("pf_", 4, WriteFault::Full);

    let d = cat.create(&light(false)).unwrap();

    assert_eq!(cat.ids().unwrap(), vec![a.clone(), c, d]);
    assert!(cat.store().raw(NS, &data_key(&b)).is_none());
    assert!(cat.store().raw(NS, &meta_key(&b)).is_none());
    assert_eq!(cat.active_id(), Some(a));
}

#[test]
fn eviction_never_takes_the_active_profile() {
    let mut cat = catalog();
    let (a, b, c) = three_profiles(&mut cat);
    cat.activate(&b).unwrap();
    cat.store_mut().fail_next_writes("pf_", 4, WriteFault::ZeroBytes);

    let d = cat.create(&light(false)).unwrap();
    assert_eq!(cat.ids().unwrap(), vec![b, c, d]);
    assert!(!cat.exists(&a));
}

#[test]
fn exhausted_write_fails_and_only_the_victim_leaves_the_index() {
    let mut cat = catalog();
    let (a, b, c) = three_profiles(&mut cat);
    cat.store_mut().fail_writes("pf_", WriteFault::Full);

    let mark = cat.store().write_log.len();
    assert_eq!(cat.create(&light(false)), Err(ProfileError::StorageWriteFailed));

    assert_eq!(cat.ids().unwrap(), vec![a.clone(), c]);
    assert!(!cat.exists(&b));
    assert_eq!(cat.active_id(), Some(a));
    // No metadata for the failed record reached the store.
    assert!(
        cat.store()
            .writes_since(mark)
            .iter()
            .all(|k| !k.contains("::pm_"))
    );
}

#[test]
fn exhausted_write_with_nothing_to_evict_leaves_store_unchanged() {
    let mut cat = catalog();
    let a = cat.create(&light(true)).unwrap();
    let before = cat.store().snapshot();
    cat.store_mut().fail_writes("pf_", WriteFault::ZeroBytes);

    assert_eq!(
        cat.save_existing("NEWPROF1", &light(false)),
        Err(ProfileError::StorageWriteFailed)
    );
    assert_eq!(cat.store().snapshot(), before);
    assert_eq!(cat.ids().unwrap(), vec![a]);
}

#[test]
fn failed_activating_save_keeps_live_curve() {
    let mut cat = catalog();
    cat.ensure_default().unwrap();
    let live = cat.live().clone();
    cat.store_mut().fail_writes("pf_", WriteFault::Full);

    assert!(cat.create(&light(true)).is_err());
    assert_eq!(cat.live(), &live);
}

#[test]
fn torn_commit_leaves_orphan_that_boot_repairs() {
    let mut cat = catalog();
    let a = cat.create(&light(true)).unwrap();
    let b = cat.create(&light(false)).unwrap();

    // Simulate a torn two-step commit: the index names `c` but no blob landed.
    let c = "ORPHAN12".to_owned();
    cat.store_mut()
        .put_raw(NS, IDS_KEY, format!("{},{},{}", a, b, c).as_bytes());
    assert_eq!(cat.list().unwrap().profiles.len(), 3);

    cat.ensure_default().unwrap();
    assert_eq!(cat.ids().unwrap(), vec![a, b]);
}

#[test]
fn zero_byte_report_counts_as_failure_even_if_data_landed() {
    let mut cat = catalog();
    let a = cat.create(&light(true)).unwrap();
    cat.store_mut().fail_writes("pf_", WriteFault::LyingZero);

    assert_eq!(cat.create(&light(false)), Err(ProfileError::StorageWriteFailed));
    assert_eq!(cat.ids().unwrap(), vec![a]);
}

// ── Index faults ──────────────────────────────────────────────

#[test]
fn index_read_fault_aborts_create_before_any_write() {
    let mut cat = catalog();
    let (a, b, c) = three_profiles(&mut cat);
    let before = cat.store().snapshot();
    let mark = cat.store().write_log.len();
    cat.store_mut().fail_next_reads(IDS_KEY, 1);

    assert_eq!(cat.create(&light(false)), Err(ProfileError::StorageReadFailed));
    assert!(cat.store().writes_since(mark).is_empty());
    assert_eq!(cat.store().snapshot(), before);

    // Once the fault clears, the next save appends to the intact index.
    let d = cat.create(&light(false)).unwrap();
    assert_eq!(cat.ids().unwrap(), vec![a, b, c, d]);
}

#[test]
fn index_read_fault_aborts_delete() {
    let mut cat = catalog();
    let (a, b, c) = three_profiles(&mut cat);
    cat.store_mut().fail_next_reads(IDS_KEY, 1);

    assert_eq!(cat.delete(&b), Err(ProfileError::StorageReadFailed));
    assert!(cat.exists(&b));
    assert_eq!(cat.ids().unwrap(), vec![a, b, c]);
}

#[test]
fn index_read_fault_at_boot_keeps_catalog() {
    let mut cat = catalog();
    let (a, b, c) = three_profiles(&mut cat);
    let before = cat.store().snapshot();
    cat.store_mut().fail_next_reads(IDS_KEY, 1);

    assert_eq!(cat.ensure_default(), Err(ProfileError::StorageReadFailed));
    assert_eq!(cat.store().snapshot(), before);

    cat.ensure_default().unwrap();
    assert_eq!(cat.ids().unwrap(), vec![a.clone(), b, c]);
    assert_eq!(cat.active_id(), Some(a));
}

#[test]
fn index_read_fault_is_reported_by_queries_and_factory_reset() {
    let mut cat = catalog();
    three_profiles(&mut cat);
    let before = cat.store().snapshot();
    cat.store_mut().fail_reads(IDS_KEY);

    assert_eq!(cat.ids(), Err(ProfileError::StorageReadFailed));
    assert_eq!(cat.list(), Err(ProfileError::StorageReadFailed));
    assert_eq!(cat.delete_all(), Err(ProfileError::StorageReadFailed));
    assert_eq!(cat.store().snapshot(), before);
}

#[test]
fn active_id_read_fault_protects_the_active_profile() {
    let mut cat = catalog();
    let (a, b, c) = three_profiles(&mut cat);
    cat.store_mut().fail_reads(ACTIVE_KEY);

    assert_eq!(cat.delete(&a), Err(ProfileError::StorageReadFailed));
    assert!(cat.exists(&a));

    // Eviction needs to know which record is active.
    cat.store_mut().fail_writes("pf_", WriteFault::Full);
    assert_eq!(cat.create(&light(false)), Err(ProfileError::StorageReadFailed));
    assert!(cat.exists(&a) && cat.exists(&b) && cat.exists(&c));
    assert_eq!(cat.ids().unwrap(), vec![a, b, c]);
}

#[test]
fn index_write_failure_rolls_back_new_record() {
    let mut cat = catalog();
    let a = cat.create(&light(true)).unwrap();
    cat.store_mut().fail_writes(IDS_KEY, WriteFault::ZeroBytes);
    let before = cat.store().snapshot();

    assert_eq!(cat.create(&light(false)), Err(ProfileError::StorageWriteFailed));
    // No blob or metadata is left behind without an index entry.
    assert_eq!(cat.store().snapshot(), before);

    cat.store_mut().clear_faults();
    cat.ensure_default().unwrap();
    assert_eq!(cat.ids().unwrap(), vec![a]);
}

#[test]
fn index_write_failure_on_delete_is_reported_and_repaired_at_boot() {
    let mut cat = catalog();
    let (a, b, c) = three_profiles(&mut cat);
    cat.store_mut().fail_writes(IDS_KEY, WriteFault::Full);

    assert_eq!(cat.delete(&b), Err(ProfileError::StorageWriteFailed));
    assert!(!cat.exists(&b));

    cat.store_mut().clear_faults();
    cat.ensure_default().unwrap();
    assert_eq!(cat.ids().unwrap(), vec![a, c]);
}

#[test]
fn active_id_write_failure_keeps_previous_activation() {
    let mut cat = catalog();
    cat.ensure_default().unwrap();
    let default_id = cat.active_id().unwrap();
    let other = cat.create(&light(false)).unwrap();
    let live = cat.live().clone();
    cat.store_mut().fail_writes(ACTIVE_KEY, WriteFault::Full);

    assert_eq!(cat.activate(&other), Err(ProfileError::StorageWriteFailed));
    assert_eq!(cat.live(), &live);
    assert_eq!(cat.active_id(), Some(default_id.clone()));

    // An activating save keeps the record but reports the failed switch.
    assert_eq!(cat.create(&light(true)), Err(ProfileError::StorageWriteFailed));
    assert_eq!(cat.ids().unwrap().len(), 3);
    assert_eq!(cat.live(), &live);
    assert_eq!(cat.active_id(), Some(default_id));
}

// ── Activate / load ───────────────────────────────────────────

#[test]
fn activate_loads_record_into_live_curve() {
    let mut cat = catalog();
    cat.ensure_default().unwrap();
    let id = cat.create(&light(false)).unwrap();
    assert_eq!(cat.live().final_target_temperature(), 444);

    let ids_before = cat.ids().unwrap();
    cat.activate(&id).unwrap();
    assert_eq!(cat.live().final_target_temperature(), 410);
    assert_eq!(cat.active_id(), Some(id));
    assert_eq!(cat.ids().unwrap(), ids_before);
}

#[test]
fn activate_missing_id_is_not_found() {
    let mut cat = catalog();
    cat.ensure_default().unwrap();
    let live = cat.live().clone();
    let active = cat.active_id();

    assert_eq!(cat.activate("NOSUCHID"), Err(ProfileError::NotFound));
    assert_eq!(cat.live(), &live);
    assert_eq!(cat.active_id(), active);
}

#[test]
fn load_of_zero_length_blob_is_not_found() {
    let mut cat = catalog();
    cat.store_mut().put_raw(NS, &data_key("EMPTY123"), &[]);
    assert_eq!(cat.load("EMPTY123"), Err(ProfileError::NotFound));
    assert_eq!(cat.load(""), Err(ProfileError::EmptyId));
}

#[test]
fn corrupted_blob_does_not_change_live_curve() {
    let mut cat = catalog();
    cat.ensure_default().unwrap();
    let before = cat.live().setpoint_count();

    // Count of zero: the only integrity check the layout has.
    cat.store_mut()
        .put_raw(NS, &data_key("BROKEN12"), &[1, 0, 0, 0, 0]);
    cat.activate("BROKEN12").unwrap();
    assert_eq!(cat.live().setpoint_count(), before);

    let loaded = cat.load("BROKEN12").unwrap();
    assert_eq!(loaded, ProfileCurve::new());
}

#[test]
fn get_reports_times_in_seconds() {
    let mut cat = catalog();
    let id = cat.create(&light(true)).unwrap();
    let detail = cat.get(&id).unwrap();
    assert!(detail.active);
    assert_eq!(detail.setpoints[1], SetpointSpec::new(240, 380, 60));
}

// ── Delete / rename / list ────────────────────────────────────

#[test]
fn delete_active_is_refused_and_store_untouched() {
    let mut cat = catalog();
    cat.ensure_default().unwrap();
    let active = cat.active_id().unwrap();
    let before = cat.store().snapshot();

    assert_eq!(cat.delete(&active), Err(ProfileError::CannotDeleteActive));
    assert_eq!(cat.store().snapshot(), before);
}

#[test]
fn delete_removes_record_and_index_entry() {
    let mut cat = catalog();
    let (a, b, c) = three_profiles(&mut cat);

    cat.delete(&b).unwrap();
    assert_eq!(cat.ids().unwrap(), vec![a.clone(), c]);
    assert!(cat.store().raw(NS, &data_key(&b)).is_none());
    assert!(cat.store().raw(NS, &meta_key(&b)).is_none());
    assert_eq!(cat.active_id(), Some(a));
}

#[test]
fn delete_rejects_empty_and_unknown_ids() {
    let mut cat = catalog();
    cat.ensure_default().unwrap();
    assert_eq!(cat.delete(""), Err(ProfileError::EmptyId));
    assert_eq!(cat.delete("NOSUCHID"), Err(ProfileError::NotFound));
}

#[test]
fn rename_updates_metadata_only() {
    let mut cat = catalog();
    let id = cat.create(&light(false)).unwrap();
    let blob = cat.store().raw(NS, &data_key(&id)).cloned();

    cat.rename(&id, "Full City").unwrap();
    assert_eq!(cat.get(&id).unwrap().name, "Full City");
    assert_eq!(cat.store().raw(NS, &data_key(&id)).cloned(), blob);
    assert_eq!(cat.ids().unwrap(), vec![id]);
}

#[test]
fn rename_of_unknown_id_leaves_dangling_metadata() {
    let mut cat = catalog();
    cat.rename("GHOST123", "Nobody").unwrap();
    assert!(cat.store().raw(NS, &meta_key("GHOST123")).is_some());
    assert!(cat.ids().unwrap().is_empty());
    assert_eq!(cat.rename("", "x"), Err(ProfileError::EmptyId));
}

#[test]
fn list_keeps_entries_with_missing_metadata() {
    let mut cat = catalog();
    let (a, b, _) = three_profiles(&mut cat);
    cat.store_mut().remove_raw(NS, &meta_key(&b));

    let list = cat.list().unwrap();
    assert_eq!(list.profiles.len(), 3);
    assert_eq!(list.profiles[1].id, b);
    assert_eq!(list.profiles[1].name, "");
    assert!(list.profiles[0].active);
    assert_eq!(list.active, Some(a));
}

#[test]
fn delete_all_resets_catalog() {
    let mut cat = catalog();
    three_profiles(&mut cat);

    cat.delete_all().unwrap();
    assert!(cat.ids().unwrap().is_empty());
    assert_eq!(cat.active_id(), None);
    assert_eq!(cat.live(), &ProfileCurve::new());
    assert!(cat.store().snapshot().is_empty());

    cat.ensure_default().unwrap();
    assert_eq!(cat.list().unwrap().profiles.len(), 1);
}

// ── Shared access ─────────────────────────────────────────────

#[test]
fn shared_catalog_serialises_concurrent_saves() {
    let shared = Arc::new(SharedCatalog::new(catalog()));
    shared.with(|c| c.ensure_default()).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let shared = Arc::clone(&shared);
            thread::spawn(move || {
                for _ in 0..2 {
                    shared.with(|c| c.create(&light(false))).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let cat = Arc::try_unwrap(shared).ok().unwrap().into_inner();
    let ids = cat.ids().unwrap();
    assert_eq!(ids.len(), 9);
    assert!(ids.iter().all(|id| cat.exists(id)));
}
