//! Persistent profile catalog.
//!
//! Named [`ProfileCurve`] records addressed by short generated ids, one of
//! them active, stored in a flash-backed [`StoragePort`].
//!
//! ## Commit order
//!
//! A save is a two-step commit: the curve blob is written first, then the
//! index (`profile_ids`) is updated. A crash or a lying backend between the
//! two can leave an id in the index whose blob never landed: an *orphan*.
//! [`ensure_default`](ProfileCatalog::ensure_default) runs at boot and drops
//! orphans before anything else reads the index.
//!
//! The reverse state, a blob no index entry points at, cannot be repaired,
//! so the index is never rewritten from a read that failed: every mutation
//! reads `profile_ids` through [`ids`](ProfileCatalog::ids), which reports a
//! storage fault as [`ProfileError::StorageReadFailed`] instead of an empty
//! list. If the index write of a new record fails, the record's blob and
//! metadata are removed again before the error is returned.
//!
//! ## Storage pressure
//!
//! A failed blob write is retried [`RoasterConfig::write_retries`] times,
//! erasing the key before each retry. If that is not enough, the oldest
//! profile that is neither the one being written nor the active one is
//! evicted and the write is tried once more.
//!
//! The catalog owns the *live* curve the control loop reads. It is a copy:
//! editing a stored record does not touch it until the record is activated.

pub mod keys;
pub mod meta;
pub mod shared;

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{EntropyPort, StorageError, StoragePort};
use crate::config::RoasterConfig;
use crate::error::{ProfileError, Result};
use crate::profile::codec::MAX_ENCODED_LEN;
use crate::profile::id::generate_id;
use crate::profile::{ProfileCurve, Setpoint};

use keys::{ACTIVE_KEY, IDS_KEY, data_key, join_ids, meta_key, split_ids};
use meta::{DEFAULT_NAME, ProfileMeta};

/// Read buffer for the comma-joined id list.
const IDS_BUF_LEN: usize = 1024;
/// Read buffer for metadata JSON and the active id.
const META_BUF_LEN: usize = 256;
/// Fresh draws before accepting a colliding id.
const ID_ATTEMPTS: usize = 4;

/// Canned curve created on first boot: (seconds, °F, fan %).
const DEFAULT_PROFILE: [(u32, u32, u32); 4] =
    [(0, 200, 30), (180, 350, 50), (420, 400, 70), (600, 444, 80)];
const DEFAULT_PROFILE_NAME: &str = "Default";

// ───────────────────────────────────────────────────────────────
// Request / response shapes
// ───────────────────────────────────────────────────────────────

/// One setpoint as the API layer speaks it: time in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetpointSpec {
    #[serde(rename = "time")]
    pub time_secs: u32,
    pub temp: u32,
    #[serde(rename = "fanSpeed")]
    pub fan_speed: u32,
}

impl SetpointSpec {
    pub const fn new(time_secs: u32, temp: u32, fan_speed: u32) -> Self {
        Self {
            time_secs,
            temp,
            fan_speed,
        }
    }

    pub const fn to_setpoint(self) -> Setpoint {
        Setpoint::new(self.time_secs.saturating_mul(1000), self.temp, self.fan_speed)
    }

    pub const fn from_setpoint(sp: Setpoint) -> Self {
        Self::new(sp.time_ms / 1000, sp.temperature, sp.fan_speed)
    }
}

/// A create/save request, already decoded from the wire by the HTTP layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub setpoints: Vec<SetpointSpec>,
    #[serde(default)]
    pub activate: bool,
}

impl ProfileRequest {
    pub fn new(name: &str, setpoints: &[SetpointSpec], activate: bool) -> Self {
        Self {
            name: Some(name.to_owned()),
            setpoints: setpoints.to_vec(),
            activate,
        }
    }

    /// Validate every setpoint and assemble the curve. Nothing is written.
    pub fn build_curve(&self) -> Result<ProfileCurve> {
        let setpoints: Vec<Setpoint> = self.setpoints.iter().map(|s| s.to_setpoint()).collect();
        ProfileCurve::from_setpoints(&setpoints)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileSummary {
    pub id: String,
    pub name: String,
    pub active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileList {
    pub active: Option<String>,
    pub profiles: Vec<ProfileSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileDetail {
    pub id: String,
    pub name: String,
    pub active: bool,
    pub setpoints: Vec<SetpointSpec>,
}

// ───────────────────────────────────────────────────────────────
// ProfileCatalog
// ───────────────────────────────────────────────────────────────

pub struct ProfileCatalog<S: StoragePort, R: EntropyPort> {
    store: S,
    rng: R,
    namespace: heapless::String<15>,
    write_retries: u8,
    live: ProfileCurve,
}

impl<S: StoragePort, R: EntropyPort> ProfileCatalog<S, R> {
    pub fn new(store: S, rng: R, config: &RoasterConfig) -> Self {
        Self {
            store,
            rng,
            namespace: config.storage_namespace.clone(),
            write_retries: config.write_retries,
            live: ProfileCurve::new(),
        }
    }

    // ── Live curve ────────────────────────────────────────────

    /// The curve the control loop follows.
    pub fn live(&self) -> &ProfileCurve {
        &self.live
    }

    pub fn live_mut(&mut self) -> &mut ProfileCurve {
        &mut self.live
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    // ── Mutations ─────────────────────────────────────────────

    /// Validate, assign a fresh id, and save. Returns the new id.
    pub fn create(&mut self, req: &ProfileRequest) -> Result<String> {
        let curve = req.build_curve()?;
        let id = self.fresh_id();
        self.commit(&id, req.name.as_deref(), &curve, req.activate)?;
        Ok(id)
    }

    /// Overwrite (or first-write) the record under `id`.
    pub fn save_existing(&mut self, id: &str, req: &ProfileRequest) -> Result<()> {
        if id.is_empty() {
            return Err(ProfileError::EmptyId);
        }
        let curve = req.build_curve()?;
        self.commit(id, req.name.as_deref(), &curve, req.activate)
    }

    /// Make `id` the active profile and load it into the live curve.
    ///
    /// The live curve changes only once `active_id` is persisted.
    pub fn activate(&mut self, id: &str) -> Result<()> {
        let blob = self.read_blob(id)?;
        let mut curve = self.live.clone();
        curve.deserialize(&blob);
        self.set_active_id(id)?;
        self.live = curve;
        info!("catalog: profile {} activated", id);
        Ok(())
    }

    /// Remove a non-active profile's data, metadata, and index entry.
    pub fn delete(&mut self, id: &str) -> Result<()> {
        if id.is_empty() {
            return Err(ProfileError::EmptyId);
        }
        if self.read_active()?.as_deref() == Some(id) {
            return Err(ProfileError::CannotDeleteActive);
        }
        if !self.exists(id) {
            return Err(ProfileError::NotFound);
        }
        let mut ids = self.ids()?;
        self.remove_record(id);
        ids.retain(|x| x != id);
        // On failure the index keeps an entry without data; boot drops it.
        self.write_ids(&ids)?;
        info!("catalog: profile {} deleted", id);
        Ok(())
    }

    /// Metadata-only update. Does not check that `id` has data; renaming an
    /// unknown id leaves metadata that no index entry points at.
    pub fn rename(&mut self, id: &str, name: &str) -> Result<()> {
        if id.is_empty() {
            return Err(ProfileError::EmptyId);
        }
        if !self.exists(id) {
            warn!("catalog: renaming {} which has no stored data", id);
        }
        self.write_meta(id, name);
        Ok(())
    }

    /// Boot-time reconciliation and load-or-create-default.
    ///
    /// 1. Drop index entries whose blob is missing (orphans) and persist.
    /// 2. Point the active id at the first survivor if it is unset or dangling.
    /// 3. On an empty catalog, save and activate the canned default curve.
    /// 4. Load the active record into the live curve.
    ///
    /// A failed read of the index or the active id aborts before anything is
    /// written.
    pub fn ensure_default(&mut self) -> Result<()> {
        let ids = self.ids()?;
        let survivors: Vec<String> = ids.iter().filter(|id| self.exists(id)).cloned().collect();
        if survivors.len() != ids.len() {
            for orphan in ids.iter().filter(|id| !survivors.contains(id)) {
                warn!("catalog: dropping orphan id {}", orphan);
            }
            if let Err(e) = self.write_ids(&survivors) {
                warn!("catalog: repaired index not persisted ({}), orphans stay listed", e);
            }
        }

        let Some(first) = survivors.first().cloned() else {
            info!("catalog: empty, creating default profile");
            let setpoints: Vec<SetpointSpec> = DEFAULT_PROFILE
                .iter()
                .map(|&(t, temp, fan)| SetpointSpec::new(t, temp, fan))
                .collect();
            let req = ProfileRequest::new(DEFAULT_PROFILE_NAME, &setpoints, true);
            self.create(&req)?;
            return Ok(());
        };

        let active = match self.read_active()? {
            Some(id) if survivors.contains(&id) => id,
            other => {
                if let Some(stale) = other {
                    warn!("catalog: active id {} has no data", stale);
                }
                info!("catalog: defaulting active profile to {}", first);
                first
            }
        };
        self.activate(&active)
    }

    /// Factory reset: every record, the index, the active id, and the live curve.
    ///
    /// Nothing is erased if the index cannot be read.
    pub fn delete_all(&mut self) -> Result<()> {
        for id in self.ids()? {
            self.remove_record(&id);
        }
        let _ = self.store.delete(&self.namespace, IDS_KEY);
        let _ = self.store.delete(&self.namespace, ACTIVE_KEY);
        self.live.clear();
        info!("catalog: all profiles deleted");
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────

    /// Decode the stored curve for `id`.
    ///
    /// A corrupted blob yields the dummy curve (see
    /// [`ProfileCurve::deserialize`]), not an error.
    pub fn load(&self, id: &str) -> Result<ProfileCurve> {
        let blob = self.read_blob(id)?;
        let mut curve = ProfileCurve::new();
        curve.deserialize(&blob);
        Ok(curve)
    }

    /// Name, active flag, and setpoints (in seconds) for `id`.
    /// Dummy `(0, 0, 0)` setpoints are left out.
    pub fn get(&self, id: &str) -> Result<ProfileDetail> {
        let curve = self.load(id)?;
        Ok(ProfileDetail {
            id: id.to_owned(),
            name: self.read_name(id),
            active: self.active_id().as_deref() == Some(id),
            setpoints: curve
                .setpoints()
                .iter()
                .filter(|sp| !sp.is_dummy())
                .map(|&sp| SetpointSpec::from_setpoint(sp))
                .collect(),
        })
    }

    /// Every indexed profile in insertion order. Missing metadata lists with
    /// an empty name rather than hiding the record.
    pub fn list(&self) -> Result<ProfileList> {
        let active = self.read_active()?;
        let profiles = self
            .ids()?
            .into_iter()
            .map(|id| ProfileSummary {
                name: self.read_name(&id),
                active: active.as_deref() == Some(id.as_str()),
                id,
            })
            .collect();
        Ok(ProfileList { active, profiles })
    }

    pub fn exists(&self, id: &str) -> bool {
        !id.is_empty() && self.store.exists(&self.namespace, &data_key(id))
    }

    /// The index in insertion order. A missing `profile_ids` key is an
    /// empty catalog; any other read fault is an error.
    pub fn ids(&self) -> Result<Vec<String>> {
        Ok(split_ids(&self.read_string(IDS_KEY, IDS_BUF_LEN)?))
    }

    /// Best-effort view of the active id; a read fault reads as `None`.
    pub fn active_id(&self) -> Option<String> {
        self.read_active().ok().flatten()
    }

    // ── Internal: commit path ─────────────────────────────────

    fn commit(&mut self, id: &str, name: Option<&str>, curve: &ProfileCurve, activate: bool) -> Result<()> {
        // Read before writing anything: a failed read must not become an
        // empty index that the commit below would persist.
        let mut ids = self.ids()?;
        let blob = curve.serialize();
        self.write_blob(id, &blob, &mut ids)?;

        self.write_meta(id, name.unwrap_or(DEFAULT_NAME));

        if !ids.iter().any(|x| x == id) {
            ids.push(id.to_owned());
            if let Err(e) = self.write_ids(&ids) {
                warn!("catalog: index update for {} failed, removing its record", id);
                self.remove_record(id);
                return Err(e);
            }
        }

        if activate {
            self.set_active_id(id)?;
            self.live = curve.clone();
        }
        info!(
            "catalog: saved profile {} ({} setpoints{})",
            id,
            curve.setpoint_count(),
            if activate { ", active" } else { "" }
        );
        Ok(())
    }

    /// Write the curve blob, falling back to retries and then eviction.
    /// An evicted victim is also removed from `ids`.
    fn write_blob(&mut self, id: &str, blob: &[u8], ids: &mut Vec<String>) -> Result<()> {
        let key = data_key(id);
        if self.try_write(&key, blob) {
            return Ok(());
        }

        warn!("catalog: write of {} failed, retrying", key);
        for attempt in 1..=self.write_retries {
            let _ = self.store.delete(&self.namespace, &key);
            if self.try_write(&key, blob) {
                debug!("catalog: write of {} succeeded on retry {}", key, attempt);
                return Ok(());
            }
        }

        warn!("catalog: retries exhausted for {}, attempting eviction", key);
        if self.evict_oldest(id, ids)?.is_some() && self.try_write(&key, blob) {
            return Ok(());
        }

        error!("catalog: storage write for {} failed completely", key);
        Err(ProfileError::StorageWriteFailed)
    }

    /// Delete the oldest record that is neither `keep` nor active.
    fn evict_oldest(&mut self, keep: &str, ids: &mut Vec<String>) -> Result<Option<String>> {
        let active = self.read_active()?;
        let Some(pos) = ids
            .iter()
            .position(|x| x != keep && active.as_deref() != Some(x.as_str()))
        else {
            return Ok(None);
        };
        let victim = ids.remove(pos);
        warn!("catalog: evicting {} to free space", victim);
        self.remove_record(&victim);
        if let Err(e) = self.write_ids(ids) {
            // The stale entry has no data left; boot drops it.
            warn!("catalog: index still lists evicted {} ({})", victim, e);
        }
        Ok(Some(victim))
    }

    fn fresh_id(&mut self) -> String {
        let mut id = generate_id(&mut self.rng);
        for _ in 1..ID_ATTEMPTS {
            if !self.exists(&id) {
                return id;
            }
            debug!("catalog: generated id {} collides, redrawing", id);
            id = generate_id(&mut self.rng);
        }
        if self.exists(&id) {
            warn!("catalog: id {} still collides after {} draws", id, ID_ATTEMPTS);
        }
        id
    }

    // ── Internal: storage helpers ─────────────────────────────

    fn try_write(&mut self, key: &str, data: &[u8]) -> bool {
        match self.store.write(&self.namespace, key, data) {
            Ok(n) if n > 0 => true,
            Ok(_) => false,
            Err(e) => {
                debug!("catalog: write {} -> {}", key, e);
                false
            }
        }
    }

    fn read_blob(&self, id: &str) -> Result<heapless::Vec<u8, MAX_ENCODED_LEN>> {
        if id.is_empty() {
            return Err(ProfileError::EmptyId);
        }
        let mut buf = [0u8; MAX_ENCODED_LEN];
        let len = self
            .store
            .read(&self.namespace, &data_key(id), &mut buf)
            .map_err(|_| ProfileError::NotFound)?;
        if len == 0 {
            return Err(ProfileError::NotFound);
        }
        heapless::Vec::from_slice(&buf[..len]).map_err(|()| ProfileError::NotFound)
    }

    /// Read a UTF-8 value. An absent key reads as `""`.
    fn read_string(&self, key: &str, cap: usize) -> Result<String> {
        let mut buf = vec![0u8; cap];
        let len = match self.store.read(&self.namespace, key, &mut buf) {
            Ok(len) => len,
            Err(StorageError::NotFound) => return Ok(String::new()),
            Err(e) => {
                error!("catalog: read of {} failed: {}", key, e);
                return Err(ProfileError::StorageReadFailed);
            }
        };
        core::str::from_utf8(&buf[..len]).map(str::to_owned).map_err(|_| {
            error!("catalog: {} is not valid UTF-8", key);
            ProfileError::StorageReadFailed
        })
    }

    fn read_active(&self) -> Result<Option<String>> {
        let id = self.read_string(ACTIVE_KEY, META_BUF_LEN)?;
        Ok(if id.is_empty() { None } else { Some(id) })
    }

    fn read_name(&self, id: &str) -> String {
        let mut buf = [0u8; META_BUF_LEN];
        self.store
            .read(&self.namespace, &meta_key(id), &mut buf)
            .ok()
            .and_then(|len| ProfileMeta::decode(&buf[..len]))
            .map(|m| m.name)
            .unwrap_or_default()
    }

    fn write_meta(&mut self, id: &str, name: &str) {
        let meta = ProfileMeta::new(id, name).encode();
        if !self.try_write(&meta_key(id), meta.as_bytes()) {
            warn!("catalog: metadata write for {} failed", id);
        }
    }

    fn write_ids(&mut self, ids: &[String]) -> Result<()> {
        let persisted = if ids.is_empty() {
            self.store.delete(&self.namespace, IDS_KEY).is_ok()
        } else {
            self.try_write(IDS_KEY, join_ids(ids).as_bytes())
        };
        if persisted {
            Ok(())
        } else {
            error!("catalog: failed to persist id list");
            Err(ProfileError::StorageWriteFailed)
        }
    }

    fn set_active_id(&mut self, id: &str) -> Result<()> {
        if self.try_write(ACTIVE_KEY, id.as_bytes()) {
            Ok(())
        } else {
            error!("catalog: failed to persist active id {}", id);
            Err(ProfileError::StorageWriteFailed)
        }
    }

    fn remove_record(&mut self, id: &str) {
        let _ = self.store.delete(&self.namespace, &data_key(id));
        let _ = self.store.delete(&self.namespace, &meta_key(id));
    }
}
