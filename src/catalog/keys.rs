//! Storage key layout for the profile catalog.
//!
//! | Key             | Value                                  |
//! |-----------------|----------------------------------------|
//! | `pf_<id>`       | binary curve (see [`crate::profile::codec`]) |
//! | `pm_<id>`       | JSON metadata `{"id":..,"name":..}`    |
//! | `profile_ids`   | comma-joined ids, insertion order      |
//! | `active_id`     | id of the active profile               |

pub const DATA_PREFIX: &str = "pf_";
pub const META_PREFIX: &str = "pm_";
pub const IDS_KEY: &str = "profile_ids";
pub const ACTIVE_KEY: &str = "active_id";

pub fn data_key(id: &str) -> String {
    format!("{DATA_PREFIX}{id}")
}

pub fn meta_key(id: &str) -> String {
    format!("{META_PREFIX}{id}")
}

/// Split the stored id list. Whitespace is trimmed and empty tokens dropped,
/// so a trailing comma or a blank value reads as fewer ids, never as `""`.
pub fn split_ids(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

pub fn join_ids(ids: &[String]) -> String {
    ids.join(",")
}
