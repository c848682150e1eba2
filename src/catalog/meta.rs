//! Per-profile metadata record, stored as compact JSON.

use serde::{Deserialize, Serialize};

/// Longest profile name kept, in characters.
pub const MAX_NAME_LEN: usize = 20;

/// Name used when a request carries none.
pub const DEFAULT_NAME: &str = "Unnamed";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileMeta {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl ProfileMeta {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_owned(),
            name: clamp_name(name),
        }
    }

    pub fn encode(&self) -> String {
        // Two plain string fields always serialize.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// `None` for anything that is not a metadata object.
    pub fn decode(raw: &[u8]) -> Option<Self> {
        serde_json::from_slice(raw).ok()
    }
}

/// Cut `name` to [`MAX_NAME_LEN`] characters.
pub fn clamp_name(name: &str) -> String {
    name.chars().take(MAX_NAME_LEN).collect()
}
