//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (HTTP API,
//! WebSocket, touchscreen) that the
//! [`RoasterService`](super::service::RoasterService) interprets and acts
//! upon. Request bodies arrive fully assembled and already decoded.

use crate::catalog::{ProfileDetail, ProfileList, ProfileRequest};

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone)]
pub enum AppCommand {
    /// Store a new profile under a generated id.
    CreateProfile(ProfileRequest),

    /// Overwrite the profile stored under `id`.
    SaveProfile { id: String, request: ProfileRequest },

    /// Make a stored profile the live curve.
    ActivateProfile(String),

    /// Remove a stored (non-active) profile.
    DeleteProfile(String),

    /// Change a profile's display name.
    RenameProfile { id: String, name: String },

    /// Read one profile back with its setpoints.
    GetProfile(String),

    /// Summarise every stored profile.
    ListProfiles,

    /// Factory reset of the profile store.
    DeleteAllProfiles,

    /// Begin a roast on the live curve.
    StartRoast,

    /// Abort the roast and go straight to cooling.
    StopRoast,

    /// Leave the error state once the operator has checked the sensor.
    ClearFault,
}

/// Successful outcome of an [`AppCommand`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandReply {
    /// Profile stored; carries its id.
    Saved(String),
    Profile(ProfileDetail),
    List(ProfileList),
    Done,
}
