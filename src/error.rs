//! Unified error types for the profile subsystem.
//!
//! Every catalog and curve operation funnels into [`ProfileError`]. All
//! variants are `Copy` so results can be handed across the command boundary
//! and logged without allocation. None of them is fatal to the firmware.

use core::fmt;

use crate::app::ports::StorageError;

// ---------------------------------------------------------------------------
// Profile errors
// ---------------------------------------------------------------------------

/// Typed failure reasons for profile and catalog operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileError {
    /// Setpoints missing, empty, or more than the curve can hold.
    InvalidInput,
    /// A setpoint temperature or fan speed is outside the allowed range.
    SetpointOutOfBounds,
    /// The id has no stored profile data.
    NotFound,
    /// The id is the active profile and cannot be deleted.
    CannotDeleteActive,
    /// An operation that needs an id was given an empty one.
    EmptyId,
    /// Writes, retries, and emergency eviction were all exhausted, or the
    /// catalog index could not be persisted.
    StorageWriteFailed,
    /// The catalog index or active id could not be read. Nothing was written.
    StorageReadFailed,
}

impl ProfileError {
    /// Stable reason code reported to the network layer.
    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_setpoints",
            Self::SetpointOutOfBounds => "setpoint_out_of_bounds",
            Self::NotFound => "not_found",
            Self::CannotDeleteActive => "cannot_delete_active",
            Self::EmptyId => "empty_id",
            Self::StorageWriteFailed => "nvs_write_failed",
            Self::StorageReadFailed => "nvs_read_failed",
        }
    }
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput => write!(f, "invalid or missing setpoints"),
            Self::SetpointOutOfBounds => write!(f, "setpoint out of bounds"),
            Self::NotFound => write!(f, "profile not found"),
            Self::CannotDeleteActive => write!(f, "cannot delete the active profile"),
            Self::EmptyId => write!(f, "empty profile id"),
            Self::StorageWriteFailed => write!(f, "storage write failed"),
            Self::StorageReadFailed => write!(f, "storage read failed"),
        }
    }
}

impl std::error::Error for ProfileError {}

impl From<StorageError> for ProfileError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound => Self::NotFound,
            StorageError::Full | StorageError::IoError => Self::StorageWriteFailed,
        }
    }
}

// ---------------------------------------------------------------------------
// Safety faults
// ---------------------------------------------------------------------------

/// Faults that stop the roast: the heater is cut and the state machine
/// parks in `Error` until the operator clears it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyFault {
    /// The thermocouple produced implausible readings several times in a row
    /// (a disconnected thermocouple reads around 2048 °F).
    SensorFailure,
    /// The bean temperature passed the absolute safe limit.
    OverTemperature,
}

impl fmt::Display for SafetyFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SensorFailure => write!(f, "thermocouple failure"),
            Self::OverTemperature => write!(f, "over temperature"),
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Profile-subsystem `Result` alias.
pub type Result<T> = core::result::Result<T, ProfileError>;
