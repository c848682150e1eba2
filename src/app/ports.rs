//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ProfileCatalog / RoasterService (domain)
//! ```
//!
//! Driven adapters (flash storage, entropy, thermocouple, display, event
//! sinks) implement these traits. The catalog and the
//! [`RoasterService`](super::service::RoasterService) consume them via
//! generics, so the domain core never touches hardware directly.
//!
//! All port errors are typed; callers must handle every variant explicitly.

use crate::config::RoasterConfig;

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage for profile blobs, metadata, and the catalog index.
///
/// - Keys are namespaced to prevent collisions between subsystems.
/// - A write either lands completely or reports failure. Backends that
///   signal failure by "zero bytes written" return `Ok(0)`; callers treat
///   `Ok(0)` and `Err(_)` alike.
/// - The backend is not internally synchronised: at most one writer at a time.
pub trait StoragePort {
    /// Read a value. Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value. Returns the number of bytes persisted.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<usize, StorageError>;

    /// Delete a key. Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists roaster configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`RoasterConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<RoasterConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&mut self, config: &RoasterConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Entropy port (driven adapter: hardware RNG → domain)
// ───────────────────────────────────────────────────────────────

/// Source of randomness for profile id generation.
pub trait EntropyPort {
    /// Return 64 fresh random bits.
    fn next_u64(&mut self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Thermal port (driven adapter: clock + thermocouple → domain)
// ───────────────────────────────────────────────────────────────

/// What the control loop samples each tick.
pub trait ThermalPort {
    /// Milliseconds since boot. Wraps at `u32::MAX`.
    fn elapsed_millis(&self) -> u32;

    /// Latest thermocouple reading in °F.
    fn current_temperature(&mut self) -> f64;
}

// ───────────────────────────────────────────────────────────────
// Display port (driven adapter: domain → touchscreen)
// ───────────────────────────────────────────────────────────────

/// The local touchscreen. The core only pushes numbers to it.
pub trait DisplayPort {
    /// Show the profile's final target temperature (°F) and progress (0–100).
    fn show_targets(&mut self, final_target: u32, progress: u32);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port. Adapters decide where they go (serial log,
/// WebSocket push, etc.).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug)]
pub enum ConfigError {
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
