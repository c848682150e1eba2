//! Roaster firmware library.
//!
//! Exposes the profile engine, the persistent profile catalog and the
//! roast service for integration testing. All ESP-IDF-specific code is
//! guarded by `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod catalog;
pub mod config;
pub mod error;
pub mod profile;
