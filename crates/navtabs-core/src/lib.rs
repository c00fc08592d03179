//! navtabs Core - chunked record storage, profiles, and schema migration
//!
//! This crate is the single storage module shared by every execution
//! context of the extension (background process, content scripts, popup,
//! options page). It stores structured configuration in quota-limited
//! key-value areas and migrates the legacy flat tab list into profiles.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]

pub mod config;
pub mod migration;
pub mod profile;
pub mod storage;

pub use config::StoreConfig;
pub use migration::{MigrationEngine, MigrationOptions, MigrationPhase};
pub use profile::{Profile, ProfileService, Tab, UserSettings};
pub use storage::{RecordStore, Storage, StorageArea, StorageBackend};
