//! Legacy schema migration

pub mod engine;
pub mod state;

pub use engine::{
    MigrationEngine, MigrationError, MigrationOptions, MigrationReport, MigrationResult,
    MigrationStep,
};
pub use state::{CompletionMarker, MigrationPhase, PersistedState};
