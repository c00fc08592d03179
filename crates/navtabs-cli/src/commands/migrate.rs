//! Migration CLI commands
//!
//! Handles: navtabs migrate detect/perform/skip/reset
//!
//! The engine's phase lives only in memory, so `perform` and `skip` run
//! `detect` first within the same invocation.

use anyhow::Result;
use clap::Subcommand;
use navtabs_core::migration::{
    CompletionMarker, MigrationEngine, MigrationOptions, MigrationPhase, PersistedState,
};

use super::Context;

/// Migration commands
#[derive(Subcommand)]
pub enum MigrateCommands {
    /// Report whether migration is needed for a version
    Detect {
        /// Current extension version
        #[arg(long)]
        version: String,
    },
    /// Move legacy tabs into a Default profile
    Perform {
        /// Current extension version
        #[arg(long)]
        version: String,
        /// Turn on the profile switcher
        #[arg(long)]
        enable_profiles: bool,
        /// Keep profiles and tabs in local storage instead of synced
        #[arg(long)]
        local: bool,
    },
    /// Opt out of migration for a version
    Skip {
        /// Current extension version
        #[arg(long)]
        version: String,
    },
    /// Forget all migration state
    Reset,
}

/// Execute migration command
pub async fn execute(cmd: MigrateCommands, ctx: &Context) -> Result<()> {
    let mut engine = MigrationEngine::new(ctx.storage.clone(), ctx.config.clone());

    match cmd {
        MigrateCommands::Detect { version } => {
            let phase = engine.detect(&version).await?;
            println!("Migration for {version}: {phase}");
            print_state(&engine.persisted_state().await?);
        }
        MigrateCommands::Perform {
            version,
            enable_profiles,
            local,
        } => {
            let phase = engine.detect(&version).await?;
            if phase != MigrationPhase::Needed {
                println!("Migration for {version}: {phase}. Nothing to do.");
                return Ok(());
            }

            let report = engine
                .perform(MigrationOptions {
                    enable_profiles,
                    use_sync_storage: !local,
                })
                .await?;

            println!("Migrated {} tabs to profile {}", report.tab_count, report.profile_id);
            println!("  From: {} storage", report.source_area);
            println!("  To: {} storage", report.target_area);
            if report.tabs_chunked {
                println!("  Tabs were stored in chunks");
            }
        }
        MigrateCommands::Skip { version } => {
            let phase = engine.detect(&version).await?;
            if phase != MigrationPhase::Needed {
                println!("Migration for {version}: {phase}. Nothing to skip.");
                return Ok(());
            }
            engine.skip().await?;
            println!("Skipped migration for {version}.");
        }
        MigrateCommands::Reset => {
            engine.reset().await?;
            println!("Migration state cleared.");
        }
    }

    Ok(())
}

fn print_state(state: &PersistedState) {
    let completed = match &state.completed {
        CompletionMarker::Never => "never".to_string(),
        CompletionMarker::Version(version) => version.clone(),
        CompletionMarker::OptedOut => "skipped".to_string(),
    };
    println!(
        "  Extension version: {}",
        state.extension_version.as_deref().unwrap_or("unknown")
    );
    println!("  Completed: {completed}");
    println!("  Pending: {}", state.pending);
    if let Some(skipped) = &state.skipped_version {
        println!("  Skipped: {skipped}");
    }
}
