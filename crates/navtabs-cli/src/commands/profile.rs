//! Profile CLI commands
//!
//! Handles: navtabs profile list/create/rename/delete/switch/match/storage

use anyhow::Result;
use clap::Subcommand;
use navtabs_core::profile::ProfileService;
use navtabs_core::storage::StorageArea;

use super::Context;

/// Profile commands
#[derive(Subcommand)]
pub enum ProfileCommands {
    /// List all profiles
    List,
    /// Create a profile with an empty tab list
    Create {
        /// Profile name
        name: String,
        /// URL glob that selects this profile (can specify multiple times)
        #[arg(long = "pattern")]
        patterns: Vec<String>,
    },
    /// Rename a profile
    Rename {
        /// Profile ID
        id: String,
        /// New name
        name: String,
    },
    /// Delete a profile and its tabs
    Delete {
        /// Profile ID
        id: String,
    },
    /// Make a profile active
    Switch {
        /// Profile ID
        id: String,
    },
    /// Show which profile a URL selects
    Match {
        /// Page URL
        url: String,
    },
    /// Move profiles and tabs to another storage area
    Storage {
        /// Target area (synced or local)
        area: StorageArea,
    },
}

/// Execute profile command
pub async fn execute(cmd: ProfileCommands, ctx: &Context) -> Result<()> {
    let service = ProfileService::new(ctx.storage.clone(), ctx.config.clone());

    match cmd {
        ProfileCommands::List => {
            let profiles = service.list_profiles().await?;
            if profiles.is_empty() {
                println!("No profiles found.");
                return Ok(());
            }
            let settings = service.settings().await?;
            println!("Profiles ({} storage):", service.data_area().await?);
            for p in profiles {
                let active = if settings.active_profile() == Some(p.id.as_str()) {
                    "*"
                } else {
                    " "
                };
                let default = if p.is_default { " (default)" } else { "" };
                println!("{active} {} - {}{default}", p.id, p.name);
            }
        }
        ProfileCommands::Create { name, patterns } => {
            let profile = service.create_profile(&name, patterns).await?;
            println!("Created profile: {} ({})", profile.name, profile.id);
        }
        ProfileCommands::Rename { id, name } => {
            let profile = service.rename_profile(&id, &name).await?;
            println!("Renamed profile {} to '{}'", profile.id, profile.name);
        }
        ProfileCommands::Delete { id } => {
            service.delete_profile(&id).await?;
            println!("Deleted profile: {id}");
        }
        ProfileCommands::Switch { id } => {
            let profile = service.switch_profile(&id).await?;
            println!("Active profile: {} ({})", profile.name, profile.id);
        }
        ProfileCommands::Match { url } => match service.profile_for_url(&url).await? {
            Some(profile) => println!("{} ({})", profile.name, profile.id),
            None => println!("No profile matches {url}"),
        },
        ProfileCommands::Storage { area } => {
            service
                .set_use_sync_storage(area == StorageArea::Synced)
                .await?;
            println!("Profiles and tabs now live in {area} storage.");
        }
    }

    Ok(())
}
