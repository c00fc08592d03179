//! Tab CLI commands
//!
//! Handles: navtabs tabs show

use anyhow::Result;
use clap::Subcommand;
use navtabs_core::profile::{resolve_tabs_key, ProfileService, Tab};

use super::Context;

/// Tab commands
#[derive(Subcommand)]
pub enum TabsCommands {
    /// Print the active profile's tab list
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Execute tab command
pub async fn execute(cmd: TabsCommands, ctx: &Context) -> Result<()> {
    let service = ProfileService::new(ctx.storage.clone(), ctx.config.clone());

    match cmd {
        TabsCommands::Show { json } => {
            let tabs = service.load_tabs().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&tabs)?);
                return Ok(());
            }

            let settings = service.settings().await?;
            println!(
                "Tabs from '{}' ({} storage):",
                resolve_tabs_key(&settings),
                service.data_area().await?
            );
            if tabs.is_empty() {
                println!("  (none)");
            }
            print_tabs(&tabs, 1);
        }
    }

    Ok(())
}

fn print_tabs(tabs: &[Tab], depth: usize) {
    let indent = "  ".repeat(depth);
    for tab in tabs {
        println!("{indent}{} -> {}", tab.label, tab.url);
        print_tabs(&tab.children, depth + 1);
    }
}
