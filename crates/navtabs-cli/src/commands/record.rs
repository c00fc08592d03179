//! Record CLI commands
//!
//! Handles: navtabs record load/save/clear/inspect/usage

use anyhow::{Context as _, Result};
use clap::Subcommand;
use navtabs_core::storage::{
    Keys, QuotaLimits, RecordStatus, RecordStore, StorageArea, StorageBackend as _,
};
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};

use super::Context;

/// Record commands
#[derive(Subcommand)]
pub enum RecordCommands {
    /// Print a record as JSON
    Load {
        /// Record name
        name: String,
        /// Storage area
        #[arg(long, default_value = "synced")]
        area: StorageArea,
    },
    /// Save JSON from a file (or stdin) as a record
    Save {
        /// Record name
        name: String,
        /// Storage area
        #[arg(long, default_value = "synced")]
        area: StorageArea,
        /// JSON file to read (reads stdin when omitted)
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Remove a record and all of its chunks
    Clear {
        /// Record name
        name: String,
        /// Storage area
        #[arg(long, default_value = "synced")]
        area: StorageArea,
    },
    /// Show how a record is stored
    Inspect {
        /// Record name
        name: String,
        /// Storage area
        #[arg(long, default_value = "synced")]
        area: StorageArea,
    },
    /// Show bytes in use per storage area
    Usage,
}

/// Execute record command
pub async fn execute(cmd: RecordCommands, ctx: &Context) -> Result<()> {
    let store = RecordStore::new(ctx.config.clone());

    match cmd {
        RecordCommands::Load { name, area } => {
            match store.load(&name, ctx.storage.area(area)).await? {
                Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                None => println!("Record '{name}' not found in {area} storage."),
            }
        }
        RecordCommands::Save { name, area, file } => {
            let value = read_json(file.as_deref())?;
            let outcome = store.save(&name, &value, ctx.storage.area(area)).await?;
            if outcome.chunked {
                println!(
                    "Saved '{name}' to {area} storage: {} bytes in {} chunks",
                    outcome.byte_size, outcome.chunk_count
                );
            } else {
                println!("Saved '{name}' to {area} storage: {} bytes", outcome.byte_size);
            }
        }
        RecordCommands::Clear { name, area } => {
            store.clear(&name, ctx.storage.area(area)).await?;
            println!("Cleared '{name}' from {area} storage.");
        }
        RecordCommands::Inspect { name, area } => {
            let status = store.inspect(&name, ctx.storage.area(area)).await?;
            println!("Record: {name} ({area})");
            match status {
                RecordStatus::Absent => println!("Status: absent"),
                RecordStatus::Direct { byte_size } => {
                    println!("Status: direct");
                    println!("Size: {byte_size} bytes");
                }
                RecordStatus::Chunked {
                    chunk_count,
                    byte_size,
                    saved_at,
                } => {
                    println!("Status: chunked");
                    println!("Size: {byte_size} bytes");
                    println!("Chunks: {chunk_count}");
                    if let Some(saved_at) = saved_at {
                        println!("Saved: {}", saved_at.format("%Y-%m-%d %H:%M:%S UTC"));
                    }
                }
                RecordStatus::Corrupt(e) => {
                    println!("Status: corrupt");
                    println!("Problem: {e}");
                }
            }
        }
        RecordCommands::Usage => {
            for area in [StorageArea::Synced, StorageArea::Local] {
                let used = ctx.storage.area(area).bytes_in_use(Keys::All).await?;
                match QuotaLimits::for_area(area).total_bytes {
                    Some(limit) => println!("{area}: {used} of {limit} bytes"),
                    None => println!("{area}: {used} bytes"),
                }
            }
        }
    }

    Ok(())
}

fn read_json(file: Option<&Path>) -> Result<Value> {
    let content = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };
    serde_json::from_str(&content).context("Input is not valid JSON")
}
