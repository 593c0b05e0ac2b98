mod apply;
mod config;
mod create;
mod error;
mod hunk_apply;
mod logging;
mod patch_format;
mod status;
mod store;
mod util;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Instant;

use crate::config::Config;

#[derive(Parser)]
#[command(
    name = "filepatch",
    version,
    about = "Track a file, commit your edit as a unified diff, apply it and revert it"
)]
struct Cli {
    /// Directory holding the patch records
    #[arg(long, global = true, default_value = config::DEFAULT_STORE_ROOT)]
    store: PathBuf,
    /// Lines a hunk may drift from its recorded position when applying
    #[arg(long, global = true, default_value_t = config::DEFAULT_FUZZ)]
    fuzz: usize,
    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Snapshot a file into the store so the copy can be edited
    Create {
        /// File to track
        file: PathBuf,
    },
    /// Save the difference between the file and its edited snapshot as a patch
    Commit {
        /// Tracked file
        file: PathBuf,
    },
    /// Apply the committed patch; the file becomes a symlink to the result
    Apply {
        /// Tracked file
        file: PathBuf,
    },
    /// Restore the file as it was before apply
    Revert {
        /// Tracked file
        file: PathBuf,
    },
    /// Show the state of one record, or of every record in the store
    Status {
        /// Tracked file; omit to list all records
        file: Option<PathBuf>,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = Config {
        store_root: cli.store,
        fuzz: cli.fuzz,
    };
    let start = Instant::now();

    match cli.command {
        Commands::Create { file } => {
            let summary = create::track_file(&config, &file).await?;
            println!("Tracking {}", summary.name);
            println!("  Original: {}", summary.original_path.display());
            println!("  Edit this copy: {}", summary.snapshot.display());
        }
        Commands::Commit { file } => {
            let summary = create::commit_patch(&config, &file).await?;
            println!("Patch committed for {}", summary.name);
            println!("  Patch: {}", summary.patch.display());
            println!("  Hunks: {}", summary.stats.hunks);
            println!("  Lines added: {}", summary.stats.insertions);
            println!("  Lines removed: {}", summary.stats.deletions);
        }
        Commands::Apply { file } => {
            let summary = apply::apply_patch(&config, &file).await?;
            println!("Patch applied to {}", summary.name);
            println!("  Hunks: {}", summary.hunks);
            println!("  Now links to: {}", summary.patched.display());
            println!("  Backup: {}", summary.backup.display());
        }
        Commands::Revert { file } => match apply::revert_patch(&config, &file).await? {
            apply::RevertOutcome::Restored { name, bytes } => {
                println!("Reverted {name}");
                println!("  Bytes restored: {bytes}");
            }
            apply::RevertOutcome::NotApplied => {}
        },
        Commands::Status { file, json } => {
            let statuses = match file {
                Some(file) => vec![status::record_status(&config, &file).await?],
                None => status::all_statuses(&config).await?,
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&statuses)?);
            } else if statuses.is_empty() {
                println!("No records in {}", config.store_root.display());
            } else {
                for s in &statuses {
                    println!("{:<10} {}  ({})", s.state, s.name, s.live_path.display());
                }
            }
        }
    }

    tracing::debug!(elapsed_ms = start.elapsed().as_millis() as u64, "done");
    Ok(())
}
