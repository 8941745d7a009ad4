// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `kickstart`: inspect or reset the wizard state saved on this machine.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kickstart_app_core::{KickstartPrefs, SystemClock};
use kickstart_config_fs::FsStorage;
use kickstart_services::AppServices;
use kickstart_user_data::FeatureFlags;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect or reset saved Kickstart wizard state")]
struct Args {
    /// Storage directory (defaults to the platform data directory)
    #[arg(long)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Saved forms, last save time and whether the resume prompt is due
    Status {
        /// Also report on these wizards (e.g. vsphere, aws)
        #[arg(long)]
        wizard: Vec<String>,
    },
    /// Print everything saved for one wizard as JSON
    Show {
        /// Wizard name
        wizard: String,
    },
    /// Delete saved state for one wizard, or everything
    Reset {
        /// Only this wizard
        #[arg(long)]
        wizard: Option<String>,
    },
    /// Set the minutes after which saved data counts as old
    StaleAfter {
        /// Threshold in minutes
        minutes: u64,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse()?))
        .with_writer(io::stderr)
        .init();

    let storage = match &args.data_dir {
        Some(dir) => FsStorage::at(dir),
        None => FsStorage::new(),
    }
    .context("open wizard storage")?;
    info!(dir = %storage.base().display(), "using wizard storage");
    let services = AppServices::load(storage, Arc::new(SystemClock), FeatureFlags::new());

    let mut out = io::stdout().lock();
    match args.command {
        Command::Status { wizard } => {
            let metadata = services.metadata();
            let forms = metadata.get_form_list()?;
            writeln!(out, "forms: {}", forms.join(", "))?;
            match metadata.last_saved_timestamp()? {
                Some(ts) => writeln!(out, "last saved: {ts}")?,
                None => writeln!(out, "last saved: never")?,
            }
            let prompt = metadata.should_prompt_clear_local_storage()?;
            writeln!(out, "resume prompt due: {}", if prompt { "yes" } else { "no" })?;
            for name in wizard {
                let entry = services.user_data().retrieve_wizard_entry(&name)?;
                let state = if entry.steps.is_empty() {
                    "empty"
                } else if services.user_data().is_wizard_data_old(&name)? {
                    "old"
                } else {
                    "current"
                };
                writeln!(out, "wizard {name}: {state}")?;
            }
        }
        Command::Show { wizard } => {
            let entry = services.user_data().retrieve_wizard_entry(&wizard)?;
            writeln!(out, "{}", serde_json::to_string_pretty(&entry)?)?;
        }
        Command::Reset { wizard: Some(name) } => {
            services.user_data().delete_wizard_data(&name)?;
            writeln!(out, "deleted saved data for wizard {name}")?;
        }
        Command::Reset { wizard: None } => {
            services.delete_all_saved_data()?;
            writeln!(out, "deleted all saved wizard data")?;
        }
        Command::StaleAfter { minutes } => {
            services.save_prefs(&KickstartPrefs {
                stale_after_minutes: minutes,
            })?;
            writeln!(out, "saved data now counts as old after {minutes} minutes")?;
        }
    }
    Ok(())
}
