use crate::config::Config;
use crate::installer::{InstallOptions, Installer, MarkState};
use crate::shutdown::ShutdownHandler;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Control the RAUC update daemon
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(help = "Config file to use instead of the default locations", long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Install a bundle and wait until the daemon is done with it
    Install {
        #[arg(help = "Bundle path or URL")]
        bundle: String,
        #[arg(help = "Skip the compatible check", long)]
        ignore_compatible: bool,
        #[arg(help = "Give up waiting after this many seconds", long)]
        timeout: Option<u64>,
    },
    /// Show compatible and version of a bundle
    Info { bundle: String },
    /// Mark a slot as good, bad or active
    Mark {
        state: MarkState,
        #[arg(default_value = "booted")]
        slot: String,
    },
    /// Show system and slot status
    Status,
    /// Show the progress of the running operation
    Progress,
}

pub async fn execute() -> Result<()> {
    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;
    let installer = Installer::connect(&config)
        .await
        .with_context(|| "Failed to connect to the RAUC daemon")?;

    match args.command {
        Commands::Install {
            bundle,
            ignore_compatible,
            timeout,
        } => {
            let installer = match timeout {
                Some(secs) => installer.with_completion_timeout(Some(Duration::from_secs(secs))),
                None => installer,
            };
            let options = InstallOptions::default().ignore_compatible(ignore_compatible);
            let cancel = ShutdownHandler::new().listen();

            installer
                .install_with_cancel(&bundle, &options, cancel)
                .await
                .with_context(|| format!("Failed to install {bundle}"))?;
            println!("{bundle} installed");
        }
        Commands::Info { bundle } => {
            let info = installer
                .info(&bundle)
                .await
                .with_context(|| format!("Failed to inspect {bundle}"))?;
            println!("Compatible: {}", info.compatible);
            println!("Version:    {}", info.version);
        }
        Commands::Mark { state, slot } => {
            let reply = installer
                .mark(state, &slot)
                .await
                .with_context(|| format!("Failed to mark {slot} {state}"))?;
            println!("{}", reply.message);
        }
        Commands::Status => status(&installer).await?,
        Commands::Progress => {
            let progress = installer.progress().await?;
            println!("{progress}");
        }
    }

    Ok(())
}

async fn status(installer: &Installer) -> Result<()> {
    println!("Compatible: {}", installer.compatible().await?);
    println!("Variant:    {}", installer.variant().await?);
    println!("Booted:     {}", installer.boot_slot().await?);
    println!("Operation:  {}", installer.operation().await?);

    let last_error = installer.last_error().await?;
    if !last_error.is_empty() {
        println!("Last error: {last_error}");
    }

    let slots = installer.slot_status().await?;
    info!("Daemon reported {} slots", slots.len());

    for slot in slots {
        println!(
            "{} ({}): {} [{}]",
            slot.name,
            slot.class.as_deref().unwrap_or("-"),
            slot.device.as_deref().unwrap_or("-"),
            slot.state.as_ref().map(ToString::to_string).unwrap_or_else(|| "-".into())
        );
        if let Some(version) = slot.bundle_version.as_deref() {
            println!("    bundle version: {version}");
        }
    }

    Ok(())
}
