//! Copies a single file from RAUC's "other" slot to the host file system,
//! for instance to find out which software version that slot holds.

use anyhow::{Context, Result, bail};
use clap::Parser;
use rauc::{Installer, SlotStatus};
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::process::Command;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(help = "Destination file (in the host's root filesystem)", long)]
    to: PathBuf,

    #[arg(help = "File to copy from (in the other slot's filesystem)", long)]
    from: PathBuf,

    #[arg(help = "Mount point to use temporarily", long, default_value = "/tmp/rauc-other-slot")]
    mount_point: PathBuf,

    #[arg(help = "Slot class to mount", long, default_value = "rootfs")]
    class: String,
}

/// Devices of the slots of `class` that are not the booted one.
fn other_slot_devices<'a>(slots: &'a [SlotStatus], class: &str) -> Vec<&'a str> {
    slots
        .iter()
        .filter(|slot| slot.class.as_deref() == Some(class))
        .filter(|slot| slot.state.as_ref().is_some_and(|state| !state.is_booted()))
        .filter_map(|slot| slot.device.as_deref())
        .collect()
}

fn source_path(mount_point: &Path, from: &Path) -> PathBuf {
    mount_point.join(from.strip_prefix("/").unwrap_or(from))
}

async fn run_command(program: &str, args: &[&str]) -> Result<()> {
    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .with_context(|| format!("Failed to run {program}"))?;

    if !output.status.success() {
        bail!(
            "{program} failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    Ok(())
}

async fn copy_file(from: &Path, to: &Path) -> Result<u64> {
    let mut source = tokio::fs::File::open(from)
        .await
        .with_context(|| format!("Cannot open {}", from.display()))?;

    let mut destination = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o644)
        .open(to)
        .await
        .with_context(|| format!("Cannot open {}", to.display()))?;

    tokio::io::copy(&mut source, &mut destination)
        .await
        .with_context(|| "Cannot copy file content")
}

async fn copy_from_device(device: &str, args: &Args) -> Result<()> {
    info!(device, "Device path for mount");

    tokio::fs::create_dir_all(&args.mount_point)
        .await
        .with_context(|| format!("Cannot create {}", args.mount_point.display()))?;

    let mount_point = args.mount_point.to_string_lossy().into_owned();
    run_command("mount", &["-t", "squashfs", "-o", "ro", device, mount_point.as_str()])
        .await
        .with_context(|| format!("Unable to mount {device} on {mount_point}"))?;

    info!(device, %mount_point, "Successfully mounted");

    let copied = copy_file(&source_path(&args.mount_point, &args.from), &args.to).await;

    if let Err(err) = run_command("umount", &[mount_point.as_str()]).await {
        error!(%mount_point, "Unable to unmount: {err:#}");
    }

    let bytes = copied?;
    info!(
        to = %args.to.display(),
        from = %args.from.display(),
        class = %args.class,
        bytes,
        "Successfully copied"
    );

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let installer = Installer::system()
        .await
        .with_context(|| "Cannot initialize")?;

    let slots = installer
        .slot_status()
        .await
        .with_context(|| "Cannot get slot statuses")?;

    let devices = other_slot_devices(&slots, &args.class);
    if devices.is_empty() {
        bail!("No slot of class {} besides the booted one", args.class);
    }

    for device in devices {
        copy_from_device(device, &args).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rauc::Value;
    use std::collections::BTreeMap;

    fn slot(name: &str, class: &str, state: Option<&str>, device: &str) -> SlotStatus {
        let mut attributes = BTreeMap::new();
        attributes.insert("class".to_string(), Value::from(class));
        attributes.insert("device".to_string(), Value::from(device));
        if let Some(state) = state {
            attributes.insert("state".to_string(), Value::from(state));
        }
        SlotStatus::from_attributes(name, attributes).unwrap()
    }

    #[test]
    fn picks_the_non_booted_slot_of_the_class() {
        let slots = vec![
            slot("rootfs.0", "rootfs", Some("booted"), "/dev/mmcblk0p1"),
            slot("rootfs.1", "rootfs", Some("inactive"), "/dev/mmcblk0p2"),
            slot("appfs.1", "appfs", Some("inactive"), "/dev/mmcblk0p4"),
        ];

        assert_eq!(other_slot_devices(&slots, "rootfs"), vec!["/dev/mmcblk0p2"]);
        assert_eq!(other_slot_devices(&slots, "appfs"), vec!["/dev/mmcblk0p4"]);
        assert!(other_slot_devices(&slots, "bootloader").is_empty());
    }

    #[test]
    fn skips_slots_without_state() {
        let slots = vec![slot("rootfs.1", "rootfs", None, "/dev/mmcblk0p2")];
        assert!(other_slot_devices(&slots, "rootfs").is_empty());
    }

    #[test]
    fn source_is_below_the_mount_point() {
        assert_eq!(
            source_path(Path::new("/tmp/rauc-other-slot"), Path::new("/etc/os-release")),
            PathBuf::from("/tmp/rauc-other-slot/etc/os-release")
        );
        assert_eq!(
            source_path(Path::new("/mnt"), Path::new("etc/version")),
            PathBuf::from("/mnt/etc/version")
        );
    }

    #[test]
    fn source_and_destination_are_required() {
        let err = Args::try_parse_from(["copy-from-other-slot", "--from", "/etc/os-release"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);

        let args = Args::try_parse_from([
            "copy-from-other-slot",
            "--from",
            "/etc/os-release",
            "--to",
            "/tmp/other-os-release",
        ])
        .unwrap();
        assert_eq!(args.mount_point, PathBuf::from("/tmp/rauc-other-slot"));
        assert_eq!(args.class, "rootfs");
    }

    #[tokio::test]
    async fn copies_and_truncates() {
        let dir = tempfile::tempdir().expect("Failed to create temporary dir");
        let from = dir.path().join("version");
        let to = dir.path().join("copy");
        std::fs::write(&from, "2024.05.1\n").unwrap();
        std::fs::write(&to, "a much longer previous content\n").unwrap();

        let bytes = copy_file(&from, &to).await.unwrap();
        assert_eq!(bytes, 10);
        assert_eq!(std::fs::read_to_string(&to).unwrap(), "2024.05.1\n");
    }
}
