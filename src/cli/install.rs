//! Installer surface: copy default configuration and systemd units into
//! system directories. Existing files are never overwritten, so user edits
//! survive re-running init.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

const DEFAULT_CONFIG: &str = include_str!("../../assets/config.toml");

const UNIT_FILES: &[(&str, &str)] = &[
    (
        "hostwatch-bandwidth.service",
        include_str!("../../assets/hostwatch-bandwidth.service"),
    ),
    (
        "hostwatch-disk.service",
        include_str!("../../assets/hostwatch-disk.service"),
    ),
];

const SYSTEMD_DIR: &str = "/etc/systemd/system";

pub fn init() -> Result<()> {
    println!("Installing default configuration files...");

    install_if_missing(
        &crate::config::Config::default_path(),
        DEFAULT_CONFIG.to_string(),
    )?;

    let exe = std::env::current_exe().context("Cannot determine current executable path")?;
    let mut newly_installed = Vec::new();

    for (name, contents) in UNIT_FILES {
        let dest = Path::new(SYSTEMD_DIR).join(name);
        if dest.exists() {
            println!("Already exists, skipping: {}", dest.display());
            continue;
        }
        let rendered = render_unit(contents, &exe);
        write_file(&dest, rendered)?;
        println!("Installed (rendered): {}", dest.display());
        newly_installed.push(name.trim_end_matches(".service").to_string());
    }

    daemon_reload();

    println!("Default configuration files installed successfully!");
    println!("Now you can edit the config to customize the settings:");
    println!("  vim {}", crate::config::Config::default_path().display());

    if newly_installed.is_empty() {
        println!("No new systemd service files were installed this time.");
        println!("To enable existing services, run manually:");
        println!("  systemctl enable --now <service>.service");
    } else {
        println!("To enable and start the newly installed services, run:");
        for name in &newly_installed {
            println!("  systemctl enable --now {name}.service");
        }
    }
    Ok(())
}

pub fn clean() -> Result<()> {
    let mut deleted_any = false;

    for (name, _) in UNIT_FILES {
        let dest = Path::new(SYSTEMD_DIR).join(name);
        if !dest.exists() {
            println!("File not found, skipping: {}", dest.display());
            continue;
        }
        match fs::remove_file(&dest) {
            Ok(()) => {
                println!("Deleted: {}", dest.display());
                deleted_any = true;
            }
            Err(e) => println!("Failed to delete {}: {e}", dest.display()),
        }
    }

    daemon_reload();

    if deleted_any {
        println!("Finished deleting .service files.");
    } else {
        println!("No .service files were deleted.");
    }
    Ok(())
}

fn install_if_missing(dest: &PathBuf, contents: String) -> Result<()> {
    if dest.exists() {
        println!("Already exists, skipping: {}", dest.display());
        return Ok(());
    }
    write_file(dest, contents)?;
    println!("Installed: {}", dest.display());
    Ok(())
}

fn write_file(dest: &Path, contents: String) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(dest, contents)
        .with_context(|| format!("Failed to write {}", dest.display()))
}

/// Point ExecStart lines at the binary actually running the installer.
fn render_unit(contents: &str, exe: &Path) -> String {
    contents
        .lines()
        .map(|line| {
            if line.starts_with("ExecStart=") {
                line.replace("/usr/local/bin/hostwatch", &exe.to_string_lossy())
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
        + "\n"
}

fn daemon_reload() {
    match Command::new("systemctl").arg("daemon-reload").status() {
        Ok(status) if status.success() => println!("systemd daemon reloaded successfully."),
        Ok(status) => println!("Failed to reload systemd daemon: {status}"),
        Err(e) => println!("Failed to reload systemd daemon: {e}"),
    }
}
