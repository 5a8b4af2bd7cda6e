use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hostwatch")]
#[command(about = "Monthly traffic watchdog with alerts, auto-shutdown and disk health checks")]
#[command(version)]
pub struct Cli {
    /// Config file path (default: /etc/hostwatch/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the monthly bandwidth monitor
    Run,

    /// Run the disk SMART health monitor
    Disk,

    /// Install default configuration and systemd unit files
    Init,

    /// Remove the systemd unit files installed by init
    Clean,
}
