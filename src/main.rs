// hostwatch: monthly traffic watchdog with alerts, auto-shutdown and
// disk health checks.

use anyhow::Result;
use clap::Parser;
use std::path::Path;
use tracing::error;

use hostwatch::cli::{Cli, Commands, install};
use hostwatch::config::Config;
use hostwatch::monitor::disk::{DiskMonitor, SmartctlSource};
use hostwatch::monitor::{BandwidthMonitor, BandwidthSettings, SystemShutdown};
use hostwatch::notify::Dispatcher;
use hostwatch::sampler::SysinfoSampler;
use hostwatch::logger;
use hostwatch::usage::UsageStore;

fn main() {
    logger::init();
    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(Config::default_path);

    let result = match cli.command {
        Commands::Run => run_bandwidth(&config_path),
        Commands::Disk => run_disk(&config_path),
        Commands::Init => install::init(),
        Commands::Clean => install::clean(),
    };

    if let Err(e) = result {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn run_bandwidth(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;
    let settings = BandwidthSettings::from_config(&config)?;
    let dispatcher = Dispatcher::from_config(&config.notify)?;
    let store = UsageStore::new(config.data_file_path(config_path));

    let mut monitor = BandwidthMonitor::new(
        settings,
        SysinfoSampler::new(),
        dispatcher,
        SystemShutdown,
        store,
    )?;
    monitor.run()
}

fn run_disk(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;
    let dispatcher = Dispatcher::from_config(&config.notify)?;

    let mut monitor = DiskMonitor::new(
        config.hostname.clone(),
        config.disk.clone(),
        SmartctlSource,
        dispatcher,
    );
    monitor.run()
}
