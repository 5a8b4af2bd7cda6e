//! Bandwidth monitor loop.
//!
//! One blocking fixed-interval cycle per process:
//! sample -> account -> evaluate -> act -> persist -> sleep. The loop only
//! terminates through the exceeded state (or a fatal startup error); every
//! recoverable failure is logged and the cadence continues.

pub mod disk;

use crate::config::{BYTES_PER_GB, Config, gb_to_bytes, parse_bandwidth};
use crate::notify::Dispatcher;
use crate::policy::{self, AlertAction};
use crate::sampler::ByteSampler;
use crate::usage::{TickOutcome, UsageRecord, UsageStore};
use anyhow::{Context, Result, bail};
use chrono::{Datelike, Utc};
use std::process::Command;
use std::time::Duration;
use tracing::{error, info, warn};

/// External power-off capability, injected so tests never touch the OS.
pub trait ShutdownTrigger {
    fn shutdown(&mut self) -> Result<()>;
}

/// Production trigger: the blocking system shutdown command.
pub struct SystemShutdown;

impl ShutdownTrigger for SystemShutdown {
    fn shutdown(&mut self) -> Result<()> {
        let status = Command::new("shutdown")
            .args(["-h", "now"])
            .status()
            .context("Failed to invoke shutdown")?;
        if !status.success() {
            bail!("shutdown exited with {status}");
        }
        Ok(())
    }
}

/// Bandwidth settings resolved to the units the loop works in.
#[derive(Debug, Clone)]
pub struct BandwidthSettings {
    pub hostname: String,
    pub interfaces: Vec<String>,
    pub cap_gb: f64,
    pub cap_bytes: u64,
    pub alarm_ratio: f64,
    pub check_interval: Duration,
    pub shutdown_enabled: bool,
}

impl BandwidthSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        let cap_gb = parse_bandwidth(&config.bandwidth.bandwidth_max)?;
        Ok(Self {
            hostname: config.hostname.clone(),
            interfaces: config.bandwidth.interfaces.clone(),
            cap_gb,
            cap_bytes: gb_to_bytes(cap_gb),
            alarm_ratio: f64::from(config.bandwidth.alarm_rate) / 100.0,
            check_interval: Duration::from_secs(config.bandwidth.check_interval),
            shutdown_enabled: config.bandwidth.shutdown,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    /// Terminal: the cap was exceeded and the exceeded side effects ran.
    Stop,
}

pub struct BandwidthMonitor<S: ByteSampler, T: ShutdownTrigger> {
    settings: BandwidthSettings,
    sampler: S,
    dispatcher: Dispatcher,
    shutdown: T,
    store: UsageStore,
    record: UsageRecord,
}

impl<S: ByteSampler, T: ShutdownTrigger> std::fmt::Debug for BandwidthMonitor<S, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BandwidthMonitor")
            .field("settings", &self.settings)
            .field("record", &self.record)
            .finish_non_exhaustive()
    }
}

impl<S: ByteSampler, T: ShutdownTrigger> BandwidthMonitor<S, T> {
    /// Validates the configured interfaces (fatal on a miss) and loads the
    /// persisted record before the first tick.
    pub fn new(
        settings: BandwidthSettings,
        mut sampler: S,
        dispatcher: Dispatcher,
        shutdown: T,
        store: UsageStore,
    ) -> Result<Self> {
        sampler.validate(&settings.interfaces)?;
        let record = store.load(Utc::now().month());

        info!(
            "Started | Host: {} | Interfaces: {} | Threshold: {:.2} GB | Alert: {:.0}%",
            settings.hostname,
            settings.interfaces.join(", "),
            settings.cap_gb,
            settings.alarm_ratio * 100.0
        );

        Ok(Self {
            settings,
            sampler,
            dispatcher,
            shutdown,
            store,
            record,
        })
    }

    pub fn record(&self) -> &UsageRecord {
        &self.record
    }

    pub fn run(&mut self) -> Result<()> {
        loop {
            match self.tick() {
                LoopControl::Stop => return Ok(()),
                LoopControl::Continue => std::thread::sleep(self.settings.check_interval),
            }
        }
    }

    fn tick(&mut self) -> LoopControl {
        let total = match self.sampler.total_bytes(&self.settings.interfaces) {
            Ok(total) => total,
            Err(e) => {
                // Policy: one bad sample is a zero-delta tick, never a crash.
                warn!("Sample failed, skipping tick: {e:#}");
                return LoopControl::Continue;
            }
        };
        self.advance(total, Utc::now().month())
    }

    /// Deterministic core of one tick; `run` feeds it live samples and the
    /// current UTC month.
    pub fn advance(&mut self, sampled_total: u64, current_month: u32) -> LoopControl {
        if self.record.tick(sampled_total, current_month) == TickOutcome::Rollover {
            info!("New month detected ({current_month}), resetting statistics");
            self.persist();
            return LoopControl::Continue;
        }

        let used_gb = self.record.used_bytes as f64 / BYTES_PER_GB;
        let usage_percent = if self.settings.cap_gb > 0.0 {
            used_gb / self.settings.cap_gb * 100.0
        } else {
            0.0
        };
        info!(
            "Current usage: {:.2} GB / {:.2} GB ({:.1}%)",
            used_gb, self.settings.cap_gb, usage_percent
        );

        let action = policy::evaluate(
            self.record.used_bytes,
            self.settings.cap_bytes,
            self.settings.alarm_ratio,
            self.record.alert_sent,
        );

        match action {
            AlertAction::None => {
                self.persist();
                LoopControl::Continue
            }
            AlertAction::Warn => {
                info!("Alert threshold reached, sending notification");
                let message = format!(
                    "[Hostwatch Traffic Alert]\n\
                     Host: {}\n\
                     Monthly usage: {used_gb:.2} GB\n\
                     Percentage: {usage_percent:.1}%\n\
                     Threshold: {:.2} GB\n\
                     Warning: Approaching limit!",
                    self.settings.hostname, self.settings.cap_gb
                );
                if !self.dispatcher.dispatch(&message) {
                    warn!("All notification channels failed or disabled");
                }
                // Attempted counts: one warning per month, not one per tick.
                self.record.alert_sent = true;
                self.persist();
                LoopControl::Continue
            }
            AlertAction::ExceededStop => {
                info!("Threshold exceeded, sending final alert");
                // Strict order: persist, then notify, then shut down, so an
                // interrupted shutdown still leaves durable state current.
                self.persist();

                let message = format!(
                    "[Hostwatch Traffic Exceeded]\n\
                     Host: {}\n\
                     Monthly usage: {used_gb:.2} GB\n\
                     Exceeded threshold: {:.2} GB\n\
                     System shutting down now!",
                    self.settings.hostname, self.settings.cap_gb
                );
                if !self.dispatcher.dispatch(&message) {
                    warn!("All notification channels failed or disabled");
                }

                if self.settings.shutdown_enabled {
                    info!("Executing shutdown command...");
                    if let Err(e) = self.shutdown.shutdown() {
                        error!("Shutdown invocation failed: {e:#}");
                    }
                }
                LoopControl::Stop
            }
        }
    }

    fn persist(&self) {
        if let Err(e) = self.store.save(&self.record) {
            error!(
                "Cannot save data to {}: {e:#}",
                self.store.path().display()
            );
        }
    }
}
