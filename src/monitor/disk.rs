//! Disk SMART health monitor.
//!
//! Polls smartctl's JSON output per configured device and pushes one
//! aggregated plain-text report through the shared dispatcher when any
//! device looks unhealthy. Protocol-specific attribute extraction lives on
//! the `Protocol` enum: a new device protocol is a new variant plus one
//! match arm, not a wider conditional.

use crate::config::DiskConfig;
use crate::notify::Dispatcher;
use anyhow::{Context, Result, bail};
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::process::Command;
use std::time::Duration;
use tracing::{info, warn};

/// Source of raw health payloads, injected so tests feed canned JSON.
pub trait HealthSource {
    fn fetch(&self, device: &str) -> Result<Value>;
}

/// Production source: `smartctl -a -j /dev/<device>`.
pub struct SmartctlSource;

impl HealthSource for SmartctlSource {
    fn fetch(&self, device: &str) -> Result<Value> {
        let output = Command::new("smartctl")
            .args(["-a", "-j", &format!("/dev/{device}")])
            .output()
            .with_context(|| format!("Failed to execute smartctl for /dev/{device}"))?;

        // smartctl exits non-zero for permission problems but also for
        // devices it merely has complaints about; only an empty stdout
        // means nothing usable came back.
        if !output.status.success() && output.stdout.is_empty() {
            bail!(
                "smartctl failed for /dev/{device} (exit {})",
                output.status
            );
        }

        serde_json::from_slice(&output.stdout)
            .with_context(|| format!("Malformed smartctl output for /dev/{device}"))
    }
}

/// Health figures every protocol reduces to.
#[derive(Debug, Default, PartialEq)]
pub struct HealthSummary {
    pub issues: Vec<String>,
    pub temperature_c: i64,
    pub power_on_hours: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Nvme,
    Ata,
}

impl Protocol {
    pub fn from_payload(payload: &Value) -> Self {
        let protocol = payload["device"]["protocol"].as_str().unwrap_or("");
        if protocol.eq_ignore_ascii_case("nvme") {
            Protocol::Nvme
        } else {
            Protocol::Ata
        }
    }

    /// Extract protocol-specific issues, temperature and power-on hours.
    pub fn extract(self, payload: &Value, config: &DiskConfig) -> HealthSummary {
        match self {
            Protocol::Nvme => extract_nvme(payload, config),
            Protocol::Ata => extract_ata(payload, config),
        }
    }
}

fn extract_nvme(payload: &Value, config: &DiskConfig) -> HealthSummary {
    let log = &payload["nvme_smart_health_information_log"];
    let mut issues = Vec::new();

    let media_errors = log["media_errors"].as_i64().unwrap_or(0);
    if media_errors > config.alarm_media_errors {
        issues.push(format!(
            "Media Errors: {media_errors} (Limit: {})",
            config.alarm_media_errors
        ));
    }

    let percentage_used = log["percentage_used"].as_i64().unwrap_or(0);
    if percentage_used > config.alarm_percentage_used {
        issues.push(format!(
            "Percentage Used: {percentage_used}% (Limit: {}%)",
            config.alarm_percentage_used
        ));
    }

    HealthSummary {
        issues,
        temperature_c: log["temperature"].as_i64().unwrap_or(0),
        power_on_hours: log["power_on_hours"].as_i64().unwrap_or(0),
    }
}

fn extract_ata(payload: &Value, config: &DiskConfig) -> HealthSummary {
    // Attribute table keyed by SMART id: 5 reallocated, 197 pending,
    // 198 uncorrectable, 194 temperature, 9 power-on hours.
    let mut attrs: HashMap<i64, i64> = HashMap::new();
    if let Some(table) = payload["ata_smart_attributes"]["table"].as_array() {
        for attr in table {
            if let Some(id) = attr["id"].as_i64() {
                attrs.insert(id, attr["raw"]["value"].as_i64().unwrap_or(0));
            }
        }
    }

    let mut issues = Vec::new();
    let reallocated = attrs.get(&5).copied().unwrap_or(0);
    if reallocated > config.alarm_reallocated_sectors {
        issues.push(format!("Reallocated Sectors: {reallocated}"));
    }
    let pending = attrs.get(&197).copied().unwrap_or(0);
    if pending > config.alarm_pending_sectors {
        issues.push(format!("Pending Sectors: {pending}"));
    }
    let uncorrectable = attrs.get(&198).copied().unwrap_or(0);
    if uncorrectable > config.alarm_uncorrectable_sectors {
        issues.push(format!("Uncorrectable Sectors: {uncorrectable}"));
    }

    let temperature_c = payload["temperature"]["current"]
        .as_i64()
        .unwrap_or_else(|| attrs.get(&194).copied().unwrap_or(0));

    HealthSummary {
        issues,
        temperature_c,
        power_on_hours: attrs.get(&9).copied().unwrap_or(0),
    }
}

/// Full health check of one device payload. Returns a report block when
/// the device has issues, None when healthy.
pub fn evaluate_payload(device: &str, payload: &Value, config: &DiskConfig) -> Option<String> {
    let protocol = Protocol::from_payload(payload);
    let mut summary = protocol.extract(payload, config);

    // Checks shared by every protocol. A missing self-assessment (common
    // on permission-limited reads) counts as a failure only when the
    // config demands a PASSED verdict.
    let assessment = payload["smart_status"]["passed"].as_bool();
    if assessment == Some(false) || (assessment.is_none() && config.alarm_assessment == "PASSED") {
        summary
            .issues
            .insert(0, "SMART Health Assessment: FAILED".to_string());
    }
    if summary.temperature_c > config.alarm_temperature {
        summary.issues.push(format!(
            "Temperature high: {}C (Limit: {}C)",
            summary.temperature_c, config.alarm_temperature
        ));
    }
    if summary.power_on_hours > config.alarm_power_on_hours {
        summary
            .issues
            .push(format!("Power-on hours: {} hrs", summary.power_on_hours));
    }

    if summary.issues.is_empty() {
        return None;
    }

    let model = payload["model_name"].as_str().unwrap_or("Unknown");
    let serial = payload["serial_number"].as_str().unwrap_or("Unknown");
    let protocol_name = match protocol {
        Protocol::Nvme => "NVME",
        Protocol::Ata => "ATA",
    };
    let issue_lines: Vec<String> = summary
        .issues
        .iter()
        .map(|issue| format!("  - {issue}"))
        .collect();
    Some(format!(
        "ALERT Device: /dev/{device} ({protocol_name})\n\
         Model: {model}\n\
         S/N: {serial}\n\
         Issues:\n{}",
        issue_lines.join("\n")
    ))
}

pub struct DiskMonitor<H: HealthSource> {
    hostname: String,
    config: DiskConfig,
    source: H,
    dispatcher: Dispatcher,
}

impl<H: HealthSource> DiskMonitor<H> {
    pub fn new(hostname: String, config: DiskConfig, source: H, dispatcher: Dispatcher) -> Self {
        Self {
            hostname,
            config,
            source,
            dispatcher,
        }
    }

    pub fn run(&mut self) -> ! {
        info!(
            "Disk watchdog started. Monitoring: {}",
            self.config.devices.join(", ")
        );
        loop {
            self.scan_once();
            std::thread::sleep(Duration::from_secs(self.config.check_interval));
        }
    }

    /// One polling pass over every configured device.
    pub fn scan_once(&mut self) {
        let mut reports = Vec::new();

        for device in &self.config.devices {
            match self.source.fetch(device) {
                Ok(payload) => match evaluate_payload(device, &payload, &self.config) {
                    Some(report) => reports.push(report),
                    None => info!("Device /dev/{device} is healthy"),
                },
                Err(e) => {
                    warn!("Health fetch failed for /dev/{device}: {e:#}");
                    reports.push(format!(
                        "[!] Device: /dev/{device}\nStatus: FAILED to fetch SMART data"
                    ));
                }
            }
        }

        if reports.is_empty() {
            return;
        }

        let now = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        let message = format!(
            "[Hostwatch Disk Health Alert]\n\
             Host: {}\n\
             Time: {now}\n\
             ------------------------------------\n\n{}",
            self.hostname,
            reports.join("\n\n------------------------------------\n\n")
        );
        info!("Detected issues, sending aggregated report");
        if !self.dispatcher.dispatch(&message) {
            warn!("All notification channels failed or disabled");
        }
    }
}
