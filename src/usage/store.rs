//! Durable storage for the usage record.
//!
//! One JSON file per monitored target. Loads never fail the process: a
//! missing or corrupt file yields a fresh zero record for the current
//! month. Saves go through a temp file and rename so a crash mid-write
//! cannot leave a truncated record behind.

use crate::config::BYTES_PER_GB;
use crate::usage::record::UsageRecord;
use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub struct UsageStore {
    path: PathBuf,
}

impl UsageStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the record, upgrading legacy files and recovering from
    /// corruption with a fresh zero record.
    pub fn load(&self, current_month: u32) -> UsageRecord {
        if !self.path.exists() {
            return UsageRecord::new(current_month);
        }
        match self.try_load(current_month) {
            Ok(record) => record,
            Err(e) => {
                warn!(
                    "Data file {} corrupted or unreadable ({e:#}), reinitializing",
                    self.path.display()
                );
                UsageRecord::new(current_month)
            }
        }
    }

    fn try_load(&self, current_month: u32) -> Result<UsageRecord> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let mut value: Value = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", self.path.display()))?;
        migrate_legacy(&mut value, current_month);
        let record = serde_json::from_value(value)
            .with_context(|| format!("Unexpected record shape in {}", self.path.display()))?;
        Ok(record)
    }

    /// Atomic write: temp file in the same directory, then rename.
    pub fn save(&self, record: &UsageRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data directory: {}", parent.display()))?;
        }

        let mut contents = serde_json::to_string_pretty(record)?;
        contents.push('\n');

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, contents)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

/// Upgrade a pre-byte-precision record in place: `used_gb` (fractional
/// gigabytes) becomes a rounded `used_bytes` and the legacy key is dropped.
/// Legacy files may carry nothing but `used_gb`, so any field they omit is
/// filled in here rather than taken as corruption. The month fills from the
/// current one, not zero, or the first tick would roll over and wipe the
/// migrated bytes.
fn migrate_legacy(value: &mut Value, current_month: u32) {
    let Some(object) = value.as_object_mut() else {
        return;
    };
    if object.contains_key("used_bytes") {
        object.remove("used_gb");
    } else if let Some(used_gb) = object.remove("used_gb").and_then(|v| v.as_f64()) {
        let used_bytes = (used_gb * BYTES_PER_GB).round() as u64;
        object.insert("used_bytes".to_string(), Value::from(used_bytes));
    } else {
        return;
    }

    object
        .entry("month")
        .or_insert_with(|| Value::from(current_month));
    object
        .entry("last_total_bytes")
        .or_insert(Value::Null);
    object
        .entry("alert_sent")
        .or_insert(Value::Bool(false));
}
