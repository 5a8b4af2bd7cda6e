use anyhow::{Context, Result, bail};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const BYTES_PER_GB: f64 = (1u64 << 30) as f64;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub hostname: String,
    pub bandwidth: BandwidthConfig,
    pub disk: DiskConfig,
    pub notify: NotifyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BandwidthConfig {
    pub interfaces: Vec<String>,
    pub bandwidth_max: BandwidthLimit,
    pub data_file: String,
    pub check_interval: u64,
    pub alarm_rate: u8, // percent, 0-100
    pub shutdown: bool,
}

/// `bandwidth_max` accepts either a bare number (gigabytes) or a string
/// with a unit suffix: "500g", "1.5tb".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BandwidthLimit {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiskConfig {
    pub devices: Vec<String>,
    pub check_interval: u64,
    /// Set to "PASSED" to also flag devices whose self-assessment is
    /// missing from the payload, not just explicit failures.
    pub alarm_assessment: String,
    pub alarm_temperature: i64,
    pub alarm_power_on_hours: i64,
    pub alarm_media_errors: i64,
    pub alarm_percentage_used: i64,
    pub alarm_reallocated_sectors: i64,
    pub alarm_pending_sectors: i64,
    pub alarm_uncorrectable_sectors: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub email: EmailConfig,
    pub dingtalk: DingtalkConfig,
    pub wecom: WecomConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub enabled: bool,
    pub cooldown: u64,
    pub smtp_server: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from_addr: String,
    pub to_addrs: Vec<String>,
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DingtalkConfig {
    pub enabled: bool,
    pub cooldown: u64,
    pub access_token: String,
    /// Shared secret for signed requests; empty disables signing.
    pub secret: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WecomConfig {
    pub enabled: bool,
    pub cooldown: u64,
    pub webhook_key: String,
    pub message: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hostname: "unknown-host".to_string(),
            bandwidth: BandwidthConfig::default(),
            disk: DiskConfig::default(),
            notify: NotifyConfig::default(),
        }
    }
}

impl Default for BandwidthConfig {
    fn default() -> Self {
        Self {
            interfaces: vec!["eth0".to_string()],
            bandwidth_max: BandwidthLimit::Number(1000.0),
            data_file: "bandwidth_usage.json".to_string(),
            check_interval: 60,
            alarm_rate: 95,
            shutdown: true,
        }
    }
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self {
            devices: Vec::new(),
            check_interval: 86400,
            alarm_assessment: String::new(),
            alarm_temperature: 70,
            alarm_power_on_hours: 43800,
            alarm_media_errors: 0,
            alarm_percentage_used: 90,
            alarm_reallocated_sectors: 0,
            alarm_pending_sectors: 0,
            alarm_uncorrectable_sectors: 0,
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cooldown: 3600,
            smtp_server: String::new(),
            smtp_port: 587,
            username: String::new(),
            password: String::new(),
            from_addr: String::new(),
            to_addrs: Vec::new(),
            subject: "Hostwatch Alert".to_string(),
            message: "{message}".to_string(),
        }
    }
}

impl Default for DingtalkConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cooldown: 3600,
            access_token: String::new(),
            secret: String::new(),
            message: "{message}".to_string(),
        }
    }
}

impl Default for WecomConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cooldown: 3600,
            webhook_key: String::new(),
            message: "{message}".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// System-wide config first, falling back to the per-user config
    /// when the daemon runs unprivileged.
    pub fn default_path() -> PathBuf {
        let user = dirs::home_dir()
            .map(|home| home.join(".config").join("hostwatch").join("config.toml"));
        pick_config_path(Path::new("/etc/hostwatch/config.toml"), user)
    }

    fn validate(&self) -> Result<()> {
        if self.bandwidth.interfaces.is_empty() {
            bail!("bandwidth.interfaces must name at least one interface");
        }
        if self.bandwidth.alarm_rate > 100 {
            bail!(
                "bandwidth.alarm_rate must be 0-100, got {}",
                self.bandwidth.alarm_rate
            );
        }
        // Fail fast on an unparseable threshold rather than mid-loop.
        parse_bandwidth(&self.bandwidth.bandwidth_max)?;
        Ok(())
    }

    /// Absolute path of the bandwidth state file. Relative paths resolve
    /// against the directory holding the config file.
    pub fn data_file_path(&self, config_path: &Path) -> PathBuf {
        let raw = Path::new(&self.bandwidth.data_file);
        if raw.is_absolute() {
            raw.to_path_buf()
        } else {
            config_path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(raw)
        }
    }
}

/// The system path wins when it exists; otherwise an existing user config
/// is used. Neither existing falls back to the system path, whose read
/// error names the place to put the file.
fn pick_config_path(system: &Path, user: Option<PathBuf>) -> PathBuf {
    if system.exists() {
        return system.to_path_buf();
    }
    match user {
        Some(path) if path.exists() => path,
        _ => system.to_path_buf(),
    }
}

/// Parse a bandwidth threshold into gigabytes.
/// Units: `g`/`gb` are gigabytes (default), `t`/`tb` multiply by 1024.
pub fn parse_bandwidth(limit: &BandwidthLimit) -> Result<f64> {
    let text = match limit {
        BandwidthLimit::Number(n) => return Ok(*n),
        BandwidthLimit::Text(s) => s.trim().to_lowercase(),
    };

    let re = Regex::new(r"^([\d.]+)\s*(gb|tb|g|t)?$").expect("static regex");
    let caps = re
        .captures(&text)
        .with_context(|| format!("Cannot parse bandwidth_max: {text}"))?;

    let number: f64 = caps[1]
        .parse()
        .with_context(|| format!("Cannot parse bandwidth_max number: {text}"))?;

    match caps.get(2).map(|m| m.as_str()) {
        Some("t") | Some("tb") => Ok(number * 1024.0),
        _ => Ok(number),
    }
}

/// Gigabytes to whole bytes, the unit the accounting engine works in.
pub fn gb_to_bytes(gb: f64) -> u64 {
    (gb * BYTES_PER_GB) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bandwidth_units() {
        let gb = parse_bandwidth(&BandwidthLimit::Text("500g".to_string())).unwrap();
        assert_eq!(gb, 500.0);

        let gb = parse_bandwidth(&BandwidthLimit::Text("2TB".to_string())).unwrap();
        assert_eq!(gb, 2048.0);

        let gb = parse_bandwidth(&BandwidthLimit::Text("1.5 tb".to_string())).unwrap();
        assert_eq!(gb, 1536.0);

        let gb = parse_bandwidth(&BandwidthLimit::Number(1000.0)).unwrap();
        assert_eq!(gb, 1000.0);
    }

    #[test]
    fn test_parse_bandwidth_rejects_garbage() {
        assert!(parse_bandwidth(&BandwidthLimit::Text("lots".to_string())).is_err());
        assert!(parse_bandwidth(&BandwidthLimit::Text("12mb".to_string())).is_err());
    }

    #[test]
    fn test_config_parses_minimal_document() {
        let doc = r#"
            hostname = "box-1"

            [bandwidth]
            interfaces = ["eth0", "eth1"]
            bandwidth_max = "1t"
            alarm_rate = 90

            [notify.wecom]
            enabled = true
            webhook_key = "abc"
        "#;
        let config: Config = toml::from_str(doc).unwrap();
        assert_eq!(config.hostname, "box-1");
        assert_eq!(config.bandwidth.interfaces.len(), 2);
        assert_eq!(config.bandwidth.alarm_rate, 90);
        assert!(config.notify.wecom.enabled);
        assert!(!config.notify.email.enabled);
        assert_eq!(config.notify.email.cooldown, 3600);

        let gb = parse_bandwidth(&config.bandwidth.bandwidth_max).unwrap();
        assert_eq!(gb, 1024.0);
    }

    #[test]
    fn test_validation_rejects_bad_alarm_rate() {
        let mut config = Config::default();
        config.bandwidth.alarm_rate = 120;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_data_file_resolves_against_config_dir() {
        let config = Config::default();
        let path = config.data_file_path(Path::new("/etc/hostwatch/config.toml"));
        assert_eq!(path, PathBuf::from("/etc/hostwatch/bandwidth_usage.json"));
    }

    #[test]
    fn test_config_path_prefers_system_then_user() {
        let dir = tempfile::tempdir().unwrap();
        let system = dir.path().join("etc-config.toml");
        let user = dir.path().join("user-config.toml");

        // Nothing exists: point at the system path anyway.
        assert_eq!(pick_config_path(&system, Some(user.clone())), system);

        fs::write(&user, "").unwrap();
        assert_eq!(pick_config_path(&system, Some(user.clone())), user);

        fs::write(&system, "").unwrap();
        assert_eq!(pick_config_path(&system, Some(user)), system);
    }

    #[test]
    fn test_gb_to_bytes() {
        assert_eq!(gb_to_bytes(1.0), 1024 * 1024 * 1024);
        assert_eq!(gb_to_bytes(100.0), 100 * 1024 * 1024 * 1024);
    }
}
