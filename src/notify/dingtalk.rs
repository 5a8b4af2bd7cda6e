//! DingTalk group-robot channel.
//!
//! When a shared secret is configured the webhook URL carries a
//! `timestamp`/`sign` pair: the signature is HMAC-SHA256 over
//! `"{timestamp}\n{secret}"` keyed with the secret, base64-encoded and
//! URL-escaped. Without a secret the request goes out unsigned.

use crate::config::DingtalkConfig;
use crate::notify::render_template;
use anyhow::{Context, Result, bail};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::time::Duration;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

pub struct DingtalkChannel {
    config: DingtalkConfig,
    client: reqwest::blocking::Client,
}

#[derive(Debug, Deserialize)]
struct BotResponse {
    #[serde(default)]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

impl DingtalkChannel {
    pub fn new(config: DingtalkConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { config, client })
    }

    fn webhook_url(&self, timestamp_ms: i64) -> Result<String> {
        let mut url = format!(
            "https://oapi.dingtalk.com/robot/send?access_token={}",
            self.config.access_token
        );
        if !self.config.secret.is_empty() {
            let sign = sign_request(&self.config.secret, timestamp_ms)?;
            url.push_str(&format!("&timestamp={timestamp_ms}&sign={sign}"));
        }
        Ok(url)
    }
}

impl crate::notify::Transport for DingtalkChannel {
    fn name(&self) -> &'static str {
        "dingtalk"
    }

    fn send(&self, message: &str) -> Result<()> {
        let url = self.webhook_url(chrono::Utc::now().timestamp_millis())?;
        let content = render_template(&self.config.message, message);
        let payload = serde_json::json!({
            "msgtype": "text",
            "text": { "content": content },
        });

        let response: BotResponse = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .context("DingTalk request failed")?
            .json()
            .context("DingTalk returned a malformed response")?;

        if response.errcode != 0 {
            bail!("DingTalk rejected the message: {}", response.errmsg);
        }
        Ok(())
    }
}

/// URL-escaped base64 HMAC-SHA256 over `"{timestamp}\n{secret}"`.
fn sign_request(secret: &str, timestamp_ms: i64) -> Result<String> {
    let string_to_sign = format!("{timestamp_ms}\n{secret}");
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .context("Invalid HMAC key")?;
    mac.update(string_to_sign.as_bytes());
    let encoded = BASE64.encode(mac.finalize().into_bytes());
    Ok(urlencoding::encode(&encoded).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_is_deterministic() {
        let a = sign_request("SECabc123", 1_700_000_000_000).unwrap();
        let b = sign_request("SECabc123", 1_700_000_000_000).unwrap();
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn test_signature_varies_with_timestamp_and_secret() {
        let base = sign_request("SECabc123", 1_700_000_000_000).unwrap();
        assert_ne!(base, sign_request("SECabc123", 1_700_000_000_001).unwrap());
        assert_ne!(base, sign_request("SECother", 1_700_000_000_000).unwrap());
    }

    #[test]
    fn test_signature_is_url_safe() {
        // base64 output can contain '+', '/' and '='; the escaped form
        // must not carry them raw.
        for ts in [0i64, 1_700_000_000_000, i64::MAX / 2] {
            let sign = sign_request("SECabc123", ts).unwrap();
            assert!(!sign.contains('+'), "raw '+' in {sign}");
            assert!(!sign.contains('/'), "raw '/' in {sign}");
            assert!(!sign.contains('='), "raw '=' in {sign}");
        }
    }

    #[test]
    fn test_url_unsigned_without_secret() {
        let channel = DingtalkChannel::new(DingtalkConfig {
            enabled: true,
            access_token: "tok".to_string(),
            ..Default::default()
        })
        .unwrap();
        let url = channel.webhook_url(1_700_000_000_000).unwrap();
        assert_eq!(
            url,
            "https://oapi.dingtalk.com/robot/send?access_token=tok"
        );
    }

    #[test]
    fn test_url_signed_with_secret() {
        let channel = DingtalkChannel::new(DingtalkConfig {
            enabled: true,
            access_token: "tok".to_string(),
            secret: "SECabc123".to_string(),
            ..Default::default()
        })
        .unwrap();
        let url = channel.webhook_url(1_700_000_000_000).unwrap();
        assert!(url.contains("&timestamp=1700000000000&sign="));
    }
}
