//! Enterprise WeChat group-robot channel (key-based webhook).

use crate::config::WecomConfig;
use crate::notify::render_template;
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::time::Duration;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

pub struct WecomChannel {
    config: WecomConfig,
    client: reqwest::blocking::Client,
}

#[derive(Debug, Deserialize)]
struct BotResponse {
    #[serde(default)]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

impl WecomChannel {
    pub fn new(config: WecomConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { config, client })
    }
}

impl crate::notify::Transport for WecomChannel {
    fn name(&self) -> &'static str {
        "wecom"
    }

    fn send(&self, message: &str) -> Result<()> {
        if self.config.webhook_key.is_empty() {
            bail!("wecom webhook_key not configured");
        }

        let url = format!(
            "https://qyapi.weixin.qq.com/cgi-bin/webhook/send?key={}",
            self.config.webhook_key
        );
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
            .context("WeCom request failed")?
            .json()
            .context("WeCom returned a malformed response")?;

        if response.errcode != 0 {
            bail!("WeCom rejected the message: {}", response.errmsg);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Transport;

    #[test]
    fn test_missing_key_is_a_send_error() {
        let channel = WecomChannel::new(WecomConfig::default()).unwrap();
        let err = channel.send("hello").unwrap_err();
        assert!(err.to_string().contains("webhook_key"));
    }
}
