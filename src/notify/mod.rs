//! Multi-channel alert dispatch.
//!
//! A `Dispatcher` owns every configured channel together with its cooldown
//! state. Channels fail independently: a dead SMTP server or a bad webhook
//! token is logged and counted as that channel's failure, never an error
//! the monitoring loop sees.

pub mod dingtalk;
pub mod email;
pub mod wecom;

use crate::config::NotifyConfig;
use anyhow::Result;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// One outbound notification transport (SMTP submission, webhook post).
pub trait Transport {
    fn name(&self) -> &'static str;
    fn send(&self, message: &str) -> Result<()>;
}

struct Channel {
    transport: Box<dyn Transport>,
    cooldown: Duration,
    /// Monotonic send time; deliberately not persisted, so cooldowns
    /// reset on process restart.
    last_sent: Option<Instant>,
}

impl Channel {
    fn ready(&self, now: Instant) -> bool {
        match self.last_sent {
            Some(last) => now.duration_since(last) >= self.cooldown,
            None => true,
        }
    }
}

#[derive(Default)]
pub struct Dispatcher {
    channels: Vec<Channel>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a dispatcher holding every channel enabled in the config.
    pub fn from_config(notify: &NotifyConfig) -> Result<Self> {
        let mut dispatcher = Self::new();
        if notify.email.enabled {
            dispatcher.register(
                Box::new(email::EmailChannel::new(notify.email.clone())),
                Duration::from_secs(notify.email.cooldown),
            );
        }
        if notify.dingtalk.enabled {
            dispatcher.register(
                Box::new(dingtalk::DingtalkChannel::new(notify.dingtalk.clone())?),
                Duration::from_secs(notify.dingtalk.cooldown),
            );
        }
        if notify.wecom.enabled {
            dispatcher.register(
                Box::new(wecom::WecomChannel::new(notify.wecom.clone())?),
                Duration::from_secs(notify.wecom.cooldown),
            );
        }
        Ok(dispatcher)
    }

    pub fn register(&mut self, transport: Box<dyn Transport>, cooldown: Duration) {
        self.channels.push(Channel {
            transport,
            cooldown,
            last_sent: None,
        });
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Try every channel. Returns true iff at least one send succeeded.
    /// A channel inside its cooldown window is skipped without error and
    /// does not count as a failure or a success.
    pub fn dispatch(&mut self, message: &str) -> bool {
        let mut any_success = false;

        for channel in &mut self.channels {
            let now = Instant::now();
            if !channel.ready(now) {
                debug!("{} channel in cooldown, skipping", channel.transport.name());
                continue;
            }

            match channel.transport.send(message) {
                Ok(()) => {
                    info!("{} notification sent", channel.transport.name());
                    channel.last_sent = Some(Instant::now());
                    any_success = true;
                }
                Err(e) => {
                    warn!("{} notification failed: {e:#}", channel.transport.name());
                }
            }
        }

        any_success
    }
}

/// Channel message templates hold a single `{message}` substitution point.
pub(crate) fn render_template(template: &str, message: &str) -> String {
    if template.is_empty() {
        message.to_string()
    } else {
        template.replace("{message}", message)
    }
}
