//! SMTP channel: TLS-upgraded submission with credential auth.

use crate::config::EmailConfig;
use crate::notify::render_template;
use anyhow::{Context, Result};
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport as _};
use std::time::Duration;

const SMTP_TIMEOUT: Duration = Duration::from_secs(10);

pub struct EmailChannel {
    config: EmailConfig,
}

impl EmailChannel {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }
}

impl crate::notify::Transport for EmailChannel {
    fn name(&self) -> &'static str {
        "email"
    }

    fn send(&self, message: &str) -> Result<()> {
        let content = render_template(&self.config.message, message);

        let from: Mailbox = self
            .config
            .from_addr
            .parse()
            .with_context(|| format!("Invalid from_addr: {}", self.config.from_addr))?;

        let mut builder = Message::builder()
            .from(from)
            .subject(self.config.subject.clone());
        for addr in &self.config.to_addrs {
            let to: Mailbox = addr
                .parse()
                .with_context(|| format!("Invalid to_addr: {addr}"))?;
            builder = builder.to(to);
        }

        let email = builder.body(content).context("Failed to build message")?;

        let mailer = SmtpTransport::starttls_relay(&self.config.smtp_server)
            .with_context(|| format!("Invalid SMTP server: {}", self.config.smtp_server))?
            .port(self.config.smtp_port)
            .credentials(Credentials::new(
                self.config.username.clone(),
                self.config.password.clone(),
            ))
            .timeout(Some(SMTP_TIMEOUT))
            .build();

        mailer.send(&email).context("SMTP submission failed")?;
        Ok(())
    }
}
