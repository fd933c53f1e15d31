//! Outgoing email. Handlers never send directly; they hand a template name
//! and its data to [`crate::background::Background`], which calls a [`Mailer`].

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

pub mod smtp;
pub mod templates;

pub use smtp::SmtpMailer;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, recipient: &str, template: &str, data: Value) -> anyhow::Result<()>;
}

/// Renders messages and writes them to the log instead of delivering them.
/// Picked when no SMTP host is configured.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, recipient: &str, template: &str, data: Value) -> anyhow::Result<()> {
        // The body holds a plaintext token; only the envelope is logged.
        let rendered = templates::render(template, &data)?;
        info!(
            %recipient,
            template,
            subject = %rendered.subject,
            "email not delivered, no smtp configured"
        );
        Ok(())
    }
}

#[cfg(test)]
pub use recording::{RecordingMailer, SentMail};
