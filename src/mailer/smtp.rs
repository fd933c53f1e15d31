use std::time::Duration;

use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde_json::Value;
use tracing::{info, instrument, warn};

use super::{templates, Mailer};
use crate::config::SmtpConfig;

const SEND_TIMEOUT: Duration = Duration::from_secs(10);
const RETRY_DELAY: Duration = Duration::from_millis(500);

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
    retries: u32,
}

impl SmtpMailer {
    pub fn new(cfg: &SmtpConfig) -> anyhow::Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.host)?
            .port(cfg.port)
            .credentials(Credentials::new(cfg.username.clone(), cfg.password.clone()))
            .timeout(Some(SEND_TIMEOUT))
            .build();
        Ok(Self {
            transport,
            sender: cfg.sender.parse()?,
            retries: cfg.retries.max(1),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    #[instrument(skip(self, data))]
    async fn send(&self, recipient: &str, template: &str, data: Value) -> anyhow::Result<()> {
        let rendered = templates::render(template, &data)?;
        let message = Message::builder()
            .from(self.sender.clone())
            .to(recipient.parse()?)
            .subject(rendered.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(rendered.plain_body)?;

        let mut attempt = 1;
        loop {
            match self.transport.send(message.clone()).await {
                Ok(_) => {
                    info!(attempt, "email sent");
                    return Ok(());
                }
                Err(e) if attempt < self.retries => {
                    warn!(attempt, error = %e, "email send failed, retrying");
                    tokio::time::sleep(RETRY_DELAY).await;
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
