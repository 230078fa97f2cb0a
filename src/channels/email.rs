use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message as LettreMessage, Tokio1Executor,
    message::Mailbox, message::header::ContentType,
    transport::smtp::authentication::Credentials,
};
use tracing::debug;

use super::EmailGateway;
use crate::config::EmailConfig;
use crate::error::MedminderError;

/// Plain-text mail over an authenticated STARTTLS relay.
pub struct SmtpEmailGateway {
    from: String,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpEmailGateway {
    pub fn new(cfg: &EmailConfig) -> Result<Self, MedminderError> {
        let from_name = cfg.display_name.as_deref().unwrap_or("Medication Reminder");
        let from = format!("{from_name} <{}>", cfg.address);

        let creds = Credentials::new(cfg.address.clone(), cfg.password.clone());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.smtp_host)
            .map_err(|e| MedminderError::Email(format!("SMTP relay: {e}")))?
            .port(cfg.smtp_port)
            .credentials(creds)
            .build();

        Ok(Self { from, mailer })
    }
}

#[async_trait]
impl EmailGateway for SmtpEmailGateway {
    async fn send(&self, to_email: &str, subject: &str, body: &str) -> Result<(), MedminderError> {
        let from: Mailbox = self
            .from
            .parse()
            .map_err(|e| MedminderError::Email(format!("invalid from address: {e}")))?;
        let to: Mailbox = to_email
            .parse()
            .map_err(|e| MedminderError::Email(format!("invalid recipient: {e}")))?;

        let message = LettreMessage::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| MedminderError::Email(format!("build email: {e}")))?;

        self.mailer
            .send(message)
            .await
            .map_err(|e| MedminderError::Email(format!("SMTP send: {e}")))?;

        debug!(to = %to_email, "email accepted by relay");
        Ok(())
    }
}
