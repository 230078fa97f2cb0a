//! Outbound delivery channels.
//!
//! The engine only sees the two traits; `sms` and `email` hold the production
//! adapters (Twilio REST and SMTP).

pub mod email;
pub mod sms;

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

use crate::error::MedminderError;

pub use email::SmtpEmailGateway;
pub use sms::TwilioSmsGateway;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Sms,
    Email,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelKind::Sms => f.write_str("sms"),
            ChannelKind::Email => f.write_str("email"),
        }
    }
}

#[async_trait]
pub trait SmsGateway: Send + Sync {
    async fn send(&self, to_phone: &str, body: &str) -> Result<(), MedminderError>;
}

#[async_trait]
pub trait EmailGateway: Send + Sync {
    async fn send(&self, to_email: &str, subject: &str, body: &str) -> Result<(), MedminderError>;
}
