use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::SmsGateway;
use crate::config::SmsConfig;
use crate::error::MedminderError;

/// Twilio Programmable Messaging over its REST API.
pub struct TwilioSmsGateway {
    client: reqwest::Client,
    messages_url: url::Url,
    account_sid: String,
    auth_token: String,
    from_number: String,
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl TwilioSmsGateway {
    pub fn new(cfg: &SmsConfig) -> Result<Self, MedminderError> {
        let client = reqwest::Client::builder()
            .user_agent("medminder/0.1")
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            .build()?;
        Self::with_client(cfg, client)
    }

    pub fn with_client(cfg: &SmsConfig, client: reqwest::Client) -> Result<Self, MedminderError> {
        let messages_url = messages_url(&cfg.api_base, &cfg.account_sid)?;
        let per_second = NonZeroU32::new(cfg.per_second).unwrap_or(NonZeroU32::MIN);
        let limiter = Arc::new(RateLimiter::direct(Quota::per_second(per_second)));

        Ok(Self {
            client,
            messages_url,
            account_sid: cfg.account_sid.clone(),
            auth_token: cfg.auth_token.clone(),
            from_number: cfg.from_number.clone(),
            limiter,
        })
    }
}

fn messages_url(base: &url::Url, account_sid: &str) -> Result<url::Url, url::ParseError> {
    base.join(&format!("/2010-04-01/Accounts/{account_sid}/Messages.json"))
}

#[async_trait]
impl SmsGateway for TwilioSmsGateway {
    async fn send(&self, to_phone: &str, body: &str) -> Result<(), MedminderError> {
        self.limiter.until_ready().await;

        let resp = self
            .client
            .post(self.messages_url.clone())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[
                ("To", to_phone),
                ("From", self.from_number.as_str()),
                ("Body", body),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(MedminderError::Sms { status, body });
        }
        debug!(to = %to_phone, "SMS accepted by gateway");
        Ok(())
    }
}
