use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::MedminderError;

pub const CONFIG_FILE: &str = "config.toml";
pub const ENV_PREFIX: &str = "MEDMINDER_";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub basic: BasicConfig,
    pub scheduler: SchedulerConfig,
    pub sms: SmsConfig,
    pub email: EmailConfig,
}

impl Config {
    /// Defaults, then `config.toml`, then `MEDMINDER_<SECTION>__<KEY>` env vars.
    /// The loaded config must also pass [`validate`](Self::validate).
    pub fn load() -> Result<Self, MedminderError> {
        let cfg: Self = Self::figment().extract()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Settings with no usable default.
    pub fn validate(&self) -> Result<(), MedminderError> {
        if self.basic.admin_key.trim().is_empty() {
            return Err(figment::Error::from(
                "basic.admin_key must be set (MEDMINDER_BASIC__ADMIN_KEY)".to_string(),
            )
            .into());
        }
        Ok(())
    }

    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicConfig {
    pub database_url: String,
    pub listen_addr: String,
    pub loglevel: String,
    pub admin_key: String,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:medminder.db".to_string(),
            listen_addr: "0.0.0.0:8000".to_string(),
            loglevel: "info".to_string(),
            admin_key: String::new(),
        }
    }
}

/// How the ledger key of a reminder is derived, and whether the clock gates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    /// Every medication is due on every tick; keyed by its `HH:MM` alone.
    #[default]
    Once,
    /// Due once the local clock passes `HH:MM`; keyed by date and time.
    Daily,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub tick_interval_secs: u64,
    pub send_timeout_secs: u64,
    pub autostart: bool,
    pub recurrence: Recurrence,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 60,
            send_timeout_secs: 15,
            autostart: true,
            recurrence: Recurrence::Once,
        }
    }
}

impl SchedulerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs.max(1))
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmsConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    pub api_base: url::Url,
    /// Outbound messages per second allowed by the gateway account.
    pub per_second: u32,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            account_sid: String::new(),
            auth_token: String::new(),
            from_number: String::new(),
            api_base: url::Url::parse("https://api.twilio.com").expect("static url"),
            per_second: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub address: String,
    pub password: String,
    pub display_name: Option<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            address: String::new(),
            password: String::new(),
            display_name: None,
        }
    }
}
