//! Configuration management
//!
//! Settings live in `settings.json` inside the qrpay directory:
//! ```json
//! {
//!   "gateway": { "baseUrl": "...", "username": "...", "password": "...",
//!                "aesKey": "...", "account": "...", "timeoutSecs": 30 },
//!   "defaults": { "currency": "BOB", "branchCode": "E0001", "dueInDays": 30,
//!                 "singleUse": true, "modifyAmount": false },
//!   "reauthPolicy": "never",
//!   "outputDir": "/path/to/results"
//! }
//! ```
//!
//! Gateway fields and the reauth policy can be overridden with `QRPAY_*`
//! environment variables. Keys this module does not know are preserved on save.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::adapters::http_gateway::DEFAULT_TIMEOUT_SECS;
use crate::domain::qr::{DEFAULT_BRANCH_CODE, DEFAULT_DUE_IN_DAYS};
use crate::domain::result::{Error, Result as DomainResult};
use crate::domain::{ClientIdentity, Currency, QrOptions, ReauthPolicy};

/// Settings file name inside the qrpay directory
pub const SETTINGS_FILENAME: &str = "settings.json";

pub const ENV_BASE_URL: &str = "QRPAY_BASE_URL";
pub const ENV_USERNAME: &str = "QRPAY_USERNAME";
pub const ENV_PASSWORD: &str = "QRPAY_PASSWORD";
pub const ENV_AES_KEY: &str = "QRPAY_AES_KEY";
pub const ENV_ACCOUNT: &str = "QRPAY_ACCOUNT";
pub const ENV_REAUTH_POLICY: &str = "QRPAY_REAUTH_POLICY";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    gateway: GatewaySettings,
    #[serde(default)]
    defaults: IssuanceDefaults,
    #[serde(default)]
    reauth_policy: ReauthPolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    output_dir: Option<PathBuf>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Gateway connection and merchant credentials
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewaySettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aes_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// Business defaults applied when a caller leaves options unset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IssuanceDefaults {
    pub currency: Currency,
    pub branch_code: String,
    pub due_in_days: i64,
    pub single_use: bool,
    pub modify_amount: bool,
}

impl Default for IssuanceDefaults {
    fn default() -> Self {
        Self {
            currency: Currency::Bob,
            branch_code: DEFAULT_BRANCH_CODE.to_string(),
            due_in_days: DEFAULT_DUE_IN_DAYS,
            single_use: true,
            modify_amount: false,
        }
    }
}

impl IssuanceDefaults {
    /// Options with these defaults and no explicit due date
    pub fn options(&self) -> QrOptions {
        QrOptions {
            currency: self.currency,
            due_date: None,
            single_use: self.single_use,
            modify_amount: self.modify_amount,
            branch_code: self.branch_code.clone(),
        }
    }
}

/// qrpay configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub gateway: GatewaySettings,
    pub defaults: IssuanceDefaults,
    pub reauth_policy: ReauthPolicy,
    pub output_dir: PathBuf,
    // Raw settings, kept so unknown keys survive a save
    raw_settings: SettingsFile,
}

impl Config {
    /// Load config from the qrpay directory, applying environment overrides
    pub fn load(qrpay_dir: &Path) -> Result<Self> {
        Self::load_with_env(qrpay_dir, |key| std::env::var(key).ok())
    }

    /// Load config using a custom environment lookup
    pub fn load_with_env<F>(qrpay_dir: &Path, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let settings_path = qrpay_dir.join(SETTINGS_FILENAME);

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)
                .with_context(|| format!("Failed to read {:?}", settings_path))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid settings file {:?}", settings_path))?
        } else {
            SettingsFile::default()
        };

        let mut gateway = raw.gateway.clone();
        let overrides = [
            (ENV_BASE_URL, &mut gateway.base_url),
            (ENV_USERNAME, &mut gateway.username),
            (ENV_PASSWORD, &mut gateway.password),
            (ENV_AES_KEY, &mut gateway.aes_key),
            (ENV_ACCOUNT, &mut gateway.account),
        ];
        for (key, slot) in overrides {
            if let Some(value) = env(key).filter(|v| !v.is_empty()) {
                *slot = Some(value);
            }
        }

        let reauth_policy = match env(ENV_REAUTH_POLICY).filter(|v| !v.is_empty()) {
            Some(value) => value.parse::<ReauthPolicy>()?,
            None => raw.reauth_policy,
        };

        let output_dir = raw
            .output_dir
            .clone()
            .unwrap_or_else(|| qrpay_dir.join("results"));

        Ok(Self {
            gateway,
            defaults: raw.defaults.clone(),
            reauth_policy,
            output_dir,
            raw_settings: raw,
        })
    }

    /// Save config to the qrpay directory
    ///
    /// Writes the current values over whatever is on disk, keeping keys this
    /// module does not manage.
    pub fn save(&self, qrpay_dir: &Path) -> Result<()> {
        let settings_path = qrpay_dir.join(SETTINGS_FILENAME);

        let mut settings = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str::<SettingsFile>(&content).unwrap_or_else(|_| self.raw_settings.clone())
        } else {
            self.raw_settings.clone()
        };

        settings.gateway = self.gateway.clone();
        settings.defaults = self.defaults.clone();
        settings.reauth_policy = self.reauth_policy;
        settings.output_dir = Some(self.output_dir.clone());

        std::fs::create_dir_all(qrpay_dir)?;
        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }

    /// Request timeout for the gateway client
    pub fn timeout_secs(&self) -> u64 {
        self.gateway.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)
    }

    /// Build the merchant identity, naming the first missing field
    pub fn identity(&self) -> DomainResult<ClientIdentity> {
        let required = |value: &Option<String>, name: &str| -> DomainResult<String> {
            value.clone().filter(|v| !v.is_empty()).ok_or_else(|| {
                Error::config(format!("Gateway {} is not configured (settings.json or environment)", name))
            })
        };

        ClientIdentity::new(
            &required(&self.gateway.base_url, "baseUrl")?,
            required(&self.gateway.username, "username")?,
            required(&self.gateway.password, "password")?,
            required(&self.gateway.aes_key, "aesKey")?,
            required(&self.gateway.account, "account")?,
        )
    }
}
