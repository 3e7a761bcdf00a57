//! Config command - view and change settings.json

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Password;
use serde_json::json;

use super::get_qrpay_dir;
use crate::output;
use qrpay_core::config::{Config, SETTINGS_FILENAME};
use qrpay_core::domain::redaction;
use qrpay_core::{ClientIdentity, ReauthPolicy};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current settings with secrets masked
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set gateway connection and merchant credentials
    SetGateway {
        /// Gateway base URL, e.g. https://host/ApiGateway
        #[arg(long)]
        base_url: String,
        /// Merchant user name
        #[arg(long)]
        username: String,
        /// Destination account number
        #[arg(long)]
        account: String,
        /// Merchant password (prompted if omitted)
        #[arg(long)]
        password: Option<String>,
        /// AES key issued by the bank (prompted if omitted)
        #[arg(long)]
        aes_key: Option<String>,
        /// Request timeout in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// Re-authenticate once when the gateway rejects the token
        #[arg(long)]
        reauth_policy: Option<ReauthPolicy>,
    },
    /// Print the settings file path
    Path,
}

pub fn run(command: ConfigCommands) -> Result<()> {
    let qrpay_dir = get_qrpay_dir()?;

    match command {
        ConfigCommands::Show { json } => {
            let config = Config::load(&qrpay_dir)?;
            let gateway = &config.gateway;
            let account = gateway.account.as_deref().map(redaction::mask_tail);
            let key_fingerprint = gateway.aes_key.as_deref().map(redaction::key_fingerprint);

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({
                        "gateway": {
                            "baseUrl": gateway.base_url,
                            "username": gateway.username,
                            "passwordSet": gateway.password.as_deref().is_some_and(|p| !p.is_empty()),
                            "aesKey": key_fingerprint,
                            "account": account,
                            "timeoutSecs": config.timeout_secs(),
                        },
                        "defaults": config.defaults,
                        "reauthPolicy": config.reauth_policy,
                        "outputDir": config.output_dir,
                    }))?
                );
                return Ok(());
            }

            let unset = || "(not set)".dimmed().to_string();
            let mut table = output::create_table();
            table.set_header(vec!["Setting", "Value"]);
            let rows = [
                ("Base URL", gateway.base_url.clone().unwrap_or_else(unset)),
                ("Username", gateway.username.clone().unwrap_or_else(unset)),
                ("Password", output::secret_status(gateway.password.as_deref())),
                ("AES key", key_fingerprint.unwrap_or_else(unset)),
                ("Account", account.unwrap_or_else(unset)),
                ("Timeout", format!("{}s", config.timeout_secs())),
                ("Currency", config.defaults.currency.to_string()),
                ("Branch", config.defaults.branch_code.clone()),
                ("Due in", format!("{} days", config.defaults.due_in_days)),
                ("Single use", config.defaults.single_use.to_string()),
                ("Modify amount", config.defaults.modify_amount.to_string()),
                ("Reauth policy", format!("{:?}", config.reauth_policy)),
                ("Output dir", config.output_dir.display().to_string()),
            ];
            for (name, value) in rows {
                table.add_row(vec![name.to_string(), value]);
            }
            println!("{}", table);

            if let Err(e) = config.identity() {
                println!();
                output::warning(&e.to_string());
            }
        }
        ConfigCommands::SetGateway {
            base_url,
            username,
            account,
            password,
            aes_key,
            timeout_secs,
            reauth_policy,
        } => {
            let password = match password {
                Some(p) => p,
                None => Password::new()
                    .with_prompt("Merchant password")
                    .interact()
                    .context("Failed to read password")?,
            };
            let aes_key = match aes_key {
                Some(k) => k,
                None => Password::new()
                    .with_prompt("AES key")
                    .interact()
                    .context("Failed to read AES key")?,
            };

            // validate before touching the file
            let identity = ClientIdentity::new(&base_url, username, password, aes_key, account)?;

            let mut config = Config::load(&qrpay_dir)?;
            config.gateway.base_url = Some(identity.base_url().to_string());
            config.gateway.username = Some(identity.username().to_string());
            config.gateway.password = Some(identity.password().to_string());
            config.gateway.aes_key = Some(identity.aes_key().to_string());
            config.gateway.account = Some(identity.account().to_string());
            if timeout_secs.is_some() {
                config.gateway.timeout_secs = timeout_secs;
            }
            if let Some(policy) = reauth_policy {
                config.reauth_policy = policy;
            }
            config.save(&qrpay_dir)?;

            output::success(&format!(
                "Gateway settings saved to {}",
                qrpay_dir.join(SETTINGS_FILENAME).display()
            ));
        }
        ConfigCommands::Path => {
            println!("{}", qrpay_dir.join(SETTINGS_FILENAME).display());
        }
    }

    Ok(())
}
