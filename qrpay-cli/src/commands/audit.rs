//! Audit command - view and manage the gateway audit trail

use std::path::PathBuf;

use anyhow::Result;
use chrono::{Duration, TimeZone, Utc};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;

use super::get_audit_service;
use crate::output;
use qrpay_core::services::AuditEntry;

#[derive(Subcommand)]
pub enum AuditCommands {
    /// Show recent gateway calls
    List {
        /// Number of entries to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Show only failed calls
        #[arg(long)]
        failures: bool,
        /// Show calls for one transaction ID
        #[arg(long)]
        txn: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Clear old audit entries
    Clear {
        /// Delete entries older than N days
        #[arg(long, default_value = "30")]
        older_than_days: i64,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show audit statistics and database path
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Copy the audit database to a file
    Export {
        /// Destination path
        path: PathBuf,
    },
}

fn format_timestamp(timestamp_ms: i64) -> String {
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp_ms.to_string())
}

fn status_cell(entry: &AuditEntry) -> String {
    match entry.status {
        Some(status) if entry.is_failure() => status.to_string().red().to_string(),
        Some(status) => status.to_string().green().to_string(),
        None => "-".red().to_string(),
    }
}

pub fn run(command: AuditCommands) -> Result<()> {
    match command {
        AuditCommands::List {
            limit,
            failures,
            txn,
            json,
        } => {
            let service = get_audit_service()?;
            let entries = match (&txn, failures) {
                (Some(txn), _) => service.for_transaction(txn, limit)?,
                (None, true) => service.failures(limit)?,
                (None, false) => service.recent(limit)?,
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
                return Ok(());
            }

            if entries.is_empty() {
                println!("No audit entries found.");
                return Ok(());
            }

            let mut table = output::create_table();
            table.set_header(vec!["Time", "Leg", "Transaction", "Status", "ms", "Error"]);

            for entry in &entries {
                table.add_row(vec![
                    format_timestamp(entry.timestamp),
                    entry.leg.clone(),
                    entry.transaction_id.clone().unwrap_or_default(),
                    status_cell(entry),
                    entry.duration_ms.to_string(),
                    entry.error_message.clone().unwrap_or_default(),
                ]);
            }

            println!("{}", table);

            if !failures && txn.is_none() {
                let failed = entries.iter().filter(|e| e.is_failure()).count();
                if failed > 0 {
                    println!();
                    println!(
                        "{}",
                        format!("{} failed call(s); use --failures to list them", failed).red()
                    );
                }
            }
        }
        AuditCommands::Clear {
            older_than_days,
            force,
            json,
        } => {
            let service = get_audit_service()?;
            let cutoff_ms = (Utc::now() - Duration::days(older_than_days)).timestamp_millis();

            if !force
                && !json
                && !Confirm::new()
                    .with_prompt(format!(
                        "Delete audit entries older than {} days?",
                        older_than_days
                    ))
                    .default(false)
                    .interact()?
            {
                println!("Cancelled.");
                return Ok(());
            }

            let deleted = service.delete_before(cutoff_ms)?;

            if json {
                println!("{}", serde_json::json!({"deleted": deleted}));
            } else {
                println!("Deleted {} audit entries", deleted);
            }
        }
        AuditCommands::Stats { json } => {
            let service = get_audit_service()?;
            let total = service.count()?;
            let failures = service.failures(1000)?.len();
            let db_path = service.db_path().to_path_buf();
            let size_bytes = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "total_entries": total,
                        "failure_count": failures,
                        "database_path": db_path.to_string_lossy(),
                        "database_size_bytes": size_bytes
                    })
                );
            } else {
                println!("{}", "Audit Statistics".bold());
                println!("  Total entries: {}", total);
                println!("  Failures: {}", failures);
                println!("  Database: {}", db_path.display());
                println!("  Size: {}", output::format_size(size_bytes));
            }
        }
        AuditCommands::Export { path } => {
            let service = get_audit_service()?;
            let written = service.export(&path)?;
            output::success(&format!("Audit database copied to {}", written.display()));
            output::info("Secrets were redacted before they were stored.");
        }
    }

    Ok(())
}
