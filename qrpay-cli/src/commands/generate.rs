//! Generate command - issue a payment QR code and save the result

use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::Args;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use rust_decimal::Decimal;
use serde_json::json;

use super::get_context;
use crate::output;
use qrpay_core::domain::qr::{parse_due_date, DUE_DATE_FORMAT};
use qrpay_core::domain::redaction;
use qrpay_core::services::default_due_date;
use qrpay_core::{Currency, OperationResult, QrOptions, QrResponse};

#[derive(Args)]
pub struct GenerateArgs {
    /// Amount to charge, e.g. 100.50
    pub amount: Decimal,
    /// Payment description shown to the payer
    pub description: String,
    /// Transaction ID (default: TXN-<timestamp>)
    #[arg(long)]
    pub txn_id: Option<String>,
    /// Currency (BOB or USD)
    #[arg(long)]
    pub currency: Option<Currency>,
    /// Expiry date as YYYY-MM-DD
    #[arg(long)]
    pub due_date: Option<String>,
    /// Allow the QR to be paid more than once
    #[arg(long)]
    pub multi_use: bool,
    /// Let the payer change the amount
    #[arg(long)]
    pub modify_amount: bool,
    /// Branch code
    #[arg(long)]
    pub branch: Option<String>,
    /// Do not write the result and image files
    #[arg(long)]
    pub no_save: bool,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Transaction ID used when none is given
fn default_transaction_id() -> String {
    format!("TXN-{}", Local::now().format("%Y%m%d%H%M%S"))
}

fn build_options(base: QrOptions, args: &GenerateArgs) -> Result<QrOptions> {
    let mut options = base;
    if let Some(currency) = args.currency {
        options = options.with_currency(currency);
    }
    if let Some(due_date) = &args.due_date {
        options = options.with_due_date(parse_due_date(due_date)?);
    }
    if args.multi_use {
        options = options.with_single_use(false);
    }
    if args.modify_amount {
        options = options.with_modify_amount(true);
    }
    if let Some(branch) = &args.branch {
        options = options.with_branch_code(branch.clone());
    }
    Ok(options)
}

fn spinner(message: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

pub fn run(args: GenerateArgs) -> Result<()> {
    let ctx = get_context()?;
    let options = build_options(ctx.config.defaults.options(), &args)?;
    let transaction_id = args.txn_id.clone().unwrap_or_else(default_transaction_id);
    let due_date = options
        .due_date
        .unwrap_or_else(|| default_due_date(Local::now().date_naive(), ctx.config.defaults.due_in_days));

    let pb = if args.json { None } else { Some(spinner("Generating QR...")?) };
    let result = ctx
        .issuance
        .generate(&transaction_id, args.amount, &args.description, &options);
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    if args.json {
        let outcome = OperationResult::<QrResponse>::from(result);
        let Some(response) = outcome.data.as_ref() else {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            bail!("QR generation failed for {}", transaction_id);
        };
        let export = if args.no_save {
            None
        } else {
            Some(ctx.exporter.export(&transaction_id, response)?)
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "success": true,
                "transactionId": transaction_id,
                "data": response,
                "export": export,
            }))?
        );
        return Ok(());
    }

    let response = result.with_context(|| format!("QR generation failed for {}", transaction_id))?;

    output::success("QR generated");
    let mut table = output::create_table();
    table.set_header(vec!["Field", "Value"]);
    table.add_row(vec!["Transaction".to_string(), transaction_id.clone()]);
    table.add_row(vec![
        "QR ID".to_string(),
        response.qr_id().unwrap_or_else(|| "-".to_string()),
    ]);
    table.add_row(vec![
        "Amount".to_string(),
        format!("{} {}", args.amount, options.currency),
    ]);
    table.add_row(vec!["Description".to_string(), args.description.clone()]);
    table.add_row(vec![
        "Due".to_string(),
        due_date.format(DUE_DATE_FORMAT).to_string(),
    ]);
    table.add_row(vec![
        "Single use".to_string(),
        if options.single_use { "yes" } else { "no" }.to_string(),
    ]);
    table.add_row(vec![
        "Image".to_string(),
        response
            .qr_image()
            .map(|image| redaction::image_marker(image.len()))
            .unwrap_or_else(|| "none".to_string()),
    ]);
    println!("{}", table);

    if args.no_save {
        return Ok(());
    }

    match ctx.exporter.export(&transaction_id, &response) {
        Ok(summary) => {
            println!("  {} {}", "Result:".dimmed(), summary.result_path.display());
            if let (Some(path), Some(size)) = (&summary.image_path, summary.image_size_bytes) {
                println!(
                    "  {} {} ({})",
                    "Image:".dimmed(),
                    path.display(),
                    output::format_size(size)
                );
            }
        }
        // the QR was issued; a failed save should not read as a failed payment
        Err(e) => output::warning(&format!("QR issued but not saved: {:#}", e)),
    }

    Ok(())
}
