//! QrPay CLI - Payment QR codes from your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod output;

use commands::{audit, cipher, config, generate};

/// Environment variable holding a tracing filter directive
const LOG_ENV: &str = "QRPAY_LOG";

/// QrPay - issue payment QR codes through the bank gateway
#[derive(Parser)]
#[command(name = "qrpay", version, about, long_about = None)]
struct Cli {
    /// Log gateway traffic at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a payment QR code
    Generate(generate::GenerateArgs),

    /// Encrypt text with the merchant key
    Encrypt {
        /// Text to encrypt
        text: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Decrypt text with the merchant key
    Decrypt {
        /// Ciphertext to decrypt
        text: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check gateway credentials by authenticating
    Auth {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// View and change settings
    Config {
        #[command(subcommand)]
        command: config::ConfigCommands,
    },

    /// Inspect the gateway audit trail
    Audit {
        #[command(subcommand)]
        command: audit::AuditCommands,
    },
}

fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    let result = if json {
        builder.json().try_init()
    } else {
        builder.with_target(false).try_init()
    };

    if let Err(e) = result {
        eprintln!("tracing init failed: {}", e);
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let result = run(cli);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Generate(args) => generate::run(args),
        Commands::Encrypt { text, json } => cipher::run_encrypt(&text, json),
        Commands::Decrypt { text, json } => cipher::run_decrypt(&text, json),
        Commands::Auth { json } => cipher::run_auth(json),
        Commands::Config { command } => config::run(command),
        Commands::Audit { command } => audit::run(command),
    }
}
