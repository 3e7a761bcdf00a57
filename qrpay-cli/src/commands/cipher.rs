//! Encrypt, decrypt and auth commands - single gateway round-trips

use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::json;

use super::get_context;
use crate::output;
use qrpay_core::domain::redaction;

pub fn run_encrypt(text: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let aes_key = ctx.session.identity().aes_key();

    let ciphertext = ctx
        .cipher()
        .encrypt(text, aes_key)
        .context("Encryption failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&json!({"ciphertext": ciphertext}))?);
    } else {
        println!("{}", ciphertext);
    }
    Ok(())
}

pub fn run_decrypt(text: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let aes_key = ctx.session.identity().aes_key();

    let plaintext = ctx
        .cipher()
        .decrypt(text, aes_key)
        .context("Decryption failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&json!({"plaintext": plaintext}))?);
    } else {
        println!("{}", plaintext);
    }
    Ok(())
}

pub fn run_auth(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let identity = ctx.session.identity();

    let token = ctx
        .session
        .ensure_authenticated()
        .context("Authentication failed")?;
    let masked = redaction::mask_tail(&token);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "authenticated": true,
                "baseUrl": identity.base_url(),
                "username": identity.username(),
                "token": masked,
            }))?
        );
        return Ok(());
    }

    output::success("Authenticated with gateway");
    println!("  {} {}", "Gateway:".dimmed(), identity.base_url());
    println!("  {} {}", "User:".dimmed(), identity.username());
    println!("  {} {}", "Token:".dimmed(), masked);
    Ok(())
}
