//! Setup Wizard
//!
//! Interactive first-run setup: collects the account cookies and the
//! optional Telegram push settings, then writes the config file.

use anyhow::Result;
use colored::Colorize;
use dialoguer::Input;
use regex::Regex;

use crate::config::{get_config_path, load_config, save_config};
use crate::types::{AccountEntry, AppConfig, TelegramConfig};

fn show_banner() {
    println!();
    println!("{}", "  bilidaily -- daily task runner".cyan().bold());
    println!();
}

/// Prompt for a required string value. Repeats until non-empty.
fn prompt_required(label: &str) -> Result<String> {
    loop {
        let value: String = Input::new()
            .with_prompt(format!("  {} {}", "\u{2192}".cyan(), label.white()))
            .allow_empty(true)
            .interact_text()?;

        let trimmed = value.trim().to_string();
        if !trimmed.is_empty() {
            return Ok(trimmed);
        }
        println!("{}", "  This field is required.".yellow());
    }
}

/// Prompt for an optional value; empty input returns `None`.
fn prompt_optional(label: &str) -> Result<Option<String>> {
    let value: String = Input::new()
        .with_prompt(format!("  {} {}", "\u{2192}".cyan(), label.white()))
        .allow_empty(true)
        .interact_text()?;

    let trimmed = value.trim().to_string();
    Ok(if trimmed.is_empty() { None } else { Some(trimmed) })
}

/// Prompt for a numeric account id.
fn prompt_uid(label: &str) -> Result<String> {
    let re = Regex::new(r"^\d+$")?;

    loop {
        let value = prompt_required(label)?;
        if re.is_match(&value) {
            return Ok(value);
        }
        println!("{}", "  The account id must be numeric.".yellow());
    }
}

/// Run the interactive setup wizard. Appends one account to the
/// existing config (creating it on first run) and returns the result.
pub fn run_setup_wizard() -> Result<AppConfig> {
    show_banner();
    println!(
        "{}",
        "  Copy the three cookies from a logged-in browser session.\n".white()
    );

    // ---- 1. Account cookies -------------------------------------------
    println!("{}", "  [1/3] Account".cyan());

    let dede_user_id = prompt_uid("DedeUserID")?;
    let sessdata = prompt_required("SESSDATA")?;
    let bili_jct = prompt_required("bili_jct")?;

    let mut entry = AccountEntry {
        credentials: crate::types::AccountCredentials {
            dede_user_id,
            sessdata,
            bili_jct,
            user_agent: crate::types::DEFAULT_USER_AGENT.to_string(),
        },
        tasks: Default::default(),
        proxy: None,
    };

    // ---- 2. Task knobs ------------------------------------------------
    println!();
    println!("{}", "  [2/3] Daily tasks".cyan());

    let coins: String = Input::new()
        .with_prompt(format!(
            "  {} {}",
            "\u{2192}".cyan(),
            "Coins to donate per day (0-5)".white()
        ))
        .default("0".to_string())
        .interact_text()?;
    entry.tasks.coin_count = coins.trim().parse::<u32>().unwrap_or(0).min(5);

    entry.proxy = prompt_optional("HTTP proxy, host:port (optional)")?;

    // ---- 3. Push channel ----------------------------------------------
    println!();
    println!("{}", "  [3/3] Telegram push (optional)".cyan());

    let telegram = match prompt_optional("Bot token (empty to skip)")? {
        Some(bot_token) => {
            let chat_id = prompt_required("Chat id")?;
            Some(TelegramConfig { bot_token, chat_id })
        }
        None => None,
    };

    // ---- Write config -------------------------------------------------
    let mut config = load_config().unwrap_or_default();
    config.accounts.push(entry);
    if telegram.is_some() {
        config.telegram = telegram;
    }
    save_config(&config)?;

    println!();
    println!(
        "{}",
        format!("  Config written to {}", get_config_path().display()).green()
    );
    println!(
        "{}",
        format!("  {} account(s) configured.", config.accounts.len()).green()
    );

    Ok(config)
}
