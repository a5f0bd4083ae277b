//! bilidaily -- Bilibili Daily Task Runner
//!
//! Entry point: CLI args, config loading, and one independent
//! orchestration run per configured account.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn, Instrument};

use bilidaily::config;
use bilidaily::notify::telegram::TelegramNotifier;
use bilidaily::notify::LogNotifier;
use bilidaily::orchestrator::TaskOrchestrator;
use bilidaily::session::BiliClient;
use bilidaily::setup;
use bilidaily::types::{AccountEntry, AccountSnapshot, Notifier, RunContext, TelegramConfig};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Bilibili Daily Task Runner
#[derive(Parser, Debug)]
#[command(
    name = "bilidaily",
    version = VERSION,
    about = "Runs the fixed daily chore batch for each configured account"
)]
struct Cli {
    /// Run the daily batch for every configured account
    #[arg(long)]
    run: bool,

    /// Run the interactive account setup wizard
    #[arg(long)]
    setup: bool,

    /// Show the configured accounts
    #[arg(long)]
    status: bool,
}

// ---- Status Command ---------------------------------------------------------

/// Display the configured accounts without touching the network.
fn show_status() {
    match config::load_config() {
        Some(config) => {
            println!("{} account(s) configured:", config.accounts.len());
            for entry in &config.accounts {
                println!(
                    "  {} (coins/day: {}, proxy: {})",
                    entry.credentials.dede_user_id,
                    entry.tasks.coin_count,
                    entry.proxy.as_deref().unwrap_or("none"),
                );
            }
            println!(
                "push channel: {}",
                if config.telegram.is_some() {
                    "telegram"
                } else {
                    "log"
                }
            );
        }
        None => println!("No config found. Run \"bilidaily --setup\" first."),
    }
}

// ---- Main Run ---------------------------------------------------------------

/// One orchestration run for one account: own session, own task list,
/// no state shared with the other accounts.
async fn run_account(
    entry: AccountEntry,
    telegram: Option<TelegramConfig>,
    cancel: Arc<AtomicBool>,
) -> Result<AccountSnapshot> {
    let ctx = RunContext::new(&entry.credentials.dede_user_id);
    let session = BiliClient::new(entry.credentials.clone(), entry.proxy.as_deref())
        .context("Failed to build the account session")?;
    let notifier: Box<dyn Notifier> = match telegram {
        Some(t) => Box::new(TelegramNotifier::new(t.bot_token, t.chat_id)),
        None => Box::new(LogNotifier),
    };

    let orchestrator = TaskOrchestrator::new(&session, notifier.as_ref(), entry.tasks, cancel);
    let span = tracing::info_span!("run", trace = %ctx.trace_id, uid = %ctx.uid);
    Ok(orchestrator.run(&ctx).instrument(span).await)
}

/// Load the config, wire up cancellation, and run every account as an
/// independent parallel orchestration.
async fn run() -> Result<()> {
    let Some(app_config) = config::load_config() else {
        anyhow::bail!(
            "no config at {}; run \"bilidaily --setup\" first",
            config::get_config_path().display()
        );
    };

    tracing_subscriber::fmt()
        .with_max_level(app_config.log_level.as_tracing())
        .init();

    if app_config.accounts.is_empty() {
        warn!("config has no accounts, nothing to do");
        return Ok(());
    }
    info!(
        "bilidaily v{} starting {} account run(s)",
        VERSION,
        app_config.accounts.len()
    );

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                warn!("shutdown requested, cancelling runs");
                cancel.store(true, Ordering::SeqCst);
            }
        });
    }

    let mut handles = Vec::new();
    for entry in app_config.accounts {
        let telegram = app_config.telegram.clone();
        let cancel = Arc::clone(&cancel);
        handles.push(tokio::spawn(run_account(entry, telegram, cancel)));
    }

    for handle in handles {
        match handle.await {
            Ok(Ok(snapshot)) => info!(
                "run for [{}] finished (signed in: {})",
                snapshot.uid, snapshot.signed_in
            ),
            Ok(Err(e)) => error!("run failed: {:#}", e),
            Err(e) => error!("run task panicked: {}", e),
        }
    }

    Ok(())
}

// ---- Entry Point -----------------------------------------------------------

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.setup {
        match setup::run_setup_wizard() {
            Ok(_) => println!("Setup complete."),
            Err(e) => {
                eprintln!("Setup failed: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    if cli.status {
        show_status();
        return;
    }

    if cli.run {
        if let Err(e) = run().await {
            eprintln!("Fatal: {:#}", e);
            std::process::exit(1);
        }
        return;
    }

    // Default: show usage hints.
    println!("Run \"bilidaily --help\" for usage information.");
    println!("Run \"bilidaily --run\" to start the daily batch.");
}
