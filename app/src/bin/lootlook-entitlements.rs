//! Maintenance tool for the local entitlement store.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use lootlook_app::{commands, AppState};
use lootlook_core::{AppConfig, ProductId, TransactionId};
use lootlook_entitlement::Purchase;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "lootlook-entitlements", version, about = "Inspect and adjust LootLook scan entitlements")]
struct Cli {
    /// Config file (defaults to the XDG config path)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file (overrides the config)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the current entitlements as JSON
    Status,
    /// Run the monthly reset check, then print status
    Session,
    /// Debit one scan
    Consume,
    /// Grant one rewarded-ad scan
    Reward,
    /// Grant pack credits directly
    GrantPack {
        /// Number of credits
        credits: u32,
    },
    /// Apply a store purchase
    Purchase {
        /// Product ID, e.g. lootlook.pack.20
        product_id: String,
        /// Platform transaction ID
        transaction_id: String,
    },
    /// Reset all entitlement state to first-run defaults
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    lootlook_app::init_tracing();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    }
    .context("failed to load configuration")?;
    config.apply_env_overrides();
    if let Some(path) = cli.database {
        config.entitlements.database_path = Some(path);
    }
    config.validate().context("invalid configuration")?;

    let state = AppState::open(&config)
        .await
        .context("failed to open entitlement store")?;

    let output = match cli.command {
        Command::Status => serde_json::to_value(commands::get_entitlements(&state).await)?,
        Command::Session => serde_json::to_value(commands::begin_session(&state).await)?,
        Command::Consume => serde_json::to_value(commands::consume_scan(&state).await)?,
        Command::Reward => serde_json::to_value(commands::reward_ad_watched(&state).await)?,
        Command::GrantPack { credits } => {
            let mut engine = state.engine.lock().await;
            engine.add_pack_credits(credits).await;
            serde_json::to_value(engine.summary())?
        }
        Command::Purchase {
            product_id,
            transaction_id,
        } => {
            let purchase = Purchase {
                transaction_id: TransactionId::new(transaction_id)?,
                product_id: ProductId::new(product_id)?,
                purchased_at: Utc::now(),
            };
            serde_json::to_value(commands::complete_purchase(&state, purchase).await?)?
        }
        Command::Reset => serde_json::to_value(commands::reset_entitlements(&state).await?)?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    state.close().await;
    Ok(())
}
