//! Marketplace CLI - inspect and edit the persisted cart.
//!
//! # Usage
//!
//! ```bash
//! # Add a product (adding it again bumps the quantity)
//! mp-cli add --id 1 --title "Cap" --image-url https://cdn.example.com/cap.png --price 12.50
//!
//! # Change quantities
//! mp-cli increment 1
//! mp-cli decrement 1
//!
//! # Inspect
//! mp-cli show
//! mp-cli summary --currency BRL
//! ```
//!
//! # Commands
//!
//! - `add` - Add a product to the cart
//! - `increment` / `decrement` - Change a product's quantity by one
//! - `show` - List cart lines
//! - `summary` - Total price and item count
//! - `open` - Navigate to the cart screen
//!
//! Storage location, key and currency come from `CART_STORAGE_DIR`,
//! `CART_STORAGE_KEY` and `CART_CURRENCY` (or a `.env` file); the
//! `--storage-dir` and `--currency` flags override them.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use marketplace_cart::{CartConfig, CartStore};
use marketplace_core::{CurrencyCode, NewLineItem, ProductId};
use rust_decimal::Decimal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "mp-cli")]
#[command(author, version, about = "Marketplace cart tools")]
struct Cli {
    /// Directory holding the cart snapshot
    #[arg(long, global = true)]
    storage_dir: Option<PathBuf>,

    /// Currency for formatted prices (USD, EUR, GBP, CAD, AUD, BRL)
    #[arg(long, global = true)]
    currency: Option<CurrencyCode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a product to the cart
    Add {
        /// Product ID
        #[arg(long)]
        id: String,

        /// Product title
        #[arg(long)]
        title: String,

        /// Product image URL
        #[arg(long, default_value = "")]
        image_url: String,

        /// Unit price
        #[arg(long)]
        price: Decimal,
    },
    /// Raise a product's quantity by one
    Increment {
        /// Product ID
        id: String,
    },
    /// Lower a product's quantity by one (stops at zero)
    Decrement {
        /// Product ID
        id: String,
    },
    /// List cart lines
    Show,
    /// Show total price and item count
    Summary,
    /// Navigate to the cart screen
    Open,
}

#[tokio::main]
async fn main() {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "mp_cli=info,marketplace_cart=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = CartConfig::from_env()?;
    if let Some(dir) = cli.storage_dir {
        config.storage_dir = dir;
    }
    if let Some(currency) = cli.currency {
        config.currency = currency;
    }
    let currency = config.currency;

    let store = CartStore::from_config(&config);
    commands::cart::load(&store).await?;

    match cli.command {
        Commands::Add {
            id,
            title,
            image_url,
            price,
        } => {
            let item = NewLineItem {
                id: ProductId::new(id),
                title,
                image_url,
                price,
            };
            commands::cart::add(&store, item).await?;
        }
        Commands::Increment { id } => {
            commands::cart::increment(&store, &ProductId::new(id)).await?;
        }
        Commands::Decrement { id } => {
            commands::cart::decrement(&store, &ProductId::new(id)).await?;
        }
        Commands::Show => commands::cart::show(&store, currency),
        Commands::Summary => commands::cart::summary(&store, currency)?,
        Commands::Open => commands::cart::open(&store, currency)?,
    }
    Ok(())
}
