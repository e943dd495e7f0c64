//! QKart CLI - Browse, search and shop a QKart storefront from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Browse and search the catalog
//! qkart products
//! qkart products --search phone
//! qkart search            # search as you type, one stdin line per keystroke
//!
//! # Account
//! qkart register -u shopper -p s3cret-pw
//! qkart login -u shopper -p s3cret-pw
//! qkart whoami
//! qkart logout
//!
//! # Cart
//! qkart cart show
//! qkart cart add <product-id>
//! qkart cart add <product-id> --qty 2 --update
//! ```
//!
//! Configuration is read from the environment (see
//! `qkart_storefront::config`). Warnings and errors raised by the storefront
//! are printed to stderr after each command.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::io::{self, Write};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use qkart_storefront::Storefront;
use qkart_storefront::config::StorefrontConfig;
use qkart_storefront::notify::Notification;

mod commands;
mod error;
mod render;

use error::Result;

#[derive(Parser)]
#[command(name = "qkart")]
#[command(author, version, about = "QKart storefront in the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List products
    Products {
        /// Only show products matching this term
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Search as you type: each line on stdin replaces the search term
    Search,
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Log in and store the session
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
    },
    /// Create an account
    Register {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
        /// Password confirmation (defaults to the password)
        #[arg(long)]
        confirm: Option<String>,
    },
    /// Clear the stored session
    Logout,
    /// Show the logged-in user
    Whoami,
}

#[derive(Subcommand)]
enum CartAction {
    /// Show cart items, item count and total
    Show,
    /// Add a product to the cart
    Add {
        /// Product ID
        product_id: String,
        /// Quantity to add or set
        #[arg(short, long, default_value_t = 1)]
        qty: u32,
        /// Set the quantity of a product already in the cart
        #[arg(long)]
        update: bool,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing_subscriber::fmt::init();
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Logs go to stderr so command output stays clean.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "qkart_storefront=warn,qkart=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let (notifier, mut notifications) = mpsc::unbounded_channel::<Notification>();
    let result = match Storefront::with_file_session(config, Arc::new(notifier)) {
        Ok(storefront) => run(cli, &storefront).await,
        Err(e) => Err(e.into()),
    };

    let mut stderr = io::stderr().lock();
    while let Ok(notification) = notifications.try_recv() {
        let _ = render::notification(&mut stderr, &notification);
    }
    let _ = stderr.flush();

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, storefront: &Storefront) -> Result<()> {
    match cli.command {
        Commands::Products { search } => {
            commands::products::list(storefront, search.as_deref()).await?;
        }
        Commands::Search => commands::products::search(storefront).await?,
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(storefront).await?,
            CartAction::Add {
                product_id,
                qty,
                update,
            } => commands::cart::add(storefront, &product_id, qty, update).await?,
        },
        Commands::Login { username, password } => {
            commands::account::login(storefront, &username, password).await?;
        }
        Commands::Register {
            username,
            password,
            confirm,
        } => commands::account::register(storefront, &username, password, confirm).await?,
        Commands::Logout => commands::account::logout(storefront)?,
        Commands::Whoami => commands::account::whoami(storefront)?,
    }
    Ok(())
}
