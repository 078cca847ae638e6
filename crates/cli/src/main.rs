//! DCL CLI - Drive the storefront cart from a terminal.
//!
//! Talks to the same AJAX endpoints as the page and keeps the same local
//! cache (`DCL_STORAGE_DIR`), so a cart built here shows up in `cart show`
//! on later runs.
//!
//! # Usage
//!
//! ```bash
//! # Add two of variant 42
//! dcl cart add 42 -q 2 --name "Silk Scarf" --price 19.99
//!
//! # Change or drop a line
//! dcl cart update 42 3
//! dcl cart remove 42
//!
//! # Local state
//! dcl cart show
//! dcl wishlist toggle p1
//! dcl wishlist list
//!
//! # Product fragment
//! dcl quickview p1 --text
//! ```
//!
//! # Configuration
//!
//! `DCL_BASE_URL` is required. `DCL_COOKIE` carries the session and
//! `csrftoken` cookies; `SENTRY_DSN` enables error reporting.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use dcl_core::{ProductId, VariantId};
use dcl_storefront::api::{AddToCart, ApiError};
use dcl_storefront::config::ClientConfig;
use dcl_storefront::error::AppError;
use dcl_storefront::state::AppState;
use rust_decimal::Decimal;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;

#[derive(Parser)]
#[command(name = "dcl")]
#[command(author, version, about = "Storefront cart client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Change or inspect the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage the local wishlist
    Wishlist {
        #[command(subcommand)]
        action: WishlistAction,
    },
    /// Fetch a product's quick view fragment
    Quickview {
        /// Product id
        product: String,

        /// Strip markup and print plain text
        #[arg(long)]
        text: bool,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Add a variant to the cart
    Add {
        /// Variant id
        variant: String,

        /// Quantity to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,

        /// Product name recorded in the local cache
        #[arg(long, default_value = "")]
        name: String,

        /// Unit price recorded in the local cache
        #[arg(long, default_value = "0")]
        price: Decimal,

        /// Product image URL recorded in the local cache
        #[arg(long, default_value = "")]
        image: String,
    },
    /// Set a line's quantity
    Update {
        /// Variant id
        variant: String,

        /// New quantity
        quantity: u32,
    },
    /// Remove a line
    Remove {
        /// Variant id
        variant: String,
    },
    /// Print the locally cached cart
    Show,
}

#[derive(Subcommand)]
enum WishlistAction {
    /// Add or remove a product
    Toggle {
        /// Product id
        product: String,
    },
    /// Print wishlisted product ids
    List,
}

/// Initialize Sentry when a DSN is configured.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Loaded before tracing so Sentry can be set up first; errors are
    // reported once the subscriber exists.
    let config = ClientConfig::from_env();
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "dcl=warn,dcl_storefront=warn".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(AppError::from(e)),
    };

    match result {
        Ok(output) => print_output(&output),
        Err(e) => {
            e.report();
            print_failure(&e);
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli, config: ClientConfig) -> Result<String, AppError> {
    let mut state = AppState::with_file_storage(config)?;

    let output = match cli.command {
        Commands::Cart { action } => match action {
            CartAction::Add {
                variant,
                quantity,
                name,
                price,
                image,
            } => {
                let request = AddToCart {
                    variant_id: VariantId::new(variant),
                    quantity,
                    name,
                    unit_price: price,
                    image,
                };
                commands::cart::add(&mut state, request).await?
            }
            CartAction::Update { variant, quantity } => {
                commands::cart::update(&mut state, &VariantId::new(variant), quantity).await?
            }
            CartAction::Remove { variant } => {
                commands::cart::remove(&mut state, &VariantId::new(variant)).await?
            }
            CartAction::Show => commands::cart::show(&state),
        },
        Commands::Wishlist { action } => match action {
            WishlistAction::Toggle { product } => {
                commands::wishlist::toggle(&mut state, &ProductId::new(product))
            }
            WishlistAction::List => commands::wishlist::list(&state),
        },
        Commands::Quickview { product, text } => {
            commands::quickview::run(&state, &ProductId::new(product), text).await?
        }
    };
    Ok(output)
}

#[allow(clippy::print_stdout)]
fn print_output(output: &str) {
    println!("{output}");
}

/// Print what the page would have shown for this failure.
#[allow(clippy::print_stderr)]
fn print_failure(err: &AppError) {
    match err {
        AppError::Api(api @ (ApiError::Validation(_) | ApiError::Rejected { .. })) => {
            eprintln!("{}", api.user_message("Request was refused."));
        }
        other => eprintln!("{other}"),
    }
}
