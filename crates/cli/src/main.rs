//! LM Store CLI - shop from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Log in (password may also come from LM_PASSWORD)
//! lm login -u ada -p 'Secret123'
//!
//! # Browse and buy
//! lm products list
//! lm cart add 3 --quantity 2
//! lm cart set 3 1
//! lm checkout --card '4242 4242 4242 4242' --expiry 12/29 --cvc 123
//! lm orders
//!
//! # Inventory (admin accounts)
//! lm admin dashboard
//! lm admin stock 3 25
//! ```
//!
//! # Exit codes
//!
//! - `0` - success
//! - `1` - command failed
//! - `2` - session expired or missing; run `lm login`

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::ffi::OsString;
use std::path::Path;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use lm_store_core::{Price, ProductId};
use lm_store_storefront::session::FileSessionStore;
use lm_store_storefront::{ApiError, ClientConfig, StoreClient};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::CommandError;

#[derive(Parser)]
#[command(name = "lm")]
#[command(author, version, about = "LM Store command-line storefront")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and remember the session
    Login {
        #[arg(short, long)]
        username: String,

        #[arg(short, long, env = "LM_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account
    Register {
        #[arg(short, long)]
        username: String,

        /// At least 8 characters with upper case, lower case and a number
        #[arg(short, long, env = "LM_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Show who is logged in
    Whoami,
    /// Browse the catalog
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// View and change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Pay for the cart (simulated) and place the order
    Checkout {
        /// Card number; spaces are ignored
        #[arg(long)]
        card: String,

        /// Expiry as MM/YY
        #[arg(long)]
        expiry: String,

        #[arg(long)]
        cvc: String,
    },
    /// List past orders
    Orders,
    /// Store inventory and reporting (admin accounts)
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum ProductsAction {
    /// List active products
    List,
    /// Show one product
    Show { id: ProductId },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show cart lines and subtotal
    Show,
    /// Add a product
    Add {
        id: ProductId,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Remove a product's line
    Remove { id: ProductId },
    /// Set a line to an exact quantity (0 removes it)
    Set { id: ProductId, quantity: u32 },
}

#[derive(Subcommand)]
enum AdminAction {
    /// User count, catalog size and out-of-stock products
    Dashboard,
    /// List registered users
    Users,
    /// Recent orders across all users
    Activity,
    /// Add a product to the catalog
    AddProduct {
        #[arg(short, long)]
        name: String,

        #[arg(short, long, default_value = "")]
        description: String,

        /// Price in dollars, e.g. 19.99
        #[arg(short, long)]
        price: Price,

        #[arg(short, long, default_value = "")]
        image_url: String,

        #[arg(short, long, default_value_t = 0)]
        stock: u32,
    },
    /// Archive a product (restorable)
    Archive { id: ProductId },
    /// Restore an archived product
    Restore { id: ProductId },
    /// Set a product's stock level
    Stock { id: ProductId, stock: u32 },
    /// List archived products
    Archived,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
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

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "lm_store_storefront=warn,lm_store_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .without_time(),
        )
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

/// Parse the command line after loading `.env`, so values kept there (such
/// as `LM_PASSWORD`) are visible to clap's `env` fallbacks.
fn parse_cli<I, T>(env_file: Option<&Path>, args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    // A missing .env file is not an error
    let _ = match env_file {
        Some(path) => dotenvy::from_path(path),
        None => dotenvy::dotenv().map(|_| ()),
    };
    Cli::try_parse_from(args)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = parse_cli(None, std::env::args_os()).unwrap_or_else(|e| e.exit());

    // Sentry must be initialized before the tracing subscriber
    let config = ClientConfig::from_env();
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);
    init_tracing();

    let result = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(CommandError::from(e)),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(CommandError::Api(ApiError::SessionExpired(reauth))) => {
            tracing::warn!("{} Run `lm login` to continue.", reauth.message());
            ExitCode::from(2)
        }
        Err(CommandError::NotLoggedIn) => {
            tracing::warn!("You are not logged in. Run `lm login` first.");
            ExitCode::from(2)
        }
        Err(e) => {
            tracing::error!("Command failed: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: ClientConfig) -> Result<(), CommandError> {
    let store = FileSessionStore::new(&config.session_file);
    let client = StoreClient::new(config, store)?;

    match cli.command {
        Commands::Login { username, password } => {
            commands::auth::login(&client, &username, &password).await?;
        }
        Commands::Register { username, password } => {
            commands::auth::register(&client, &username, &password).await?;
        }
        Commands::Logout => commands::auth::logout(&client)?,
        Commands::Whoami => commands::auth::whoami(&client)?,
        Commands::Products { action } => match action {
            ProductsAction::List => commands::catalog::list(&client).await?,
            ProductsAction::Show { id } => commands::catalog::show(&client, id).await?,
        },
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&client).await?,
            CartAction::Add { id, quantity } => commands::cart::add(&client, id, quantity).await?,
            CartAction::Remove { id } => commands::cart::remove(&client, id).await?,
            CartAction::Set { id, quantity } => {
                commands::cart::set(&client, id, quantity).await?;
            }
        },
        Commands::Checkout { card, expiry, cvc } => {
            commands::orders::checkout(&client, &card, &expiry, &cvc).await?;
        }
        Commands::Orders => commands::orders::history(&client).await?,
        Commands::Admin { action } => {
            commands::admin::require_admin(&client)?;
            match action {
                AdminAction::Dashboard => commands::admin::dashboard(&client).await?,
                AdminAction::Users => commands::admin::users(&client).await?,
                AdminAction::Activity => commands::admin::activity(&client).await?,
                AdminAction::AddProduct {
                    name,
                    description,
                    price,
                    image_url,
                    stock,
                } => {
                    let product = lm_store_core::NewProduct {
                        name,
                        description,
                        price,
                        image_url,
                        stock,
                    };
                    commands::admin::add_product(&client, &product).await?;
                }
                AdminAction::Archive { id } => commands::admin::archive(&client, id).await?,
                AdminAction::Restore { id } => commands::admin::restore(&client, id).await?,
                AdminAction::Stock { id, stock } => {
                    commands::admin::stock(&client, id, stock).await?;
                }
                AdminAction::Archived => commands::admin::archived(&client).await?,
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_password_from_env_file() {
        let path = std::env::temp_dir().join(format!("lm-cli-{}.env", std::process::id()));
        std::fs::write(&path, "LM_PASSWORD=Dotenv123\n").unwrap();

        let cli = parse_cli(Some(&path), ["lm", "register", "-u", "grace"]).unwrap();
        std::fs::remove_file(&path).unwrap();

        let Commands::Register { username, password } = cli.command else {
            panic!("expected register");
        };
        assert_eq!(username, "grace");
        assert_eq!(password, "Dotenv123");
    }

    #[test]
    fn test_price_argument_parses() {
        let cli = parse_cli(
            None,
            ["lm", "admin", "add-product", "-n", "Lamp", "-p", "$24.50", "-s", "3"],
        );
        assert!(cli.is_ok());
    }
}
