//! Rewards CLI: inspect and drive a shopper's loyalty profile from the shell.
//!
//! Each invocation logs in, runs one command, prints the result as JSON on
//! stdout and waits for background remote writes before exiting.

use clap::{Parser, Subcommand};
use rewards_cache::{FileStore, HttpRewardsClient, OfflineRemote, RemoteRewards};
use rewards_core::config::AppConfig;
use rewards_core::event_bus::noop_sink;
use rewards_core::Product;
use rewards_loyalty::offers::offers_for_category;
use rewards_sync::{RewardsStore, StoreDeps};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "rewards")]
#[command(about = "Loyalty rewards: points, tiers, free gifts, offers and bundles")]
#[command(version)]
struct Cli {
    /// Shopper whose rewards are loaded
    #[arg(long, env = "REWARDS_ENGINE__USER", default_value = "default")]
    user: String,

    /// Rewards API base URL (overrides config)
    #[arg(long, env = "REWARDS_ENGINE__REMOTE__BASE_URL")]
    api_url: Option<String>,

    /// Directory holding the local cache (overrides config)
    #[arg(long, env = "REWARDS_ENGINE__CACHE__PATH")]
    cache_dir: Option<String>,

    /// Never contact the rewards API
    #[arg(long, default_value_t = false)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Current profile, tier progress and gift progress
    Show,
    /// Record a completed purchase
    Purchase {
        /// Purchase total in dollars
        amount: f64,
        /// Number of purchases the total covers
        #[arg(long, default_value_t = 1)]
        count: u32,
    },
    /// Exchange points for a discount (100 points = $1)
    RedeemPoints { points: u64 },
    /// Redeem one available free gift
    RedeemGift,
    /// Active offers, optionally only those covering a category
    Offers {
        #[arg(long)]
        category: Option<String>,
    },
    /// Check which BOGO offer applies to a product
    Bogo {
        product_id: String,
        #[arg(long)]
        category: Option<String>,
        /// Apply the matched offer through the rewards API
        #[arg(long, default_value_t = false)]
        apply: bool,
    },
    /// Bundles, or the details of one bundle
    Bundles {
        #[arg(long)]
        id: Option<String>,
    },
    /// Points history from the rewards API
    History,
    /// Free gifts that can be chosen on redemption
    Gifts,
    /// Clear the local rewards cache
    Logout,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays valid JSON.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rewards=warn,rewards_sync=info".into()),
        )
        .json()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });
    if let Some(url) = cli.api_url {
        config.remote.base_url = url;
    }
    if let Some(dir) = cli.cache_dir {
        config.cache.path = dir;
    }

    info!(
        base_url = %config.remote.base_url,
        cache_path = %config.cache.path,
        offline = cli.offline,
        "Configuration loaded"
    );

    let remote: Arc<dyn RemoteRewards> = if cli.offline {
        Arc::new(OfflineRemote)
    } else {
        Arc::new(HttpRewardsClient::new(&config.remote)?)
    };
    let store = RewardsStore::new(
        &config,
        StoreDeps {
            remote,
            local: Arc::new(FileStore::new(&config.cache.path)),
            events: noop_sink(),
        },
    );

    if let Command::Logout = cli.command {
        store.logout().await?;
        return print_json(&json!({ "loggedOut": true }));
    }

    let status = store.login(&cli.user).await?;
    if store.rewards_unavailable() {
        warn!(user = %cli.user, "Rewards unavailable, showing defaults");
    }

    match cli.command {
        Command::Show => print_json(&json!({
            "status": status,
            "state": store.state(),
            "profile": store.profile(),
            "tierName": store.profile().tier.display_name(),
            "availableFreeGifts": store.available_free_gifts(),
            "giftProgressPercent": store.gift_progress_percent(),
            "tierProgress": store.tier_progress(),
        }))?,
        Command::Purchase { amount, count } => {
            print_json(&store.record_purchase(amount, count).await?)?
        }
        Command::RedeemPoints { points } => print_json(&store.redeem_points(points).await?)?,
        Command::RedeemGift => print_json(&store.redeem_free_gift().await?)?,
        Command::Offers { category } => {
            let offers = store.offers();
            match category {
                Some(category) => print_json(&offers_for_category(&offers, &category))?,
                None => print_json(&offers)?,
            }
        }
        Command::Bogo {
            product_id,
            category,
            apply,
        } => {
            let product = Product {
                name: product_id.clone(),
                id: product_id,
                category,
            };
            match store.match_bogo(&product) {
                Some(offer) if apply => {
                    print_json(&store.apply_bogo(&offer.id, &product).await?)?
                }
                matched => print_json(&matched)?,
            }
        }
        Command::Bundles { id: Some(id) } => print_json(&store.bundle_details(&id).await)?,
        Command::Bundles { id: None } => print_json(&json!({
            "bundles": store.bundles(),
            "featured": store.featured_bundle(),
        }))?,
        Command::History => print_json(&store.history().await)?,
        Command::Gifts => print_json(&store.free_gift_options().await)?,
        Command::Logout => {}
    }

    store.flush().await;
    Ok(())
}
