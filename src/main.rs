//! tftop — TFT top-ladder match collector and tracker.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tftop::collector::{Collector, CycleOptions};
use tftop::config::{parse_tier_list, Settings};
use tftop::riot::client::is_supported_tier;
use tftop::riot::{ReqwestTransport, RiotClient, RiotHttpClient, SlidingWindowLimiter};
use tftop::scheduler::Scheduler;
use tftop::server::{self, AppState};
use tftop::storage::Store;

#[derive(Parser)]
#[command(name = "tftop", about = "TFT top-ladder match collection and tracking")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the JSON API server, plus the background collector when
    /// COLLECT_INTERVAL_SEC is configured.
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 8000)]
        port: u16,
    },
    /// Run one collection cycle and print its result.
    Collect {
        #[arg(long)]
        region: Option<String>,
        #[arg(long)]
        players: Option<usize>,
        #[arg(long)]
        per_player: Option<u32>,
        /// Comma-separated tier list (challenger, grandmaster, master).
        #[arg(long)]
        tiers: Option<String>,
    },
}

/// Wire the outbound stack: one shared admission controller for the whole
/// process, whatever triggers the fetches.
fn build_collector(settings: &Settings, store: &Store) -> Option<Arc<Collector>> {
    let api_key = settings.api_key.clone()?;
    let limiter = Arc::new(SlidingWindowLimiter::new(
        settings.limit_per_second,
        settings.limit_per_two_minutes,
    ));
    let transport = Arc::new(ReqwestTransport::new(api_key, settings.request_timeout));
    let client = RiotClient::new(RiotHttpClient::new(transport, limiter));
    Some(Arc::new(Collector::new(client, store.clone())))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env();
    let store = Store::new(&settings.data_dir)?;
    let collector = build_collector(&settings, &store);

    match cli.command {
        Command::Serve { host, port } => {
            let scheduler = Scheduler::new();
            match (&collector, settings.collect_interval) {
                (Some(collector), Some(interval)) => {
                    scheduler.start(collector.clone(), settings.cycle_options(), interval);
                }
                (None, Some(_)) => {
                    tracing::warn!("COLLECT_INTERVAL_SEC set but RIOT_API_KEY missing, scheduler disabled");
                }
                _ => {}
            }

            let state = AppState {
                store: Arc::new(store),
                collector,
                settings: Arc::new(settings),
            };
            server::serve(state, &host, port).await
        }
        Command::Collect {
            region,
            players,
            per_player,
            tiers,
        } => {
            let collector =
                collector.ok_or_else(|| anyhow::anyhow!("RIOT_API_KEY is not set"))?;
            let defaults = settings.cycle_options();
            let tiers = tiers.as_deref().map(parse_tier_list).unwrap_or(defaults.tiers);
            for tier in &tiers {
                if !is_supported_tier(tier) {
                    anyhow::bail!("unsupported tier: {tier}");
                }
            }

            let opts = CycleOptions {
                region: region.unwrap_or(defaults.region),
                max_players: players.unwrap_or(defaults.max_players),
                max_matches_per_player: per_player.unwrap_or(defaults.max_matches_per_player),
                tiers,
            };
            let result = collector.run_cycle(&opts).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
    }
}
