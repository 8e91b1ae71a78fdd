//! Player Report - one-shot JSON dump of the dashboard data
//!
//! Prints the leaderboard (or one player's detail record) to stdout as JSON,
//! using the same configuration and aggregation as the dashboard.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin player_report                       # leaderboard by kills
//! cargo run --bin player_report -- --sort level       # leaderboard by mod level
//! cargo run --bin player_report -- --roster           # players with online flag
//! cargo run --bin player_report -- --uuid <UUID>      # one player in detail
//! ```
//!
//! ## Environment Variables
//!
//! Same as the dashboard (`SFTP_HOST`, `SFTP_USER`, `SFTP_PASS`,
//! `LOCAL_SERVER_ROOT`, `WORLD_DIR`, `ENABLE_QUERY`, ...). `RUST_LOG`
//! defaults to `warn` so stdout stays clean JSON.

use std::env;
use std::sync::Arc;
use worldstats::{
    player::{roster, sort_leaderboard},
    DashboardConfig, PlayerAggregator, PlayerCache, SortKey,
};

#[derive(Debug, Default)]
struct ReportArgs {
    uuid: Option<String>,
    sort: SortKey,
    roster: bool,
}

fn parse_args() -> ReportArgs {
    let args: Vec<String> = env::args().skip(1).collect();
    let value_of = |flag: &str| {
        args.iter()
            .position(|a| a == flag)
            .and_then(|idx| args.get(idx + 1))
            .cloned()
    };

    ReportArgs {
        uuid: value_of("--uuid"),
        sort: value_of("--sort")
            .map(|s| SortKey::parse_or_default(&s))
            .unwrap_or_default(),
        roster: args.iter().any(|a| a == "--roster"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let args = parse_args();
    let config = DashboardConfig::from_env()?;

    let cache = Arc::new(PlayerCache::new(config.cache_ttl));
    let mut aggregator = PlayerAggregator::new(config.connector()?, cache, config.world_dir.clone());
    if let Some(status) = config.status_query() {
        aggregator = aggregator.with_status_query(status);
    }
    log::info!("📂 Reading {}", aggregator.describe());

    let output = if let Some(uuid) = &args.uuid {
        match aggregator.fetch_details_for(uuid).await? {
            Some(detail) => serde_json::to_string_pretty(&detail)?,
            None => {
                eprintln!("No statistics for player {}", uuid);
                std::process::exit(1);
            }
        }
    } else if args.roster {
        let summaries = aggregator.fetch_summary_for_all().await?;
        let online = aggregator.fetch_online_players().await;
        serde_json::to_string_pretty(&serde_json::json!({
            "online": online.count,
            "players": roster(&summaries, &online),
        }))?
    } else {
        let mut summaries = aggregator.fetch_summary_for_all().await?;
        sort_leaderboard(&mut summaries, args.sort);
        serde_json::to_string_pretty(&serde_json::json!({
            "sort": args.sort,
            "players": summaries,
        }))?
    };

    println!("{}", output);
    Ok(())
}
