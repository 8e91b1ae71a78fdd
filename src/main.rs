use {
    std::sync::Arc,
    tokio::sync::{mpsc, RwLock},
    worldstats::{
        config::Backend,
        state::{spawn_refresh_task, DashboardState, RefreshCommand},
        DashboardConfig, PlayerAggregator, PlayerCache, SortKey,
    },
};

/// Pending UI commands; extra key presses beyond this are dropped
const COMMAND_BUFFER: usize = 8;

#[tokio::main]
pub async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Logs go to stderr; the dashboard draws on the alternate screen
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = DashboardConfig::from_env()?;

    log::info!("🚀 Starting worldstats...");
    log::info!("📊 Configuration:");
    match &config.backend {
        Backend::Sftp {
            host,
            port,
            credentials,
        } => log::info!("   Source: sftp://{}@{}:{}", credentials.user, host, port),
        Backend::Local { root } => log::info!("   Source: {}", root.display()),
    }
    log::info!("   World: {}", config.world_dir);
    log::info!("   Cache TTL: {}s", config.cache_ttl.as_secs());
    log::info!("   Refresh: {}s", config.refresh_interval.as_secs());
    log::info!(
        "   Status query: {}",
        if config.enable_query {
            format!("{}:{}", config.mc_host, config.mc_port)
        } else {
            "disabled".to_string()
        }
    );

    let cache = Arc::new(PlayerCache::new(config.cache_ttl));
    let mut aggregator = PlayerAggregator::new(config.connector()?, cache, config.world_dir.clone());
    if let Some(status) = config.status_query() {
        aggregator = aggregator.with_status_query(status);
    }
    let source = aggregator.describe();

    let state = Arc::new(RwLock::new(DashboardState::new(SortKey::default())));
    let (tx, rx) = mpsc::channel::<RefreshCommand>(COMMAND_BUFFER);

    let refresh_handle = spawn_refresh_task(aggregator, state.clone(), config.refresh_interval, rx);

    log::info!("✅ Dashboard ready");
    let ui_result = worldstats::ui::run_ui(state, tx, source).await;

    refresh_handle.abort();
    if let Err(e) = &ui_result {
        log::error!("❌ UI error: {}", e);
    }
    log::info!("👋 Shutting down");
    ui_result
}
