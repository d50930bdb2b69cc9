//! Pushgate server binary entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use pushgate_common::config::{AppConfig, StatEngine};
use pushgate_common::redis_pool::create_redis_pool;
use pushgate_common::stats::{MemoryStatStore, RedisStatStore, StatStore};
use pushgate_engine::Dispatcher;
use pushgate_notifier::SenderRegistry;

use pushgate_api::routes::create_router;
use pushgate_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!("Starting Pushgate server...");

    // Load and check configuration
    let config = AppConfig::from_env()?;
    config.check()?;
    let config = Arc::new(config);

    let stats: Arc<dyn StatStore> = match config.stat_engine {
        StatEngine::Memory => Arc::new(MemoryStatStore::new()),
        StatEngine::Redis => {
            let redis = create_redis_pool(&config.redis_url).await?;
            Arc::new(RedisStatStore::new(redis))
        }
    };
    tracing::info!(engine = ?config.stat_engine, "Stat storage ready");

    let registry = SenderRegistry::from_config(&config, stats.clone());
    if registry.is_empty() {
        anyhow::bail!("no push platform could be initialized");
    }

    let dispatcher = Dispatcher::new(config.clone(), registry, stats);
    let workers = dispatcher.start_workers();

    let state = AppState::new(dispatcher, config.clone());
    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(sync = config.sync, "Pushgate listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    workers.shutdown();
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(
            "pushgate_api=info,pushgate_engine=info,pushgate_notifier=info,tower_http=info",
        )
    });

    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
