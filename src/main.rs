use liqguard::api;
use liqguard::{
    Config, LiquidationMonitor, LoggingPayout, MonitorConfig, Payout, PolicyStore,
    PremiumCalculator, PriceFeed, PythPriceFeed, ResolutionHandler,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let port = config.port;

    let store = Arc::new(PolicyStore::new());
    let payout: Arc<dyn Payout> = Arc::new(LoggingPayout);
    let resolver = Arc::new(ResolutionHandler::new(store.clone(), payout));
    let feed: Arc<dyn PriceFeed> = Arc::new(PythPriceFeed::new(config.price_feed_url.clone()));

    let monitor = LiquidationMonitor::new(
        feed,
        store.clone(),
        resolver.clone(),
        MonitorConfig::from_config(&config),
    );
    let latest_price = monitor.subscribe();

    let shutdown = CancellationToken::new();
    let monitor_token = shutdown.clone();
    let monitor_task = tokio::spawn(async move { monitor.run(monitor_token).await });

    // Create router
    let calculator = PremiumCalculator::new(config.loading_factor);
    let app = api::create_router(api::AppState::new(store, calculator, resolver, latest_price));

    // Bind to address
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on {}", addr);

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for ctrl-c: {}", e);
        }
        signal_token.cancel();
    });

    // Run server
    let server_token = shutdown.clone();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move { server_token.cancelled().await })
        .await;

    shutdown.cancel();
    if let Err(e) = monitor_task.await {
        tracing::warn!("Monitor task ended abnormally: {}", e);
    }

    if let Err(e) = served {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
