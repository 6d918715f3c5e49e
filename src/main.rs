use item_service::{
    api::{build_router, AppState},
    config::Config,
    handlers::{Dispatcher, HandlerRegistry},
    search::{IndexRegistry, ItemSearch},
    state::{seed_sample_content, InMemoryItemRepository, ItemRepository},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config_result = Config::load();
    let config = match config_result {
        Ok(ref config) => config.clone(),
        Err(_) => Config::default(),
    };

    init_tracing(&config);

    if let Err(e) = config_result {
        tracing::warn!("Failed to load configuration: {}", e);
        tracing::warn!("Using default configuration");
    }

    tracing::info!("Starting Item Service v{}", env!("CARGO_PKG_VERSION"));

    // Initialize Prometheus metrics
    if config.observability.prometheus_enabled {
        if let Err(e) = item_service::metrics::init_metrics() {
            tracing::warn!("Failed to initialize metrics: {}", e);
            tracing::warn!("Continuing without metrics");
        }
    } else {
        tracing::info!("Prometheus metrics disabled in configuration");
    }

    // Content repository
    let repository = Arc::new(InMemoryItemRepository::new(config.repository.clone()));
    if config.repository.seed_sample_content {
        for database in &config.repository.databases {
            let items = seed_sample_content(repository.as_ref(), database).await?;
            tracing::info!(database = %database, count = items.len(), "Sample content created");
        }
    }

    // Search indexes
    let indexes = Arc::new(IndexRegistry::open(&config.search)?);
    let repository: Arc<dyn ItemRepository> = repository;
    let search = Arc::new(ItemSearch::new(
        &config.search,
        &config.repository,
        indexes.clone(),
        repository.clone(),
    ));

    let items = repository.latest_versions().await?;
    let indexed = search.index_items(&items).await?;
    tracing::info!(indexed, indexes = ?indexes.index_ids(), "Search indexes populated");

    // Handlers
    let registry = HandlerRegistry::with_defaults(repository, search);
    tracing::info!(handlers = registry.len(), "Handler registry built");
    let dispatcher = Dispatcher::new(registry);

    let app_state = AppState::new(dispatcher, config.server.route_base.clone())
        .with_default_page_size(config.search.default_page_size);
    let app = build_router(app_state);

    // Start HTTP server
    let http_addr = format!("{}:{}", config.server.host, config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_addr).await?;

    tracing::info!("HTTP API server listening on http://{}", http_addr);
    tracing::info!("   Health check: http://{}/health", http_addr);
    tracing::info!("   Items: http://{}{}/item", http_addr, config.server.route_base);

    let http_handle = tokio::spawn(async move {
        let service = app.into_make_service_with_connect_info::<SocketAddr>();
        if let Err(e) = axum::serve(http_listener, service).await {
            tracing::error!("HTTP server error: {}", e);
        }
    });

    tokio::select! {
        _ = http_handle => {
            tracing::warn!("HTTP server stopped");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    tracing::info!("Shutting down gracefully...");
    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "item_service={},tower_http=info",
            config.observability.log_level
        )
        .into()
    });

    if config.observability.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
