use std::net::SocketAddr;
use std::sync::Arc;

use flowmeta::{AppState, Component, Config, MetricsRegistry, Result, StaticPoller, create_router};
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Загружаем .env файл
    dotenvy::dotenv().ok();

    // Инициализация логирования
    setup_tracing();

    let config = Config::from_env();

    tracing::info!(
        "Loaded configuration for {} static sampler(s), {} worker(s)",
        config.samplers.len(),
        config.poller.workers
    );
    for sampler in &config.samplers {
        tracing::info!(
            "  - Samplers {} with {} interface(s)",
            sampler.address,
            sampler.interfaces.len()
        );
    }

    let addr: SocketAddr = config.server_addr.parse().map_err(|e| {
        tracing::error!("Invalid server address: {}", e);
        e
    })?;

    let metrics = MetricsRegistry::new();
    let poller = StaticPoller::new(&config.samplers);
    let component = Component::new(config, metrics.clone(), poller).map_err(|e| {
        tracing::error!("Refusing to start: {}", e);
        e
    })?;
    component.start().await?;
    let component = Arc::new(component);

    let state = Arc::new(AppState {
        metrics,
        component: component.clone(),
    });

    // Канал завершения (graceful shutdown)
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    // Ожидание Ctrl+C
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        tracing::error!("Failed to bind address: {}", e);
        e
    })?;

    tracing::info!("Flowmeta starting on {}", addr);
    tracing::info!("Endpoints:");
    tracing::info!("  - GET /health        - Health check");
    tracing::info!("  - GET /metrics       - Prometheus metrics");
    tracing::info!("  - GET /api/v0/lookup - Interface lookup");

    // Запуск сервера с graceful shutdown
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.wait_for(|stop| *stop).await;
            tracing::info!("HTTP server shutting down");
        })
        .await;

    // Сохраняем кэш даже если сервер завершился с ошибкой
    let stopped = component.stop().await;

    shutdown_result(served, stopped)
}

/// Logs both outcomes and returns the first failure
fn shutdown_result(served: std::io::Result<()>, stopped: Result<()>) -> Result<()> {
    if let Err(e) = &served {
        tracing::error!("Server error: {}", e);
    }
    if let Err(e) = &stopped {
        tracing::error!("Failed to stop interface metadata component: {}", e);
    }
    served?;
    stopped
}

fn setup_tracing() {
    // Если RUST_LOG не установлена, используем "info" по умолчанию
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
