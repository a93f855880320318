use anyhow::Result;
use chrono::Utc;
use cronwatch_server::app;
use cronwatch_server::config::ServerConfig;
use cronwatch_server::scanner::MissedRunScanner;
use cronwatch_server::state::AppState;
use cronwatch_storage::MonitorStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("cronwatch=info".parse()?))
        .init();

    cronwatch_common::id::init(1, 1);

    let args: Vec<String> = std::env::args().collect();
    let config_path = args
        .get(1)
        .map(|s| s.as_str())
        .unwrap_or("config/server.toml");
    let config = ServerConfig::load(config_path)?;

    tracing::info!(
        http_port = config.http_port,
        db = %config.database.url,
        "cronwatch-server starting"
    );

    std::fs::create_dir_all(&config.database.data_dir)?;
    let store = Arc::new(MonitorStore::new(&config.database.url).await?);

    let notifier = Arc::new(config.notify.build_manager());
    tracing::info!(
        channels = notifier.channel_count(),
        "Notification channels ready"
    );

    let state = AppState {
        store: store.clone(),
        notifier: notifier.clone(),
        config: Arc::new(config.clone()),
        start_time: Utc::now(),
    };

    // Background missed-run scanner. A fault inside the task never takes
    // the server down with it.
    let scanner_handle = if config.scanner.enabled {
        let scanner = MissedRunScanner::new(
            store.clone(),
            notifier.clone(),
            config.scanner.tick_secs,
            config.scanner.missed_threshold_secs,
        );
        Some(tokio::spawn(async move {
            scanner.run().await;
        }))
    } else {
        tracing::info!("Missed-run scanner disabled");
        None
    };

    let http_addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    let app = app::build_http_app(state);
    let listener = tokio::net::TcpListener::bind(http_addr).await?;
    tracing::info!(http = %http_addr, "Server started");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            signal::ctrl_c().await.ok();
        })
        .await
    {
        tracing::error!(error = %e, "HTTP server error");
    }

    if let Some(handle) = scanner_handle {
        handle.abort();
    }
    tracing::info!("Server stopped");

    Ok(())
}
