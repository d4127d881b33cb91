use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bingx_signal_bot::bingx::auth::BingxAuth;
use bingx_signal_bot::bingx::BingxClient;
use bingx_signal_bot::config::Config;
use bingx_signal_bot::jobs::JobContext;
use bingx_signal_bot::scheduler::{self, Scheduler};
use bingx_signal_bot::storage::Store;
use bingx_signal_bot::telegram::TelegramNotifier;
use bingx_signal_bot::webhook::{self, AppState};

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("🚀 BingX Signal Bot - Starting...");

    // Load configuration
    let config = Config::load()?;
    info!("✅ Configuration loaded");
    info!("   Server: {}:{}", config.server.bind_addr, config.server.port);
    info!("   Database: {}", config.database.url);
    info!("   Paper trading: {}", config.trading.paper_trading);
    info!("   Auto trading: {}", config.trading.auto_trading_enabled);

    // Open the store (the default URL keeps the database under data/)
    if config.database.url.contains("data/") {
        std::fs::create_dir_all("data").ok();
    }
    let store = Store::connect(&config.database.url).await?;
    info!("✅ Store ready");

    // Initialize Telegram notifier
    let telegram = Arc::new(TelegramNotifier::new(config.telegram.clone()));
    if config.telegram.enabled {
        info!("📱 Telegram notifications enabled");
        let delivery = telegram
            .notify_startup(&config.server.bind_addr, config.server.port)
            .await;
        if delivery.ok {
            info!("📱 Startup notification sent");
        } else {
            warn!("Startup notification not sent: {}", delivery.detail);
        }
    } else {
        info!("📱 Telegram notifications disabled in config");
    }

    // Initialize BingX REST client
    let auth = match (&config.bingx.api_key, &config.bingx.api_secret) {
        (Some(api_key), Some(api_secret)) if !api_key.is_empty() => {
            Some(BingxAuth::new(api_key.clone(), api_secret.clone()))
        }
        _ => {
            warn!("BingX API credentials not configured; private endpoints unavailable");
            None
        }
    };
    let bingx = Arc::new(BingxClient::new(
        config.bingx.rest_url.clone(),
        auth,
        config.bingx.recv_window,
    ));
    info!("✅ REST client initialized");

    // Webhook/API server
    let state = AppState::new(
        Arc::clone(&config),
        store.clone(),
        Arc::clone(&bingx),
        Arc::clone(&telegram),
    );
    let server_task = tokio::spawn(async move { webhook::serve(state).await });
    info!("✅ Webhook server task started");

    // Scheduled jobs
    let ctx = Arc::new(JobContext {
        config: Arc::clone(&config),
        store,
        bingx,
        telegram: Arc::clone(&telegram),
    });
    let specs = scheduler::catalog(&config.jobs);
    let scheduler = Scheduler::new(ctx);
    let job_handles = scheduler.spawn_all(&specs);
    info!("✅ {} jobs scheduled", job_handles.len());

    // Wait for shutdown
    tokio::select! {
        result = server_task => {
            match result {
                Ok(Err(e)) => warn!("Webhook server error: {}", e),
                Err(e) => warn!("Webhook server task error: {}", e),
                _ => {}
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    for handle in job_handles {
        handle.abort();
    }

    if config.telegram.enabled {
        let delivery = telegram.notify_shutdown().await;
        if !delivery.ok {
            warn!("Failed to send shutdown notification: {}", delivery.detail);
        }
    }

    info!("👋 Bot stopped");
    Ok(())
}
