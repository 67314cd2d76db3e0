use std::sync::Arc;

use fundboard_proto::config::Config;
use fundboard_proto::protocol::Severity;
use fundboard_sync::{
    http, CoreBroadcast, CoreConfig, CoreEvent, DashboardCore, HttpReportService, ReportService,
};
use tokio::sync::{broadcast, mpsc};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = fundboard_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;

    let log_path = data_dir.join("fundboard.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Allow RUST_LOG override; default to debug for app code but suppress noisy
    // connection-level DEBUG from HTTP client internals (hyper_util, reqwest).
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    eprintln!("fundboard log: {}", log_path.display());
    tracing::info!("fundboard starting…");

    // ── Load config ──────────────────────────────────────────────────────────
    let config = Config::load().unwrap_or_default();
    let service = Arc::new(HttpReportService::new(&config.api)?);
    tracing::info!("analysis backend: {}", config.api.base_url);

    // Settings are informational only; a failure here is not fatal.
    match service.fetch_settings().await {
        Ok(settings) => tracing::info!(
            "backend settings: provider={:?} provider_key={} search_key={}",
            settings.llm_provider,
            settings.provider_key_configured(),
            settings.search_key_configured()
        ),
        Err(e) => tracing::warn!("backend settings unavailable: {}", e),
    }

    // ── Channels ─────────────────────────────────────────────────────────────
    let (broadcast_tx, mut broadcast_rx) = broadcast::channel::<CoreBroadcast>(1024);
    let (event_tx, event_rx) = mpsc::channel::<CoreEvent>(1024);

    // ── Build DashboardCore ──────────────────────────────────────────────────
    let core = DashboardCore::new(
        CoreConfig::from_config(&config),
        service,
        broadcast_tx,
        event_tx,
    );
    let handle = core.handle();

    if config.http.enabled {
        http::start_server(
            config.http.bind_address.clone(),
            config.http.port,
            handle.clone(),
        );
    }

    let core_task = tokio::spawn(core.run(event_rx));

    handle.refresh().await?;
    if config.polling.auto_start {
        handle.start_polling().await?;
    }

    // ── Echo notices until interrupted ───────────────────────────────────────
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            msg = broadcast_rx.recv() => match msg {
                Ok(CoreBroadcast::Notice(notice)) => {
                    let tag = match notice.severity {
                        Severity::Info => "info",
                        Severity::Success => "ok",
                        Severity::Warning => "warn",
                        Severity::Error => "error",
                    };
                    eprintln!("[{}] {}", tag, notice.message);
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::debug!("notice echo lagged by {}", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    tracing::info!("fundboard shutting down");
    handle.shutdown().await;
    core_task.await?;
    Ok(())
}
