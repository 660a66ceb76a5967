//! Kursmon Binary
//!
//! Watches USD/KZT and RUB/KZT and reports threshold crossings to Telegram.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kursmon_common::system_clock;
use kursmon_fx::KursKzSource;
use kursmon_history::SqliteHistoryStore;
use kursmon_monitor::{CycleRequest, MonitorConfig, MonitorService, Scheduler, TelegramNotifier};

#[derive(Parser, Debug)]
#[command(name = "kursmon")]
#[command(about = "KZT exchange rate monitor")]
struct Args {
    /// Run a single scheduled cycle and exit
    #[arg(long, conflicts_with = "trigger")]
    once: bool,

    /// Run a single manual cycle (always notifies, does not persist) and exit
    #[arg(long)]
    trigger: bool,

    /// Chat to notify for --trigger instead of TELEGRAM_CHAT_ID
    #[arg(long, requires = "trigger")]
    chat_id: Option<String>,

    /// Override the schedule interval
    #[arg(long)]
    interval_secs: Option<u64>,
}

fn init_tracing(config: &MonitorConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));

    let json = config.log_json.then(|| tracing_subscriber::fmt::layer().json());
    let text = (!config.log_json).then(|| tracing_subscriber::fmt::layer());

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(text)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = MonitorConfig::from_env();
    if let Some(secs) = args.interval_secs {
        config.schedule.interval = Duration::from_secs(secs);
    }

    init_tracing(&config);
    info!("Starting kursmon");

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }

    let clock = system_clock();
    let store = Arc::new(SqliteHistoryStore::open(&config.history.database_path, clock.clone()).await?);
    let source = Arc::new(KursKzSource::new(config.source.url.clone(), config.source.timeout)?);
    let notifier = Arc::new(TelegramNotifier::new(&config.telegram)?);

    info!(
        database = store.location(),
        source = %config.source.url,
        interval_secs = config.schedule.interval.as_secs(),
        "Components initialized"
    );

    let service = Arc::new(MonitorService::from_config(
        &config,
        source,
        store.clone(),
        notifier,
        clock,
    ));

    let result = if args.trigger {
        service
            .trigger(args.chat_id.as_deref())
            .await
            .map(|report| info!(alerts = report.alerts.len(), "Manual cycle complete"))
            .map_err(anyhow::Error::from)
    } else if args.once {
        service
            .run_cycle(&CycleRequest::scheduled(service.default_destination()))
            .await
            .map(|report| info!(alerts = report.alerts.len(), notified = report.notified, "Cycle complete"))
            .map_err(anyhow::Error::from)
    } else {
        run_scheduler(service.clone(), config.schedule.interval).await
    };

    info!(metrics = %service.metrics().to_prometheus(), "Final metrics");
    store.close().await;

    if let Err(e) = &result {
        error!(error = %e, "kursmon exiting with error");
    }
    result
}

async fn run_scheduler(service: Arc<MonitorService>, interval: Duration) -> anyhow::Result<()> {
    let scheduler = Arc::new(Scheduler::new(service, interval)?);

    let scheduler_clone = scheduler.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            return;
        }
        info!("Shutdown signal received");
        scheduler_clone.stop().await;
    });

    scheduler.run().await?;

    info!("Kursmon shutdown complete");
    Ok(())
}
