//! News pipeline service binary entrypoint.
//! Boots the Axum HTTP server, the daily scheduler and the metrics exporter.

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tunnel_news_pipeline::api::{self, AppState};
use tunnel_news_pipeline::metrics::Metrics;
use tunnel_news_pipeline::pipeline::spawn_daily_scheduler;
use tunnel_news_pipeline::{build_orchestrator, PipelineConfig};

const DEFAULT_FILTER: &str = "info,ingest=info,store=info,scheduler=info,api=info";

/// Compact logs by default, JSON lines when `NEWS_LOG_JSON=1`.
/// `RUST_LOG` overrides the filter.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry().with(filter);
    let res = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    // the runtime may already have installed a subscriber
    if let Err(e) = res {
        eprintln!("tracing init skipped: {e}");
    }
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    let cfg = PipelineConfig::from_env()?;
    init_tracing(cfg.log_json);

    // recorder first, a catch-up run may start right away
    let metrics = Metrics::init(cfg.orchestrator.retention_days)?;
    let orchestrator = build_orchestrator(&cfg).await?;

    if cfg.scheduler_enabled {
        let _ = spawn_daily_scheduler(orchestrator.clone(), cfg.schedule);
        tracing::info!(
            target: "scheduler",
            at = %cfg.schedule.target,
            offset = %cfg.schedule.offset,
            "daily scheduler started"
        );
    } else {
        tracing::info!(target: "scheduler", "scheduler disabled, updates only via /api/cron/update-news");
    }

    let state = AppState::new(orchestrator, cfg.cron_secret.clone());
    let router = api::create_router(state).merge(metrics.router());

    Ok(router.into())
}
