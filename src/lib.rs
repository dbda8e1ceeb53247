// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod news;
pub mod pipeline;
pub mod relevance;
pub mod store;

use std::sync::Arc;

use anyhow::Context;

pub use crate::api::create_router as router;
pub use crate::config::PipelineConfig;
pub use crate::pipeline::{RunOutcome, UpdateOrchestrator};

use crate::ingest::providers::build_providers;
use crate::store::{FileWatermark, JsonFileStore, Watermark};

/// Wire the durable store, watermark, providers and filter from config.
pub async fn build_orchestrator(cfg: &PipelineConfig) -> anyhow::Result<Arc<UpdateOrchestrator>> {
    let watermark: Arc<dyn Watermark> = Arc::new(FileWatermark::in_dir(&cfg.data_dir));
    let store = JsonFileStore::open(&cfg.data_dir, watermark.clone())
        .await
        .with_context(|| format!("opening news store in {}", cfg.data_dir.display()))?;
    let filter = cfg.relevance_filter().context("loading relevance keywords")?;

    tracing::info!(
        target: "ingest",
        strategy = filter.strategy_name(),
        data_dir = %cfg.data_dir.display(),
        "orchestrator ready"
    );

    Ok(Arc::new(UpdateOrchestrator::new(
        build_providers(cfg),
        Arc::new(store),
        watermark,
        filter,
        cfg.orchestrator,
    )))
}
