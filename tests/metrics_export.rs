// tests/metrics_export.rs
//
// The Prometheus recorder is process-wide, so everything that touches it
// lives in this one test binary, in one test.

use std::sync::Arc;

use chrono::Utc;
use shuttle_axum::axum::{
    body::{self, Body},
    http::{Request, StatusCode},
};
use tower::ServiceExt as _;

use tunnel_news_pipeline::ingest::providers::mediastack::MediaStackProvider;
use tunnel_news_pipeline::ingest::types::SourceProvider;
use tunnel_news_pipeline::metrics::Metrics;
use tunnel_news_pipeline::pipeline::{OrchestratorConfig, UpdateOrchestrator};
use tunnel_news_pipeline::relevance::RelevanceFilter;
use tunnel_news_pipeline::store::{MemoryStore, MemoryWatermark};

#[tokio::test]
async fn update_run_shows_up_on_metrics_endpoint() {
    let metrics = Metrics::init(30).expect("recorder installs");

    let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();
    let fixture = include_str!("fixtures/mediastack.json").replace("{{TODAY}}", &today);
    let providers: Vec<Arc<dyn SourceProvider>> =
        vec![Arc::new(MediaStackProvider::from_fixture(&fixture))];
    let wm = Arc::new(MemoryWatermark::new());
    let orch = UpdateOrchestrator::new(
        providers,
        Arc::new(MemoryStore::new(wm.clone())),
        wm,
        RelevanceFilter::default(),
        OrchestratorConfig::default(),
    );
    assert!(orch.run().await.is_completed());

    let rendered = metrics.handle.render();
    assert!(rendered.contains("news_update_runs_total"), "{rendered}");
    assert!(rendered.contains("news_added_total"), "{rendered}");
    assert!(rendered.contains("news_retention_days"), "{rendered}");

    let resp = metrics
        .router()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .expect("build GET"),
        )
        .await
        .expect("oneshot");
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    let text = String::from_utf8_lossy(&bytes);
    assert!(text.contains("news_update_runs_total{outcome=\"completed\"} 1"), "{text}");
}
