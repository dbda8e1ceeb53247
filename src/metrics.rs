use anyhow::Context;
use shuttle_axum::axum::{routing::get, Router};
use metrics::gauge;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

static GLOBAL: OnceCell<Metrics> = OnceCell::new();

impl Metrics {
    /// Install the process-wide Prometheus recorder (first call only) and
    /// publish the static retention gauge.
    pub fn init(retention_days: i64) -> anyhow::Result<&'static Self> {
        let m = GLOBAL.get_or_try_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .context("prometheus: install recorder")?;
            Ok::<_, anyhow::Error>(Self { handle })
        })?;
        crate::ingest::ensure_metrics_described();
        gauge!("news_retention_days").set(retention_days as f64);
        Ok(m)
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
