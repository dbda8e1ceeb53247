// src/ingest/providers/mod.rs
pub mod mediastack;
pub mod newsapi;
pub mod placeholder;
pub mod rss;

use std::sync::Arc;
use std::time::Duration;

use crate::config::PipelineConfig;
use crate::ingest::types::SourceProvider;

use mediastack::{MediaStackProvider, MediaStackQuery};
use newsapi::NewsApiProvider;
use placeholder::PlaceholderProvider;
use rss::RssFeedProvider;

/// Shared HTTP client for every outbound provider.
pub fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("tunnel-news-pipeline/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Every configured source, in report order.
pub fn build_providers(cfg: &PipelineConfig) -> Vec<Arc<dyn SourceProvider>> {
    let client = http_client(cfg.orchestrator.provider_timeout);
    vec![
        Arc::new(MediaStackProvider::from_api(
            client.clone(),
            cfg.mediastack_base_url.clone(),
            cfg.mediastack_api_key.clone(),
            MediaStackQuery::for_phrases(&cfg.search_phrases),
        )),
        Arc::new(NewsApiProvider::new(
            client.clone(),
            cfg.newsapi_base_url.clone(),
            cfg.newsapi_api_key.clone(),
            &cfg.search_phrases,
        )),
        Arc::new(RssFeedProvider::from_urls(client, cfg.rss_feeds.clone())),
        Arc::new(PlaceholderProvider::local_press()),
        Arc::new(PlaceholderProvider::government_portals()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_all_sources_in_order() {
        let names: Vec<_> = build_providers(&PipelineConfig::default())
            .iter()
            .map(|p| p.name())
            .collect();
        assert_eq!(
            names,
            vec![
                "MediaStack",
                "NewsAPI",
                "RSS",
                PlaceholderProvider::LOCAL_PRESS,
                PlaceholderProvider::GOVERNMENT_PORTALS
            ]
        );
    }

    #[tokio::test]
    async fn unconfigured_sources_settle_empty() {
        // no keys, no feeds: nothing touches the network
        for p in build_providers(&PipelineConfig::default()) {
            let items = p.fetch_latest().await.expect("no failure without config");
            assert!(items.is_empty(), "{} returned items", p.name());
        }
    }

    #[tokio::test]
    async fn transport_errors_never_expose_api_keys() {
        // nothing listens on the discard port, every request fails
        let cfg = PipelineConfig {
            mediastack_api_key: Some("MEDIASTACKSECRET".into()),
            mediastack_base_url: "http://127.0.0.1:9/v1".into(),
            newsapi_api_key: Some("NEWSAPISECRET".into()),
            newsapi_base_url: "http://127.0.0.1:9/v2".into(),
            ..PipelineConfig::default()
        };
        let providers = build_providers(&cfg);
        let agg = crate::ingest::aggregate(&providers[..2], Duration::from_secs(5)).await;

        assert_eq!(agg.failed_providers(), 2);
        let json = serde_json::to_string(&agg.reports).unwrap();
        assert!(!json.contains("MEDIASTACKSECRET"), "{json}");
        assert!(!json.contains("NEWSAPISECRET"), "{json}");
    }
}
