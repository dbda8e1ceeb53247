// src/ingest/types.rs
use serde::Serialize;

use crate::error::ProviderError;
use crate::news::Candidate;

/// Raw record as a provider sees it, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawArticle {
    pub title: Option<String>,
    pub source: Option<String>,
    pub published: Option<String>, // RFC 3339, RFC 2822 or YYYY-MM-DD
    pub summary: Option<String>,
    pub url: Option<String>,
    pub image_url: Option<String>,
}

#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<Candidate>, ProviderError>;
    fn name(&self) -> &'static str;
}

/// Per-provider outcome of one aggregation.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProviderReport {
    pub provider: String,
    pub fetched: usize,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProviderReport {
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}
