// src/store/mod.rs
//! Deduplicating news store.
//!
//! Uniqueness is enforced on the canonical URL (the `"#"` sentinel excluded)
//! and on the title fingerprint. Hitting either constraint is the ordinary
//! [`InsertOutcome::Duplicate`] outcome, not an error.

pub mod file;
pub mod index;
pub mod memory;
pub mod watermark;

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::StorageError;
use crate::news::{Category, NewNewsItem, NewsItem};

pub use file::JsonFileStore;
pub use index::NewsIndex;
pub use memory::MemoryStore;
pub use watermark::{FileWatermark, MemoryWatermark, Watermark};

pub const DEFAULT_EXPORT_LIMIT: usize = 1000;

/// Which uniqueness constraint rejected an insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateKey {
    Url,
    Fingerprint,
}

impl DuplicateKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicateKey::Url => "url",
            DuplicateKey::Fingerprint => "fingerprint",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(Uuid),
    Duplicate(DuplicateKey),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub total_news: usize,
    pub last_update: Option<DateTime<Utc>>,
    /// Item count per source display name.
    pub sources: BTreeMap<String, usize>,
}

#[async_trait]
pub trait NewsStore: Send + Sync {
    async fn insert(&self, item: NewNewsItem) -> Result<InsertOutcome, StorageError>;

    /// Point lookup by URL. The sentinel never exists.
    async fn exists(&self, url: &str) -> Result<bool, StorageError>;

    async fn query_all(&self, limit: usize) -> Result<Vec<NewsItem>, StorageError>;

    async fn query_by_category(
        &self,
        category: Category,
        limit: usize,
    ) -> Result<Vec<NewsItem>, StorageError>;

    async fn query_recent(&self, since: NaiveDate) -> Result<Vec<NewsItem>, StorageError>;

    /// Remove items with `published_date < cutoff`; returns how many went.
    async fn purge_older_than(&self, cutoff: NaiveDate) -> Result<usize, StorageError>;

    /// Remove everything and reset the watermark.
    async fn clear_all(&self) -> Result<(), StorageError>;

    async fn stats(&self) -> Result<StoreStats, StorageError>;

    /// Pretty JSON array of up to `limit` items, newest first.
    async fn export_json(&self, limit: usize) -> Result<String, StorageError> {
        let items = self.query_all(limit).await?;
        Ok(serde_json::to_string_pretty(&items)?)
    }
}

/// Write `bytes` to a sibling temp file, then rename over `path`.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| StorageError::io(dir, e))?;
    }
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes)
        .await
        .map_err(|e| StorageError::io(&tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| StorageError::io(path, e))?;
    Ok(())
}
