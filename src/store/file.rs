// src/store/file.rs
//! Durable store: `<data_dir>/news.json` rewritten (tmp + rename) after every
//! mutation. A failed write rolls the in-memory index back so both views
//! stay identical.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::Mutex;

use crate::error::StorageError;
use crate::news::{Category, NewNewsItem, NewsItem};
use crate::store::{write_atomic, InsertOutcome, NewsIndex, NewsStore, StoreStats, Watermark};

pub const NEWS_FILE: &str = "news.json";

pub struct JsonFileStore {
    path: PathBuf,
    index: Mutex<NewsIndex>,
    watermark: Arc<dyn Watermark>,
}

impl JsonFileStore {
    /// Load `<data_dir>/news.json` if present, otherwise start empty.
    pub async fn open(
        data_dir: impl AsRef<Path>,
        watermark: Arc<dyn Watermark>,
    ) -> Result<Self, StorageError> {
        let path = data_dir.as_ref().join(NEWS_FILE);
        let index = match tokio::fs::read_to_string(&path).await {
            Ok(s) if s.trim().is_empty() => NewsIndex::default(),
            Ok(s) => {
                let rows: Vec<NewsItem> = serde_json::from_str(&s).map_err(|e| {
                    StorageError::Corrupt(format!("{}: {e}", path.display()))
                })?;
                let (index, dropped) = NewsIndex::from_items(rows);
                if dropped > 0 {
                    tracing::warn!(target: "store", dropped, "conflicting rows dropped on load");
                }
                index
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => NewsIndex::default(),
            Err(e) => return Err(StorageError::io(&path, e)),
        };
        tracing::info!(target: "store", path = %path.display(), items = index.len(), "news store opened");
        Ok(Self {
            path,
            index: Mutex::new(index),
            watermark,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, index: &NewsIndex) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(&index.snapshot())?;
        write_atomic(&self.path, &bytes).await
    }
}

#[async_trait]
impl NewsStore for JsonFileStore {
    async fn insert(&self, item: NewNewsItem) -> Result<InsertOutcome, StorageError> {
        let mut idx = self.index.lock().await;
        let outcome = idx.insert(item, Utc::now());
        if let InsertOutcome::Inserted(id) = outcome {
            if let Err(e) = self.persist(&idx).await {
                idx.remove(&id);
                return Err(e);
            }
        }
        Ok(outcome)
    }

    async fn exists(&self, url: &str) -> Result<bool, StorageError> {
        Ok(self.index.lock().await.contains_url(url))
    }

    async fn query_all(&self, limit: usize) -> Result<Vec<NewsItem>, StorageError> {
        Ok(self.index.lock().await.newest(limit))
    }

    async fn query_by_category(
        &self,
        category: Category,
        limit: usize,
    ) -> Result<Vec<NewsItem>, StorageError> {
        Ok(self.index.lock().await.in_category(category, limit))
    }

    async fn query_recent(&self, since: NaiveDate) -> Result<Vec<NewsItem>, StorageError> {
        Ok(self.index.lock().await.since(since))
    }

    async fn purge_older_than(&self, cutoff: NaiveDate) -> Result<usize, StorageError> {
        let mut idx = self.index.lock().await;
        let removed = idx.purge_before(cutoff);
        if removed.is_empty() {
            return Ok(0);
        }
        let n = removed.len();
        if let Err(e) = self.persist(&idx).await {
            for item in removed {
                idx.restore(item);
            }
            return Err(e);
        }
        Ok(n)
    }

    async fn clear_all(&self) -> Result<(), StorageError> {
        {
            let mut idx = self.index.lock().await;
            let old = idx.clear();
            if let Err(e) = self.persist(&idx).await {
                for item in old {
                    idx.restore(item);
                }
                return Err(e);
            }
        }
        self.watermark.reset().await
    }

    async fn stats(&self) -> Result<StoreStats, StorageError> {
        let (total_news, sources) = {
            let idx = self.index.lock().await;
            (idx.len(), idx.source_counts())
        };
        Ok(StoreStats {
            total_news,
            last_update: self.watermark.get().await?,
            sources,
        })
    }
}
