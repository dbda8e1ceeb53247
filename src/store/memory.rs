// src/store/memory.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;

use crate::error::StorageError;
use crate::news::{Category, NewNewsItem, NewsItem};
use crate::store::{InsertOutcome, NewsIndex, NewsStore, StoreStats, Watermark};

/// Volatile store. Same indexes and semantics as [`super::JsonFileStore`],
/// nothing survives a restart.
pub struct MemoryStore {
    index: RwLock<NewsIndex>,
    watermark: Arc<dyn Watermark>,
}

impl MemoryStore {
    pub fn new(watermark: Arc<dyn Watermark>) -> Self {
        Self {
            index: RwLock::new(NewsIndex::default()),
            watermark,
        }
    }
}

#[async_trait]
impl NewsStore for MemoryStore {
    async fn insert(&self, item: NewNewsItem) -> Result<InsertOutcome, StorageError> {
        Ok(self.index.write().await.insert(item, Utc::now()))
    }

    async fn exists(&self, url: &str) -> Result<bool, StorageError> {
        Ok(self.index.read().await.contains_url(url))
    }

    async fn query_all(&self, limit: usize) -> Result<Vec<NewsItem>, StorageError> {
        Ok(self.index.read().await.newest(limit))
    }

    async fn query_by_category(
        &self,
        category: Category,
        limit: usize,
    ) -> Result<Vec<NewsItem>, StorageError> {
        Ok(self.index.read().await.in_category(category, limit))
    }

    async fn query_recent(&self, since: NaiveDate) -> Result<Vec<NewsItem>, StorageError> {
        Ok(self.index.read().await.since(since))
    }

    async fn purge_older_than(&self, cutoff: NaiveDate) -> Result<usize, StorageError> {
        Ok(self.index.write().await.purge_before(cutoff).len())
    }

    async fn clear_all(&self) -> Result<(), StorageError> {
        self.index.write().await.clear();
        self.watermark.reset().await
    }

    async fn stats(&self) -> Result<StoreStats, StorageError> {
        let (total_news, sources) = {
            let idx = self.index.read().await;
            (idx.len(), idx.source_counts())
        };
        Ok(StoreStats {
            total_news,
            last_update: self.watermark.get().await?,
            sources,
        })
    }
}
