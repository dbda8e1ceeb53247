// src/store/watermark.rs
//! "Last successful update" timestamp used by the scheduler's
//! already-ran-today check.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::StorageError;
use crate::store::write_atomic;

pub const WATERMARK_FILE: &str = "last_update.json";

#[async_trait]
pub trait Watermark: Send + Sync {
    async fn get(&self) -> Result<Option<DateTime<Utc>>, StorageError>;
    async fn set(&self, at: DateTime<Utc>) -> Result<(), StorageError>;
    async fn reset(&self) -> Result<(), StorageError>;
}

#[derive(Debug, Default)]
pub struct MemoryWatermark {
    inner: Mutex<Option<DateTime<Utc>>>,
}

impl MemoryWatermark {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Watermark for MemoryWatermark {
    async fn get(&self) -> Result<Option<DateTime<Utc>>, StorageError> {
        Ok(*self.inner.lock().await)
    }

    async fn set(&self, at: DateTime<Utc>) -> Result<(), StorageError> {
        *self.inner.lock().await = Some(at);
        Ok(())
    }

    async fn reset(&self) -> Result<(), StorageError> {
        *self.inner.lock().await = None;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WatermarkState {
    last_update: Option<DateTime<Utc>>,
}

/// `<data_dir>/last_update.json`, `{ "last_update": RFC3339 | null }`.
#[derive(Debug)]
pub struct FileWatermark {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileWatermark {
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: data_dir.into().join(WATERMARK_FILE),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    async fn write(&self, state: &WatermarkState) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(state)?;
        write_atomic(&self.path, &bytes).await
    }
}

#[async_trait]
impl Watermark for FileWatermark {
    async fn get(&self) -> Result<Option<DateTime<Utc>>, StorageError> {
        let _g = self.lock.lock().await;
        match tokio::fs::read_to_string(&self.path).await {
            Ok(s) => match serde_json::from_str::<WatermarkState>(&s) {
                Ok(state) => Ok(state.last_update),
                Err(e) => {
                    // unreadable watermark means "never ran", the next run rewrites it
                    tracing::warn!(target: "store", path = %self.path.display(), error = %e, "watermark unreadable");
                    Ok(None)
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(&self.path, e)),
        }
    }

    async fn set(&self, at: DateTime<Utc>) -> Result<(), StorageError> {
        let _g = self.lock.lock().await;
        self.write(&WatermarkState {
            last_update: Some(at),
        })
        .await
    }

    async fn reset(&self) -> Result<(), StorageError> {
        let _g = self.lock.lock().await;
        self.write(&WatermarkState::default()).await
    }
}
