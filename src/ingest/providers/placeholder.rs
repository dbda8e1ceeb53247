// src/ingest/providers/placeholder.rs
use async_trait::async_trait;

use crate::error::ProviderError;
use crate::ingest::types::SourceProvider;
use crate::news::Candidate;

/// Declared source with no integration yet. Always settles with zero items.
pub struct PlaceholderProvider {
    name: &'static str,
}

impl PlaceholderProvider {
    pub const LOCAL_PRESS: &'static str = "Imprensa local";
    pub const GOVERNMENT_PORTALS: &'static str = "Portais de governo";

    pub fn new(name: &'static str) -> Self {
        Self { name }
    }

    pub fn local_press() -> Self {
        Self::new(Self::LOCAL_PRESS)
    }

    pub fn government_portals() -> Self {
        Self::new(Self::GOVERNMENT_PORTALS)
    }
}

#[async_trait]
impl SourceProvider for PlaceholderProvider {
    async fn fetch_latest(&self) -> Result<Vec<Candidate>, ProviderError> {
        tracing::debug!(target: "ingest", provider = self.name, "placeholder source, nothing to fetch");
        Ok(Vec::new())
    }

    fn name(&self) -> &'static str {
        self.name
    }
}
