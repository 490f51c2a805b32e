//! Mock metadata provider for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::library::{MetadataError, MetadataProvider};
use crate::media::{MediaKind, MediaMetadata};

/// Mock implementation of the MetadataProvider trait.
///
/// Results are keyed by the looked-up title; unknown titles yield no match.
#[derive(Debug, Default)]
pub struct MockMetadataProvider {
    results: Arc<RwLock<HashMap<String, MediaMetadata>>>,
    lookups: Arc<RwLock<Vec<String>>>,
    next_error: Arc<RwLock<Option<String>>>,
}

impl MockMetadataProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the result returned for `title`.
    pub async fn set_result(&self, title: &str, metadata: MediaMetadata) {
        self.results
            .write()
            .await
            .insert(title.to_string(), metadata);
    }

    /// Configure the next lookup to fail.
    pub async fn set_next_error(&self, message: &str) {
        *self.next_error.write().await = Some(message.to_string());
    }

    /// Titles looked up so far, in order.
    pub async fn recorded_lookups(&self) -> Vec<String> {
        self.lookups.read().await.clone()
    }
}

#[async_trait]
impl MetadataProvider for MockMetadataProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn lookup(
        &self,
        title: &str,
        _kind: &MediaKind,
    ) -> Result<Option<MediaMetadata>, MetadataError> {
        self.lookups.write().await.push(title.to_string());

        if let Some(message) = self.next_error.write().await.take() {
            return Err(MetadataError::LookupFailed(message));
        }
        Ok(self.results.read().await.get(title).cloned())
    }
}
