use crate::error::StoreError;
use crate::types::EventRecord;
use async_trait::async_trait;

// Fetch-side ports
#[async_trait]
pub trait HttpClientPort: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpGetResult, String>;
}

#[derive(Clone, Debug)]
pub struct HttpGetResult {
    pub status: u16,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl HttpGetResult {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

// Persistence ports

/// Keyed document store holding one [`EventRecord`] per id.
#[async_trait]
pub trait DocumentStorePort: Send + Sync {
    async fn exists(&self, collection: &str, id: &str) -> Result<bool, StoreError>;

    /// Create every document in one atomic step. If any id is already present the whole
    /// batch is rejected with [`StoreError::Conflict`] and nothing is written.
    async fn batch_create(
        &self,
        collection: &str,
        docs: Vec<(String, EventRecord)>,
    ) -> Result<(), StoreError>;
}

/// Blob store with a deterministic public URL per object path.
#[async_trait]
pub trait ObjectStorePort: Send + Sync {
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StoreError>;
    async fn make_public(&self, path: &str) -> Result<(), StoreError>;
    /// `{public_base}/{path}`; computed locally, no round trip.
    fn public_url(&self, path: &str) -> String;
}
