use crate::app::ports::ObjectStorePort;
use crate::error::StoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::debug;

fn join_public(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub public: bool,
}

/// In-memory object store for development/testing
pub struct InMemoryObjectStore {
    public_base: String,
    objects: Mutex<HashMap<String, StoredObject>>,
}

impl InMemoryObjectStore {
    pub fn new(public_base: impl Into<String>) -> Self {
        Self {
            public_base: public_base.into(),
            objects: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, path: &str) -> Option<StoredObject> {
        let objects = self.objects.lock().unwrap_or_else(|e| e.into_inner());
        objects.get(path).cloned()
    }

    pub fn paths(&self) -> Vec<String> {
        let objects = self.objects.lock().unwrap_or_else(|e| e.into_inner());
        let mut paths: Vec<String> = objects.keys().cloned().collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl ObjectStorePort for InMemoryObjectStore {
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StoreError> {
        let mut objects = self.objects.lock().unwrap_or_else(|e| e.into_inner());
        objects.insert(
            path.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
                public: false,
            },
        );
        Ok(())
    }

    async fn make_public(&self, path: &str) -> Result<(), StoreError> {
        let mut objects = self.objects.lock().unwrap_or_else(|e| e.into_inner());
        let object = objects
            .get_mut(path)
            .ok_or_else(|| StoreError::Backend(format!("no object at '{path}'")))?;
        object.public = true;
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        join_public(&self.public_base, path)
    }
}

/// Sidecar metadata written next to each object by [`LocalObjectStore`].
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectMeta {
    content_type: String,
    public: bool,
}

/// Directory-backed object store; a static file server (or CDN) is expected to serve
/// `root` under `public_base`.
pub struct LocalObjectStore {
    root: PathBuf,
    public_base: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.into(),
        }
    }

    fn object_path(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }

    fn meta_path(&self, path: &str) -> PathBuf {
        let mut p = self.object_path(path).into_os_string();
        p.push(".meta.json");
        PathBuf::from(p)
    }

    async fn write_meta(&self, path: &str, meta: &ObjectMeta) -> Result<(), StoreError> {
        let body = serde_json::to_vec(meta).map_err(|e| StoreError::Backend(e.to_string()))?;
        tokio::fs::write(self.meta_path(path), body)
            .await
            .map_err(|e| StoreError::Backend(format!("failed to write metadata for '{path}': {e}")))
    }
}

#[async_trait]
impl ObjectStorePort for LocalObjectStore {
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StoreError> {
        let target = self.object_path(path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Backend(format!("failed to create {:?}: {}", parent, e)))?;
        }
        tokio::fs::write(&target, bytes)
            .await
            .map_err(|e| StoreError::Backend(format!("failed to write {:?}: {}", target, e)))?;
        self.write_meta(
            path,
            &ObjectMeta {
                content_type: content_type.to_string(),
                public: false,
            },
        )
        .await?;
        debug!("Stored object {:?} ({})", target, content_type);
        Ok(())
    }

    async fn make_public(&self, path: &str) -> Result<(), StoreError> {
        let raw = tokio::fs::read(self.meta_path(path))
            .await
            .map_err(|e| StoreError::Backend(format!("no object at '{path}': {e}")))?;
        let mut meta: ObjectMeta =
            serde_json::from_slice(&raw).map_err(|e| StoreError::Backend(e.to_string()))?;
        meta.public = true;
        self.write_meta(path, &meta).await
    }

    fn public_url(&self, path: &str) -> String {
        join_public(&self.public_base, path)
    }
}

/// Supabase Storage backend.
///
/// Config via env:
/// - SUPABASE_URL (e.g., https://xyzcompany.supabase.co) OR SUPABASE_PROJECT_REF
/// - SUPABASE_SERVICE_ROLE_KEY (service role key)
/// - SUPABASE_BUCKET (bucket name; must be a public bucket)
pub struct SupabaseObjectStore {
    client: reqwest::Client,
    url: String,
    key: String,
    bucket: String,
}

impl SupabaseObjectStore {
    pub fn new(url: impl Into<String>, key: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into().trim_end_matches('/').to_string(),
            key: key.into(),
            bucket: bucket.into(),
        }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        // Allow either a full URL or a project ref
        let url = match std::env::var("SUPABASE_URL") {
            Ok(u) => u,
            Err(_) => {
                let project_ref = std::env::var("SUPABASE_PROJECT_REF")?;
                format!("https://{}.supabase.co", project_ref)
            }
        };
        let key = std::env::var("SUPABASE_SERVICE_ROLE_KEY")?;
        let bucket = std::env::var("SUPABASE_BUCKET")?;
        Ok(Self::new(url, key, bucket))
    }
}

#[async_trait]
impl ObjectStorePort for SupabaseObjectStore {
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StoreError> {
        let endpoint = format!("{}/storage/v1/object/{}/{}", self.url, self.bucket, path);
        // upsert so a re-archived image for the same id replaces the old bytes
        let resp = self
            .client
            .post(&endpoint)
            .header("Authorization", format!("Bearer {}", self.key))
            .header("apikey", self.key.clone())
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "true")
            .body(bytes)
            .send()
            .await
            .map_err(|e| StoreError::Backend(format!("Supabase upload failed: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Backend(format!(
                "Supabase upload failed: {} - {}",
                status, body
            )));
        }
        Ok(())
    }

    async fn make_public(&self, path: &str) -> Result<(), StoreError> {
        // Visibility is a bucket-level setting in Supabase Storage.
        debug!("Object '{}' served from public bucket '{}'", path, self.bucket);
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.url, self.bucket, path)
    }
}
