use crate::app::ports::{HttpClientPort, ObjectStorePort};
use crate::constants::{DEFAULT_IMAGE_EXTENSION, IMAGE_PREFIX, SITE_ORIGIN};
use std::sync::Arc;
use tracing::{debug, warn};

/// Copies event cover images into our own object store.
pub struct ImageArchiver {
    http: Arc<dyn HttpClientPort>,
    objects: Arc<dyn ObjectStorePort>,
}

impl ImageArchiver {
    pub fn new(http: Arc<dyn HttpClientPort>, objects: Arc<dyn ObjectStorePort>) -> Self {
        Self { http, objects }
    }

    /// Archive `source_url` for event `id` and return its public URL, or `""` on any failure.
    pub async fn archive(&self, source_url: &str, id: &str) -> String {
        let source_url = source_url.trim();
        if source_url.is_empty() {
            return String::new();
        }
        match self.try_archive(source_url, id).await {
            Ok(url) => {
                debug!("Archived image for {} at {}", id, url);
                url
            }
            Err(e) => {
                warn!("Failed to archive image '{}' for event {}: {}", source_url, id, e);
                String::new()
            }
        }
    }

    async fn try_archive(&self, source_url: &str, id: &str) -> Result<String, String> {
        let url = absolute_url(source_url);
        let resp = self.http.get(&url).await?;
        if !resp.is_success() {
            return Err(format!("image request returned status {}", resp.status));
        }

        let path = object_path(id, &url);
        self.objects
            .put(&path, resp.bytes, &resp.content_type)
            .await
            .map_err(|e| e.to_string())?;
        self.objects
            .make_public(&path)
            .await
            .map_err(|e| e.to_string())?;
        Ok(self.objects.public_url(&path))
    }
}

/// Complete protocol-relative (`//host/x.jpg`) and root-relative (`/x.jpg`) references.
pub fn absolute_url(src: &str) -> String {
    if src.starts_with("//") {
        format!("https:{src}")
    } else if src.starts_with('/') {
        format!("{SITE_ORIGIN}{src}")
    } else {
        src.to_string()
    }
}

/// `events/<id><ext>` where the extension comes from the URL path.
pub fn object_path(id: &str, url: &str) -> String {
    format!("{}/{}{}", IMAGE_PREFIX, id, image_extension(url))
}

/// Extension (with dot) of the last path segment, ignoring query and fragment; `.png` if none.
pub fn image_extension(url: &str) -> String {
    let path = url
        .split(|c: char| c == '?' || c == '#')
        .next()
        .unwrap_or_default();
    let path = path.split_once("://").map(|(_, rest)| rest).unwrap_or(path);
    // drop the host so "img.example" is never read as an extension
    let path = path.split_once('/').map(|(_, rest)| rest).unwrap_or("");
    let segment = path.rsplit('/').next().unwrap_or_default();
    match segment.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => format!(".{}", ext.to_lowercase()),
        _ => DEFAULT_IMAGE_EXTENSION.to_string(),
    }
}
