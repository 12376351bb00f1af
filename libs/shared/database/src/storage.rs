use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::error::BlobError;

/// Location of an uploaded object. Persisted in records as its
/// `gs://bucket/path` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobRef {
    pub bucket: String,
    pub path: String,
}

impl BlobRef {
    pub fn parse(value: &str) -> Result<Self, BlobError> {
        let rest = value
            .strip_prefix("gs://")
            .ok_or_else(|| BlobError::InvalidReference(value.to_string()))?;
        match rest.split_once('/') {
            Some((bucket, path)) if !bucket.is_empty() && !path.is_empty() => Ok(Self {
                bucket: bucket.to_string(),
                path: path.to_string(),
            }),
            _ => Err(BlobError::InvalidReference(value.to_string())),
        }
    }
}

impl fmt::Display for BlobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gs://{}/{}", self.bucket, self.path)
    }
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<BlobRef, BlobError>;

    async fn download_url(&self, reference: &BlobRef) -> Result<String, BlobError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectMetadata {
    name: String,
    download_tokens: Option<String>,
}

/// REST client for the managed object storage bucket.
pub struct StorageClient {
    client: Client,
    base_url: String,
    bucket: String,
    access_token: String,
}

impl StorageClient {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_base_url(&config.storage_base_url, &config.storage_bucket, &config.database_secret)
    }

    pub fn with_base_url(base_url: &str, bucket: &str, access_token: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            access_token: access_token.to_string(),
        }
    }

    fn objects_url(&self, bucket: &str) -> String {
        format!("{}/b/{}/o", self.base_url, bucket)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.access_token.is_empty() {
            req
        } else {
            req.bearer_auth(&self.access_token)
        }
    }

    async fn check(response: reqwest::Response, path: &str) -> Result<reqwest::Response, BlobError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        error!("Blob store error ({}) for '{}': {}", status, path, body);
        Err(match status.as_u16() {
            404 => BlobError::NotFound(path.to_string()),
            code => BlobError::Status { status: code, body },
        })
    }
}

#[async_trait]
impl BlobStore for StorageClient {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<BlobRef, BlobError> {
        debug!("Uploading {} bytes to '{}'", bytes.len(), path);

        let req = self
            .client
            .post(self.objects_url(&self.bucket))
            .query(&[("uploadType", "media"), ("name", path)])
            .header(CONTENT_TYPE, content_type)
            .body(bytes);

        let response = Self::check(self.authorize(req).send().await?, path).await?;
        let metadata: ObjectMetadata = response
            .json()
            .await
            .map_err(|e| BlobError::Network(e.to_string()))?;

        Ok(BlobRef {
            bucket: self.bucket.clone(),
            path: metadata.name,
        })
    }

    async fn download_url(&self, reference: &BlobRef) -> Result<String, BlobError> {
        let object_url = format!(
            "{}/{}",
            self.objects_url(&reference.bucket),
            urlencoding::encode(&reference.path)
        );

        let req = self.client.get(&object_url);
        let response = Self::check(self.authorize(req).send().await?, &reference.path).await?;
        let metadata: ObjectMetadata = response
            .json()
            .await
            .map_err(|e| BlobError::Network(e.to_string()))?;

        let mut url = format!("{}?alt=media", object_url);
        if let Some(token) = metadata
            .download_tokens
            .as_deref()
            .and_then(|tokens| tokens.split(',').next())
        {
            url.push_str("&token=");
            url.push_str(token);
        }
        Ok(url)
    }
}

/// Blob store kept in process memory.
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    bucket: String,
    objects: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryBlobStore {
    pub fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            objects: Arc::default(),
        }
    }

    pub async fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.objects.read().await.get(path).cloned()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, path: &str, bytes: Vec<u8>, _content_type: &str) -> Result<BlobRef, BlobError> {
        self.objects.write().await.insert(path.to_string(), bytes);
        Ok(BlobRef {
            bucket: self.bucket.clone(),
            path: path.to_string(),
        })
    }

    async fn download_url(&self, reference: &BlobRef) -> Result<String, BlobError> {
        if self.objects.read().await.contains_key(&reference.path) {
            Ok(format!("memory://{}/{}", reference.bucket, reference.path))
        } else {
            Err(BlobError::NotFound(reference.path.clone()))
        }
    }
}
