//! Object fetch: retrieve receipt bytes and metadata from the store.
//!
//! [`ObjectStore`] is the seam between the pipeline and whatever holds the
//! images. The default adapter speaks plain HTTP against an S3-compatible
//! endpoint; tests inject an in-memory store. No retry happens here — a
//! transient failure aborts the invocation and the caller re-invokes.

use crate::error::ReceiptError;
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use std::collections::HashMap;
use tracing::{debug, info};

/// Prefix under which S3-compatible stores expose user-defined object
/// metadata as response headers.
const METADATA_HEADER_PREFIX: &str = "x-amz-meta-";

/// A fetched object: bytes, content type, and user metadata.
///
/// Owned transiently by the fetch stage and consumed once by the extractor.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    /// MIME type reported by the store; receipts default to `image/jpeg`.
    pub content_type: String,
    /// User metadata attached at upload time (e.g. a `category` tag).
    pub metadata: HashMap<String, String>,
}

/// Read access to one object by (bucket, key).
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch the object's byte content and metadata mapping.
    ///
    /// # Errors
    ///
    /// [`ReceiptError::ObjectNotFound`] if the key does not exist,
    /// [`ReceiptError::StorageUnavailable`] on any network or service failure.
    async fn fetch(&self, bucket: &str, key: &str) -> Result<StoredObject, ReceiptError>;
}

/// HTTP adapter for S3-compatible storage using virtual-hosted addressing:
/// the configured endpoint names the bucket host, so the request path is
/// just the object key. The `bucket` argument contributes only to log and
/// error context.
pub struct HttpObjectStore {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpObjectStore {
    /// Build a store for the given bucket endpoint.
    ///
    /// # Errors
    ///
    /// [`ReceiptError::InvalidConfig`] if the HTTP client cannot be
    /// constructed.
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Result<Self, ReceiptError> {
        let endpoint = endpoint.into();
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| {
                ReceiptError::InvalidConfig(format!("failed to build HTTP client: {e}"))
            })?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn fetch(&self, bucket: &str, key: &str) -> Result<StoredObject, ReceiptError> {
        let url = format!("{}/{}", self.endpoint.trim_end_matches('/'), key);
        debug!("Fetching object '{}' from bucket '{}': {}", key, bucket, url);

        let response =
            self.client
                .get(&url)
                .send()
                .await
                .map_err(|e| ReceiptError::StorageUnavailable {
                    key: key.to_string(),
                    reason: e.to_string(),
                })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ReceiptError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(ReceiptError::StorageUnavailable {
                key: key.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/jpeg")
            .to_string();
        let metadata = metadata_from_headers(response.headers());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ReceiptError::StorageUnavailable {
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        info!(
            "Fetched '{}' from bucket '{}' ({} bytes, {} metadata entries)",
            key,
            bucket,
            bytes.len(),
            metadata.len()
        );

        Ok(StoredObject {
            bytes: bytes.to_vec(),
            content_type,
            metadata,
        })
    }
}

/// Collect `x-amz-meta-*` response headers into the metadata mapping,
/// stripping the prefix. Header names arrive lowercased; values that are
/// not valid UTF-8 are skipped.
fn metadata_from_headers(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            let name = name.as_str().strip_prefix(METADATA_HEADER_PREFIX)?;
            let value = value.to_str().ok()?;
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderName, HeaderValue};

    #[test]
    fn metadata_headers_are_extracted_and_prefix_stripped() {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-amz-meta-category"),
            HeaderValue::from_static("travel"),
        );
        headers.insert(
            HeaderName::from_static("x-amz-meta-uploaded-by"),
            HeaderValue::from_static("mobile-app"),
        );
        headers.insert(
            HeaderName::from_static("content-length"),
            HeaderValue::from_static("1234"),
        );

        let metadata = metadata_from_headers(&headers);
        assert_eq!(metadata.len(), 2);
        assert_eq!(metadata.get("category").map(String::as_str), Some("travel"));
        assert_eq!(
            metadata.get("uploaded-by").map(String::as_str),
            Some("mobile-app")
        );
    }

    #[test]
    fn non_metadata_headers_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("content-type"),
            HeaderValue::from_static("image/jpeg"),
        );
        assert!(metadata_from_headers(&headers).is_empty());
    }

    #[test]
    fn store_builds_with_trailing_slash_endpoint() {
        // URL assembly trims the trailing slash so keys never double up.
        let store =
            HttpObjectStore::new("https://bucket.example.com/", 30).expect("client must build");
        assert_eq!(store.endpoint, "https://bucket.example.com/");
    }
}
