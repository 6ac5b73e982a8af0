//! S3ObjectStore - IObjectStore implementation for Amazon S3
//!
//! ## Design Notes
//!
//! - `exists` is a metadata-only `HeadObject`. Absence is `Ok(false)`; any
//!   other failure is an error and is never read as absence.
//! - File bodies are streamed from disk with `ByteStream::from_path`.
//! - `delete_batch` splits keys into `DeleteObjects` requests of at most
//!   [`MAX_DELETE_BATCH`] keys and collects per-key failures across chunks.

use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use bucketsync_core::config::StoreConfig;
use bucketsync_core::domain::RemoteKey;
use bucketsync_core::ports::{IObjectStore, ObjectBody, ObjectEntry, StoreError};

use crate::client::build_client;
use crate::errors::{classify, status_of};

/// S3 limit on keys per `DeleteObjects` request
pub const MAX_DELETE_BATCH: usize = 1000;

/// Object store backed by an `aws-sdk-s3` client
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    /// Wraps an already configured client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds the client from store settings
    pub async fn from_config(store: &StoreConfig) -> Self {
        Self::new(build_client(store).await)
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

fn to_chrono(ts: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts.secs(), ts.subsec_nanos())
}

#[async_trait::async_trait]
impl IObjectStore for S3ObjectStore {
    async fn exists(&self, bucket: &str, key: &RemoteKey) -> Result<bool, StoreError> {
        let result = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key.as_str())
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(err) => {
                let not_found = err
                    .as_service_error()
                    .is_some_and(|e| e.is_not_found())
                    || status_of(&err) == Some(404);
                if not_found {
                    debug!(key = %key, "Object not found");
                    Ok(false)
                } else {
                    Err(classify(&err))
                }
            }
        }
    }

    async fn put(&self, bucket: &str, key: &RemoteKey, body: ObjectBody) -> Result<(), StoreError> {
        let request = self.client.put_object().bucket(bucket).key(key.as_str());

        let request = match body {
            ObjectBody::File(path) => {
                let stream = ByteStream::from_path(&path)
                    .await
                    .map_err(|e| StoreError::Body(format!("{}: {e}", path.display())))?;
                request.body(stream)
            }
            ObjectBody::Bytes { data, content_type } => {
                request.body(ByteStream::from(data)).content_type(content_type)
            }
        };

        request.send().await.map_err(|e| classify(&e))?;
        Ok(())
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectEntry>, StoreError> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .set_prefix((!prefix.is_empty()).then(|| prefix.to_string()))
            .into_paginator()
            .send();

        let mut entries = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| classify(&e))?;
            for object in page.contents() {
                let Some(raw_key) = object.key() else {
                    continue;
                };
                let key = match RemoteKey::new(raw_key) {
                    Ok(key) => key,
                    Err(e) => {
                        warn!(key = raw_key, error = %e, "Ignoring unusable key in listing");
                        continue;
                    }
                };
                entries.push(ObjectEntry {
                    key,
                    size: object.size().unwrap_or_default().max(0) as u64,
                    last_modified: object.last_modified().and_then(to_chrono),
                });
            }
        }

        debug!(prefix, count = entries.len(), "Listed objects");
        Ok(entries)
    }

    async fn delete_batch(&self, bucket: &str, keys: &[RemoteKey]) -> Result<(), StoreError> {
        let mut failed = Vec::new();

        for chunk in keys.chunks(MAX_DELETE_BATCH) {
            let objects = chunk
                .iter()
                .map(|key| ObjectIdentifier::builder().key(key.as_str()).build())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| StoreError::Transport(e.to_string()))?;
            let delete = Delete::builder()
                .set_objects(Some(objects))
                .quiet(true)
                .build()
                .map_err(|e| StoreError::Transport(e.to_string()))?;

            let output = self
                .client
                .delete_objects()
                .bucket(bucket)
                .delete(delete)
                .send()
                .await
                .map_err(|e| classify(&e))?;

            for error in output.errors() {
                let key = error.key().unwrap_or("<unknown>");
                warn!(
                    key,
                    code = error.code().unwrap_or_default(),
                    message = error.message().unwrap_or_default(),
                    "Store refused to delete object"
                );
                failed.push(key.to_string());
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(StoreError::PartialDelete { failed })
        }
    }
}
