//! Shared helpers for S3 adapter integration tests

use bucketsync_core::config::StoreConfig;
use bucketsync_core::domain::RemoteKey;
use bucketsync_s3::S3ObjectStore;
use wiremock::MockServer;

pub const BUCKET: &str = "test-bucket";

/// Starts a mock server and returns a store pointed at it
pub async fn setup_s3_mock() -> (MockServer, S3ObjectStore) {
    let server = MockServer::start().await;

    let store = StoreConfig {
        access_key: Some("AKIDEXAMPLE".to_string()),
        secret_key: Some("wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".to_string()),
        region: "us-east-1".to_string(),
        endpoint_url: Some(server.uri()),
        force_path_style: true,
    };

    (server, S3ObjectStore::from_config(&store).await)
}

pub fn key(s: &str) -> RemoteKey {
    RemoteKey::new(s).expect("valid key")
}

/// Path of `key` under the test bucket with path-style addressing
pub fn object_path(key: &str) -> String {
    format!("/{BUCKET}/{key}")
}

/// ListObjectsV2 response body
pub fn list_body(keys: &[(&str, u64)], next_token: Option<&str>) -> String {
    let contents: String = keys
        .iter()
        .map(|(key, size)| {
            format!(
                "<Contents><Key>{key}</Key><LastModified>2026-01-15T10:00:00.000Z</LastModified>\
                 <ETag>&quot;etag&quot;</ETag><Size>{size}</Size><StorageClass>STANDARD</StorageClass></Contents>"
            )
        })
        .collect();
    let truncation = match next_token {
        Some(token) => format!(
            "<IsTruncated>true</IsTruncated><NextContinuationToken>{token}</NextContinuationToken>"
        ),
        None => "<IsTruncated>false</IsTruncated>".to_string(),
    };
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <ListBucketResult xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">\
         <Name>{BUCKET}</Name><KeyCount>{}</KeyCount><MaxKeys>1000</MaxKeys>{truncation}{contents}\
         </ListBucketResult>",
        keys.len()
    )
}
