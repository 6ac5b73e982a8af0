//! HeadObject status mapping

use bucketsync_core::ports::{IObjectStore, StoreError};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{self, key, object_path, BUCKET};

async fn mount_head(server: &wiremock::MockServer, object: &str, status: u16) {
    Mock::given(method("HEAD"))
        .and(path(object_path(object)))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_head_200_means_present() {
    let (server, store) = common::setup_s3_mock().await;
    Mock::given(method("HEAD"))
        .and(path(object_path("sub/b.txt")))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("Content-Length", "5")
                .append_header("ETag", "\"etag\""),
        )
        .mount(&server)
        .await;

    assert!(store.exists(BUCKET, &key("sub/b.txt")).await.unwrap());
}

#[tokio::test]
async fn test_head_404_means_absent() {
    let (server, store) = common::setup_s3_mock().await;
    mount_head(&server, "sub/missing.txt", 404).await;

    assert!(!store.exists(BUCKET, &key("sub/missing.txt")).await.unwrap());
}

#[tokio::test]
async fn test_head_403_is_access_denied() {
    let (server, store) = common::setup_s3_mock().await;
    mount_head(&server, "secret.txt", 403).await;

    let err = store.exists(BUCKET, &key("secret.txt")).await.unwrap_err();

    assert!(matches!(err, StoreError::AccessDenied(_)), "got {err:?}");
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_head_503_is_throttled() {
    let (server, store) = common::setup_s3_mock().await;
    mount_head(&server, "busy.txt", 503).await;

    let err = store.exists(BUCKET, &key("busy.txt")).await.unwrap_err();

    assert!(matches!(err, StoreError::Throttled(_)), "got {err:?}");
    // the SDK retry layer is disabled
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_head_500_is_transport_error() {
    let (server, store) = common::setup_s3_mock().await;
    mount_head(&server, "broken.txt", 500).await;

    let err = store.exists(BUCKET, &key("broken.txt")).await.unwrap_err();

    assert!(matches!(err, StoreError::Transport(_)), "got {err:?}");
}
