//! PutObject, ListObjectsV2 and DeleteObjects

use bucketsync_core::ports::{IObjectStore, ObjectBody, StoreError};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{self, key, list_body, object_path, BUCKET};

const XML: &str = "application/xml";

#[tokio::test]
async fn test_put_file_streams_to_object_path() {
    let (server, store) = common::setup_s3_mock().await;
    Mock::given(method("PUT"))
        .and(path(object_path("sub/b.txt")))
        .respond_with(ResponseTemplate::new(200).append_header("ETag", "\"etag\""))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("b.txt");
    std::fs::write(&file, b"hello").unwrap();

    store
        .put(BUCKET, &key("sub/b.txt"), ObjectBody::File(file))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_put_missing_file_is_body_error() {
    let (server, store) = common::setup_s3_mock().await;

    let err = store
        .put(
            BUCKET,
            &key("gone.txt"),
            ObjectBody::File("/nonexistent/bucketsync/gone.txt".into()),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Body(_)), "got {err:?}");
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_put_marker_sends_text_content_type() {
    let (server, store) = common::setup_s3_mock().await;
    Mock::given(method("PUT"))
        .and(path(object_path("sub/syncd.txt")))
        .and(header("content-type", "text/plain"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    store
        .put(BUCKET, &key("sub/syncd.txt"), ObjectBody::text("Synced at: now\n"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_list_follows_continuation_tokens() {
    let (server, store) = common::setup_s3_mock().await;
    Mock::given(method("GET"))
        .and(path(format!("/{BUCKET}")))
        .and(query_param("list-type", "2"))
        .and(query_param("continuation-token", "page-2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(list_body(&[("p/sub/c.txt", 7)], None), XML),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/{BUCKET}")))
        .and(query_param("list-type", "2"))
        .and(query_param("prefix", "p/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            list_body(&[("p/a.txt", 3), ("p/sub/b.txt", 5)], Some("page-2")),
            XML,
        ))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    let entries = store.list(BUCKET, "p/").await.unwrap();

    let keys: Vec<&str> = entries.iter().map(|e| e.key.as_str()).collect();
    assert_eq!(keys, vec!["p/a.txt", "p/sub/b.txt", "p/sub/c.txt"]);
    assert_eq!(entries[1].size, 5);
    assert!(entries[0].last_modified.is_some());
}

#[tokio::test]
async fn test_list_forbidden_is_access_denied() {
    let (server, store) = common::setup_s3_mock().await;
    Mock::given(method("GET"))
        .and(path(format!("/{BUCKET}")))
        .respond_with(ResponseTemplate::new(403).set_body_raw(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <Error><Code>AccessDenied</Code><Message>Access Denied</Message></Error>",
            XML,
        ))
        .mount(&server)
        .await;

    let err = store.list(BUCKET, "").await.unwrap_err();

    assert!(matches!(err, StoreError::AccessDenied(_)), "got {err:?}");
}

#[tokio::test]
async fn test_delete_batch_reports_refused_keys() {
    let (server, store) = common::setup_s3_mock().await;
    Mock::given(method("POST"))
        .and(path(format!("/{BUCKET}")))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <DeleteResult xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">\
             <Error><Key>old/locked.txt</Key><Code>AccessDenied</Code><Message>Access Denied</Message></Error>\
             </DeleteResult>",
            XML,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let err = store
        .delete_batch(BUCKET, &[key("old/obsolete.txt"), key("old/locked.txt")])
        .await
        .unwrap_err();

    assert_eq!(
        err,
        StoreError::PartialDelete {
            failed: vec!["old/locked.txt".to_string()]
        }
    );
}

#[tokio::test]
async fn test_delete_batch_splits_large_batches() {
    let (server, store) = common::setup_s3_mock().await;
    Mock::given(method("POST"))
        .and(path(format!("/{BUCKET}")))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <DeleteResult xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\"></DeleteResult>",
            XML,
        ))
        .expect(3)
        .mount(&server)
        .await;

    let keys: Vec<_> = (0..2500).map(|i| key(&format!("old/{i}.txt"))).collect();
    store.delete_batch(BUCKET, &keys).await.unwrap();
}
