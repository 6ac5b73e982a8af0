//! SDK error classification
//!
//! Every SDK failure is mapped onto a [`StoreError`] the retry decorator can
//! reason about. Only `exists` treats "not found" specially; it never
//! reaches this module as an error.

use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};

use bucketsync_core::ports::StoreError;

const ACCESS_DENIED_CODES: &[&str] = &[
    "AccessDenied",
    "InvalidAccessKeyId",
    "SignatureDoesNotMatch",
    "ExpiredToken",
];

const THROTTLING_CODES: &[&str] = &["SlowDown", "Throttling", "RequestLimitExceeded"];

/// Maps an SDK failure onto the port's error type
pub fn classify<E>(err: &SdkError<E, HttpResponse>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let message = DisplayErrorContext(err).to_string();
    match err {
        SdkError::ServiceError(_) | SdkError::ResponseError(_) => {
            let status = err.raw_response().map(|r| r.status().as_u16());
            classify_response(status, err.code(), message)
        }
        _ => StoreError::Transport(message),
    }
}

/// HTTP status of the raw response behind `err`, if one was received
pub fn status_of<E>(err: &SdkError<E, HttpResponse>) -> Option<u16> {
    err.raw_response().map(|r| r.status().as_u16())
}

/// Classifies a service response by status and error code
pub fn classify_response(status: Option<u16>, code: Option<&str>, message: String) -> StoreError {
    let code = code.unwrap_or_default();
    if matches!(status, Some(401 | 403)) || ACCESS_DENIED_CODES.contains(&code) {
        StoreError::AccessDenied(message)
    } else if matches!(status, Some(429 | 503)) || THROTTLING_CODES.contains(&code) {
        StoreError::Throttled(message)
    } else {
        StoreError::Transport(message)
    }
}
