//! S3 client construction
//!
//! The SDK's own retry layer is disabled: retries and deadlines are applied
//! once, by `RetryingStore` in `bucketsync-sync`.

use aws_config::BehaviorVersion;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::Client;
use tracing::debug;

use bucketsync_core::config::StoreConfig;

/// Provider name attached to static credentials
const CREDENTIALS_PROVIDER: &str = "bucketsync";

/// Builds an S3 client for the given store settings
///
/// Static credentials are used when both keys are configured; otherwise the
/// default AWS credential chain (environment, profile, instance metadata)
/// is resolved.
///
/// # Arguments
/// * `store` - Region, endpoint and credential settings
pub async fn build_client(store: &StoreConfig) -> Client {
    let region = Region::new(store.region.clone());

    let builder = match store.static_credentials() {
        Some((access_key, secret_key)) => {
            debug!(region = %store.region, "Using static credentials");
            aws_sdk_s3::config::Builder::new()
                .behavior_version(BehaviorVersion::latest())
                .region(region)
                .credentials_provider(Credentials::new(
                    access_key,
                    secret_key,
                    None,
                    None,
                    CREDENTIALS_PROVIDER,
                ))
        }
        None => {
            debug!(region = %store.region, "Resolving default AWS credential chain");
            let shared = aws_config::defaults(BehaviorVersion::latest())
                .region(region)
                .retry_config(RetryConfig::disabled())
                .load()
                .await;
            aws_sdk_s3::config::Builder::from(&shared)
        }
    };

    let mut builder = builder
        .retry_config(RetryConfig::disabled())
        .force_path_style(store.force_path_style);
    if let Some(endpoint) = &store.endpoint_url {
        debug!(endpoint = %endpoint, "Using custom S3 endpoint");
        builder = builder.endpoint_url(endpoint);
    }

    Client::from_conf(builder.build())
}
