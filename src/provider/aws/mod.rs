//! AWS backends: SQS queue and S3 object store
//!
//! Both clients share one `SdkConfig` built from the configured region and
//! optional shared-credentials profile; otherwise the default provider
//! chain (environment, `~/.aws/credentials`, instance role) applies.

mod s3;
mod sqs;

pub use s3::S3Store;
pub use sqs::SqsQueue;

use aws_config::{BehaviorVersion, Region, SdkConfig};

/// Resolve the shared AWS SDK configuration
pub async fn load_sdk_config(region: &str, profile: Option<&str>) -> SdkConfig {
    let mut loader =
        aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region.to_string()));

    if let Some(profile) = profile {
        tracing::debug!(profile, "Using shared credentials profile");
        loader = loader.profile_name(profile);
    }

    loader.load().await
}
