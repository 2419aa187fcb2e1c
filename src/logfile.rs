//! Log fetch & parse: download one log object and decode its records

use crate::error::{Result, TrailError};
use crate::provider::ObjectStore;
use crate::types::LogBatch;
use flate2::read::GzDecoder;
use std::io::Read;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Download `bucket/key` and decode it as a log batch
///
/// The object is read fully into memory. Gzip-compressed objects (the
/// usual `.json.gz` delivery) are inflated before decoding.
pub async fn fetch_log_batch(store: &dyn ObjectStore, bucket: &str, key: &str) -> Result<LogBatch> {
    let body = store.get(bucket, key).await?;

    tracing::debug!(bucket, key, bytes = body.len(), "Log object downloaded");

    parse_log_batch(&body).map_err(|e| match e {
        TrailError::Decode(reason) => {
            TrailError::Decode(format!("s3://{}/{}: {}", bucket, key, reason))
        }
        other => other,
    })
}

/// Decode raw (optionally gzipped) log object bytes
pub fn parse_log_batch(body: &[u8]) -> Result<LogBatch> {
    if body.starts_with(&GZIP_MAGIC) {
        let mut inflated = Vec::new();
        GzDecoder::new(body)
            .read_to_end(&mut inflated)
            .map_err(|e| TrailError::Decode(format!("gzip: {}", e)))?;
        return decode_json(&inflated);
    }
    decode_json(body)
}

fn decode_json(body: &[u8]) -> Result<LogBatch> {
    serde_json::from_slice(body)
        .map_err(|e| TrailError::Decode(format!("error unmarshaling CloudTrail JSON: {}", e)))
}
