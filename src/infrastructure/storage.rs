use crate::config::EditConfig;
use crate::services::storage::S3ObjectStore;
use aws_sdk_s3::config::Region;
use tracing::info;

pub async fn setup_storage(config: &EditConfig, bucket: &str) -> S3ObjectStore {
    // Credentials come from the default provider chain (env, profile, SSO, IMDS)
    let mut loader = aws_config::from_env().region(Region::new(config.region.clone()));
    if let Some(endpoint_url) = &config.endpoint_url {
        loader = loader.endpoint_url(endpoint_url);
    }
    let aws_config = loader.load().await;

    let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
        .force_path_style(config.force_path_style)
        .build();

    info!(
        "☁️  S3 Storage: bucket={} region={} endpoint={}",
        bucket,
        config.region,
        config.endpoint_url.as_deref().unwrap_or("default")
    );

    let s3_client = aws_sdk_s3::Client::from_conf(s3_config);
    S3ObjectStore::new(s3_client, bucket.to_string())
}
