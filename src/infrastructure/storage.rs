use crate::config::GatewayConfig;
use crate::services::backend::S3Backend;
use aws_sdk_s3::config::{Credentials, Region};
use std::sync::Arc;
use tracing::info;

pub async fn setup_backend(config: &GatewayConfig) -> Arc<S3Backend> {
    let mut loader = aws_config::from_env().region(Region::new(config.region.clone()));

    if let Some(endpoint_url) = &config.endpoint_url {
        loader = loader.endpoint_url(endpoint_url);
    }

    // Static keys win over the default provider chain (env, profile, IMDS)
    if let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key) {
        loader = loader.credentials_provider(Credentials::new(
            access_key.clone(),
            secret_key.clone(),
            None,
            None,
            "static",
        ));
    }

    let aws_config = loader.load().await;

    let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
        .force_path_style(config.force_path_style)
        .build();

    info!(
        "☁️  S3 backend: {} (region: {}, path-style: {})",
        config.endpoint_url.as_deref().unwrap_or("aws default"),
        config.region,
        config.force_path_style
    );

    let client = aws_sdk_s3::Client::from_conf(s3_config);
    Arc::new(S3Backend::new(client, config.region.clone()))
}
