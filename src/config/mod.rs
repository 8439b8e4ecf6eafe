use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Upper bound accepted by SigV4 presigning (7 days)
pub const SIGV4_MAX_EXPIRY_SECS: u64 = 7 * 24 * 60 * 60;

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Local directory used for staging uploads and materialising downloads (default: "./storage")
    pub destination_folder: PathBuf,

    /// S3 endpoint override, e.g. a MinIO URL (default: AWS endpoint resolution)
    pub endpoint_url: Option<String>,

    /// S3 region (default: "us-east-1")
    pub region: String,

    /// Static access key; falls back to the default provider chain when unset
    pub access_key: Option<String>,

    /// Static secret key
    pub secret_key: Option<String>,

    /// Use path-style addressing (default: true)
    pub force_path_style: bool,

    /// Bound on every backend round trip (default: 30 s)
    pub backend_timeout: Duration,

    /// Maximum upload size in bytes (default: 256 MB)
    pub max_file_size: usize,

    /// Grant expiry used when the caller does not give one (default: 15 min)
    pub default_grant_expiry: Duration,

    /// Longest grant expiry accepted (default and ceiling: 7 days)
    pub max_grant_expiry: Duration,

    /// Prefix staging files with a per-request id (default: true)
    pub unique_staging_names: bool,

    /// Age after which the sweeper deletes leftover staging files (default: 1 h)
    pub staging_sweep_age: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            destination_folder: PathBuf::from("./storage"),
            endpoint_url: None,
            region: "us-east-1".to_string(),
            access_key: None,
            secret_key: None,
            force_path_style: true,
            backend_timeout: Duration::from_secs(30),
            max_file_size: 256 * 1024 * 1024, // 256 MB
            default_grant_expiry: Duration::from_secs(15 * 60),
            max_grant_expiry: Duration::from_secs(SIGV4_MAX_EXPIRY_SECS),
            unique_staging_names: true,
            staging_sweep_age: Duration::from_secs(3600),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        let max_grant_expiry = env::var("MAX_GRANT_EXPIRY_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(|secs| Duration::from_secs(secs.min(SIGV4_MAX_EXPIRY_SECS)))
            .unwrap_or(default.max_grant_expiry);

        let mut config = Self {
            destination_folder: env::var("DESTINATION_FOLDER")
                .map(PathBuf::from)
                .unwrap_or(default.destination_folder),

            endpoint_url: env::var("S3_ENDPOINT").ok().filter(|v| !v.is_empty()),

            region: env::var("S3_REGION").unwrap_or(default.region),

            access_key: env::var("S3_ACCESS_KEY").ok(),
            secret_key: env::var("S3_SECRET_KEY").ok(),

            force_path_style: env::var("S3_FORCE_PATH_STYLE")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(default.force_path_style),

            backend_timeout: env::var("BACKEND_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default.backend_timeout),

            max_file_size: env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_file_size),

            default_grant_expiry: env::var("DEFAULT_GRANT_EXPIRY_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default.default_grant_expiry),

            max_grant_expiry,

            unique_staging_names: env::var("STAGING_UNIQUE_NAMES")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(default.unique_staging_names),

            staging_sweep_age: env::var("STAGING_SWEEP_AGE_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default.staging_sweep_age),
        };

        config.staging_sweep_age =
            sweep_age_floor(config.staging_sweep_age, config.backend_timeout);
        config
    }

    /// Config for local development against MinIO on the default port
    pub fn development() -> Self {
        Self {
            endpoint_url: Some("http://127.0.0.1:9000".to_string()),
            access_key: Some("minioadmin".to_string()),
            secret_key: Some("minioadmin".to_string()),
            backend_timeout: Duration::from_secs(5),
            ..Self::default()
        }
    }
}

/// The sweeper must not reach a staging file while its upload can still be
/// in flight, so the sweep age has to outlast one backend round trip.
pub fn sweep_age_floor(sweep_age: Duration, backend_timeout: Duration) -> Duration {
    if sweep_age > backend_timeout {
        return sweep_age;
    }
    let raised = backend_timeout * 2;
    tracing::warn!(
        "⚠️  Staging sweep age {:?} does not exceed the backend timeout {:?}, using {:?}",
        sweep_age,
        backend_timeout,
        raised
    );
    raised
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GatewayConfig::default();
        assert_eq!(config.max_file_size, 256 * 1024 * 1024);
        assert_eq!(config.region, "us-east-1");
        assert!(config.unique_staging_names);
        assert_eq!(config.max_grant_expiry.as_secs(), SIGV4_MAX_EXPIRY_SECS);
    }

    #[test]
    fn test_development_config() {
        let config = GatewayConfig::development();
        assert_eq!(config.endpoint_url.as_deref(), Some("http://127.0.0.1:9000"));
        assert_eq!(config.access_key.as_deref(), Some("minioadmin"));
        assert!(config.force_path_style);
    }

    #[test]
    fn test_from_env_caps_grant_expiry() {
        unsafe { env::set_var("MAX_GRANT_EXPIRY_SECS", "99999999") };
        let config = GatewayConfig::from_env();
        unsafe { env::remove_var("MAX_GRANT_EXPIRY_SECS") };
        assert_eq!(config.max_grant_expiry.as_secs(), SIGV4_MAX_EXPIRY_SECS);
    }

    #[test]
    fn test_sweep_age_outlasts_backend_timeout() {
        let timeout = Duration::from_secs(30);
        assert_eq!(
            sweep_age_floor(Duration::from_secs(3600), timeout),
            Duration::from_secs(3600)
        );
        assert_eq!(sweep_age_floor(Duration::from_secs(5), timeout), Duration::from_secs(60));
        assert_eq!(sweep_age_floor(timeout, timeout), Duration::from_secs(60));
        assert_eq!(sweep_age_floor(Duration::ZERO, timeout), Duration::from_secs(60));
    }
}
