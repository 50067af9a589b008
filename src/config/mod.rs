use std::env;
use std::path::PathBuf;

/// Object store and staging configuration for image transfers
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Target bucket (default: "uploads")
    pub bucket: String,

    /// Bucket region (default: "us-east-1")
    pub region: String,

    /// Custom endpoint for S3-compatible stores such as MinIO (default: none)
    pub endpoint_url: Option<String>,

    /// Static access key; when unset the AWS default credential chain is used
    pub access_key_id: Option<String>,

    /// Static secret key, paired with `access_key_id`
    pub secret_access_key: Option<String>,

    /// Use path-style addressing (default: false)
    pub force_path_style: bool,

    /// Directory holding scratch files for in-flight downloads
    pub staging_dir: PathBuf,

    /// Prefix for generated upload keys (default: "user_images")
    pub upload_prefix: String,

    /// JPEG quality, 1-100 (default: 75)
    pub jpeg_quality: u8,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            bucket: "uploads".to_string(),
            region: "us-east-1".to_string(),
            endpoint_url: None,
            access_key_id: None,
            secret_access_key: None,
            force_path_style: false,
            staging_dir: env::temp_dir().join("rust-image-transfer"),
            upload_prefix: "user_images".to_string(),
            jpeg_quality: 75,
        }
    }
}

impl TransferConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            bucket: env::var("S3_BUCKET").unwrap_or(default.bucket),

            region: env::var("S3_REGION").unwrap_or(default.region),

            endpoint_url: env::var("S3_ENDPOINT").ok().filter(|v| !v.is_empty()),

            access_key_id: env::var("S3_ACCESS_KEY").ok().filter(|v| !v.is_empty()),

            secret_access_key: env::var("S3_SECRET_KEY").ok().filter(|v| !v.is_empty()),

            force_path_style: env::var("S3_FORCE_PATH_STYLE")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(default.force_path_style),

            staging_dir: env::var("STAGING_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.staging_dir),

            upload_prefix: env::var("UPLOAD_PREFIX").unwrap_or(default.upload_prefix),

            jpeg_quality: env::var("JPEG_QUALITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(|q: u8| q.clamp(1, 100))
                .unwrap_or(default.jpeg_quality),
        }
    }

    /// Config for a local MinIO instance
    pub fn development() -> Self {
        Self {
            endpoint_url: Some("http://127.0.0.1:9000".to_string()),
            access_key_id: Some("minioadmin".to_string()),
            secret_access_key: Some("minioadmin".to_string()),
            force_path_style: true,
            ..Self::default()
        }
    }

    /// Static credentials, only when both halves are present.
    pub fn static_credentials(&self) -> Option<(&str, &str)> {
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(access), Some(secret)) => Some((access.as_str(), secret.as_str())),
            _ => None,
        }
    }
}
