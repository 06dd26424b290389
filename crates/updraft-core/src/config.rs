//! Configuration module
//!
//! This module provides the application configuration, loaded from the
//! environment with sensible defaults. Required settings fail fast at
//! startup; everything else falls back to a documented default.

use std::env;

use crate::constants::SECURE_REDIRECT_GRACE_SECONDS;
use crate::storage_types::StoreBackend;

// Common constants
const DB_MAX_CONNECTIONS: u32 = 10;
const DB_TIMEOUT_SECS: u64 = 30;
const SERVER_PORT: u16 = 3000;
const MAX_ATTACHMENT_SIZE_KB: u64 = 4096;
const MAX_IMAGE_SIZE_KB: u64 = 10_240;
const PRESIGNED_GET_EXPIRES_SECS: u64 = 300;
const MIN_PRESIGNED_GET_EXPIRES_SECS: u64 = 60;
const URL_FETCH_TIMEOUT_SECS: u64 = 30;

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    // Service API key (for service-to-service auth)
    pub api_key: Option<String>,
    // Storage configuration
    pub storage_backend: StoreBackend,
    pub local_storage_path: String,
    pub local_storage_base_url: String,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub aws_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, DigitalOcean Spaces, etc.)
    pub s3_cdn_url: Option<String>,
    // Upload size ceilings
    pub max_attachment_size_kb: u64,
    pub max_image_size_kb: u64,
    // Secure-upload behavior
    pub secure_uploads: bool,
    pub prevent_anons_from_downloading_files: bool,
    pub presigned_get_expires_seconds: u64,
    pub allow_uploaded_avatars: bool,
    // External access-check service (optional)
    pub access_policy_url: Option<String>,
    // Remote URL ingestion
    pub url_fetch_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins: Vec<String> = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(value) => value.parse::<StoreBackend>()?,
            Err(_) => StoreBackend::Local,
        };

        let config = Config {
            server_port: env::var("SERVER_PORT")
                .or_else(|_| env::var("PORT"))
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("SERVER_PORT must be a valid number"))?,
            cors_origins,
            environment,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| DB_MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(DB_MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| DB_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(DB_TIMEOUT_SECS),
            api_key: env::var("API_KEY").ok().filter(|s| !s.is_empty()),
            storage_backend,
            local_storage_path: env::var("LOCAL_STORAGE_PATH")
                .unwrap_or_else(|_| "./uploads".to_string()),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL")
                .unwrap_or_else(|_| "/uploads".to_string()),
            s3_bucket: env::var("S3_BUCKET").ok().filter(|s| !s.is_empty()),
            s3_region: env::var("S3_REGION").ok().filter(|s| !s.is_empty()),
            aws_region: env::var("AWS_REGION").ok().filter(|s| !s.is_empty()),
            s3_endpoint: env::var("S3_ENDPOINT_URL").ok().filter(|s| !s.is_empty()),
            s3_cdn_url: env::var("S3_CDN_URL").ok().filter(|s| !s.is_empty()),
            max_attachment_size_kb: env::var("MAX_ATTACHMENT_SIZE_KB")
                .unwrap_or_else(|_| MAX_ATTACHMENT_SIZE_KB.to_string())
                .parse()
                .unwrap_or(MAX_ATTACHMENT_SIZE_KB),
            max_image_size_kb: env::var("MAX_IMAGE_SIZE_KB")
                .unwrap_or_else(|_| MAX_IMAGE_SIZE_KB.to_string())
                .parse()
                .unwrap_or(MAX_IMAGE_SIZE_KB),
            secure_uploads: env::var("SECURE_UPLOADS")
                .unwrap_or_else(|_| "false".to_string())
                .to_lowercase()
                .parse()
                .unwrap_or(false),
            prevent_anons_from_downloading_files: env::var("PREVENT_ANONS_FROM_DOWNLOADING_FILES")
                .unwrap_or_else(|_| "false".to_string())
                .to_lowercase()
                .parse()
                .unwrap_or(false),
            presigned_get_expires_seconds: env::var("PRESIGNED_GET_EXPIRES_SECONDS")
                .unwrap_or_else(|_| PRESIGNED_GET_EXPIRES_SECS.to_string())
                .parse()
                .unwrap_or(PRESIGNED_GET_EXPIRES_SECS),
            allow_uploaded_avatars: env::var("ALLOW_UPLOADED_AVATARS")
                .unwrap_or_else(|_| "true".to_string())
                .to_lowercase()
                .parse()
                .unwrap_or(true),
            access_policy_url: env::var("ACCESS_POLICY_URL").ok().filter(|s| !s.is_empty()),
            url_fetch_timeout_secs: env::var("URL_FETCH_TIMEOUT_SECS")
                .unwrap_or_else(|_| URL_FETCH_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(URL_FETCH_TIMEOUT_SECS),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.database_url.starts_with("postgresql://")
            && !self.database_url.starts_with("postgres://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.is_production() && self.cors_origins.iter().any(|origin| origin == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        if self.presigned_get_expires_seconds < MIN_PRESIGNED_GET_EXPIRES_SECS {
            return Err(anyhow::anyhow!(
                "PRESIGNED_GET_EXPIRES_SECONDS must be at least {} seconds",
                MIN_PRESIGNED_GET_EXPIRES_SECS
            ));
        }

        if self.max_attachment_size_kb == 0 || self.max_image_size_kb == 0 {
            return Err(anyhow::anyhow!(
                "MAX_ATTACHMENT_SIZE_KB and MAX_IMAGE_SIZE_KB must be positive"
            ));
        }

        match self.storage_backend {
            StoreBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() && self.aws_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StoreBackend::Local => {
                if self.local_storage_path.trim().is_empty() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.local_storage_base_url.trim().is_empty() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
            }
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn max_attachment_size_bytes(&self) -> u64 {
        self.max_attachment_size_kb * 1024
    }

    pub fn max_image_size_bytes(&self) -> u64 {
        self.max_image_size_kb * 1024
    }

    /// Presign lifetime minus the redirect grace window, used as the
    /// client-side cache lifetime for signed redirects.
    pub fn secure_redirect_cache_seconds(&self) -> u64 {
        self.presigned_get_expires_seconds
            .saturating_sub(SECURE_REDIRECT_GRACE_SECONDS)
    }
}
