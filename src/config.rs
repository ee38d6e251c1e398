use anyhow::Result;
use serde::Deserialize;
use std::env;

use crate::validation::FileConstraints;

const MIB: u64 = 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub upload: UploadConfig,
    pub character: CharacterConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub provider: String,
    pub s3_bucket: String,
    pub s3_region: String,
    pub s3_access_key_id: Option<String>,
    pub s3_secret_access_key: Option<String>,
    pub s3_endpoint: Option<String>,
    /// Logical namespace every generated object key lives under.
    pub key_prefix: String,
    pub upload_url_ttl_secs: u32,
    pub view_url_ttl_secs: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub max_files: usize,
    pub batch_max_file_size: u64,
    pub direct_max_file_size: u64,
    pub max_total_size: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CharacterConfig {
    pub point_budget: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: "memory".to_string(),
            s3_bucket: "character-album".to_string(),
            s3_region: "us-east-1".to_string(),
            s3_access_key_id: None,
            s3_secret_access_key: None,
            s3_endpoint: None,
            key_prefix: "character-album".to_string(),
            upload_url_ttl_secs: 3600,
            view_url_ttl_secs: 604_800,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_files: 20,
            batch_max_file_size: 5 * MIB,
            direct_max_file_size: 10 * MIB,
            max_total_size: 50 * MIB,
        }
    }
}

impl Default for CharacterConfig {
    fn default() -> Self {
        Self { point_budget: 90 }
    }
}

impl UploadConfig {
    /// Constraints for the multipart batch path (per-file and aggregate caps).
    pub fn batch_constraints(&self) -> FileConstraints {
        FileConstraints {
            max_files: self.max_files,
            max_file_size: self.batch_max_file_size,
            max_total_size: Some(self.max_total_size),
            ..FileConstraints::batch()
        }
    }

    /// Constraints for the direct-to-storage path.
    pub fn direct_constraints(&self) -> FileConstraints {
        FileConstraints {
            max_files: self.max_files,
            max_file_size: self.direct_max_file_size,
            ..FileConstraints::direct()
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = StorageConfig::default();
        let upload_defaults = UploadConfig::default();

        Ok(Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()?,
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                cors_allowed_origins: env::var("ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| "http://localhost:3000,http://localhost:5173".to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            storage: StorageConfig {
                provider: env::var("STORAGE_PROVIDER").unwrap_or_else(|_| "s3".to_string()),
                s3_bucket: env::var("AWS_S3_BUCKET_NAME")
                    .or_else(|_| env::var("S3_BUCKET"))
                    .unwrap_or_default(),
                s3_region: env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
                s3_access_key_id: env::var("AWS_ACCESS_KEY_ID").ok(),
                s3_secret_access_key: env::var("AWS_SECRET_ACCESS_KEY").ok(),
                s3_endpoint: env::var("S3_ENDPOINT").ok(),
                key_prefix: env::var("S3_KEY_PREFIX").unwrap_or(defaults.key_prefix),
                upload_url_ttl_secs: parse_or("UPLOAD_URL_TTL_SECS", defaults.upload_url_ttl_secs)?,
                view_url_ttl_secs: parse_or("VIEW_URL_TTL_SECS", defaults.view_url_ttl_secs)?,
            },
            upload: UploadConfig {
                max_files: parse_or("MAX_FILES", upload_defaults.max_files)?,
                batch_max_file_size: parse_or(
                    "BATCH_MAX_FILE_SIZE",
                    upload_defaults.batch_max_file_size,
                )?,
                direct_max_file_size: parse_or(
                    "DIRECT_MAX_FILE_SIZE",
                    upload_defaults.direct_max_file_size,
                )?,
                max_total_size: parse_or("MAX_TOTAL_SIZE", upload_defaults.max_total_size)?,
            },
            character: CharacterConfig {
                point_budget: parse_or("POINT_BUDGET", CharacterConfig::default().point_budget)?,
            },
        })
    }

    /// Configuration used by tests and the in-memory provider: no environment lookups.
    pub fn in_memory() -> Self {
        Self {
            server: ServerConfig {
                port: 3000,
                host: "127.0.0.1".to_string(),
                cors_allowed_origins: vec!["http://localhost:3000".to_string()],
            },
            storage: StorageConfig::default(),
            upload: UploadConfig::default(),
            character: CharacterConfig::default(),
        }
    }
}

fn parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value {:?}: {}", name, raw, e)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_defaults_keep_both_caps() {
        let upload = UploadConfig::default();
        assert_eq!(upload.batch_constraints().max_file_size, 5 * MIB);
        assert_eq!(upload.batch_constraints().max_total_size, Some(50 * MIB));
        assert_eq!(upload.direct_constraints().max_file_size, 10 * MIB);
        assert_eq!(upload.direct_constraints().max_total_size, None);
    }

    #[test]
    fn test_parse_or_falls_back_to_default() {
        let value: u32 = parse_or("CHARACTER_ALBUM_TEST_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }
}
