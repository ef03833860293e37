//! TOML configuration for the redactor media endpoints.
//!
//! Every field has a default, so a missing file means "run with defaults".
//! The file path comes from `REDACTOR_CONFIG`, falling back to
//! `redactor.toml` in the working directory.

use std::collections::BTreeMap;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;

use crate::errors::LocationError;
use crate::rules::ValidationRule;
use crate::sanitize::SanitizeOptions;
use crate::pipeline::UploadTarget;

pub const CONFIG_PATH_ENV: &str = "REDACTOR_CONFIG";
pub const BIND_ENV: &str = "REDACTOR_BIND";
/// Location used when a request does not name one.
pub const DEFAULT_LOCATION: &str = "files";
const DEFAULT_CONFIG_FILE: &str = "redactor.toml";

const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("a '{}' location must be configured", DEFAULT_LOCATION)]
    MissingDefaultLocation,

    #[error("upload.max_size must be greater than 0")]
    InvalidMaxSize,

    #[error("image.thumbnail must be a non-empty path segment, got '{0}'")]
    InvalidThumbnailProfile(String),

    #[error("extension '{0}' must be lower-case alphanumeric")]
    InvalidExtension(String),

    #[error("log_level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,

    /// Location key -> directory.
    pub locations: BTreeMap<String, PathBuf>,

    pub upload: UploadConfig,

    pub image: ImageConfig,

    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct UploadConfig {
    /// Maximum accepted upload, in bytes.
    pub max_size: u64,
    pub media_types: Vec<String>,
    pub file_types: Vec<String>,
    /// Fold sanitized filenames to lower case.
    pub lowercase_filenames: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ImageConfig {
    /// Thumbnail profile used in the public URL of uploaded images.
    pub thumbnail: String,
    pub thumb_width: u32,
    pub thumb_height: u32,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct SecurityConfig {
    /// Bearer token required on every redactor route. Empty disables the check.
    pub access_token: String,
}

impl Default for Config {
    fn default() -> Self {
        let mut locations = BTreeMap::new();
        locations.insert(DEFAULT_LOCATION.to_string(), PathBuf::from("public/files"));

        Self {
            server: ServerConfig::default(),
            locations,
            upload: UploadConfig::default(),
            image: ImageConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 3030)),
            log_level: "info".to_string(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_size: 8 * 1024 * 1024,
            media_types: to_strings(crate::state::IMAGE_TYPES),
            file_types: to_strings(crate::state::FILE_TYPES),
            lowercase_filenames: false,
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            thumbnail: "1000×1000×max".to_string(),
            thumb_width: 400,
            thumb_height: 300,
        }
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

impl Config {
    /// Load from `REDACTOR_CONFIG` (or `redactor.toml`) and apply
    /// environment overrides.
    pub fn load_from_env() -> Result<Self> {
        let path = std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut config = Self::load(&path)?;

        if let Ok(bind) = std::env::var(BIND_ENV) {
            config.server.bind = bind
                .parse()
                .with_context(|| format!("Invalid {}: {}", BIND_ENV, bind))?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).context("Invalid TOML configuration")
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.locations.contains_key(DEFAULT_LOCATION) {
            return Err(ConfigError::MissingDefaultLocation);
        }

        if self.upload.max_size == 0 {
            return Err(ConfigError::InvalidMaxSize);
        }

        let profile = &self.image.thumbnail;
        if profile.is_empty() || profile.contains('/') {
            return Err(ConfigError::InvalidThumbnailProfile(profile.clone()));
        }

        for extension in self.upload.media_types.iter().chain(&self.upload.file_types) {
            let valid = !extension.is_empty()
                && extension
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
            if !valid {
                return Err(ConfigError::InvalidExtension(extension.clone()));
            }
        }

        if !VALID_LOG_LEVELS.contains(&self.server.log_level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.server.log_level.clone()));
        }

        Ok(())
    }

    pub fn location_root(&self, key: &str) -> Result<&Path, LocationError> {
        self.locations
            .get(key)
            .map(PathBuf::as_path)
            .ok_or_else(|| LocationError::UnknownLocation(key.to_string()))
    }

    /// Upload destination for `key` plus an optional client sub-path, never
    /// outside the location root.
    pub fn upload_target(&self, key: &str, sub_path: &str) -> Result<UploadTarget, LocationError> {
        UploadTarget::new(self.location_root(key)?, sub_path)
    }

    /// Media types followed by file types, in configured order.
    pub fn allowed_upload_types(&self) -> Vec<String> {
        self.upload
            .media_types
            .iter()
            .chain(&self.upload.file_types)
            .cloned()
            .collect()
    }

    pub fn upload_rules(&self) -> Vec<ValidationRule> {
        vec![
            ValidationRule::extension(self.allowed_upload_types()),
            ValidationRule::size(self.upload.max_size),
        ]
    }

    pub fn sanitize_options(&self) -> SanitizeOptions {
        SanitizeOptions {
            lowercase: self.upload.lowercase_filenames,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.locations["files"], PathBuf::from("public/files"));
        assert_eq!(config.upload.max_size, 8 * 1024 * 1024);
        assert_eq!(config.image.thumb_width, 400);
        assert_eq!(config.image.thumb_height, 300);
        assert!(config.security.access_token.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_empty() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_from_toml_partial() {
        let config = Config::from_toml(
            r#"
            [locations]
            files = "/srv/site/files"
            themes = "/srv/site/themes"

            [upload]
            max_size = 1024
            lowercase_filenames = true

            [image]
            thumbnail = "default"
            "#,
        )
        .unwrap();

        assert_eq!(config.locations.len(), 2);
        assert_eq!(config.upload.max_size, 1024);
        assert!(config.upload.lowercase_filenames);
        assert_eq!(config.upload.media_types, Config::default().upload.media_types);
        assert_eq!(config.image.thumbnail, "default");
        assert_eq!(config.image.thumb_width, 400);
        assert_eq!(config.server, ServerConfig::default());
    }

    #[test]
    fn test_from_toml_invalid() {
        assert!(Config::from_toml("[upload]\nmax_size = \"big\"").is_err());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("redactor.toml");
        fs::write(&path, "[security]\naccess_token = \"s3cret\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.security.access_token, "s3cret");
    }

    #[test]
    fn test_validate() {
        let mut config = Config::default();
        config.upload.max_size = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidMaxSize));

        let mut config = Config::default();
        config.locations.remove(DEFAULT_LOCATION);
        config.locations.insert("themes".to_string(), PathBuf::from("themes"));
        assert_eq!(config.validate(), Err(ConfigError::MissingDefaultLocation));

        let mut config = Config::default();
        config.image.thumbnail = "a/b".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidThumbnailProfile(_))
        ));

        let mut config = Config::default();
        config.upload.file_types.push("PDF".to_string());
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidExtension("PDF".to_string()))
        );

        let mut config = Config::default();
        config.server.log_level = "loud".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidLogLevel(_))));
    }

    #[test]
    fn test_upload_target() {
        let config = Config::default();

        assert_eq!(
            config.upload_target("files", "2024").unwrap().dir(),
            Path::new("public/files/2024")
        );
        assert_eq!(
            config.upload_target("themes", ""),
            Err(LocationError::UnknownLocation("themes".to_string()))
        );
        assert!(matches!(
            config.upload_target("files", "../../etc"),
            Err(LocationError::Traversal(_))
        ));
    }

    #[test]
    fn test_upload_rules_order() {
        let config = Config::default();
        let allowed = config.allowed_upload_types();

        assert_eq!(allowed.first().map(String::as_str), Some("gif"));
        assert_eq!(allowed.last().map(String::as_str), Some("gz"));
        assert_eq!(
            config.upload_rules(),
            vec![
                ValidationRule::extension(allowed),
                ValidationRule::size(8 * 1024 * 1024),
            ]
        );
    }
}
