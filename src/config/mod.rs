use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Option name to value, applied on top of the defaults by the application factory
pub type ConfigOverrides = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub uploads: UploadConfig,
    pub search: SearchConfig,
    pub realtime: RealtimeConfig,
    /// Override options with no typed setting, kept as given
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub secret_key: String,
    pub instance_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connection_timeout_seconds: u64,
    pub idle_timeout_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub external_url: Option<String>,
    pub api_rate_limit: u64,
    pub max_request_body_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadConfig {
    pub folder: PathBuf,
    pub allowed_extensions: BTreeSet<String>,
    pub max_upload_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    pub index_path: PathBuf,
    pub timeout_seconds: u64,
    pub max_results: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeConfig {
    pub channel_capacity: usize,
}

const DEFAULT_SECRET_KEY: &str = "dev";
const DEFAULT_ALLOWED_EXTENSIONS: &str = "png,jpg,jpeg,gif";

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_value<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("Invalid {name} value")))
}

fn env_parse<T: std::str::FromStr>(name: &str, default: &str) -> Result<T> {
    parse_value(name, &env_or(name, default))
}

/// Parse a comma separated extension list ("png, .JPG") into lowercase names without dots
pub fn parse_extensions(value: &str) -> BTreeSet<String> {
    value
        .split(',')
        .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect()
}

impl Settings {
    /// Code defaults for an instance rooted at `instance_path`
    pub fn defaults(instance_path: impl AsRef<Path>) -> Self {
        let instance_path = instance_path.as_ref().to_path_buf();

        Settings {
            app: AppConfig {
                secret_key: DEFAULT_SECRET_KEY.to_string(),
                instance_path: instance_path.clone(),
            },
            database: DatabaseConfig {
                host: "localhost".to_string(),
                url: format!("sqlite:{}?mode=rwc", instance_path.join("recipes.db").display()),
                max_connections: 25,
                min_connections: 5,
                connection_timeout_seconds: 30,
                idle_timeout_seconds: 600,
            },
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
                external_url: None,
                api_rate_limit: 100,
                max_request_body_size: 10_485_760,
            },
            uploads: UploadConfig {
                folder: instance_path.join("uploads"),
                allowed_extensions: parse_extensions(DEFAULT_ALLOWED_EXTENSIONS),
                max_upload_size: 16_777_216,
            },
            search: SearchConfig {
                index_path: instance_path.join("index"),
                timeout_seconds: 10,
                max_results: 100,
            },
            realtime: RealtimeConfig {
                channel_capacity: 256,
            },
            extra: BTreeMap::new(),
        }
    }

    /// Load settings from environment variables
    pub fn from_env() -> Result<Self> {
        let instance_path = PathBuf::from(env_or("INSTANCE_PATH", "./instance"));
        let mut settings = Self::defaults(&instance_path);

        settings.app.secret_key = env_or("SECRET_KEY", DEFAULT_SECRET_KEY);

        settings.database.host = env_or("DB_HOST", "localhost");
        if let Ok(url) = std::env::var("DATABASE_URL") {
            settings.database.url = url;
        }
        settings.database.max_connections = env_parse("DATABASE_MAX_CONNECTIONS", "25")?;
        settings.database.min_connections = env_parse("DATABASE_MIN_CONNECTIONS", "5")?;
        settings.database.connection_timeout_seconds =
            env_parse("DATABASE_CONNECTION_TIMEOUT", "30")?;
        settings.database.idle_timeout_seconds = env_parse("DATABASE_IDLE_TIMEOUT", "600")?;

        settings.server.host = env_or("HOST", "0.0.0.0");
        settings.server.port = env_parse("PORT", "5000")?;
        settings.server.external_url = std::env::var("EXTERNAL_URL").ok();
        settings.server.api_rate_limit = env_parse("API_RATE_LIMIT", "100")?;
        settings.server.max_request_body_size = env_parse("MAX_REQUEST_BODY_SIZE", "10485760")?;

        if let Ok(folder) = std::env::var("UPLOAD_FOLDER") {
            settings.uploads.folder = folder.into();
        }
        settings.uploads.allowed_extensions =
            parse_extensions(&env_or("ALLOWED_EXTENSIONS", DEFAULT_ALLOWED_EXTENSIONS));
        settings.uploads.max_upload_size = env_parse("MAX_CONTENT_LENGTH", "16777216")?;

        if let Ok(path) = std::env::var("INDEX_PATH") {
            settings.search.index_path = path.into();
        }
        settings.search.timeout_seconds = env_parse("SEARCH_TIMEOUT", "10")?;
        settings.search.max_results = env_parse("SEARCH_MAX_RESULTS", "100")?;

        settings.realtime.channel_capacity = env_parse("REALTIME_CAPACITY", "256")?;

        Ok(settings)
    }

    /// Apply an override mapping verbatim. Names without a typed setting land in `extra`.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) -> Result<()> {
        for (name, value) in overrides {
            match name.as_str() {
                "SECRET_KEY" => self.app.secret_key = value.clone(),
                "DATABASE_HOST" | "DB_HOST" => self.database.host = value.clone(),
                "DATABASE_URL" => self.database.url = value.clone(),
                "DATABASE_MAX_CONNECTIONS" => {
                    self.database.max_connections = parse_value(name, value)?
                }
                "DATABASE_MIN_CONNECTIONS" => {
                    self.database.min_connections = parse_value(name, value)?
                }
                "HOST" => self.server.host = value.clone(),
                "PORT" => self.server.port = parse_value(name, value)?,
                "EXTERNAL_URL" => self.server.external_url = Some(value.clone()),
                "API_RATE_LIMIT" => self.server.api_rate_limit = parse_value(name, value)?,
                "MAX_REQUEST_BODY_SIZE" => {
                    self.server.max_request_body_size = parse_value(name, value)?
                }
                "UPLOAD_FOLDER" => self.uploads.folder = PathBuf::from(value),
                "ALLOWED_EXTENSIONS" => self.uploads.allowed_extensions = parse_extensions(value),
                "MAX_CONTENT_LENGTH" => self.uploads.max_upload_size = parse_value(name, value)?,
                "INDEX_PATH" => self.search.index_path = PathBuf::from(value),
                "SEARCH_TIMEOUT" => self.search.timeout_seconds = parse_value(name, value)?,
                "SEARCH_MAX_RESULTS" => self.search.max_results = parse_value(name, value)?,
                "REALTIME_CAPACITY" => self.realtime.channel_capacity = parse_value(name, value)?,
                _ => {
                    self.extra.insert(name.clone(), value.clone());
                }
            }
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::Config("Port must be non-zero".to_string()));
        }

        if self.server.api_rate_limit == 0 {
            return Err(Error::Config("API rate limit must be non-zero".to_string()));
        }

        if self.search.timeout_seconds == 0 {
            return Err(Error::Config("Search timeout must be non-zero".to_string()));
        }

        if self.uploads.allowed_extensions.is_empty() {
            return Err(Error::Config(
                "At least one upload extension must be allowed".to_string(),
            ));
        }

        if self.realtime.channel_capacity == 0 {
            return Err(Error::Config(
                "Realtime channel capacity must be non-zero".to_string(),
            ));
        }

        if self.app.secret_key == DEFAULT_SECRET_KEY {
            tracing::warn!("SECRET_KEY is the development default; set it for deployments");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overrides(pairs: &[(&str, &str)]) -> ConfigOverrides {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_settings_validation() {
        let mut settings = Settings::defaults("/tmp/instance");
        assert!(settings.validate().is_ok());

        settings.server.port = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::defaults("/tmp/instance");
        settings.uploads.allowed_extensions.clear();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_defaults_are_instance_relative() {
        let settings = Settings::defaults("/srv/app");
        assert_eq!(settings.uploads.folder, PathBuf::from("/srv/app/uploads"));
        assert_eq!(settings.search.index_path, PathBuf::from("/srv/app/index"));
        assert_eq!(settings.database.host, "localhost");
        assert_eq!(
            settings.uploads.allowed_extensions,
            ["gif", "jpeg", "jpg", "png"]
                .iter()
                .map(|s| s.to_string())
                .collect()
        );
    }

    #[test]
    fn test_apply_overrides_verbatim() {
        let mut settings = Settings::defaults("/srv/app");
        let map = overrides(&[
            ("SECRET_KEY", "test-secret"),
            ("DATABASE_HOST", "db.internal"),
            ("UPLOAD_FOLDER", "/tmp/uploads"),
            ("ALLOWED_EXTENSIONS", "png, .WEBP"),
            ("SEARCH_TIMEOUT", "3"),
        ]);

        settings.apply_overrides(&map).unwrap();

        assert_eq!(settings.app.secret_key, "test-secret");
        assert_eq!(settings.database.host, "db.internal");
        assert_eq!(settings.uploads.folder, PathBuf::from("/tmp/uploads"));
        assert!(settings.uploads.allowed_extensions.contains("webp"));
        assert!(!settings.uploads.allowed_extensions.contains("gif"));
        assert_eq!(settings.search.timeout_seconds, 3);
    }

    #[test]
    fn test_apply_overrides_idempotent() {
        let map = overrides(&[("SECRET_KEY", "s"), ("PORT", "8081")]);

        let mut once = Settings::defaults("/srv/app");
        once.apply_overrides(&map).unwrap();

        let mut twice = once.clone();
        twice.apply_overrides(&map).unwrap();

        assert_eq!(once, twice);
    }

    #[test]
    fn test_apply_overrides_keeps_unknown_options() {
        let mut settings = Settings::defaults("/srv/app");
        settings
            .apply_overrides(&overrides(&[("TESTING", "true"), ("PORT", "8081")]))
            .unwrap();

        assert_eq!(settings.extra.get("TESTING").map(String::as_str), Some("true"));
        assert!(!settings.extra.contains_key("PORT"));
        assert_eq!(settings.server.port, 8081);
    }

    #[test]
    fn test_apply_overrides_rejects_invalid_values() {
        let mut settings = Settings::defaults("/srv/app");
        assert!(settings
            .apply_overrides(&overrides(&[("PORT", "not-a-port")]))
            .is_err());
    }

    #[test]
    fn test_parse_extensions() {
        let exts = parse_extensions(" PNG,,.jpg , gif ");
        assert_eq!(exts.len(), 3);
        assert!(exts.contains("png"));
        assert!(exts.contains("jpg"));
    }
}
