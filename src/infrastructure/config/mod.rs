use std::path::Path;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::domain::error::{AppError, Result};

pub const DEFAULT_CONFIG_FILE: &str = "equipment.toml";
pub const ENV_PREFIX: &str = "EQUIPMENT_";

/// Maximum datasets kept per scope unless configured otherwise.
pub const MAX_STORED_DATASETS: usize = 5;

/// Rows shown in the report's sample table unless configured otherwise.
pub const REPORT_SAMPLE_ROWS: usize = 50;

/// Upper bound on a multipart upload body (10 MiB) unless configured otherwise.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub retention: RetentionConfig,
    pub report: ReportConfig,
    pub upload: UploadConfig,
    pub auth: AuthConfig,
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite URL, or `memory` for a process-local store
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    pub max_datasets: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub sample_rows: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Total bytes accepted across all parts of one upload form
    pub max_bytes: usize,
    /// Single ASCII field separator for uploaded tables
    pub delimiter: String,
}

impl UploadConfig {
    pub fn delimiter_byte(&self) -> Result<u8> {
        match self.delimiter.as_bytes() {
            [byte] if byte.is_ascii() && !matches!(*byte, b'"' | b'\r' | b'\n') => Ok(*byte),
            _ => Err(AppError::ConfigError(format!(
                "upload.delimiter must be one ASCII character, got '{}'",
                self.delimiter
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub users: Vec<UserCredential>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCredential {
    pub username: String,
    pub password: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8000,
            },
            database: DatabaseConfig {
                url: "sqlite://equipment.db".to_string(),
            },
            retention: RetentionConfig {
                max_datasets: MAX_STORED_DATASETS,
            },
            report: ReportConfig {
                sample_rows: REPORT_SAMPLE_ROWS,
            },
            upload: UploadConfig {
                max_bytes: MAX_UPLOAD_BYTES,
                delimiter: ",".to_string(),
            },
            auth: AuthConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load `.env`, then defaults < `equipment.toml` < `EQUIPMENT_*` env vars.
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        // A missing .env file is normal outside development.
        let _ = dotenvy::dotenv();

        let figment = Self::base_figment()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        Self::from_figment(figment)
    }

    /// Built-in defaults only; callers layer their own providers on top.
    pub fn base_figment() -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: AppConfig = figment
            .extract()
            .map_err(|e| AppError::ConfigError(format!("Failed to load configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            return Err(AppError::ConfigError("server.host must not be empty".to_string()));
        }
        if self.database.url.trim().is_empty() {
            return Err(AppError::ConfigError("database.url must not be empty".to_string()));
        }
        if self.retention.max_datasets == 0 {
            return Err(AppError::ConfigError(
                "retention.max_datasets must be > 0".to_string(),
            ));
        }
        if self.report.sample_rows == 0 {
            return Err(AppError::ConfigError("report.sample_rows must be > 0".to_string()));
        }
        if self.upload.max_bytes == 0 {
            return Err(AppError::ConfigError("upload.max_bytes must be > 0".to_string()));
        }
        self.upload.delimiter_byte()?;
        if self.auth.users.iter().any(|u| u.username.is_empty()) {
            return Err(AppError::ConfigError(
                "auth.users entries need a username".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::from_figment(AppConfig::base_figment()).unwrap();

        assert_eq!(config.server.port, 8000);
        assert_eq!(config.retention.max_datasets, 5);
        assert_eq!(config.report.sample_rows, 50);
        assert_eq!(config.upload.max_bytes, MAX_UPLOAD_BYTES);
        assert_eq!(config.upload.delimiter_byte().unwrap(), b',');
        assert!(config.auth.users.is_empty());
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let figment = AppConfig::base_figment().merge(Toml::string(
            r#"
            log_level = "debug"

            [server]
            port = 9100

            [database]
            url = "memory"

            [[auth.users]]
            username = "alice"
            password = "s3cret"
            "#,
        ));
        let config = AppConfig::from_figment(figment).unwrap();

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.database.url, "memory");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.auth.users[0].username, "alice");
    }

    #[test]
    fn test_zero_retention_is_rejected() {
        let figment = AppConfig::base_figment().merge(Toml::string(
            r#"
            [retention]
            max_datasets = 0
            "#,
        ));

        assert!(matches!(
            AppConfig::from_figment(figment),
            Err(AppError::ConfigError(_))
        ));
    }

    #[test]
    fn test_upload_section_is_validated() {
        let figment = AppConfig::base_figment().merge(Toml::string(
            r#"
            [upload]
            max_bytes = 2048
            delimiter = ";"
            "#,
        ));
        let config = AppConfig::from_figment(figment).unwrap();
        assert_eq!(config.upload.max_bytes, 2048);
        assert_eq!(config.upload.delimiter_byte().unwrap(), b';');

        for bad in [
            "[upload]\nmax_bytes = 0",
            "[upload]\ndelimiter = \";;\"",
            "[upload]\ndelimiter = \"\"",
        ] {
            let figment = AppConfig::base_figment().merge(Toml::string(bad));
            assert!(
                matches!(AppConfig::from_figment(figment), Err(AppError::ConfigError(_))),
                "accepted {bad}"
            );
        }
    }
}
