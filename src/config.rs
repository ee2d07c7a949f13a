use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::env;
use config;

#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub web: WebConfig,
    // Populated from the .env file
    pub database_path: String,
    pub token_secret: String,
    pub token_ttl_hours: i64,
    pub allowed_origins: String,
    pub log_level: String,
}

impl Config {
    pub fn from_env(env_path: &Path) -> Result<Self, config::ConfigError> {
        dotenvy::from_path(env_path)
            .map_err(|e| config::ConfigError::Message(format!(
                "FATAL: Failed to load .env file from '{}'. Error: {}", env_path.display(), e
            )))?;

        let database_path = env::var("DATABASE_PATH")
            .map_err(|_| config::ConfigError::Message(
                "FATAL: Environment variable 'DATABASE_PATH' is not set in your .env file.".to_string()
            ))?;

        if Path::new(&database_path).is_relative() {
            return Err(config::ConfigError::Message(format!(
                "FATAL: The 'DATABASE_PATH' in your .env file is a relative path ('{}'). It MUST be an absolute path.",
                database_path
            )));
        }

        let token_secret = env::var("TOKEN_SECRET")
            .map_err(|_| config::ConfigError::Message(
                "FATAL: Environment variable 'TOKEN_SECRET' is not set in your .env file.".to_string()
            ))?;
        validate_token_secret(&token_secret)?;

        let token_ttl_hours = match env::var("TOKEN_TTL_HOURS") {
            Ok(raw) => raw.trim().parse::<i64>().ok().filter(|h| *h > 0).ok_or_else(|| {
                config::ConfigError::Message(
                    "FATAL: 'TOKEN_TTL_HOURS' must be a positive whole number.".to_string()
                )
            })?,
            Err(_) => 24,
        };

        let allowed_origins = env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| "".to_string());
        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let builder = config::Config::builder()
            // Host/port and other static defaults.
            .add_source(config::File::new("config/default.toml", config::FileFormat::Toml))
            .set_override("database_path", database_path)?
            .set_override("token_secret", token_secret)?
            .set_override("token_ttl_hours", token_ttl_hours)?
            .set_override("allowed_origins", allowed_origins)?
            .set_override("log_level", log_level)?
            .build()?;

        builder.try_deserialize()
    }

    /// SQLite file holding clients and admin users.
    pub fn identity_db_path(&self) -> PathBuf {
        PathBuf::from(&self.database_path)
            .join("identity")
            .join("identity.db")
    }

    /// Redb file holding materials, campaigns and documents.
    pub fn content_db_path(&self) -> PathBuf {
        PathBuf::from(&self.database_path)
            .join("content")
            .join("content.db")
    }

    pub fn token_secret_bytes(&self) -> Result<Vec<u8>, hex::FromHexError> {
        hex::decode(&self.token_secret)
    }
}

/// The signing secret must be 128 hexadecimal characters (64 bytes).
pub fn validate_token_secret(secret: &str) -> Result<(), config::ConfigError> {
    if secret.len() != 128 || !secret.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(config::ConfigError::Message(
            "FATAL: 'TOKEN_SECRET' must be 128 hexadecimal characters long (64 bytes).".to_string()
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_secret_must_be_64_hex_bytes() {
        assert!(validate_token_secret(&"ab".repeat(64)).is_ok());
        assert!(validate_token_secret(&"ab".repeat(32)).is_err());
        assert!(validate_token_secret(&"zz".repeat(64)).is_err());
    }

    #[test]
    fn database_files_live_in_their_own_folders() {
        let config = Config {
            web: WebConfig { host: "127.0.0.1".into(), port: 8080 },
            database_path: "/var/lib/portal".into(),
            token_secret: "ab".repeat(64),
            token_ttl_hours: 24,
            allowed_origins: String::new(),
            log_level: "info".into(),
        };
        assert_eq!(config.identity_db_path(), PathBuf::from("/var/lib/portal/identity/identity.db"));
        assert_eq!(config.content_db_path(), PathBuf::from("/var/lib/portal/content/content.db"));
        assert_eq!(config.token_secret_bytes().unwrap().len(), 64);
    }
}
