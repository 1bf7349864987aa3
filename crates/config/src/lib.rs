use std::{
    net::{IpAddr, SocketAddr},
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const PROJECT_ROOT: &str = env!("CARGO_MANIFEST_DIR");
const ASSET_DIR_ENV: &str = "TODO_ASSET_DIR";
const CONFIG_PATH_ENV: &str = "TODO_CONFIG_PATH";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("No home directory available for application data")]
    NoDataDir,
}

/// A caller provisioned at startup. The secret is stored only as a digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSeed {
    pub id: i64,
    pub secret: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// `None` means `sqlite://<asset dir>/db.sqlite`.
    pub database_url: Option<String>,
    pub log_level: String,
    pub users: Vec<UserSeed>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database_url: None,
            log_level: default_log_level(),
            users: Vec::new(),
        }
    }
}

impl Config {
    /// Parses `raw`, falling back to defaults when it is not a valid config.
    pub fn from_raw(raw: &str) -> Self {
        match serde_json::from_str::<Config>(raw) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!("Invalid config file, using defaults: {}", err);
                Config::default()
            }
        }
    }

    /// Applies `HOST`, `PORT`/`BACKEND_PORT`, `DATABASE_URL` and `RUST_LOG`.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(host) = non_empty_var("HOST") {
            self.host = host;
        }
        if let Some(port) = non_empty_var("BACKEND_PORT").or_else(|| non_empty_var("PORT")) {
            self.port = port
                .parse()
                .map_err(|_| ConfigError::ValidationError(format!("Invalid port: {port}")))?;
        }
        if let Some(url) = non_empty_var("DATABASE_URL") {
            self.database_url = Some(url);
        }
        if let Some(level) = non_empty_var("RUST_LOG") {
            self.log_level = level;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = std::collections::HashSet::new();
        for user in &self.users {
            if user.id <= 0 {
                return Err(ConfigError::ValidationError(format!(
                    "User id must be positive: {}",
                    user.id
                )));
            }
            if user.secret.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "User {} has an empty secret",
                    user.id
                )));
            }
            if !seen.insert(user.id) {
                return Err(ConfigError::ValidationError(format!(
                    "User {} is listed twice",
                    user.id
                )));
            }
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|_| ConfigError::ValidationError(format!("Invalid host: {}", self.host)))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn database_url(&self) -> Result<String, ConfigError> {
        match &self.database_url {
            Some(url) => Ok(url.clone()),
            None => Ok(format!(
                "sqlite://{}?mode=rwc",
                asset_dir()?.join("db.sqlite").to_string_lossy()
            )),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Directory holding the config file and the default SQLite database.
pub fn asset_dir() -> Result<PathBuf, ConfigError> {
    let path = match non_empty_var(ASSET_DIR_ENV) {
        Some(dir) => PathBuf::from(dir),
        None if cfg!(debug_assertions) => PathBuf::from(PROJECT_ROOT).join("../../dev_assets"),
        None => ProjectDirs::from("dev", "todo", "todo-server")
            .ok_or(ConfigError::NoDataDir)?
            .data_dir()
            .to_path_buf(),
    };

    if !path.exists() {
        std::fs::create_dir_all(&path)?;
    }
    Ok(path)
}

pub fn config_path() -> Result<PathBuf, ConfigError> {
    match non_empty_var(CONFIG_PATH_ENV) {
        Some(path) => Ok(PathBuf::from(path)),
        None => Ok(asset_dir()?.join("config.json")),
    }
}

/// Will always return config, falling back to defaults on missing/invalid files.
pub fn load_config_from_file(config_path: &Path) -> Config {
    match std::fs::read_to_string(config_path) {
        Ok(raw_config) => Config::from_raw(&raw_config),
        Err(err) => {
            if err.kind() == std::io::ErrorKind::NotFound {
                tracing::info!(
                    path = %config_path.display(),
                    "No config file found, using defaults"
                );
            } else {
                tracing::warn!("Failed to read config file: {}", err);
            }
            Config::default()
        }
    }
}

/// File config with environment overrides applied, validated.
pub fn load_config() -> Result<Config, ConfigError> {
    let mut config = load_config_from_file(&config_path()?);
    config.apply_env_overrides()?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use test_support::TestEnvGuard;

    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let env = TestEnvGuard::new();
        let config = load_config().unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config_path().unwrap(), env.path("config.json"));
        assert_eq!(config.socket_addr().unwrap().to_string(), "127.0.0.1:8080");
    }

    #[test]
    fn file_values_and_partial_fields() {
        let env = TestEnvGuard::new();
        std::fs::write(
            env.path("config.json"),
            r#"{"port": 9000, "users": [{"id": 7, "secret": "s7"}]}"#,
        )
        .unwrap();

        let config = load_config().unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(
            config.users,
            vec![UserSeed {
                id: 7,
                secret: "s7".to_string()
            }]
        );
    }

    #[test]
    fn invalid_file_falls_back_to_defaults() {
        let env = TestEnvGuard::new();
        std::fs::write(env.path("config.json"), "{ not json").unwrap();
        assert_eq!(load_config().unwrap(), Config::default());
    }

    #[test]
    fn env_overrides_file() {
        let env = TestEnvGuard::new();
        let custom = env.path("custom.json");
        std::fs::write(&custom, r#"{"host": "0.0.0.0", "port": 9000}"#).unwrap();
        env.set("TODO_CONFIG_PATH", &custom);
        env.set("PORT", "7000");
        env.set("BACKEND_PORT", "7100");
        env.set("DATABASE_URL", "sqlite::memory:");

        let config = load_config().unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 7100);
        assert_eq!(config.database_url().unwrap(), "sqlite::memory:");
    }

    #[test]
    fn bad_port_is_rejected() {
        let env = TestEnvGuard::new();
        env.set("PORT", "not-a-port");
        assert!(matches!(load_config(), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn duplicate_or_blank_users_are_rejected() {
        let config = Config {
            users: vec![
                UserSeed {
                    id: 1,
                    secret: "a".to_string(),
                },
                UserSeed {
                    id: 1,
                    secret: "b".to_string(),
                },
            ],
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            users: vec![UserSeed {
                id: 2,
                secret: " ".to_string(),
            }],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn default_database_lives_in_asset_dir() {
        let env = TestEnvGuard::new();
        let url = Config::default().database_url().unwrap();
        assert!(url.starts_with("sqlite://"), "{url}");
        assert!(url.contains(&*env.asset_dir().to_string_lossy()), "{url}");
        assert!(url.ends_with("db.sqlite?mode=rwc"), "{url}");
    }
}
