//! Layered service configuration.
//!
//! Precedence, lowest first:
//! 1. built-in defaults ([`AppConfig::default`]),
//! 2. a TOML file (explicit `--config`, else the first of `./quizbank.toml`
//!    and `$XDG_CONFIG_HOME/quizbank/config.toml`),
//! 3. `QUIZBANK_*` environment variables, `__` between nested keys:
//!    `QUIZBANK_API__USERNAME=admin`, `QUIZBANK_SERVER__ALLOWED_ORIGINS=a,b`.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use quizbank_core::DataConfig;
use serde::{Deserialize, Serialize};

const ENV_PREFIX: &str = "QUIZBANK";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Configuration file not found at path: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required configuration field: {0}")]
    MissingField(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub data: DataConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// CORS origins. Empty allows any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

fn default_bind_addr() -> String {
    "127.0.0.1:5000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            allowed_origins: Vec::new(),
        }
    }
}

/// Management API credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub username: String,

    /// Argon2id PHC string, see [`crate::auth::hash_password`].
    #[serde(default)]
    pub password_hash: String,
}

impl AppConfig {
    /// Reject configurations the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.api.username.trim().is_empty() {
            return Err(ConfigError::MissingField("api.username".to_string()));
        }
        if self.api.password_hash.trim().is_empty() {
            return Err(ConfigError::MissingField("api.password_hash".to_string()));
        }
        Ok(())
    }
}

pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Merge the layers and validate the result.
    pub fn load(&self) -> Result<AppConfig> {
        let mut builder = Config::builder();

        let defaults_json = serde_json::to_string(&AppConfig::default())?;
        builder = builder.add_source(File::from_str(&defaults_json, config::FileFormat::Json));

        if let Some(ref path) = self.config_path {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
            builder = builder.add_source(File::from(path.as_path()));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("server.allowed_origins"),
        );

        let app_config: AppConfig = builder.build()?.try_deserialize()?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// First existing of `./quizbank.toml` and `<config dir>/quizbank/config.toml`.
    pub fn find_config_file() -> Option<PathBuf> {
        let cwd_config = PathBuf::from("./quizbank.toml");
        if cwd_config.exists() {
            return Some(cwd_config);
        }

        dirs::config_dir()
            .map(|dir| dir.join("quizbank").join("config.toml"))
            .filter(|path| path.exists())
    }

    /// Load from `path` if given, else from the default locations.
    pub fn load_from(path: Option<PathBuf>) -> Result<AppConfig> {
        match path.or_else(Self::find_config_file) {
            Some(path) => ConfigLoader::new().with_file(path).load(),
            None => ConfigLoader::new().load(),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use std::env;

    const CREDENTIALS: [(&str, &str); 2] = [
        ("QUIZBANK_API__USERNAME", "admin"),
        ("QUIZBANK_API__PASSWORD_HASH", "$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHQ$aGFzaA"),
    ];

    fn set_env(vars: &[(&str, &str)]) {
        for (key, value) in vars {
            unsafe { env::set_var(key, value) };
        }
    }

    fn clear_env(vars: &[(&str, &str)]) {
        for (key, _) in vars {
            unsafe { env::remove_var(key) };
        }
    }

    #[test]
    fn defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.bind_addr, "127.0.0.1:5000");
        assert!(config.server.allowed_origins.is_empty());
        assert_eq!(config.data.images_url, "/api/v1/app/images/");
    }

    #[test]
    #[serial]
    fn missing_credentials_are_rejected() {
        let err = ConfigLoader::new().load().unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(field) if field == "api.username"));
    }

    #[test]
    #[serial]
    fn env_supplies_credentials_and_lists() {
        let origins = [("QUIZBANK_SERVER__ALLOWED_ORIGINS", "http://a.test,http://b.test")];
        set_env(&CREDENTIALS);
        set_env(&origins);

        let config = ConfigLoader::new().load().unwrap();

        clear_env(&CREDENTIALS);
        clear_env(&origins);
        assert_eq!(config.api.username, "admin");
        assert_eq!(config.api.password_hash, CREDENTIALS[1].1);
        assert_eq!(
            config.server.allowed_origins,
            vec!["http://a.test", "http://b.test"]
        );
    }

    #[test]
    #[serial]
    fn env_overrides_toml_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("quizbank.toml");
        std::fs::write(
            &path,
            r#"
[server]
bind_addr = "0.0.0.0:8080"

[api]
username = "file-user"
password_hash = "$argon2id$v=19$m=19456,t=2,p=1$ZmlsZXNhbHQ$ZmlsZQ"

[data]
data_dir = "/srv/quizbank/data"
"#,
        )
        .unwrap();
        let overrides = [("QUIZBANK_API__USERNAME", "env-user")];
        set_env(&overrides);

        let config = ConfigLoader::new().with_file(&path).load().unwrap();

        clear_env(&overrides);
        assert_eq!(config.server.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.api.username, "env-user");
        assert_eq!(
            config.api.password_hash,
            "$argon2id$v=19$m=19456,t=2,p=1$ZmlsZXNhbHQ$ZmlsZQ"
        );
        assert_eq!(config.data.data_dir, PathBuf::from("/srv/quizbank/data"));
        assert_eq!(config.data.images_dir, PathBuf::from("dist/images"));
    }

    #[test]
    fn missing_file_error() {
        let result = ConfigLoader::new().with_file("/nonexistent/quizbank.toml").load();
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }
}
