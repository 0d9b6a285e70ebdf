use std::{env, fs, net::SocketAddr, path::PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,
    #[serde(default = "default_database_path")]
    pub database_path: String,
    /// Base URL prepended to invitation tokens when building the link a
    /// receiver follows to accept an invite.
    #[serde(default)]
    pub invite_link_base: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            database_path: default_database_path(),
            invite_link_base: None,
        }
    }
}

impl AppConfig {
    const CONFIG_ENV: &'static str = "CLIPDECK_CONFIG_FILE";
    const BIND_ADDRESS_ENV: &'static str = "CLIPDECK_BIND_ADDRESS";
    const DATABASE_PATH_ENV: &'static str = "CLIPDECK_DATABASE_PATH";
    const INVITE_LINK_BASE_ENV: &'static str = "CLIPDECK_INVITE_LINK_BASE";

    /// Load configuration from defaults layered with an optional config file
    /// and environment variables.
    pub fn load() -> Result<Self> {
        Self::load_with(None)
    }

    pub fn load_with(config_path: Option<PathBuf>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = Self::resolve_config_path(config_path)? {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("failed to read config file: {}", path.display()))?;
            config = toml::from_str(&contents)
                .with_context(|| format!("invalid config file: {}", path.display()))?;
        }

        if let Ok(addr) = env::var(Self::BIND_ADDRESS_ENV) {
            config.bind_address = addr
                .parse()
                .with_context(|| format!("invalid {name}", name = Self::BIND_ADDRESS_ENV))?;
        }

        if let Ok(path) = env::var(Self::DATABASE_PATH_ENV) {
            config.database_path = path;
        }

        if let Ok(base) = env::var(Self::INVITE_LINK_BASE_ENV) {
            if !base.trim().is_empty() {
                config.invite_link_base = Some(base);
            }
        }

        Ok(config)
    }

    fn resolve_config_path(explicit: Option<PathBuf>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            return Self::validate_path(path);
        }

        if let Ok(path) = env::var(Self::CONFIG_ENV) {
            return Self::validate_path(PathBuf::from(path));
        }

        let candidate = PathBuf::from("clipdeck.toml");
        if candidate.exists() {
            return Ok(Some(candidate));
        }

        Ok(None)
    }

    fn validate_path(path: PathBuf) -> Result<Option<PathBuf>> {
        if path.exists() {
            Ok(Some(path))
        } else {
            Err(anyhow!(
                "configuration file does not exist: {}",
                path.display()
            ))
        }
    }
}

fn default_bind_address() -> SocketAddr {
    "127.0.0.1:8084"
        .parse()
        .expect("default bind address must be valid")
}

fn default_database_path() -> String {
    "./data/clipdeck.db".to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = AppConfig::default();
        assert_eq!(config.bind_address.port(), 8084);
        assert_eq!(config.database_path, "./data/clipdeck.db");
        assert!(config.invite_link_base.is_none());
    }

    #[test]
    fn config_file_overrides_defaults() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("clipdeck.toml");
        fs::write(
            &path,
            "bind_address = \"0.0.0.0:9090\"\ndatabase_path = \"/tmp/test.db\"\n",
        )
        .expect("write config");

        let config = AppConfig::load_with(Some(path)).expect("load config");
        assert_eq!(config.bind_address.port(), 9090);
        assert_eq!(config.database_path, "/tmp/test.db");
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let err = AppConfig::load_with(Some(PathBuf::from("/definitely/not/here.toml")))
            .expect_err("missing file must error");
        assert!(err.to_string().contains("does not exist"));
    }
}
