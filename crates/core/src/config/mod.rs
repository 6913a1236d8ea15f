//! Configuration types for toolsmith
//!
//! Loaded from an optional `toolsmith.toml`. Every field has a default so an
//! absent file and an empty file behave the same.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::paths::{self, ROOT_ENV};
use crate::{Error, Result};

/// File name looked up in the working directory when no path is given.
pub const CONFIG_FILE: &str = "toolsmith.toml";

/// Main configuration structure for toolsmith
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct Config {
    /// Dev root; `TOOLSMITH_ROOT` takes precedence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    /// Container engine settings
    #[serde(default)]
    pub container: ContainerConfig,
}

/// Container engine settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct ContainerConfig {
    /// Engine CLI executable
    #[serde(default = "default_engine")]
    pub engine: String,

    /// Alpine release used by builder images
    #[serde(default = "default_alpine_version")]
    pub alpine_version: String,

    /// Label key attached to images and containers
    #[serde(default = "default_label_key")]
    pub label_key: String,

    /// Label value attached to images and containers
    #[serde(default = "default_label_value")]
    pub label_value: String,

    /// Prefix of container names
    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            engine: default_engine(),
            alpine_version: default_alpine_version(),
            label_key: default_label_key(),
            label_value: default_label_value(),
            name_prefix: default_name_prefix(),
        }
    }
}

impl ContainerConfig {
    /// `key=value` label rendering used on the engine command line.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}={}", self.label_key, self.label_value)
    }
}

fn default_engine() -> String {
    "docker".to_string()
}

fn default_alpine_version() -> String {
    "3.20".to_string()
}

fn default_label_key() -> String {
    "com.toolsmith.build".to_string()
}

fn default_label_value() -> String {
    "true".to_string()
}

fn default_name_prefix() -> String {
    "toolsmith-build".to_string()
}

impl Config {
    /// Parse configuration text.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the TOML is malformed or has unknown keys.
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::configuration(e.to_string()))
    }

    /// Load configuration from `path`, or from `toolsmith.toml` in `cwd` if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly given file cannot be read or any
    /// file found fails to parse.
    pub fn load(path: Option<&Path>, cwd: &Path) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let candidate = cwd.join(CONFIG_FILE);
                if !candidate.is_file() {
                    tracing::debug!(cwd = %cwd.display(), "No configuration file, using defaults");
                    return Ok(Self::default());
                }
                candidate
            }
        };

        let text = std::fs::read_to_string(&path).map_err(|e| Error::io(e, &path, "read"))?;
        let config = Self::parse(&text).map_err(|e| match e {
            Error::Configuration { message } => {
                Error::configuration(format!("{}: {message}", path.display()))
            }
            other => other,
        })?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Resolve the dev root: `TOOLSMITH_ROOT`, then `root`, then the cache directory.
    ///
    /// # Errors
    ///
    /// Returns an error if no root is configured and the cache directory is unknown.
    pub fn resolve_root(&self) -> Result<PathBuf> {
        if let Ok(dir) = std::env::var(ROOT_ENV)
            && !dir.is_empty()
        {
            return Ok(PathBuf::from(dir));
        }
        match &self.root {
            Some(root) => Ok(root.clone()),
            None => paths::default_root(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.container.engine, "docker");
        assert_eq!(config.container.label(), "com.toolsmith.build=true");
    }

    #[test]
    fn test_partial_container_section() {
        let config = Config::parse(
            r#"
            root = "/srv/dev"

            [container]
            engine = "podman"
            "#,
        )
        .unwrap();
        assert_eq!(config.root, Some(PathBuf::from("/srv/dev")));
        assert_eq!(config.container.engine, "podman");
        assert_eq!(config.container.alpine_version, "3.20");
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = Config::parse("colour = true").unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_load_missing_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(None, dir.path()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_explicit_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.toml")), dir.path()).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_load_from_cwd_reports_path_on_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "root = [").unwrap();
        let err = Config::load(None, dir.path()).unwrap_err();
        assert!(err.to_string().contains(CONFIG_FILE));
    }

    #[test]
    fn test_resolve_root_precedence() {
        let config = Config {
            root: Some(PathBuf::from("/from/config")),
            ..Config::default()
        };
        temp_env::with_var(ROOT_ENV, Some("/from/env"), || {
            assert_eq!(config.resolve_root().unwrap(), PathBuf::from("/from/env"));
        });
        temp_env::with_var_unset(ROOT_ENV, || {
            assert_eq!(config.resolve_root().unwrap(), PathBuf::from("/from/config"));
        });
    }
}
