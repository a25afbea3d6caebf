//! Layered configuration for trove.
//!
//! Sources, lowest priority first:
//! 1. Built-in defaults.
//! 2. A configuration file (TOML, YAML or JSON, chosen by extension): either
//!    the path given explicitly, or `config.toml` in the platform config
//!    directory if it exists.
//! 3. Environment variables prefixed with `TROVE_`, with `__` separating
//!    nested keys (`TROVE_CACHE__BUSY_TIMEOUT_MS=10000`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error};
use trove_cache::models::SubjectType;
use trove_cache::{DB_FILENAME, Options, StaticRegistry};

pub const ENV_PREFIX: &str = "TROVE_";
const CONFIG_FILENAME: &str = "config.toml";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "trove", "trove")
}

/// Location of the configuration file read when none is given explicitly.
pub fn default_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILENAME))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cache: CacheConfig,
    pub providers: ProvidersConfig,
}
impl Config {
    /// Load configuration from every source.
    ///
    /// An explicit `path` must exist; the default location is only read if
    /// it does.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        match path {
            Some(path) if !path.is_file() => {
                error!(path = %path.display(), "configuration file does not exist");
                exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
            },
            Some(path) => figment = Self::merge_file(figment, path),
            None => match default_path().filter(|path| path.is_file()) {
                Some(path) => figment = Self::merge_file(figment, &path),
                None => debug!("no configuration file found, using defaults"),
            },
        }
        Self::from_figment(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    fn merge_file(figment: Figment, path: &Path) -> Figment {
        debug!(path = %path.display(), "loading configuration file");
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
            Some("json") => figment.merge(Json::file(path)),
            _ => figment.merge(Toml::file(path)),
        }
    }

    /// Extract configuration from an already assembled [`Figment`].
    pub fn from_figment(figment: Figment) -> Result<Self> {
        figment
            .extract()
            .inspect_err(|err| error!(error = %err, "invalid configuration"))
            .or_raise(|| ErrorKind::Load)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory holding the cache database. Defaults to the platform data
    /// directory.
    pub root: Option<PathBuf>,
    pub filename: String,
    pub busy_timeout_ms: u64,
    pub max_connections: u32,
}
impl Default for CacheConfig {
    fn default() -> Self {
        let options = Options::default();
        Self {
            root: None,
            filename: options.filename,
            busy_timeout_ms: options.busy_timeout.as_millis().try_into().unwrap_or(u64::MAX),
            max_connections: options.max_connections,
        }
    }
}
impl CacheConfig {
    /// The configured root, or the platform data directory.
    pub fn root(&self) -> Result<PathBuf> {
        if let Some(root) = &self.root {
            return Ok(root.clone());
        }
        // No home directory to derive a data directory from.
        let dirs = project_dirs().ok_or_raise(|| ErrorKind::InvalidValue("cache.root".to_string()))?;
        Ok(dirs.data_dir().to_path_buf())
    }

    pub fn options(&self) -> Result<Options> {
        if self.filename.trim().is_empty() {
            exn::bail!(ErrorKind::InvalidValue("cache.filename".to_string()));
        }
        if self.max_connections == 0 {
            exn::bail!(ErrorKind::InvalidValue("cache.max_connections".to_string()));
        }
        Ok(Options {
            filename: self.filename.clone(),
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
            max_connections: self.max_connections,
        })
    }

    /// Path of the database file these settings point at.
    pub fn database_path(&self) -> Result<PathBuf> {
        Ok(self.root()?.join(if self.filename.is_empty() { DB_FILENAME } else { &self.filename }))
    }
}

/// Provider names per subject type, e.g. `lyrics = ["lyricswiki"]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProvidersConfig(pub BTreeMap<String, Vec<String>>);
impl ProvidersConfig {
    pub fn registry(&self) -> Result<StaticRegistry> {
        let mut registry = StaticRegistry::new();
        for (subject, names) in &self.0 {
            let subject = subject
                .parse::<SubjectType>()
                .inspect_err(|_| error!(%subject, "unknown subject type in provider configuration"))
                .or_raise(|| ErrorKind::InvalidValue(format!("providers.{subject}")))?;
            for name in names {
                registry.register(subject, name);
            }
        }
        Ok(registry)
    }
}
