//! Configuration loading from TOML files with environment overrides.
//!
//! A configuration is loaded in three layers, each overriding the previous:
//! 1. the defaults supplied by the caller
//! 2. `<dir>/<name>.toml`
//! 3. environment variables named `<PREFIX>_<SECTION>__<KEY>`
//!
//! Nested keys are separated by a double underscore so that snake_case field
//! names stay addressable (`ENV_SERVER__REQUEST_TIMEOUT_MS`). Keys registered
//! with [`ConfigLoader::with_list_key`] take comma-separated lists.

use std::path::{Path, PathBuf};

use rust_cli_config::builder::{ConfigBuilder, DefaultState};
use rust_cli_config::{Config, Environment, File, FileFormat, Map};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

/// Directory searched by [`ConfigLoader::default`].
pub const DEFAULT_CONFIG_DIR: &str = "configs";

/// Prefix of environment overrides unless configured otherwise.
pub const DEFAULT_ENV_PREFIX: &str = "ENV";

/// Separator between the prefix and the first key segment.
const ENV_PREFIX_SEPARATOR: &str = "_";

/// Separator between nested key segments in variable names.
const ENV_SEPARATOR: &str = "__";

/// Separator of list elements in variable values.
const LIST_SEPARATOR: &str = ",";

/// Errors raised while loading a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("config file {} not found", path.display())]
    NotFound { path: PathBuf },

    /// The defaults could not be turned into a configuration source.
    #[error("failed to serialize config defaults: {0}")]
    Defaults(#[source] rust_cli_config::ConfigError),

    /// The configuration file is not valid TOML.
    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: rust_cli_config::ConfigError,
    },

    /// Environment overrides could not be merged.
    #[error("failed to apply environment overrides: {0}")]
    Environment(#[source] rust_cli_config::ConfigError),

    /// The merged configuration does not fit the target type.
    #[error("invalid configuration: {0}")]
    Decode(#[source] rust_cli_config::ConfigError),
}

/// Loads typed configurations from a directory of TOML files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLoader {
    dir: PathBuf,
    env_prefix: String,
    list_keys: Vec<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIG_DIR)
    }
}

impl ConfigLoader {
    /// Loader reading files from `dir` with the [`DEFAULT_ENV_PREFIX`].
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            list_keys: Vec::new(),
        }
    }

    /// Sets the prefix of environment overrides.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Marks a dotted key (`server.cors_origins`) whose environment override
    /// is a comma-separated list.
    #[must_use]
    pub fn with_list_key(mut self, key: impl Into<String>) -> Self {
        self.list_keys.push(key.into());
        self
    }

    /// Path of the file holding configuration `name`.
    #[must_use]
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.toml"))
    }

    /// Loads configuration `name` over `defaults`, reading overrides from
    /// the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] when the file is missing; callers
    /// wanting the defaults in that case fall back explicitly. Any other
    /// variant means the file or an override is invalid.
    pub fn load<T>(&self, name: &str, defaults: &T) -> Result<T, ConfigError>
    where
        T: Serialize + DeserializeOwned,
    {
        self.load_from(name, defaults, None)
    }

    /// Same as [`load`](Self::load) with overrides taken from `vars` instead
    /// of the process environment.
    ///
    /// # Errors
    ///
    /// See [`load`](Self::load).
    pub fn load_with_env<T, I>(&self, name: &str, defaults: &T, vars: I) -> Result<T, ConfigError>
    where
        T: Serialize + DeserializeOwned,
        I: IntoIterator<Item = (String, String)>,
    {
        self.load_from(name, defaults, Some(vars.into_iter().collect()))
    }

    fn load_from<T>(
        &self,
        name: &str,
        defaults: &T,
        vars: Option<Map<String, String>>,
    ) -> Result<T, ConfigError>
    where
        T: Serialize + DeserializeOwned,
    {
        let path = self.path_for(name);
        if !path.is_file() {
            return Err(ConfigError::NotFound { path });
        }

        let defaults = Config::try_from(defaults).map_err(ConfigError::Defaults)?;
        let builder = Config::builder()
            .add_source(defaults)
            .add_source(File::from(path.clone()).format(FileFormat::Toml));
        validate_file(&builder, &path)?;

        let settings = builder
            .add_source(self.environment(vars))
            .build()
            .map_err(ConfigError::Environment)?;

        debug!(path = %path.display(), "loaded configuration");
        settings.try_deserialize::<T>().map_err(ConfigError::Decode)
    }

    fn environment(&self, vars: Option<Map<String, String>>) -> Environment {
        let mut source = Environment::with_prefix(&self.env_prefix)
            .prefix_separator(ENV_PREFIX_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
            .source(vars);

        if !self.list_keys.is_empty() {
            source = source.list_separator(LIST_SEPARATOR);
            for key in &self.list_keys {
                source = source.with_list_parse_key(key);
            }
        }
        source
    }
}

fn validate_file(builder: &ConfigBuilder<DefaultState>, path: &Path) -> Result<(), ConfigError> {
    builder
        .clone()
        .build()
        .map(|_| ())
        .map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
}
