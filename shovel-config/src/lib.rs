//! Loader for shovel configuration with YAML + environment overlays.
//!
//! Sources are merged in order: an optional YAML file, inline YAML snippets,
//! then `SHOVEL_`-prefixed environment variables (`__` separates nested keys,
//! e.g. `SHOVEL_CLIENT__MAX_CONNECTIONS=8`). String values may reference other
//! environment variables as `${VAR}`; expansion runs after merging.
//!
//! Every section is optional, an empty source set yields [`ShovelConfig::default`].
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use shovel_common::observability::{LogConfig, LogFormat};
use std::path::{Path, PathBuf};
use std::time::Duration;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

/// Value sent as `User-Agent` unless configured otherwise.
pub const DEFAULT_USER_AGENT: &str = "shovel-rs HTTP client";

/// Upper bound on simultaneous in-flight requests per transport.
pub const DEFAULT_MAX_CONNECTIONS: usize = 32;

#[derive(Debug, Default, Deserialize)]
pub struct ShovelConfig {
    pub version: Option<String>,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Knobs for the default HTTP transport.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Whole-request timeout; unset means the transport never gives up on its own.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: None,
            max_connections: default_max_connections(),
        }
    }
}

impl ClientConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_app_name")]
    pub app_name: String,
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default)]
    pub emit_stderr: bool,
    #[serde(default = "default_filter")]
    pub default_filter: String,
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            format: LogFormat::default(),
            emit_stderr: false,
            default_filter: default_filter(),
            log_dir: None,
        }
    }
}

impl LoggingSettings {
    /// Translate into the shape `shovel_common::observability::init_logging` takes.
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            app_name: self.app_name.clone(),
            log_dir: self.log_dir.clone(),
            emit_stderr: self.emit_stderr,
            format: self.format,
            default_filter: self.default_filter.clone(),
        }
    }
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.into()
}
fn default_connect_timeout_ms() -> u64 {
    5_000
}
fn default_max_connections() -> usize {
    DEFAULT_MAX_CONNECTIONS
}
fn default_app_name() -> String {
    "shovel".into()
}
fn default_filter() -> String {
    "info".into()
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct ShovelConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    files: Vec<(PathBuf, bool)>,
    snippets: Vec<String>,
}

impl Default for ShovelConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ShovelConfigLoader {
    /// Start empty; `SHOVEL_` environment overrides are applied on [`load`](Self::load).
    ///
    /// ```
    /// use shovel_config::ShovelConfigLoader;
    ///
    /// let config = ShovelConfigLoader::new()
    ///     .with_yaml_str("version: '1'\nclient:\n  max_connections: 4")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.version.as_deref(), Some("1"));
    /// assert_eq!(config.client.max_connections, 4);
    /// assert_eq!(config.client.user_agent, shovel_config::DEFAULT_USER_AGENT);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
            files: Vec::new(),
            snippets: Vec::new(),
        }
    }

    /// Attach a YAML/TOML/JSON file that must exist; format is inferred by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.files.push((path.as_ref().to_path_buf(), true));
        self
    }

    /// Attach a file that is skipped when missing, so deployments can rely on env alone.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.files.push((path.as_ref().to_path_buf(), false));
        self
    }

    /// Merge an inline YAML snippet (tests, embedders with baked-in defaults).
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.snippets.push(yaml.to_string());
        self
    }

    /// Consume the builder and deserialize the merged sources.
    ///
    /// ```
    /// use shovel_config::ShovelConfigLoader;
    ///
    /// unsafe { std::env::set_var("SHOVEL_DOC_UA", "docs-bot/1.0"); }
    ///
    /// let config = ShovelConfigLoader::new()
    ///     .with_yaml_str(r#"
    /// client:
    ///   user_agent: "${SHOVEL_DOC_UA}"
    ///   request_timeout_ms: 2500
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(config.client.user_agent, "docs-bot/1.0");
    /// assert_eq!(
    ///     config.client.request_timeout(),
    ///     Some(std::time::Duration::from_millis(2500))
    /// );
    ///
    /// unsafe { std::env::remove_var("SHOVEL_DOC_UA"); }
    /// ```
    pub fn load(self) -> Result<ShovelConfig, ConfigError> {
        let mut builder = self.builder;
        for (path, required) in &self.files {
            builder = builder.add_source(File::from(path.as_path()).required(*required));
        }
        for yaml in &self.snippets {
            builder = builder.add_source(File::from_str(yaml, config::FileFormat::Yaml));
        }
        builder = builder.add_source(
            Environment::with_prefix("SHOVEL")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))
    }
}
