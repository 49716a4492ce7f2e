//! `tracing` setup for programs and test suites embedding shovel.
//!
//! Events go to a daily rolling file, `<dir>/<app_name>.log.<YYYY-MM-DD>`,
//! and optionally to stderr. The directory is `LogConfig::log_dir`, else
//! `$SHOVEL_LOG_DIR`, else `~/.local/share/<app_name>`. Only the first call to
//! [`init_logging`] installs anything.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::Context;
use chrono::Local;
use serde::Deserialize;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();
static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();

const LOG_DIR_ENV: &str = "SHOVEL_LOG_DIR";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Line format, `text` or `json` in configuration files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// File name stem and default directory name.
    pub app_name: String,
    pub log_dir: Option<PathBuf>,
    /// Mirror every event to stderr.
    pub emit_stderr: bool,
    pub format: LogFormat,
    /// `EnvFilter` directives used when `RUST_LOG` is unset, e.g. `shovel_web=debug`.
    pub default_filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            app_name: "shovel".to_string(),
            log_dir: None,
            emit_stderr: false,
            format: LogFormat::Text,
            default_filter: "info".to_string(),
        }
    }
}

/// Install the global subscriber and return today's log file path.
///
/// Later calls ignore their argument and return the path chosen by the first.
pub fn init_logging(config: LogConfig) -> anyhow::Result<PathBuf> {
    if let Some(path) = LOG_PATH.get() {
        return Ok(path.clone());
    }

    let dir = log_dir(&config);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("cannot create log directory {}", dir.display()))?;

    let stem = format!("{}.log", config.app_name);
    let path = dir.join(format!("{stem}.{}", Local::now().format("%Y-%m-%d")));
    let (file_writer, guard) = tracing_appender::non_blocking(rolling::daily(&dir, &stem));

    let mut sinks = vec![sink(file_writer, config.format, false)];
    if config.emit_stderr {
        sinks.push(sink(std::io::stderr, config.format, true));
    }
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    tracing_subscriber::registry()
        .with(sinks)
        .with(filter)
        .try_init()
        .context("tracing setup failed")?;

    let _ = LOG_GUARD.set(guard);
    Ok(LOG_PATH.get_or_init(|| path).clone())
}

fn sink<W>(writer: W, format: LogFormat, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Text => fmt::layer().with_writer(writer).with_ansi(ansi).boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(writer).boxed(),
    }
}

fn log_dir(config: &LogConfig) -> PathBuf {
    let configured = config
        .log_dir
        .clone()
        .or_else(|| std::env::var_os(LOG_DIR_ENV).map(PathBuf::from));
    match configured {
        Some(dir) => expand_home(&dir),
        None => match home() {
            Some(home) => home.join(".local/share").join(&config.app_name),
            None => PathBuf::from(&config.app_name),
        },
    }
}

fn home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), home()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
