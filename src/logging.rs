//! Log output for the terminal UI
//!
//! The terminal belongs to the UI, so logs go to a file. The filter comes from
//! `SCORELINE_LOG` when set, otherwise from the `--log-level` argument.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Environment variable that overrides the log filter
pub const LOG_ENV_VAR: &str = "SCORELINE_LOG";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to open log file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid log filter '{0}'")]
    Filter(String),

    #[error("a global logger is already installed")]
    AlreadyInstalled,
}

/// Default log location: `$TMPDIR/scoreline.log`
pub fn default_log_path() -> PathBuf {
    std::env::temp_dir().join("scoreline.log")
}

/// Opens a log file for appending, creating parent directories as needed
pub fn open_log_file(path: &Path) -> Result<File, LoggingError> {
    let io_err = |source| LoggingError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_err)
}

/// Builds the level filter, preferring the environment override
pub fn build_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    match std::env::var(LOG_ENV_VAR) {
        Ok(directives) if !directives.trim().is_empty() => {
            EnvFilter::try_new(&directives).map_err(|_| LoggingError::Filter(directives))
        }
        _ => EnvFilter::try_new(level).map_err(|_| LoggingError::Filter(level.to_string())),
    }
}

/// Installs the global subscriber writing to `path` (or the default location)
///
/// Returns the path logs are written to.
pub fn init(path: Option<&Path>, level: &str) -> Result<PathBuf, LoggingError> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_log_path);
    let file = open_log_file(&path)?;
    let filter = build_filter(level)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInstalled)?;

    Ok(path)
}
