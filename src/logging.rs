//! Logging setup for applications embedding athena-query.
//!
//! The library itself only emits `tracing` events; these helpers install a
//! subscriber for hosts that do not bring their own. When a global subscriber
//! is already installed they leave it in place.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use tracing_subscriber::EnvFilter;

const LOG_FILE_NAME: &str = "athena-query.log";

/// `RUST_LOG` when set, otherwise `info`.
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs a subscriber that appends to a log file.
///
/// `path` defaults to [`default_log_path`]. Missing parent directories are
/// created. Returns the path written to; errors opening the file are returned
/// to the host rather than printed.
pub fn init_file_logging(path: Option<&Path>) -> io::Result<PathBuf> {
    let path = path.map_or_else(default_log_path, Path::to_path_buf);
    let file = open_log_file(&path)?;

    let _ = tracing::subscriber::set_global_default(file_subscriber(file, env_filter()));
    Ok(path)
}

/// Installs a subscriber that writes to stderr.
pub fn init_stderr_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(io::stderr)
        .try_init();
}

/// Default log file location: the platform state directory, then the config
/// directory, then the temp directory.
pub fn default_log_path() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::config_dir)
        .map(|dir| dir.join("athena-query").join(LOG_FILE_NAME))
        .unwrap_or_else(|| std::env::temp_dir().join(LOG_FILE_NAME))
}

/// Opens `path` for appending so a host's earlier log lines survive restarts.
fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

fn file_subscriber(file: File, filter: EnvFilter) -> impl tracing::Subscriber + Send + Sync {
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(file)
        .with_ansi(false)
        .finish()
}
