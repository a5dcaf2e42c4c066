//! Process-wide `tracing` setup for the tracker binary and its test suites.
//!
//! Events land in a file under the log directory that rolls over at local
//! midnight, optionally mirrored to `stderr`. Only binaries and tests install
//! the subscriber; the library crates just emit events. A repeated
//! [`init_logging`] call leaves the first subscriber in place and returns the
//! path it reported.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::Context;
use chrono::{DateTime, Local};
use serde::Deserialize;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Keeps the non-blocking writer flushing for the life of the process.
static FLUSH_GUARD: OnceLock<WorkerGuard> = OnceLock::new();
static ACTIVE_LOG: OnceLock<PathBuf> = OnceLock::new();

/// Overrides the log directory when [`LogConfig::log_dir`] is unset.
pub const LOG_DIR_ENV: &str = "TRACKER_LOG_DIR";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Names the log file and the per-user data directory.
    pub app_name: &'static str,
    /// Takes priority over `TRACKER_LOG_DIR` and the platform data directory.
    pub log_dir: Option<PathBuf>,
    pub emit_stderr: bool,
    pub format: LogFormat,
    /// `EnvFilter` directives, used only when `RUST_LOG` is absent.
    pub default_filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            app_name: "tracker",
            log_dir: None,
            emit_stderr: true,
            format: LogFormat::Text,
            default_filter: "info".to_string(),
        }
    }
}

/// Install the global subscriber and return today's log file.
pub fn init_logging(config: LogConfig) -> anyhow::Result<PathBuf> {
    if let Some(active) = ACTIVE_LOG.get() {
        return Ok(active.clone());
    }

    let dir = log_dir_for(config.app_name, config.log_dir.as_deref(), |key| {
        std::env::var(key).ok()
    });
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("cannot create log directory {}", dir.display()))?;

    let prefix = format!("{}.log", config.app_name);
    let current = daily_file(&dir, &prefix, Local::now());

    let (writer, guard) = tracing_appender::non_blocking(rolling::daily(&dir, &prefix));
    let _ = FLUSH_GUARD.set(guard);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    // Optional layers keep the registry type identical for every format/stderr mix.
    let (text, json) = match config.format {
        LogFormat::Text => (true, false),
        LogFormat::Json => (false, true),
    };
    let stderr = config.emit_stderr;
    tracing_subscriber::registry()
        .with(filter)
        .with(text.then(|| fmt::layer().with_ansi(false).with_writer(writer.clone())))
        .with(json.then(|| fmt::layer().json().with_writer(writer.clone())))
        .with((text && stderr).then(|| fmt::layer().with_writer(std::io::stderr)))
        .with((json && stderr).then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .try_init()
        .map_err(|e| anyhow::anyhow!("could not install tracing subscriber: {e}"))?;

    let _ = ACTIVE_LOG.set(current.clone());
    Ok(current)
}

/// Name of the file `rolling::daily` writes to on `now`'s date.
fn daily_file(dir: &Path, prefix: &str, now: DateTime<Local>) -> PathBuf {
    dir.join(format!("{prefix}.{}", now.format("%Y-%m-%d")))
}

fn log_dir_for(
    app_name: &str,
    configured: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> PathBuf {
    if let Some(dir) = configured {
        return with_home(dir);
    }
    if let Some(dir) = env(LOG_DIR_ENV).filter(|d| !d.is_empty()) {
        return with_home(Path::new(&dir));
    }
    match dirs::data_local_dir() {
        Some(base) => base.join(app_name),
        None => Path::new(".").join(app_name),
    }
}

/// Replace a leading `~/`.
fn with_home(path: &Path) -> PathBuf {
    let home = dirs::home_dir();
    match (path.strip_prefix("~"), home) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn configured_dir_beats_environment() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = log_dir_for("tracker", Some(tmp.path()), |_| Some("/elsewhere".into()));
        assert_eq!(dir, tmp.path());
    }

    #[test]
    fn environment_dir_used_when_unconfigured() {
        let dir = log_dir_for("tracker", None, |key| {
            (key == LOG_DIR_ENV).then(|| "/var/tmp/tracker-logs".to_string())
        });
        assert_eq!(dir, PathBuf::from("/var/tmp/tracker-logs"));
    }

    #[test]
    fn empty_environment_dir_falls_through() {
        let dir = log_dir_for("tracker", None, |_| Some(String::new()));
        assert!(dir.ends_with("tracker"));
    }

    #[test]
    fn home_prefix_is_replaced() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        assert_eq!(with_home(Path::new("~/logs")), home.join("logs"));
        assert_eq!(with_home(Path::new("/var/log")), PathBuf::from("/var/log"));
        assert_eq!(with_home(Path::new("~user/x")), PathBuf::from("~user/x"));
    }

    #[test]
    fn daily_file_carries_the_date_suffix() {
        let now = Local.with_ymd_and_hms(2024, 3, 9, 23, 59, 0).unwrap();
        let path = daily_file(Path::new("/logs"), "tracker.log", now);
        assert_eq!(path, PathBuf::from("/logs/tracker.log.2024-03-09"));
    }

    #[test]
    fn log_format_reads_lowercase_names() {
        let format: LogFormat = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(format, LogFormat::Json);
        assert_eq!(LogFormat::default(), LogFormat::Text);
    }
}
