//! Logging setup.
//!
//! Records go to systemd's journal on Linux when it is reachable, otherwise to
//! a daily rolling file that keeps two weeks of history. Nothing is written
//! to the terminal, which the presenter may own.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Env var holding extra `EnvFilter` directives.
pub const LOG_ENV: &str = "HYMNBOOK_LOG";

/// Baseline levels per module.
const DEFAULT_DIRECTIVES: &str = "info,hymnbook::llm=info,hymnbook::store=warn,ureq=warn,rusqlite=warn";

const LOG_FILE_PREFIX: &str = "hymnbook";
const MAX_LOG_FILES: usize = 14;

static GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Defaults first, then whatever the user asked for, so a user directive for
/// the same target wins.
fn directives(user: Option<&str>) -> String {
    match user.map(str::trim).filter(|u| !u.is_empty()) {
        Some(user) => format!("{},{}", DEFAULT_DIRECTIVES, user),
        None => DEFAULT_DIRECTIVES.to_string(),
    }
}

pub fn build_filter(user: Option<&str>) -> EnvFilter {
    EnvFilter::new(directives(user))
}

fn file_appender(log_dir: &Path) -> Result<RollingFileAppender> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(log_dir)
        .with_context(|| format!("Failed to open log file in {}", log_dir.display()))
}

/// Install the global subscriber. Call once at startup.
pub fn init(log_dir: Option<PathBuf>) -> Result<()> {
    let user = std::env::var(LOG_ENV).ok();
    let filter = build_filter(user.as_deref());

    #[cfg(target_os = "linux")]
    {
        if let Ok(journald) = tracing_journald::layer() {
            tracing_subscriber::registry()
                .with(filter)
                .with(journald.with_syslog_identifier(LOG_FILE_PREFIX.to_string()))
                .try_init()?;
            tracing::info!(version = env!("CARGO_PKG_VERSION"), "Logging to journald");
            return Ok(());
        }
    }

    let log_dir = log_dir.unwrap_or_else(default_log_dir);
    let (writer, guard) = tracing_appender::non_blocking(file_appender(&log_dir)?);
    let _ = GUARD.set(guard);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false).with_target(true))
        .try_init()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        dir = %log_dir.display(),
        keep = MAX_LOG_FILES,
        "Logging to rolling file"
    );
    Ok(())
}

pub fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hymnbook")
        .join("logs")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives() {
        assert_eq!(directives(None), DEFAULT_DIRECTIVES);
        assert_eq!(directives(Some("  ")), DEFAULT_DIRECTIVES);
        assert!(DEFAULT_DIRECTIVES.contains("hymnbook::store=warn"));
    }

    #[test]
    fn test_user_directives_come_last() {
        let combined = directives(Some("hymnbook::store=debug"));
        assert!(combined.starts_with(DEFAULT_DIRECTIVES));
        assert!(combined.ends_with(",hymnbook::store=debug"));

        let filter = build_filter(Some("hymnbook::store=debug"));
        assert_eq!(filter.max_level_hint(), Some(tracing::level_filters::LevelFilter::DEBUG));
        assert_eq!(
            build_filter(None).max_level_hint(),
            Some(tracing::level_filters::LevelFilter::INFO)
        );
    }

    #[test]
    fn test_file_appender_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("nested").join("logs");
        file_appender(&logs).unwrap();
        assert!(logs.is_dir());
    }
}
