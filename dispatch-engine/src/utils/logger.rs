//! Logging Infrastructure
//!
//! Structured logging setup for development and production:
//! - Daily rotating application logs (deleted after 14 days)
//! - Daily rotating audit logs for packing transitions (target `audit`, never deleted)

use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, prelude::*};

/// Application log retention
const APP_LOG_RETENTION_DAYS: i64 = 14;

/// Clean up application log files older than the retention window
///
/// Rolling appender files are named `app.YYYY-MM-DD`.
pub fn cleanup_old_logs(log_dir: &Path) -> anyhow::Result<()> {
    let cutoff = chrono::Local::now().date_naive() - chrono::Duration::days(APP_LOG_RETENTION_DAYS);

    let app_log_dir = log_dir.join("app");
    if !app_log_dir.exists() {
        return Ok(());
    }

    for entry in fs::read_dir(app_log_dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(date_part) = name.strip_prefix("app.")
            && let Ok(date) = chrono::NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
            && date < cutoff
        {
            fs::remove_file(&path)?;
            tracing::info!(file = %name, "Deleted old log file");
        }
    }

    Ok(())
}

/// Initialize the logging system with optional daily rotating files
///
/// # Arguments
/// * `level` - Log level used when `RUST_LOG` is unset (e.g. "info", "debug")
/// * `json_format` - JSON output (production) or human-readable (development)
/// * `log_dir` - Optional directory for file logging; creates `app/` and `audit/`
///
/// # Examples
/// ```no_run
/// // Development setup (console only)
/// dispatch_engine::init_logger_with_file("debug", false, None)?;
///
/// // Production setup (console + file)
/// dispatch_engine::init_logger_with_file("info", true, Some("./logs"))?;
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn init_logger_with_file(
    level: &str,
    json_format: bool,
    log_dir: Option<&str>,
) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::registry().with(env_filter);

    let not_audit = || tracing_subscriber::filter::filter_fn(|meta| meta.target() != "audit");
    let only_audit = || tracing_subscriber::filter::filter_fn(|meta| meta.target() == "audit");

    let Some(dir) = log_dir else {
        if json_format {
            subscriber
                .with(fmt::layer().json().with_target(true).with_current_span(true))
                .try_init()?;
        } else {
            subscriber
                .with(fmt::layer().with_target(true).with_line_number(true))
                .try_init()?;
        }
        return Ok(());
    };

    let log_dir = Path::new(dir);
    let app_log_dir = log_dir.join("app");
    let audit_log_dir = log_dir.join("audit");
    fs::create_dir_all(&app_log_dir)?;
    fs::create_dir_all(&audit_log_dir)?;

    let app_log = RollingFileAppender::new(Rotation::DAILY, app_log_dir, "app");
    let audit_log = RollingFileAppender::new(Rotation::DAILY, audit_log_dir, "audit");

    if json_format {
        let console_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_thread_ids(true);
        let app_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(std::sync::Mutex::new(app_log))
            .with_filter(not_audit());
        let audit_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_writer(std::sync::Mutex::new(audit_log))
            .with_filter(only_audit());

        subscriber
            .with(console_layer)
            .with(app_layer)
            .with(audit_layer)
            .try_init()?;
    } else {
        let console_layer = fmt::layer().with_target(true).with_line_number(true);
        let app_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(app_log))
            .with_filter(not_audit());
        let audit_layer = fmt::layer()
            .with_target(true)
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(audit_log))
            .with_filter(only_audit());

        subscriber
            .with(console_layer)
            .with(app_layer)
            .with(audit_layer)
            .try_init()?;
    }

    // Cleanup needs a runtime; embedders without one call cleanup_old_logs themselves
    if let Ok(handle) = tokio::runtime::Handle::try_current() {
        handle.spawn(periodic_cleanup(log_dir.to_path_buf()));
    }

    Ok(())
}

/// Periodic cleanup task - runs every hour
async fn periodic_cleanup(log_dir: PathBuf) {
    use tokio::time::{Duration, sleep};

    loop {
        sleep(Duration::from_secs(3600)).await;

        if let Err(e) = cleanup_old_logs(&log_dir) {
            tracing::error!(error = %e, "Failed to cleanup old logs");
        }
    }
}

/// Initialize the logging system (console only)
pub fn init_logger(level: &str, json_format: bool) -> anyhow::Result<()> {
    init_logger_with_file(level, json_format, None)
}
