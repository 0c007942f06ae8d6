use crate::config::{ensure_logs_dir, ensure_private_dir, get_logs_dir};
use crate::error::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::{LazyLock, Mutex};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{
    fmt::{self},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Rotate component logs once they pass 10MB
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated backups kept per component (`<name>.log.1` .. `<name>.log.5`)
const MAX_LOG_BACKUPS: u32 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: String,
    pub component: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

static LOGGER_INITIALIZED: std::sync::Once = std::sync::Once::new();

// Keep the guard alive for the lifetime of the program
static FILE_APPENDER_GUARD: LazyLock<Mutex<Option<tracing_appender::non_blocking::WorkerGuard>>> =
    LazyLock::new(|| Mutex::new(None));

pub fn init_logging() -> Result<()> {
    ensure_logs_dir()?;
    let logs_dir = get_logs_dir()?;

    LOGGER_INITIALIZED.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let console_layer = fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_filter(env_filter.clone());

        let file_appender = tracing_appender::rolling::never(&logs_dir, "app.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if let Ok(mut guard_mutex) = FILE_APPENDER_GUARD.lock() {
            *guard_mutex = Some(guard);
        }

        let file_layer = fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .with_filter(env_filter);

        // A host application may already own the global subscriber
        let _ = tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer)
            .try_init();
    });

    Ok(())
}

/// Emit through tracing and append a JSON line to `<logs>/<component>.log`
pub fn log_event(
    component: &str,
    level: &str,
    message: &str,
    details: Option<serde_json::Value>,
) -> Result<()> {
    log_event_to(&get_logs_dir()?, component, level, message, details)
}

/// [`log_event`] against an explicit logs directory
pub fn log_event_to(
    logs_dir: &Path,
    component: &str,
    level: &str,
    message: &str,
    details: Option<serde_json::Value>,
) -> Result<()> {
    match level {
        "ERROR" => error!(component = component, "{}", message),
        "WARN" => warn!(component = component, "{}", message),
        "DEBUG" => debug!(component = component, "{}", message),
        _ => info!(component = component, "{}", message),
    }

    ensure_private_dir(logs_dir)?;
    let log_file_path = logs_dir.join(format!("{}.log", component));

    let entry = LogEntry {
        timestamp: Utc::now().to_rfc3339(),
        level: level.to_string(),
        component: component.to_string(),
        message: message.to_string(),
        details,
    };

    write_log_entry(&log_file_path, &entry)
}

fn write_log_entry(log_file_path: &Path, entry: &LogEntry) -> Result<()> {
    if should_rotate_log(log_file_path)? {
        rotate_log_file(log_file_path)?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)?;

    let json_line = serde_json::to_string(entry)?;
    writeln!(file, "{}", json_line)?;
    file.flush()?;

    Ok(())
}

fn should_rotate_log(log_file_path: &Path) -> Result<bool> {
    if !log_file_path.exists() {
        return Ok(false);
    }

    let metadata = std::fs::metadata(log_file_path)?;
    Ok(metadata.len() > MAX_LOG_SIZE)
}

fn rotate_log_file(log_file_path: &Path) -> Result<()> {
    // Shift backups up by one (4 -> 5, 3 -> 4, ...); the oldest is overwritten
    for i in (1..MAX_LOG_BACKUPS).rev() {
        let current_backup = log_file_path.with_extension(format!("log.{}", i));
        let next_backup = log_file_path.with_extension(format!("log.{}", i + 1));

        if current_backup.exists() {
            std::fs::rename(&current_backup, &next_backup)?;
        }
    }

    if log_file_path.exists() {
        let first_backup = log_file_path.with_extension("log.1");
        std::fs::rename(log_file_path, first_backup)?;
    }

    Ok(())
}

// Log helpers swallow their own failures: a full disk must not fail an upload.

pub fn log_debug(component: &str, message: &str) {
    log_event(component, "DEBUG", message, None).unwrap_or_default();
}

pub fn log_info(component: &str, message: &str) {
    log_event(component, "INFO", message, None).unwrap_or_default();
}

pub fn log_warn(component: &str, message: &str) {
    log_event(component, "WARN", message, None).unwrap_or_default();
}

pub fn log_error(component: &str, message: &str) {
    log_event(component, "ERROR", message, None).unwrap_or_default();
}

pub fn log_with_details(component: &str, level: &str, message: &str, details: serde_json::Value) {
    log_event(component, level, message, Some(details)).unwrap_or_default();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn test_log_rotation() {
        let temp_dir = tempdir().unwrap();
        let log_file = temp_dir.path().join("uploads.log");

        {
            let mut file = File::create(&log_file).unwrap();
            let large_content = "x".repeat(11 * 1024 * 1024); // 11MB
            file.write_all(large_content.as_bytes()).unwrap();
        }

        assert!(should_rotate_log(&log_file).unwrap());

        rotate_log_file(&log_file).unwrap();

        let backup_file = log_file.with_extension("log.1");
        assert!(backup_file.exists());
        assert!(!log_file.exists());
    }

    #[test]
    fn test_small_log_not_rotated() {
        let temp_dir = tempdir().unwrap();
        let log_file = temp_dir.path().join("catalog.log");
        assert!(!should_rotate_log(&log_file).unwrap());

        std::fs::write(&log_file, "short").unwrap();
        assert!(!should_rotate_log(&log_file).unwrap());
    }

    #[test]
    fn test_rotation_shifts_existing_backups() {
        let temp_dir = tempdir().unwrap();
        let log_file = temp_dir.path().join("uploads.log");

        std::fs::write(&log_file, "current").unwrap();
        std::fs::write(log_file.with_extension("log.1"), "older").unwrap();

        rotate_log_file(&log_file).unwrap();

        assert_eq!(
            std::fs::read_to_string(log_file.with_extension("log.1")).unwrap(),
            "current"
        );
        assert_eq!(
            std::fs::read_to_string(log_file.with_extension("log.2")).unwrap(),
            "older"
        );
    }

    #[test]
    fn test_write_log_entry_appends_json_lines() {
        let temp_dir = tempdir().unwrap();
        let log_file = temp_dir.path().join("uploads.log");

        for message in ["first", "second"] {
            let entry = LogEntry {
                timestamp: "2026-01-01T00:00:00Z".to_string(),
                level: "INFO".to_string(),
                component: "uploads".to_string(),
                message: message.to_string(),
                details: Some(serde_json::json!({"uploadId": "abc"})),
            };
            write_log_entry(&log_file, &entry).unwrap();
        }

        let content = std::fs::read_to_string(&log_file).unwrap();
        let entries: Vec<LogEntry> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "first");
        assert_eq!(entries[1].message, "second");
        assert_eq!(entries[1].details.as_ref().unwrap()["uploadId"], "abc");
    }

    #[test]
    fn test_log_event_to_creates_dir_and_component_file() {
        let temp_dir = tempdir().unwrap();
        let logs_dir = temp_dir.path().join("logs");

        log_event_to(&logs_dir, "uploads", "WARN", "Chunk retried", None).unwrap();

        let content = std::fs::read_to_string(logs_dir.join("uploads.log")).unwrap();
        let entry: LogEntry = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(entry.level, "WARN");
        assert_eq!(entry.component, "uploads");
        assert!(entry.details.is_none());
    }
}
