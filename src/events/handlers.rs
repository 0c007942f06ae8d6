use super::{EventBus, UploadEvent, UploadEventPayload};
use crate::logging::{log_event, log_event_to};
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Component name of the upload log file (`<logs>/uploads.log`)
pub const UPLOAD_LOG_COMPONENT: &str = "uploads";

/// Handler that mirrors upload lifecycle events into the component log
pub struct LoggingEventHandler {
    event_bus: EventBus,
    shutdown: CancellationToken,
    logs_dir: Option<PathBuf>,
}

impl LoggingEventHandler {
    pub fn new(event_bus: EventBus, shutdown: CancellationToken) -> Self {
        Self {
            event_bus,
            shutdown,
            logs_dir: None,
        }
    }

    /// Write component logs under `logs_dir` instead of the config home
    pub fn with_logs_dir(mut self, logs_dir: impl Into<PathBuf>) -> Self {
        self.logs_dir = Some(logs_dir.into());
        self
    }

    /// Subscribe now and process events on a background task until shutdown or bus close
    pub fn start(self) -> JoinHandle<()> {
        let mut rx = self.event_bus.subscribe();

        tokio::spawn(async move {
            let logs_dir = self.logs_dir.as_deref();
            loop {
                tokio::select! {
                    result = rx.recv() => {
                        match result {
                            Ok(event) => handle_event(logs_dir, &event),
                            Err(broadcast::error::RecvError::Closed) => {
                                let message = "Logging handler stopped (event bus closed)";
                                record(logs_dir, "events", "INFO", message, None);
                                break;
                            }
                            Err(broadcast::error::RecvError::Lagged(n)) => {
                                let message = format!("Logging handler lagged {} events", n);
                                record(logs_dir, "events", "WARN", &message, None);
                            }
                        }
                    }
                    _ = self.shutdown.cancelled() => {
                        record(logs_dir, "events", "INFO", "Logging handler shutting down", None);
                        break;
                    }
                }
            }
        })
    }
}

/// Log helpers swallow failures; the handler must keep draining the bus
fn record(
    logs_dir: Option<&Path>,
    component: &str,
    level: &str,
    message: &str,
    details: Option<serde_json::Value>,
) {
    let result = match logs_dir {
        Some(dir) => log_event_to(dir, component, level, message, details),
        None => log_event(component, level, message, details),
    };
    result.unwrap_or_default();
}

fn handle_event(logs_dir: Option<&Path>, event: &UploadEvent) {
    if event.is_progress() {
        return;
    }

    let level = match event.payload {
        UploadEventPayload::Failed { .. } => "ERROR",
        _ => "INFO",
    };

    let details = serde_json::json!({
        "sequence": event.sequence,
        "itemId": event.item_id,
        "uploadId": event.upload_id,
        "payload": event.payload,
    });

    record(
        logs_dir,
        UPLOAD_LOG_COMPONENT,
        level,
        &format!("Upload {}", event.payload_type()),
        Some(details),
    );
}
