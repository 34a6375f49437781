use crate::errors::RecorderError;
use serde::Serialize;
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 4096;

// Event types written by a recording session.
pub const EVENT_STAGE: &str = "stage";
pub const EVENT_COMMIT: &str = "commit";
pub const EVENT_COMMIT_FAILED: &str = "commit_failed";
pub const EVENT_INIT_FAILED: &str = "init_failed";
pub const EVENT_OUT_OF_ORDER: &str = "out_of_order";

/// Run log: one JSON object per line, appended.
#[derive(Debug)]
pub struct JsonlLogger {
    pub path: PathBuf,
    pub max_payload_bytes: usize,
    write_lock: Mutex<()>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEvent<'a> {
    pub level: &'a str,
    pub event_type: &'a str,
    pub payload: Value,
}

impl JsonlLogger {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            write_lock: Mutex::new(()),
        }
    }

    pub fn append(&self, event: &LogEvent<'_>) -> Result<(), RecorderError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| RecorderError::Io(e.to_string()))?;
        }
        let line = serde_json::to_string(&LogEvent {
            level: event.level,
            event_type: event.event_type,
            payload: truncate_json(event.payload.clone(), self.max_payload_bytes),
        })
        .map_err(|e| RecorderError::Io(e.to_string()))?;

        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| RecorderError::Io(e.to_string()))?;
        writeln!(file, "{line}").map_err(|e| RecorderError::Io(e.to_string()))
    }

    /// Best-effort append; a broken run log never fails the caller.
    pub fn emit(&self, level: &str, event_type: &str, payload: Value) {
        let _ = self.append(&LogEvent {
            level,
            event_type,
            payload,
        });
    }
}

pub fn structured_fallback_line(source: &str, state: &str, message: &str) -> String {
    format!(
        "source={source} state={state} message={} ",
        message.replace('\n', "\\n")
    )
}

fn truncate_json(value: Value, max_bytes: usize) -> Value {
    let rendered = serde_json::to_string(&value).unwrap_or_default();
    if rendered.len() <= max_bytes {
        return value;
    }
    let mut cut = max_bytes.saturating_sub(3);
    while cut > 0 && !rendered.is_char_boundary(cut) {
        cut -= 1;
    }
    Value::String(format!("{}...", &rendered[..cut]))
}

#[cfg(test)]
mod tests {
    use super::{structured_fallback_line, JsonlLogger, LogEvent, EVENT_COMMIT, EVENT_OUT_OF_ORDER};
    use serde_json::json;

    #[test]
    fn logger_truncates_large_payloads_and_writes_jsonl() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("logs/run.jsonl");
        let mut logger = JsonlLogger::new(&path);
        logger.max_payload_bytes = 20;

        logger
            .append(&LogEvent {
                level: "info",
                event_type: EVENT_COMMIT,
                payload: json!({"text": "abcdefghijklmnopqrstuvwxyz"}),
            })
            .expect("append");
        logger.emit("warn", EVENT_OUT_OF_ORDER, json!({"stage": "finalized"}));

        let text = std::fs::read_to_string(&path).expect("read");
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"event_type\":\"commit\""));
        assert!(lines[0].contains("..."));
        assert!(lines[1].contains("\"level\":\"warn\""));
    }

    #[test]
    fn fallback_line_is_deterministic() {
        let line = structured_fallback_line("driver", "complete", "hello\nworld");
        assert_eq!(line, "source=driver state=complete message=hello\\nworld ");
    }
}
