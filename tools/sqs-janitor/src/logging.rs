use crate::errors::JanitorError;
use serde::Serialize;
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

pub const DEFAULT_MAX_FILE_BYTES: u64 = 1024 * 1024;
pub const DEFAULT_DISK_BUDGET_BYTES: u64 = 10 * 1024 * 1024;

static RUN_LOG: OnceLock<Mutex<JsonlLogger>> = OnceLock::new();

/// Appends JSONL events to `path`. Once the active file reaches
/// `max_file_bytes` it is renamed to `<stem>.<millis>.jsonl`; only those
/// rotated siblings are ever pruned.
#[derive(Debug, Clone)]
pub struct JsonlLogger {
    pub path: PathBuf,
    pub max_payload_bytes: usize,
    pub max_file_bytes: u64,
    pub budget_bytes: u64,
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
            max_payload_bytes: 4096,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            budget_bytes: DEFAULT_DISK_BUDGET_BYTES,
        }
    }

    pub fn append(&self, event: &LogEvent<'_>) -> Result<(), JanitorError> {
        fs::create_dir_all(log_dir(&self.path)).map_err(|e| JanitorError::Io(e.to_string()))?;
        let line = serde_json::to_string(&LogEvent {
            level: event.level,
            event_type: event.event_type,
            payload: truncate_json(event.payload.clone(), self.max_payload_bytes),
        })
        .map_err(|e| JanitorError::Io(e.to_string()))?;

        self.rotate_if_full()?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| JanitorError::Io(e.to_string()))?;
        file.write_all(line.as_bytes())
            .map_err(|e| JanitorError::Io(e.to_string()))?;
        file.write_all(b"\n")
            .map_err(|e| JanitorError::Io(e.to_string()))?;

        prune_rotated_logs(&self.path, self.budget_bytes)?;
        Ok(())
    }

    fn rotate_if_full(&self) -> Result<(), JanitorError> {
        let Ok(meta) = fs::metadata(&self.path) else {
            return Ok(());
        };
        if meta.len() < self.max_file_bytes {
            return Ok(());
        }
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let mut rotated = rotated_path(&self.path, millis);
        let mut bump = millis;
        while rotated.exists() {
            bump += 1;
            rotated = rotated_path(&self.path, bump);
        }
        fs::rename(&self.path, &rotated).map_err(|e| JanitorError::Io(e.to_string()))
    }
}

/// Installs the process-wide run log. Only the first call wins.
pub fn init_run_log(path: impl AsRef<Path>) -> bool {
    RUN_LOG.set(Mutex::new(JsonlLogger::new(path))).is_ok()
}

/// Appends to the run log if one is installed; logging never fails the caller.
pub fn append_run_log(level: &str, event_type: &str, payload: Value) {
    let Some(logger) = RUN_LOG.get() else {
        return;
    };
    if let Ok(logger) = logger.lock() {
        let _ = logger.append(&LogEvent {
            level,
            event_type,
            payload,
        });
    }
}

pub fn structured_fallback_line(queue_url: &str, state: &str, message: &str) -> String {
    format!(
        "queue_url={queue_url} state={state} message={} ",
        message.replace('\n', "\\n")
    )
}

/// Deletes the oldest rotated siblings of `active` until the active file plus
/// the remaining rotations fit `budget_bytes`. Other files in the directory
/// are never touched.
pub fn prune_rotated_logs(active: &Path, budget_bytes: u64) -> Result<Vec<PathBuf>, JanitorError> {
    let active_len = fs::metadata(active).map(|m| m.len()).unwrap_or(0);
    let mut rotated = fs::read_dir(log_dir(active))
        .map_err(|e| JanitorError::Io(e.to_string()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter_map(|path| {
            let stamp = rotation_stamp(active, &path)?;
            let len = fs::metadata(&path).ok()?.len();
            Some((stamp, len, path))
        })
        .collect::<Vec<_>>();
    rotated.sort_by_key(|(stamp, _, _)| *stamp);

    let mut total = active_len + rotated.iter().map(|(_, len, _)| *len).sum::<u64>();
    let mut deleted = Vec::new();
    for (_, len, path) in rotated {
        if total <= budget_bytes {
            break;
        }
        fs::remove_file(&path).map_err(|e| JanitorError::Io(e.to_string()))?;
        total = total.saturating_sub(len);
        deleted.push(path);
    }
    Ok(deleted)
}

fn log_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn rotated_path(active: &Path, millis: u128) -> PathBuf {
    let stem = active
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    active.with_file_name(format!("{stem}.{millis}.jsonl"))
}

/// `Some(millis)` when `candidate` is named `<active stem>.<millis>.jsonl`.
fn rotation_stamp(active: &Path, candidate: &Path) -> Option<u128> {
    let stem = active.file_stem()?.to_str()?;
    let name = candidate.file_name()?.to_str()?;
    let digits = name.strip_prefix(stem)?.strip_prefix('.')?.strip_suffix(".jsonl")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
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
    use super::{prune_rotated_logs, structured_fallback_line, JsonlLogger, LogEvent};
    use serde_json::json;
    use std::fs;

    fn event() -> LogEvent<'static> {
        LogEvent {
            level: "info",
            event_type: "fetch.completed",
            payload: json!({"queue_url": "https://sqs.eu-west-1.amazonaws.com/1/orders"}),
        }
    }

    #[test]
    fn logger_truncates_large_payloads_and_writes_jsonl() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("run.jsonl");
        let mut logger = JsonlLogger::new(&path);
        logger.max_payload_bytes = 20;
        logger.budget_bytes = 1024;

        logger.append(&event()).expect("append");

        let text = fs::read_to_string(&path).expect("read");
        assert!(text.contains("\"event_type\":\"fetch.completed\""));
        assert!(text.contains("..."));
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn full_log_is_rotated_before_the_next_event() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("run.jsonl");
        let mut logger = JsonlLogger::new(&path);
        logger.max_file_bytes = 10;

        logger.append(&event()).expect("first");
        logger.append(&event()).expect("second");

        let rotated = fs::read_dir(dir.path())
            .expect("read dir")
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with("run.") && name != "run.jsonl")
            .collect::<Vec<_>>();
        assert_eq!(rotated.len(), 1, "{rotated:?}");
        assert_eq!(fs::read_to_string(&path).expect("active").lines().count(), 1);
    }

    #[test]
    fn pruning_removes_oldest_rotations_but_keeps_active_log() {
        let dir = tempfile::tempdir().expect("tempdir");
        let active = dir.path().join("run.jsonl");
        fs::write(dir.path().join("run.1000.jsonl"), vec![b'x'; 40]).expect("oldest");
        fs::write(dir.path().join("run.2000.jsonl"), vec![b'x'; 40]).expect("newer");
        fs::write(&active, vec![b'x'; 40]).expect("active");

        let deleted = prune_rotated_logs(&active, 90).expect("pruned");
        assert_eq!(deleted.len(), 1);
        assert!(deleted[0].ends_with("run.1000.jsonl"));
        assert!(dir.path().join("run.2000.jsonl").exists());
        assert!(active.exists());
    }

    #[test]
    fn unrelated_files_next_to_the_log_survive_pruning() {
        let dir = tempfile::tempdir().expect("tempdir");
        let foreign = [
            "exported-events.jsonl",
            "run.backup.jsonl",
            "runner.1000.jsonl",
            "notes.txt",
        ];
        for name in foreign {
            fs::write(dir.path().join(name), vec![b'x'; 200]).expect("foreign file");
        }
        let mut logger = JsonlLogger::new(dir.path().join("run.jsonl"));
        logger.budget_bytes = 50;

        logger.append(&event()).expect("append");

        for name in foreign {
            assert!(dir.path().join(name).exists(), "run log deleted {name}");
        }
    }

    #[test]
    fn fallback_line_is_deterministic() {
        let line = structured_fallback_line("q1", "failed", "boom\nagain");
        assert_eq!(line, "queue_url=q1 state=failed message=boom\\nagain ");
    }
}
