use crate::config::AppConfig;
use crate::errors::JanitorError;
use crate::logging::append_run_log;
use crate::sqs::SqsQueueService;
use crate::worker_pool::CancellationToken;
use serde_json::json;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub type AttributeMap = HashMap<String, String>;

/// Synchronous view of the queueing service. Implementations must be safe to
/// call from many fetch workers at once.
pub trait QueueService: Send + Sync {
    fn list_queue_urls(&self, prefix: Option<&str>) -> Result<Vec<String>, JanitorError>;
    fn get_queue_attributes(
        &self,
        queue_url: &str,
        attribute_names: &[&str],
    ) -> Result<AttributeMap, JanitorError>;
    fn purge_queue(&self, queue_url: &str) -> Result<(), JanitorError>;
}

pub trait QueueConnector: Send + Sync {
    fn connect(&self, cfg: &AppConfig) -> Result<Arc<dyn QueueService>, JanitorError>;
}

pub trait FileSystem: Send + Sync {
    fn read_to_string(&self, path: &Path) -> Result<String, JanitorError>;
    fn exists(&self, path: &Path) -> bool;
}

pub trait Terminal: Send + Sync {
    fn stdin_is_tty(&self) -> bool;
    fn write_line(&self, line: &str) -> Result<(), JanitorError>;
}

/// Cancels a token when the operator interrupts the process. Watching stops
/// when the returned guard is dropped.
pub trait InterruptWatcher: Send + Sync {
    fn watch(&self, token: CancellationToken) -> Result<InterruptGuard, JanitorError>;
}

#[derive(Debug, Default)]
pub struct InterruptGuard {
    stop: Option<tokio::sync::oneshot::Sender<()>>,
    watcher: Option<std::thread::JoinHandle<()>>,
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(watcher) = self.watcher.take() {
            let _ = watcher.join();
        }
    }
}

pub struct ProductionConnector;

impl QueueConnector for ProductionConnector {
    fn connect(&self, cfg: &AppConfig) -> Result<Arc<dyn QueueService>, JanitorError> {
        let service = SqsQueueService::connect(
            &cfg.aws,
            Duration::from_secs(cfg.fetch.call_timeout_seconds),
        )?;
        Ok(Arc::new(service))
    }
}

pub struct ProductionFileSystem;

impl FileSystem for ProductionFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String, JanitorError> {
        std::fs::read_to_string(path).map_err(|e| JanitorError::Io(e.to_string()))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

pub struct ProductionTerminal;

impl Terminal for ProductionTerminal {
    fn stdin_is_tty(&self) -> bool {
        std::io::IsTerminal::is_terminal(&std::io::stdin())
    }

    fn write_line(&self, line: &str) -> Result<(), JanitorError> {
        use std::io::Write;
        let mut out = std::io::stdout();
        writeln!(out, "{line}").map_err(|e| JanitorError::Io(e.to_string()))
    }
}

/// Ctrl-C while watching cancels the token instead of killing the process,
/// so queued fetches drain as cancelled failures.
pub struct CtrlCWatcher;

impl InterruptWatcher for CtrlCWatcher {
    fn watch(&self, token: CancellationToken) -> Result<InterruptGuard, JanitorError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| JanitorError::Io(e.to_string()))?;
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let watcher = std::thread::Builder::new()
            .name("sqs-janitor-interrupt".to_string())
            .spawn(move || {
                runtime.block_on(async move {
                    tokio::select! {
                        signal = tokio::signal::ctrl_c() => {
                            if signal.is_ok() {
                                append_run_log("warn", "fetch.interrupted", json!({}));
                                token.cancel();
                            }
                        }
                        _ = stop_rx => {}
                    }
                });
            })
            .map_err(|e| JanitorError::Io(e.to_string()))?;
        Ok(InterruptGuard {
            stop: Some(stop_tx),
            watcher: Some(watcher),
        })
    }
}

pub struct ProductionRuntime {
    pub file_system: Arc<dyn FileSystem>,
    pub terminal: Arc<dyn Terminal>,
    pub connector: Arc<dyn QueueConnector>,
    pub interrupts: Arc<dyn InterruptWatcher>,
}

impl ProductionRuntime {
    pub fn new() -> Self {
        Self {
            file_system: Arc::new(ProductionFileSystem),
            terminal: Arc::new(ProductionTerminal),
            connector: Arc::new(ProductionConnector),
            interrupts: Arc::new(CtrlCWatcher),
        }
    }
}

impl Default for ProductionRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default, Clone)]
pub struct FakeFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, String>>>,
}

impl FakeFileSystem {
    pub fn with_file(path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        let fs = Self::default();
        fs.files
            .lock()
            .expect("files lock")
            .insert(path.into(), contents.into());
        fs
    }
}

impl FileSystem for FakeFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String, JanitorError> {
        self.files
            .lock()
            .expect("files lock")
            .get(path)
            .cloned()
            .ok_or_else(|| JanitorError::Io(format!("missing file {}", path.display())))
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.lock().expect("files lock").contains_key(path)
    }
}

#[derive(Default, Clone)]
pub struct FakeTerminal {
    pub is_tty: bool,
    writes: Arc<Mutex<Vec<String>>>,
}

impl FakeTerminal {
    pub fn new(is_tty: bool) -> Self {
        Self {
            is_tty,
            ..Self::default()
        }
    }

    pub fn written_lines(&self) -> Vec<String> {
        self.writes.lock().expect("writes lock").clone()
    }
}

impl Terminal for FakeTerminal {
    fn stdin_is_tty(&self) -> bool {
        self.is_tty
    }

    fn write_line(&self, line: &str) -> Result<(), JanitorError> {
        self.writes
            .lock()
            .expect("writes lock")
            .push(line.to_string());
        Ok(())
    }
}

/// Scripted queue service. Unknown URLs answer with a remote-call error.
#[derive(Default, Clone)]
pub struct FakeQueueService {
    queue_urls: Arc<Mutex<Vec<String>>>,
    attributes: Arc<Mutex<HashMap<String, Result<AttributeMap, JanitorError>>>>,
    list_error: Arc<Mutex<Option<JanitorError>>>,
    purge_errors: Arc<Mutex<HashMap<String, JanitorError>>>,
    attribute_requests: Arc<Mutex<Vec<(String, Vec<String>)>>>,
    list_prefixes: Arc<Mutex<Vec<Option<String>>>>,
    purged: Arc<Mutex<Vec<String>>>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
    call_delay: Arc<Mutex<Duration>>,
}

impl FakeQueueService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_queue(&self, queue_url: &str, message_count: u64) {
        let mut attributes = AttributeMap::new();
        attributes.insert(
            crate::types::APPROXIMATE_NUMBER_OF_MESSAGES.to_string(),
            message_count.to_string(),
        );
        self.push_raw_attributes(queue_url, attributes);
    }

    pub fn push_raw_attributes(&self, queue_url: &str, attributes: AttributeMap) {
        self.queue_urls
            .lock()
            .expect("urls lock")
            .push(queue_url.to_string());
        self.attributes
            .lock()
            .expect("attributes lock")
            .insert(queue_url.to_string(), Ok(attributes));
    }

    pub fn push_attribute_error(&self, queue_url: &str, error: JanitorError) {
        self.queue_urls
            .lock()
            .expect("urls lock")
            .push(queue_url.to_string());
        self.attributes
            .lock()
            .expect("attributes lock")
            .insert(queue_url.to_string(), Err(error));
    }

    pub fn set_list_error(&self, error: JanitorError) {
        *self.list_error.lock().expect("list lock") = Some(error);
    }

    pub fn set_purge_error(&self, queue_url: &str, error: JanitorError) {
        self.purge_errors
            .lock()
            .expect("purge lock")
            .insert(queue_url.to_string(), error);
    }

    pub fn set_call_delay(&self, delay: Duration) {
        *self.call_delay.lock().expect("delay lock") = delay;
    }

    pub fn attribute_requests(&self) -> Vec<(String, Vec<String>)> {
        self.attribute_requests
            .lock()
            .expect("requests lock")
            .clone()
    }

    pub fn list_prefixes(&self) -> Vec<Option<String>> {
        self.list_prefixes.lock().expect("prefix lock").clone()
    }

    pub fn purged(&self) -> Vec<String> {
        self.purged.lock().expect("purged lock").clone()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

impl QueueService for FakeQueueService {
    fn list_queue_urls(&self, prefix: Option<&str>) -> Result<Vec<String>, JanitorError> {
        self.list_prefixes
            .lock()
            .expect("prefix lock")
            .push(prefix.map(str::to_string));
        if let Some(error) = self.list_error.lock().expect("list lock").clone() {
            return Err(error);
        }
        let urls = self.queue_urls.lock().expect("urls lock").clone();
        Ok(match prefix {
            Some(prefix) => urls
                .into_iter()
                .filter(|url| {
                    url.rsplit('/')
                        .next()
                        .is_some_and(|name| name.starts_with(prefix))
                })
                .collect(),
            None => urls,
        })
    }

    fn get_queue_attributes(
        &self,
        queue_url: &str,
        attribute_names: &[&str],
    ) -> Result<AttributeMap, JanitorError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        self.attribute_requests.lock().expect("requests lock").push((
            queue_url.to_string(),
            attribute_names.iter().map(|name| name.to_string()).collect(),
        ));

        let delay = *self.call_delay.lock().expect("delay lock");
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        let response = self
            .attributes
            .lock()
            .expect("attributes lock")
            .get(queue_url)
            .cloned()
            .unwrap_or_else(|| {
                Err(JanitorError::RemoteCall(format!(
                    "queue does not exist: {queue_url}"
                )))
            });
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        response
    }

    fn purge_queue(&self, queue_url: &str) -> Result<(), JanitorError> {
        if let Some(error) = self
            .purge_errors
            .lock()
            .expect("purge lock")
            .get(queue_url)
            .cloned()
        {
            return Err(error);
        }
        self.purged
            .lock()
            .expect("purged lock")
            .push(queue_url.to_string());
        Ok(())
    }
}

/// Hands out a pre-built service regardless of config, recording what it saw.
#[derive(Clone)]
pub struct FakeConnector {
    service: Arc<dyn QueueService>,
    connect_error: Option<JanitorError>,
    seen: Arc<Mutex<Vec<AppConfig>>>,
}

impl FakeConnector {
    pub fn new(service: Arc<dyn QueueService>) -> Self {
        Self {
            service,
            connect_error: None,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(service: Arc<dyn QueueService>, error: JanitorError) -> Self {
        Self {
            connect_error: Some(error),
            ..Self::new(service)
        }
    }

    pub fn seen_configs(&self) -> Vec<AppConfig> {
        self.seen.lock().expect("seen lock").clone()
    }
}

impl QueueConnector for FakeConnector {
    fn connect(&self, cfg: &AppConfig) -> Result<Arc<dyn QueueService>, JanitorError> {
        self.seen.lock().expect("seen lock").push(cfg.clone());
        if let Some(error) = &self.connect_error {
            return Err(error.clone());
        }
        Ok(Arc::clone(&self.service))
    }
}

/// Interrupts as soon as watching starts when `interrupt_immediately` is set.
#[derive(Debug, Clone, Default)]
pub struct FakeInterruptWatcher {
    pub interrupt_immediately: bool,
    watches: Arc<AtomicUsize>,
}

impl FakeInterruptWatcher {
    pub fn interrupting() -> Self {
        Self {
            interrupt_immediately: true,
            ..Self::default()
        }
    }

    pub fn watch_count(&self) -> usize {
        self.watches.load(Ordering::SeqCst)
    }
}

impl InterruptWatcher for FakeInterruptWatcher {
    fn watch(&self, token: CancellationToken) -> Result<InterruptGuard, JanitorError> {
        self.watches.fetch_add(1, Ordering::SeqCst);
        if self.interrupt_immediately {
            token.cancel();
        }
        Ok(InterruptGuard::default())
    }
}

#[cfg(test)]
mod tests {
    use super::{CtrlCWatcher, InterruptWatcher};
    use crate::worker_pool::CancellationToken;

    #[test]
    fn dropping_the_guard_stops_watching_without_cancelling() {
        let token = CancellationToken::new();
        let guard = CtrlCWatcher.watch(token.clone()).expect("watch");
        drop(guard);
        assert!(!token.is_cancelled());
    }
}
