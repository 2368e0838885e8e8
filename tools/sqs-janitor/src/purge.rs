use crate::errors::JanitorError;
use crate::logging::append_run_log;
use crate::runtime::QueueService;
use crate::types::PurgeNotice;
use serde_json::json;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::thread;

/// Discards every message in `queue_url`. One call, no confirmation, and the
/// caller's model is left as-is.
pub fn purge_queue(service: &dyn QueueService, queue_url: &str) -> Result<(), JanitorError> {
    match service.purge_queue(queue_url) {
        Ok(()) => {
            append_run_log("info", "purge.completed", json!({ "queue_url": queue_url }));
            Ok(())
        }
        Err(error) => {
            append_run_log(
                "error",
                "purge.failed",
                json!({ "queue_url": queue_url, "error": error.to_string() }),
            );
            Err(error)
        }
    }
}

/// Consumes purge requests until every sender is dropped, reporting each
/// outcome on `notices`. Returns how many requests were handled.
pub fn spawn_purge_consumer(
    service: Arc<dyn QueueService>,
    requests: Receiver<String>,
    notices: Sender<PurgeNotice>,
) -> thread::JoinHandle<usize> {
    thread::spawn(move || {
        let mut handled = 0usize;
        for queue_url in requests {
            let outcome = purge_queue(service.as_ref(), &queue_url);
            handled += 1;
            // The session may already be gone; the purge still happened.
            let _ = notices.send(PurgeNotice { queue_url, outcome });
        }
        handled
    })
}
