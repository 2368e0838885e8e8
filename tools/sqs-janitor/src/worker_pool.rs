use crate::errors::JanitorError;
use crate::fetcher::fetch_queue_details;
use crate::logging::append_run_log;
use crate::runtime::QueueService;
use crate::types::{FetchReport, QueueDetails, QueueFetchFailure, QueueListModel};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

type FetchOutcome = Result<QueueDetails, QueueFetchFailure>;

/// Shared flag checked by fetch workers before each remote call.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

pub fn fetch_all_queue_details(
    service: &dyn QueueService,
    queue_urls: &[String],
    max_workers: usize,
) -> Result<FetchReport, JanitorError> {
    fetch_all_queue_details_with_cancel(service, queue_urls, max_workers, &CancellationToken::new())
}

/// Fans `queue_urls` out to exactly `max_workers` threads and fans the
/// outcomes back in. Every URL yields exactly one outcome, success or failure;
/// the model keeps the order in which successes arrived.
pub fn fetch_all_queue_details_with_cancel(
    service: &dyn QueueService,
    queue_urls: &[String],
    max_workers: usize,
    cancel: &CancellationToken,
) -> Result<FetchReport, JanitorError> {
    let total = queue_urls.len();
    if total == 0 {
        return Ok(FetchReport::default());
    }
    if max_workers == 0 {
        return Err(JanitorError::InvalidConfig(format!(
            "max_workers must be greater than zero to fetch {total} queues"
        )));
    }

    append_run_log(
        "info",
        "fetch.started",
        json!({ "queues": total, "max_workers": max_workers }),
    );

    let (work_tx, work_rx) = mpsc::sync_channel::<String>(total);
    for queue_url in queue_urls {
        work_tx
            .send(queue_url.clone())
            .map_err(|e| JanitorError::Io(format!("work queue rejected {}", e.0)))?;
    }
    // Closing the work queue is what lets idle workers exit.
    drop(work_tx);
    let work_rx = Mutex::new(work_rx);

    let (result_tx, result_rx) = mpsc::channel::<FetchOutcome>();
    let (done_tx, done_rx) = mpsc::channel::<usize>();

    let report = thread::scope(|scope| {
        for worker_id in 0..max_workers {
            let work_rx = &work_rx;
            let result_tx = result_tx.clone();
            let done_tx = done_tx.clone();
            scope.spawn(move || {
                run_fetch_worker(worker_id, service, work_rx, &result_tx, cancel);
                let _ = done_tx.send(worker_id);
            });
        }
        drop(result_tx);
        drop(done_tx);

        for _ in 0..max_workers {
            done_rx.recv().map_err(|_| {
                JanitorError::Io("fetch worker exited without signalling completion".to_string())
            })?;
        }

        drain_outcomes(&result_rx, total)
    })?;

    append_run_log(
        "info",
        "fetch.completed",
        json!({
            "queues": total,
            "succeeded": report.model.len(),
            "failed": report.failures.len(),
        }),
    );
    Ok(report)
}

fn run_fetch_worker(
    worker_id: usize,
    service: &dyn QueueService,
    work_rx: &Mutex<Receiver<String>>,
    result_tx: &Sender<FetchOutcome>,
    cancel: &CancellationToken,
) {
    loop {
        let next = match work_rx.lock() {
            Ok(rx) => rx.recv(),
            Err(_) => break,
        };
        let Ok(queue_url) = next else {
            break;
        };

        let outcome = if cancel.is_cancelled() {
            Err(JanitorError::Cancelled(queue_url.clone()))
        } else {
            fetch_queue_details(service, &queue_url)
        };
        let outcome = outcome.map_err(|error| {
            append_run_log(
                "warn",
                "fetch.worker.failed",
                json!({
                    "worker_id": worker_id,
                    "queue_url": queue_url,
                    "error": error.to_string(),
                }),
            );
            QueueFetchFailure {
                queue_url: queue_url.clone(),
                error,
            }
        });

        if result_tx.send(outcome).is_err() {
            break;
        }
    }
}

fn drain_outcomes(
    result_rx: &Receiver<FetchOutcome>,
    total: usize,
) -> Result<FetchReport, JanitorError> {
    let mut queues = Vec::with_capacity(total);
    let mut failures = Vec::new();
    for _ in 0..total {
        match result_rx.recv() {
            Ok(Ok(details)) => queues.push(details),
            Ok(Err(failure)) => failures.push(failure),
            Err(_) => {
                return Err(JanitorError::Io(format!(
                    "fetch results closed after {} of {total} queues",
                    queues.len() + failures.len()
                )))
            }
        }
    }
    Ok(FetchReport {
        model: QueueListModel::new(queues),
        failures,
    })
}
