use crate::errors::JanitorError;
use serde::Serialize;
use std::ops::Deref;
use std::sync::Arc;

pub const APPROXIMATE_NUMBER_OF_MESSAGES: &str = "ApproximateNumberOfMessages";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueDetails {
    pub queue_url: String,
    pub message_count: u64,
}

impl QueueDetails {
    pub fn new(queue_url: impl Into<String>, message_count: u64) -> Self {
        Self {
            queue_url: queue_url.into(),
            message_count,
        }
    }
}

/// Queues in the order their fetches completed. Cheap to clone; never mutated
/// once built, so the renderer and the controller share one allocation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueueListModel {
    queues: Arc<[QueueDetails]>,
}

impl QueueListModel {
    pub fn new(queues: Vec<QueueDetails>) -> Self {
        Self {
            queues: queues.into(),
        }
    }

    pub fn as_slice(&self) -> &[QueueDetails] {
        &self.queues
    }
}

impl Deref for QueueListModel {
    type Target = [QueueDetails];

    fn deref(&self) -> &Self::Target {
        &self.queues
    }
}

impl From<Vec<QueueDetails>> for QueueListModel {
    fn from(value: Vec<QueueDetails>) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueFetchFailure {
    pub queue_url: String,
    pub error: JanitorError,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchReport {
    pub model: QueueListModel,
    pub failures: Vec<QueueFetchFailure>,
}

impl FetchReport {
    pub fn outcome_count(&self) -> usize {
        self.model.len() + self.failures.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Interactive,
    List,
    Purge,
}

impl CommandKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Interactive => "interactive",
            Self::List => "list",
            Self::Purge => "purge",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurgeNotice {
    pub queue_url: String,
    pub outcome: Result<(), JanitorError>,
}

impl PurgeNotice {
    pub fn status_line(&self) -> String {
        match &self.outcome {
            Ok(()) => format!("purged {} (counts refresh on next run)", self.queue_url),
            Err(error) => format!("purge failed for {}: {error}", self.queue_url),
        }
    }
}
