use crate::errors::JanitorError;
use crate::runtime::QueueService;
use crate::types::{QueueDetails, APPROXIMATE_NUMBER_OF_MESSAGES};

/// One remote call for the approximate backlog of `queue_url`. No retries.
pub fn fetch_message_count(
    service: &dyn QueueService,
    queue_url: &str,
) -> Result<u64, JanitorError> {
    let attributes =
        service.get_queue_attributes(queue_url, &[APPROXIMATE_NUMBER_OF_MESSAGES])?;
    let raw = attributes
        .get(APPROXIMATE_NUMBER_OF_MESSAGES)
        .ok_or_else(|| JanitorError::MissingAttribute {
            queue_url: queue_url.to_string(),
            attribute: APPROXIMATE_NUMBER_OF_MESSAGES.to_string(),
        })?;
    raw.trim().parse::<u64>().map_err(|e| {
        JanitorError::Parse(format!(
            "{APPROXIMATE_NUMBER_OF_MESSAGES}={raw:?} for {queue_url}: {e}"
        ))
    })
}

pub fn fetch_queue_details(
    service: &dyn QueueService,
    queue_url: &str,
) -> Result<QueueDetails, JanitorError> {
    fetch_message_count(service, queue_url).map(|count| QueueDetails::new(queue_url, count))
}
