use crate::config::AwsConfig;
use crate::errors::JanitorError;
use crate::runtime::{AttributeMap, QueueService};
use aws_config::BehaviorVersion;
use aws_credential_types::{provider::SharedCredentialsProvider, Credentials};
use aws_sdk_sqs as sqs;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::types::QueueAttributeName;
use std::future::Future;
use std::time::Duration;

/// SQS adapter. The SDK is async; each call is driven to completion on an
/// owned runtime so fetch workers can stay plain threads.
pub struct SqsQueueService {
    client: sqs::Client,
    runtime: tokio::runtime::Runtime,
    call_timeout: Duration,
}

impl SqsQueueService {
    pub fn connect(cfg: &AwsConfig, call_timeout: Duration) -> Result<Self, JanitorError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("sqs-janitor-io")
            .build()
            .map_err(|e| JanitorError::Io(e.to_string()))?;
        let client = runtime.block_on(build_sqs_client(cfg));
        Ok(Self {
            client,
            runtime,
            call_timeout,
        })
    }

    fn call<T, E, F>(&self, operation: &str, request: F) -> Result<T, JanitorError>
    where
        F: Future<Output = Result<T, E>>,
        E: std::error::Error,
    {
        let timeout = self.call_timeout;
        let outcome = self
            .runtime
            .handle()
            .block_on(async move { tokio::time::timeout(timeout, request).await });
        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => Err(JanitorError::RemoteCall(format!(
                "{operation}: {}",
                DisplayErrorContext(&error)
            ))),
            Err(_) => Err(JanitorError::RemoteCall(format!(
                "{operation}: timed out after {}s",
                timeout.as_secs()
            ))),
        }
    }
}

impl QueueService for SqsQueueService {
    fn list_queue_urls(&self, prefix: Option<&str>) -> Result<Vec<String>, JanitorError> {
        let request = self
            .client
            .list_queues()
            .set_queue_name_prefix(prefix.map(str::to_string))
            .send();
        let output = self.call("list_queues", request)?;
        Ok(output.queue_urls.unwrap_or_default())
    }

    fn get_queue_attributes(
        &self,
        queue_url: &str,
        attribute_names: &[&str],
    ) -> Result<AttributeMap, JanitorError> {
        let names = attribute_names
            .iter()
            .map(|name| QueueAttributeName::from(*name))
            .collect::<Vec<_>>();
        let request = self
            .client
            .get_queue_attributes()
            .queue_url(queue_url)
            .set_attribute_names(Some(names))
            .send();
        let output = self.call("get_queue_attributes", request)?;
        Ok(output
            .attributes
            .unwrap_or_default()
            .into_iter()
            .map(|(name, value)| (name.as_str().to_string(), value))
            .collect())
    }

    fn purge_queue(&self, queue_url: &str) -> Result<(), JanitorError> {
        let request = self.client.purge_queue().queue_url(queue_url).send();
        self.call("purge_queue", request)?;
        Ok(())
    }
}

async fn build_sqs_client(cfg: &AwsConfig) -> sqs::Client {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());

    if let Some(region) = &cfg.region {
        loader = loader.region(aws_config::Region::new(region.clone()));
    }
    if let Some(profile) = &cfg.profile {
        loader = loader.profile_name(profile);
    }
    // Static keys from flags or config take precedence over the default chain.
    if let (Some(key), Some(secret)) = (&cfg.access_key_id, &cfg.secret_access_key) {
        let creds = Credentials::new(key.clone(), secret.clone(), None, None, "sqs-janitor");
        loader = loader.credentials_provider(SharedCredentialsProvider::new(creds));
    }

    let shared_cfg = loader.load().await;

    let mut builder = sqs::config::Builder::from(&shared_cfg);
    if let Some(endpoint) = &cfg.endpoint_url {
        builder = builder.endpoint_url(endpoint.clone());
    }
    sqs::Client::from_conf(builder.build())
}
