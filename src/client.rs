//! Gmail label API client with timeouts, concurrency limiting and retry logic

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::auth::{GmailHub, METADATA_SCOPE};
use crate::config::GmailConfig;
use crate::error::{ExporterError, Result};
use crate::models::{labels_from_response, LabelDetail, LabelSummary};

/// The two remote calls the exporter needs from the mail service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LabelSource: Send + Sync {
    /// List every label in the account, in the order the service returns them
    async fn list_labels(&self) -> Result<Vec<LabelSummary>>;

    /// Fetch current message counts for one label
    async fn get_label_detail(&self, id: &str) -> Result<LabelDetail>;
}

/// Production label source backed by the Gmail API hub
///
/// - Every call is bounded by `request_timeout`
/// - A semaphore caps in-flight requests across overlapping scrapes
/// - `list_labels` retries transient failures; `get_label_detail` fails fast
pub struct GmailLabelSource {
    hub: GmailHub,
    user_id: String,
    request_timeout: Duration,
    list_retries: u32,
    rate_limiter: Arc<Semaphore>,
}

impl GmailLabelSource {
    pub fn new(hub: GmailHub, config: &GmailConfig) -> Self {
        Self {
            hub,
            user_id: config.user_id.clone(),
            request_timeout: config.request_timeout(),
            list_retries: config.list_retries,
            rate_limiter: Arc::new(Semaphore::new(config.max_concurrent_requests)),
        }
    }
}

/// Run `call` while holding a permit from `limiter`
///
/// The permit is taken before `call` is first polled, so time spent queueing
/// does not count against the call's timeout.
pub(crate) async fn with_permit<T, F>(limiter: &Semaphore, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let _permit = limiter.acquire().await.map_err(|e| {
        ExporterError::Internal(format!("Failed to acquire rate limit permit: {}", e))
    })?;
    call.await
}

/// Bound `call` by `timeout`; expiry is a transient `NetworkError`
pub(crate) async fn with_timeout<T, E, F>(
    operation_name: &str,
    timeout: Duration,
    call: F,
) -> Result<T>
where
    E: Into<ExporterError>,
    F: Future<Output = std::result::Result<T, E>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => {
            warn!(
                "Gmail API {} call timed out after {:?}",
                operation_name, timeout
            );
            Err(ExporterError::NetworkError(format!(
                "API call timed out after {:?}",
                timeout
            )))
        }
    }
}

/// Execute an async operation with exponential backoff retry
///
/// Only transient errors are retried. The delay doubles after each attempt
/// and is capped at 30 seconds. A rate limit waits at least its Retry-After.
pub(crate) async fn with_retry<T, F, Fut>(
    operation_name: &str,
    max_retries: u32,
    base_delay: Duration,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut delay = base_delay;
    let mut attempts = 0;

    loop {
        attempts += 1;
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_transient() && attempts <= max_retries => {
                let wait = e.retry_after().map_or(delay, |after| after.max(delay));
                warn!(
                    "{} failed (attempt {}/{}): {}. Retrying in {:?}...",
                    operation_name,
                    attempts,
                    max_retries + 1,
                    e,
                    wait
                );
                tokio::time::sleep(wait).await;
                delay = std::cmp::min(delay * 2, Duration::from_secs(30));
            }
            Err(e) => return Err(e),
        }
    }
}

#[async_trait]
impl LabelSource for GmailLabelSource {
    async fn list_labels(&self) -> Result<Vec<LabelSummary>> {
        with_retry(
            "list_labels",
            self.list_retries,
            Duration::from_secs(1),
            || async {
                debug!("Calling Gmail API to list labels...");
                let call = self
                    .hub
                    .users()
                    .labels_list(&self.user_id)
                    .add_scope(METADATA_SCOPE)
                    .doit();
                let (_, response) = with_permit(
                    &self.rate_limiter,
                    with_timeout("list_labels", self.request_timeout, call),
                )
                .await?;

                let labels = labels_from_response(response);
                debug!("Successfully parsed {} labels", labels.len());
                Ok(labels)
            },
        )
        .await
    }

    async fn get_label_detail(&self, id: &str) -> Result<LabelDetail> {
        let call = self
            .hub
            .users()
            .labels_get(&self.user_id, id)
            .add_scope(METADATA_SCOPE)
            .doit();
        let (_, label) = with_permit(
            &self.rate_limiter,
            with_timeout("labels_get", self.request_timeout, call),
        )
        .await?;

        Ok(LabelDetail::from(label))
    }
}

// Implement LabelSource for Arc<T> to allow shared ownership
#[async_trait]
impl<T> LabelSource for Arc<T>
where
    T: LabelSource + ?Sized,
{
    async fn list_labels(&self) -> Result<Vec<LabelSummary>> {
        self.as_ref().list_labels().await
    }

    async fn get_label_detail(&self, id: &str) -> Result<LabelDetail> {
        self.as_ref().get_label_detail(id).await
    }
}
