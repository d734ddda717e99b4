//! Per-platform ingestion adapters.
//!
//! Each adapter owns a concrete response struct and a mapper into the
//! canonical [`common_types::Post`] — no runtime attribute probing. Adapters
//! are retried internally on transient transport errors with exponential
//! backoff and give up after a small bounded number of attempts; rate-limit
//! responses from upstream surface as [`error_types::AdapterError`].

pub mod discussion_forum;
pub mod news_aggregator;
pub mod product_launch;
pub mod review_platform;

use async_trait::async_trait;
use common_types::{Capability, Post};
use error_types::AdapterError;

/// A source-specific ingestion module honoring the normalization contract.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable adapter name; every [`Post`] this adapter returns has
    /// `source == name()`.
    fn name(&self) -> &str;

    /// Human-readable platform label (for logs/diagnostics).
    fn platform(&self) -> &str;

    fn capabilities(&self) -> &[Capability];

    /// `target` is adapter-specific: a forum name, a feed tag, a search
    /// query, or a product slug. `limit` bounds the number of items
    /// returned; adapters may return fewer.
    async fn scrape(&self, target: &str, limit: usize) -> Result<Vec<Post>, AdapterError>;

    async fn health_check(&self) -> bool;
}

/// Shared client builder: every adapter gets the same default per-request
/// timeout (§5) instead of rolling its own `reqwest::Client::new()`.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .expect("reqwest client with a fixed timeout always builds")
}

/// Retry an idempotent GET a small bounded number of times with exponential
/// backoff, per the normalization contract in §4.2: network transients are
/// recoverable, upstream rate-limit failures are not retried further.
pub(crate) async fn retry_get<F, Fut>(op: F) -> Result<reqwest::Response, AdapterError>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    use backoff::future::retry;
    use backoff::ExponentialBackoffBuilder;
    use std::time::Duration;

    let backoff = ExponentialBackoffBuilder::new()
        .with_initial_interval(Duration::from_millis(500))
        .with_max_interval(Duration::from_secs(8))
        .with_max_elapsed_time(Some(Duration::from_secs(20)))
        .build();

    retry(backoff, || async {
        match op().await {
            Ok(resp) if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS => Err(
                backoff::Error::permanent(AdapterError::RateLimited(format!(
                    "{}",
                    resp.status()
                ))),
            ),
            Ok(resp) => Ok(resp),
            Err(e) => Err(backoff::Error::transient(AdapterError::RequestFailed(e))),
        }
    })
    .await
}

/// Items with a missing id, a deleted/removed body, or an empty title are
/// dropped at the adapter boundary per §4.2 rule 5. Called by each adapter's
/// mapper before a [`Post`] is added to its result vector.
pub(crate) fn is_droppable(title: &str, body: Option<&str>) -> bool {
    if title.trim().is_empty() {
        return true;
    }
    matches!(
        body.map(str::trim),
        Some("[removed]") | Some("[deleted]") | Some("")
    )
}
