use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use authority_scout_common::{MetricValues, ProxySpec, ScrapeError};

/// Abstraction over the browser automation backend.
///
/// The pool and the executor only talk to these traits, so the orchestration
/// logic can be exercised in tests without launching a real browser.
#[async_trait]
pub trait BrowserEngine: Send + Sync {
    /// Creates a fresh isolated browsing context.
    ///
    /// Callers are expected to serialize invocations through the
    /// [`SerializationGate`](crate::gate::SerializationGate); the engine itself
    /// does not guard against concurrent creation.
    async fn create_context(
        &self,
        proxy: Option<&ProxySpec>,
    ) -> Result<Arc<dyn EngineContext>, ScrapeError>;
}

/// A live browsing context. Contexts are long lived and shared between jobs.
#[async_trait]
pub trait EngineContext: Send + Sync {
    /// Opens a new page inside this context.
    async fn create_page(&self) -> Result<Box<dyn EnginePage>, ScrapeError>;

    /// Tears the context down. Called when the pool recycles an entry.
    async fn close(&self);
}

/// A single page. Pages are short lived: one per job, closed when the job ends.
#[async_trait]
pub trait EnginePage: Send + Sync {
    /// Navigates to `url` and waits for the document to finish loading.
    ///
    /// Must not enforce its own deadline beyond `timeout`; the executor wraps
    /// the call in [`tokio::time::timeout`] as well and treats the earliest
    /// expiry as a navigation timeout.
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), ScrapeError>;

    /// Runs the in-page extraction script and returns whatever metric values
    /// could be located. Missing values come back as `None` rather than an error.
    async fn extract_metrics(&self) -> Result<MetricValues, ScrapeError>;

    /// Closes the page. Best effort; failures are logged by implementations.
    async fn close(&self);
}
