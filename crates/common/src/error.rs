use std::time::Duration;
use thiserror::Error;

/// Failure modes of a single scrape attempt.
///
/// Every variant is recorded on the owning job; none of them propagate past
/// the worker boundary. `ContextUnhealthy` additionally tells the worker to
/// recycle the browser context for that proxy key before the next job uses it.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Browser context construction failed (bad proxy, engine crash).
    /// Nothing is cached; the next job for the same proxy key retries creation.
    #[error("context creation failed: {0}")]
    ContextCreation(String),

    /// Navigation did not reach network idle within the configured timeout.
    #[error("navigation timed out after {0:?}")]
    NavigationTimeout(Duration),

    /// The metrics extraction step found no usable data (or timed out).
    #[error("metrics extraction failed: {0}")]
    ExtractionFailed(String),

    /// The context is in a state where further pages are unlikely to work.
    #[error("browser context unhealthy: {0}")]
    ContextUnhealthy(String),

    /// Any other engine-level failure (page creation, dead CDP session, ...).
    #[error("browser engine error: {0}")]
    Engine(String),
}

impl ScrapeError {
    /// Short machine-readable tag used in job records and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ContextCreation(_) => "context_creation",
            Self::NavigationTimeout(_) => "navigation_timeout",
            Self::ExtractionFailed(_) => "extraction_failed",
            Self::ContextUnhealthy(_) => "context_unhealthy",
            Self::Engine(_) => "engine",
        }
    }
}
