use std::sync::Arc;
use std::time::{Duration, Instant};

use authority_scout_common::{authority_check_url, DomainMetrics, ScrapeError, ServerConfig};
use tracing::{debug, warn};

use crate::engine::EngineContext;
use crate::gate::SerializationGate;

/// Runs a single scrape inside an already-acquired context.
///
/// Page creation and the full navigate-and-wait each take their
/// serialization lock; the settle delay and extraction run unlocked so jobs
/// overlap where it is safe to. The page is closed on every exit path, the
/// context never is.
pub struct ScrapeExecutor {
    gate: Arc<SerializationGate>,
    navigation_timeout: Duration,
    extraction_timeout: Duration,
    settle_delay: Duration,
}

impl ScrapeExecutor {
    pub fn new(gate: Arc<SerializationGate>, config: &ServerConfig) -> Self {
        Self {
            gate,
            navigation_timeout: config.navigation_timeout,
            extraction_timeout: config.extraction_timeout,
            settle_delay: config.settle_delay,
        }
    }

    pub async fn execute(
        &self,
        context: &Arc<dyn EngineContext>,
        domain: &str,
    ) -> Result<DomainMetrics, ScrapeError> {
        let started = Instant::now();
        let url = authority_check_url(domain);

        let page = {
            let _page_lock = self.gate.lock_page().await;
            context.create_page().await?
        };

        let outcome = self.run_on_page(page.as_ref(), domain, &url).await;

        page.close().await;

        let metrics = outcome?;
        let elapsed = started.elapsed().as_secs_f64();
        debug!(domain, elapsed, "scrape finished");
        Ok(DomainMetrics::new(domain.to_string(), metrics, elapsed))
    }

    async fn run_on_page(
        &self,
        page: &dyn crate::engine::EnginePage,
        domain: &str,
        url: &str,
    ) -> Result<authority_scout_common::MetricValues, ScrapeError> {
        {
            let _nav_lock = self.gate.lock_navigation().await;
            match tokio::time::timeout(self.navigation_timeout, page.navigate(url, self.navigation_timeout))
                .await
            {
                Ok(result) => result?,
                Err(_) => {
                    warn!(domain, timeout = ?self.navigation_timeout, "navigation timed out");
                    return Err(ScrapeError::NavigationTimeout(self.navigation_timeout));
                }
            }
        }

        // Metric widgets render asynchronously after the document load event.
        tokio::time::sleep(self.settle_delay).await;

        let values = match tokio::time::timeout(self.extraction_timeout, page.extract_metrics()).await
        {
            Ok(result) => result?,
            Err(_) => {
                warn!(domain, timeout = ?self.extraction_timeout, "extraction timed out");
                return Err(ScrapeError::ExtractionFailed("extraction timed out".into()));
            }
        };

        if values.is_empty() {
            return Err(ScrapeError::ExtractionFailed(
                "no metrics found on page".into(),
            ));
        }
        Ok(values)
    }
}
