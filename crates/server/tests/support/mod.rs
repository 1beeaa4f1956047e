// Shared between the integration test binaries; not every binary uses every helper.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use authority_scout_common::{MetricValues, ProxyKey, ProxySpec, ScrapeError, ServerConfig};
use authority_scout_server::{AppState, BrowserEngine, EngineContext, EnginePage};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Scripted browser engine. Behavior is keyed off the domain in the target
/// URL: `hang.*` navigations never finish, `empty.*` extractions find nothing,
/// everything else succeeds with fixed metric values.
#[derive(Default)]
pub struct MockState {
    pub creations: Mutex<HashMap<String, usize>>,
    pub navigated: Mutex<Vec<String>>,
    pub pages_closed: AtomicUsize,
    /// When set, every navigation waits for a permit before finishing.
    pub navigate_gate: Option<Arc<Semaphore>>,
    /// Proxy keys whose context creation fails.
    pub broken_keys: Mutex<Vec<String>>,
    /// When set, the next page creation fails as an unhealthy context.
    pub fail_next_page: std::sync::atomic::AtomicBool,
}

impl MockState {
    pub fn creations_for(&self, key: &str) -> usize {
        *self.creations.lock().unwrap().get(key).unwrap_or(&0)
    }

    pub fn total_creations(&self) -> usize {
        self.creations.lock().unwrap().values().sum()
    }
}

pub struct MockEngine {
    pub state: Arc<MockState>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            state: Arc::new(MockState::default()),
        }
    }

    pub fn with_state(state: Arc<MockState>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl BrowserEngine for MockEngine {
    async fn create_context(
        &self,
        proxy: Option<&ProxySpec>,
    ) -> Result<Arc<dyn EngineContext>, ScrapeError> {
        let key = ProxyKey::from_optional(proxy).as_str().to_string();
        if self.state.broken_keys.lock().unwrap().contains(&key) {
            return Err(ScrapeError::ContextCreation(format!(
                "scripted creation failure for {key}"
            )));
        }
        *self.state.creations.lock().unwrap().entry(key).or_insert(0) += 1;
        Ok(Arc::new(MockContext {
            state: self.state.clone(),
        }))
    }
}

struct MockContext {
    state: Arc<MockState>,
}

#[async_trait]
impl EngineContext for MockContext {
    async fn create_page(&self) -> Result<Box<dyn EnginePage>, ScrapeError> {
        if self.state.fail_next_page.swap(false, Ordering::SeqCst) {
            return Err(ScrapeError::ContextUnhealthy(
                "scripted page creation failure".into(),
            ));
        }
        Ok(Box::new(MockPage {
            state: self.state.clone(),
            domain: Mutex::new(String::new()),
        }))
    }

    async fn close(&self) {}
}

struct MockPage {
    state: Arc<MockState>,
    domain: Mutex<String>,
}

#[async_trait]
impl EnginePage for MockPage {
    async fn navigate(&self, url: &str, _timeout: Duration) -> Result<(), ScrapeError> {
        let domain = url.rsplit("input=").next().unwrap_or("").to_string();
        *self.domain.lock().unwrap() = domain.clone();
        self.state.navigated.lock().unwrap().push(domain.clone());

        if domain.starts_with("hang.") {
            std::future::pending::<()>().await;
        }
        if let Some(gate) = &self.state.navigate_gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|e| ScrapeError::Engine(e.to_string()))?;
            permit.forget();
        }
        Ok(())
    }

    async fn extract_metrics(&self) -> Result<MetricValues, ScrapeError> {
        let domain = self.domain.lock().unwrap().clone();
        if domain.starts_with("empty.") {
            return Ok(MetricValues::default());
        }
        Ok(MetricValues {
            dr: Some(71),
            backlinks: Some(1200),
            linking_websites: Some(340),
        })
    }

    async fn close(&self) {
        self.state.pages_closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Config with delays short enough for tests. Navigation keeps a generous
/// timeout so gated navigations do not trip it; hang tests shrink it.
pub fn test_config(workers: usize) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.workers = workers;
    config.navigation_timeout = Duration::from_secs(5);
    config.extraction_timeout = Duration::from_secs(5);
    config.settle_delay = Duration::from_millis(0);
    config
}

/// Full application state plus running workers, backed by a mock engine.
pub struct TestApp {
    pub state: Arc<AppState>,
    pub mock: Arc<MockState>,
    pub shutdown: CancellationToken,
}

impl TestApp {
    pub fn start(workers: usize) -> Self {
        Self::start_with_mock(workers, Arc::new(MockState::default()))
    }

    pub fn start_with_mock(workers: usize, mock: Arc<MockState>) -> Self {
        Self::start_with_config(test_config(workers), mock)
    }

    pub fn start_with_config(config: ServerConfig, mock: Arc<MockState>) -> Self {
        let workers = config.workers;
        let engine = Arc::new(MockEngine::with_state(mock.clone()));
        let state = Arc::new(AppState::new(config, engine).expect("state construction"));
        let shutdown = CancellationToken::new();
        authority_scout_server::worker::spawn_workers(state.clone(), shutdown.clone(), workers);
        Self {
            state,
            mock,
            shutdown,
        }
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Polls `check` until it returns true or the deadline passes.
pub async fn wait_for<F>(what: &str, deadline: Duration, mut check: F)
where
    F: FnMut() -> bool,
{
    let start = tokio::time::Instant::now();
    while !check() {
        assert!(
            start.elapsed() < deadline,
            "timed out waiting for {what}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
