use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use authority_scout_common::{parse_metric_count, MetricValues, ProxySpec, ScrapeError, ServerConfig};
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::Target::CreateTarget;
use headless_chrome::{Browser, LaunchOptions};
use tracing::{debug, info, warn};

use crate::engine::{BrowserEngine, EngineContext, EnginePage};

/// Hard ceiling for a single blocking CDP call that the page-level timeouts
/// in the executor cannot interrupt on their own.
const CDP_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Interval for polling `document.readyState` after the navigation call returns.
const READY_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// In-page script locating the metric widgets. Each widget is a label element
/// ("Domain Rating", "Backlinks", "Linking websites") with the value rendered
/// nearby in a large-font span. The script walks up from the label and takes
/// the first big numeric span it finds, returning raw display text so the
/// "1.2K"/"3.4M" formatting can be parsed on our side.
const EXTRACT_METRICS_JS: &str = r#"
(() => {
    const labels = {
        dr: 'Domain Rating',
        backlinks: 'Backlinks',
        linking_websites: 'Linking websites',
    };
    const result = { dr: null, backlinks: null, linking_websites: null };
    const elements = Array.from(document.querySelectorAll('*'));
    for (const [key, label] of Object.entries(labels)) {
        const anchor = elements.find(
            (el) => el.children.length === 0 && el.textContent.trim() === label
        );
        if (!anchor) continue;
        let node = anchor;
        for (let depth = 0; depth < 8 && node && result[key] === null; depth++) {
            for (const span of node.querySelectorAll('span')) {
                const text = span.textContent.trim();
                const size = parseFloat(window.getComputedStyle(span).fontSize);
                if (size > 25 && /^[0-9][0-9.,]*[KkMm]?$/.test(text)) {
                    result[key] = text;
                    break;
                }
            }
            node = node.parentElement;
        }
    }
    return JSON.stringify(result);
})()
"#;

/// [`BrowserEngine`] backed by one shared Chrome process.
///
/// Each pooled context is a CDP BrowserContext inside this process, so
/// cookies and storage stay isolated per proxy identity. Chrome only accepts
/// a proxy server at launch; per-job proxies therefore share the launch-time
/// `--proxy-server`, while per-proxy credentials are applied per page through
/// the Fetch domain.
pub struct ChromeEngine {
    browser: Arc<Browser>,
}

impl ChromeEngine {
    pub fn launch(config: &ServerConfig) -> anyhow::Result<Self> {
        if let Some(server) = &config.proxy_server {
            info!("Launching Chrome with proxy server {}", server);
        } else {
            info!("Launching Chrome with direct connection");
        }

        let mut launch_builder = LaunchOptions::default_builder();
        launch_builder
            .headless(config.headless)
            .proxy_server(config.proxy_server.as_deref())
            // The default 30s idle timeout closes the CDP WebSocket between
            // jobs and every later call fails with "connection is closed".
            .idle_browser_timeout(Duration::from_secs(3600));

        if let Some(path) = &config.browser_path {
            info!("Using browser binary: {}", path.display());
            launch_builder.path(Some(path.clone()));
        }

        let launch_options = launch_builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build launch options: {}", e))?;

        let browser = Browser::new(launch_options)?;
        info!("Browser process launched successfully");

        Ok(Self {
            browser: Arc::new(browser),
        })
    }
}

#[async_trait]
impl BrowserEngine for ChromeEngine {
    async fn create_context(
        &self,
        proxy: Option<&ProxySpec>,
    ) -> Result<Arc<dyn EngineContext>, ScrapeError> {
        let browser = self.browser.clone();
        let context_id = run_blocking(
            move || {
                let context = browser
                    .new_context()
                    .map_err(|e| ScrapeError::ContextCreation(e.to_string()))?;
                Ok(context.get_id().to_string())
            },
            ScrapeError::ContextCreation,
        )
        .await?;

        debug!(context_id = %context_id, "created CDP browser context");
        Ok(Arc::new(ChromeContext {
            browser: self.browser.clone(),
            context_id,
            proxy: proxy.cloned(),
        }))
    }
}

struct ChromeContext {
    browser: Arc<Browser>,
    context_id: String,
    proxy: Option<ProxySpec>,
}

#[async_trait]
impl EngineContext for ChromeContext {
    async fn create_page(&self) -> Result<Box<dyn EnginePage>, ScrapeError> {
        let browser = self.browser.clone();
        let context_id = self.context_id.clone();
        let credentials = self
            .proxy
            .as_ref()
            .and_then(|spec| spec.credentials())
            .map(|(user, pass)| (user.to_string(), pass.to_string()));

        let tab = run_blocking(
            move || {
                let create_target = CreateTarget {
                    url: "about:blank".to_string(),
                    left: None,
                    top: None,
                    width: None,
                    height: None,
                    window_state: None,
                    browser_context_id: Some(context_id),
                    enable_begin_frame_control: None,
                    new_window: None,
                    background: None,
                    for_tab: None,
                    hidden: None,
                };
                let tab = browser
                    .new_tab_with_options(create_target)
                    .map_err(|e| ScrapeError::ContextUnhealthy(e.to_string()))?;

                // Proxy auth goes through the Fetch domain since Chrome has no
                // CLI flag for credentials.
                if let Some((username, password)) = credentials {
                    tab.enable_fetch(None, Some(true))
                        .map_err(|e| ScrapeError::ContextUnhealthy(e.to_string()))?;
                    tab.authenticate(Some(username), Some(password))
                        .map_err(|e| ScrapeError::ContextUnhealthy(e.to_string()))?;
                }
                Ok(tab)
            },
            ScrapeError::ContextUnhealthy,
        )
        .await?;

        Ok(Box::new(ChromePage { tab }))
    }

    /// Releases the pool's handle on this context.
    ///
    /// Note: the CDP BrowserContext itself is not disposed here since the
    /// browser API exposes no call for it. Chrome cleans the context up once
    /// all of its tabs are closed; until then a recycled context lingers
    /// inside the browser process.
    async fn close(&self) {
        debug!(context_id = %self.context_id, "dropping CDP browser context");
    }
}

struct ChromePage {
    tab: Arc<Tab>,
}

#[async_trait]
impl EnginePage for ChromePage {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), ScrapeError> {
        let tab = self.tab.clone();
        let url_owned = url.to_string();
        run_blocking(
            move || {
                tab.navigate_to(&url_owned)
                    .map_err(|e| ScrapeError::Engine(e.to_string()))?;
                tab.wait_until_navigated()
                    .map_err(|e| ScrapeError::Engine(e.to_string()))?;
                Ok(())
            },
            ScrapeError::Engine,
        )
        .await?;

        // wait_until_navigated fires on the load event race; poll readyState
        // until the document is fully loaded or the deadline passes.
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let tab = self.tab.clone();
            let ready = run_blocking(
                move || {
                    let result = tab
                        .evaluate("document.readyState", false)
                        .map_err(|e| ScrapeError::Engine(e.to_string()))?;
                    Ok(result
                        .value
                        .and_then(|v| v.as_str().map(str::to_string))
                        .map_or(false, |state| state == "complete"))
                },
                ScrapeError::Engine,
            )
            .await?;
            if ready {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(ScrapeError::NavigationTimeout(timeout));
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }

    async fn extract_metrics(&self) -> Result<MetricValues, ScrapeError> {
        let tab = self.tab.clone();
        let raw = run_blocking(
            move || {
                let result = tab
                    .evaluate(EXTRACT_METRICS_JS, false)
                    .map_err(|e| ScrapeError::ExtractionFailed(e.to_string()))?;
                result
                    .value
                    .and_then(|v| v.as_str().map(str::to_string))
                    .ok_or_else(|| {
                        ScrapeError::ExtractionFailed("extraction script returned no value".into())
                    })
            },
            ScrapeError::ExtractionFailed,
        )
        .await?;

        let parsed: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|e| ScrapeError::ExtractionFailed(format!("malformed script output: {e}")))?;

        let field = |name: &str| {
            parsed
                .get(name)
                .and_then(|v| v.as_str())
                .and_then(parse_metric_count)
        };
        Ok(MetricValues {
            dr: field("dr"),
            backlinks: field("backlinks"),
            linking_websites: field("linking_websites"),
        })
    }

    async fn close(&self) {
        let tab = self.tab.clone();
        let closed = tokio::task::spawn_blocking(move || tab.close(false)).await;
        match closed {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!("Failed to close tab: {}", e),
            Err(e) => warn!("Tab close task aborted: {}", e),
        }
    }
}

/// Runs a blocking CDP call off the async runtime with a hard deadline.
///
/// Chrome occasionally stops answering on the WebSocket; without the outer
/// timeout a stuck call would pin a blocking thread forever.
async fn run_blocking<T, F, E>(call: F, to_error: E) -> Result<T, ScrapeError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ScrapeError> + Send + 'static,
    E: FnOnce(String) -> ScrapeError,
{
    let handle = tokio::task::spawn_blocking(call);
    match tokio::time::timeout(CDP_CALL_TIMEOUT, handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(to_error(format!("browser call panicked: {join_err}"))),
        Err(_) => Err(to_error(format!(
            "browser call stuck for {}s",
            CDP_CALL_TIMEOUT.as_secs()
        ))),
    }
}
