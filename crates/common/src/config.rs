use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration, assembled from environment variables in the binary.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP API binds to.
    pub bind_addr: String,
    pub port: u16,

    /// Number of concurrent scrape workers. Bounds how many jobs can be in
    /// `processing` at once; queue depth stays unbounded.
    pub workers: usize,

    /// true = headless (faster, detectable), false = headfull (slower, better stealth)
    pub headless: bool,

    /// Path to browser binary. If None, uses default Chrome/Chromium auto-detection.
    pub browser_path: Option<PathBuf>,

    /// Process-wide proxy server flag for the browser launch. Per-job proxy
    /// credentials are applied per page; see the engine module.
    pub proxy_server: Option<String>,

    /// Upper bound on navigate + network-idle wait for one page.
    pub navigation_timeout: Duration,

    /// Upper bound on the metrics extraction step.
    pub extraction_timeout: Duration,

    /// Settle time between network idle and extraction; the metrics widgets
    /// render asynchronously after the page itself is idle.
    pub settle_delay: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            port: 8000,
            workers: 3,
            headless: true,
            browser_path: None,
            proxy_server: None,
            navigation_timeout: Duration::from_secs(90),
            extraction_timeout: Duration::from_secs(60),
            settle_delay: Duration::from_secs(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.workers, 3);
        assert_eq!(config.port, 8000);
        assert!(config.headless);
        assert_eq!(config.navigation_timeout, Duration::from_secs(90));
    }
}
