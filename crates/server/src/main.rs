use anyhow::Result;
use authority_scout_common::ServerConfig;
use authority_scout_server::{run_server, ChromeEngine};
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Load configuration from environment
    let config = load_config_from_env()?;

    // Launch the shared browser process
    let engine = Arc::new(ChromeEngine::launch(&config)?);

    run_server(config, engine).await
}

fn load_config_from_env() -> Result<ServerConfig> {
    use std::env;
    use std::path::PathBuf;
    use std::time::Duration;

    let mut config = ServerConfig::default();

    if let Ok(bind_addr) = env::var("SCOUT_BIND") {
        config.bind_addr = bind_addr;
    }
    if let Ok(port) = env::var("SCOUT_PORT") {
        config.port = port.parse::<u16>()?;
    }

    // Concurrent workers bound the number of jobs in processing at once
    config.workers = env::var("SCOUT_WORKERS")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(config.workers);

    config.headless = env::var("SCOUT_HEADLESS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(true);

    // Custom browser path (e.g., /usr/bin/chromium-browser)
    // If not set, uses default Chrome/Chromium auto-detection
    config.browser_path = env::var("SCOUT_BROWSER_PATH").ok().map(PathBuf::from);

    // Launch-time proxy server for the whole browser process, e.g.
    // "http://10.0.0.1:3128". Per-job proxy credentials are applied per page.
    config.proxy_server = env::var("SCOUT_PROXY_SERVER").ok();

    if let Some(secs) = parse_secs("SCOUT_NAVIGATION_TIMEOUT_SECS") {
        config.navigation_timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = parse_secs("SCOUT_EXTRACTION_TIMEOUT_SECS") {
        config.extraction_timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = parse_secs("SCOUT_SETTLE_DELAY_SECS") {
        config.settle_delay = Duration::from_secs(secs);
    }

    Ok(config)
}

fn parse_secs(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|v| v.parse::<u64>().ok())
}
