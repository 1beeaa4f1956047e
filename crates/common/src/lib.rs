pub mod config;
pub mod error;
pub mod proxy;
pub mod types;
pub mod utils;

pub use config::ServerConfig;
pub use error::ScrapeError;
pub use proxy::{ProxyKey, ProxySpec};
pub use types::{DomainMetrics, Job, JobStatus, JobSummary, MetricValues, StatusCounts};
pub use utils::{authority_check_url, parse_metric_count, validate_domain};
