use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Prometheus registry plus the instruments the server updates.
///
/// Counters move with job lifecycle events; gauges are refreshed from live
/// state right before every scrape of the metrics endpoint.
pub struct Metrics {
    registry: Registry,
    jobs_started: IntCounter,
    jobs_completed: IntCounter,
    jobs_failed: IntCounterVec,
    queue_depth: IntGauge,
    jobs_processing: IntGauge,
    contexts_pooled: IntGauge,
    contexts_created: IntGauge,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let jobs_started = IntCounter::with_opts(Opts::new(
            "scout_jobs_started_total",
            "Jobs moved into processing",
        ))?;
        registry.register(Box::new(jobs_started.clone()))?;

        let jobs_completed = IntCounter::with_opts(Opts::new(
            "scout_jobs_completed_total",
            "Jobs finished successfully",
        ))?;
        registry.register(Box::new(jobs_completed.clone()))?;

        let jobs_failed = IntCounterVec::new(
            Opts::new("scout_jobs_failed_total", "Jobs finished with an error"),
            &["kind"],
        )?;
        registry.register(Box::new(jobs_failed.clone()))?;

        let queue_depth = IntGauge::with_opts(Opts::new(
            "scout_queue_depth",
            "Jobs waiting for a worker",
        ))?;
        registry.register(Box::new(queue_depth.clone()))?;

        let jobs_processing = IntGauge::with_opts(Opts::new(
            "scout_jobs_processing",
            "Jobs currently being scraped",
        ))?;
        registry.register(Box::new(jobs_processing.clone()))?;

        let contexts_pooled = IntGauge::with_opts(Opts::new(
            "scout_contexts_pooled",
            "Browser contexts currently pooled",
        ))?;
        registry.register(Box::new(contexts_pooled.clone()))?;

        let contexts_created = IntGauge::with_opts(Opts::new(
            "scout_contexts_created_total",
            "Browser contexts created since start",
        ))?;
        registry.register(Box::new(contexts_created.clone()))?;

        Ok(Self {
            registry,
            jobs_started,
            jobs_completed,
            jobs_failed,
            queue_depth,
            jobs_processing,
            contexts_pooled,
            contexts_created,
        })
    }

    pub fn job_started(&self) {
        self.jobs_started.inc();
    }

    pub fn job_completed(&self) {
        self.jobs_completed.inc();
    }

    pub fn job_failed(&self, kind: &str) {
        self.jobs_failed.with_label_values(&[kind]).inc();
    }

    pub fn set_queue_depth(&self, depth: usize) {
        self.queue_depth.set(depth as i64);
    }

    pub fn set_jobs_processing(&self, processing: usize) {
        self.jobs_processing.set(processing as i64);
    }

    pub fn set_contexts(&self, pooled: usize, created_total: u64) {
        self.contexts_pooled.set(pooled as i64);
        self.contexts_created.set(created_total as i64);
    }

    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        if let Err(err) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::error!("Failed to encode metrics: {}", err);
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
