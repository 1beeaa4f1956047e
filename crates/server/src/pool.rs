use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use authority_scout_common::{ProxyKey, ProxySpec, ScrapeError};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::engine::{BrowserEngine, EngineContext};
use crate::gate::SerializationGate;

/// Pool of browser contexts, one per proxy identity.
///
/// Jobs with the same proxy share a context so cookies and fingerprint state
/// stay warm between visits. Jobs without a proxy share the single direct
/// context. Contexts live until recycled; a failed creation is never cached.
pub struct ContextPool {
    engine: Arc<dyn BrowserEngine>,
    gate: Arc<SerializationGate>,
    contexts: RwLock<HashMap<ProxyKey, Arc<dyn EngineContext>>>,
    created_total: AtomicU64,
}

impl ContextPool {
    pub fn new(engine: Arc<dyn BrowserEngine>, gate: Arc<SerializationGate>) -> Self {
        Self {
            engine,
            gate,
            contexts: RwLock::new(HashMap::new()),
            created_total: AtomicU64::new(0),
        }
    }

    /// Returns the context for the given proxy, creating it on first use.
    ///
    /// Creation runs under the creation lock with a re-check after acquiring
    /// it, so two jobs racing on the same key still end up with one context.
    pub async fn acquire(
        &self,
        proxy: Option<&ProxySpec>,
    ) -> Result<Arc<dyn EngineContext>, ScrapeError> {
        let key = ProxyKey::from_optional(proxy);

        {
            let contexts = self.contexts.read().await;
            if let Some(context) = contexts.get(&key) {
                debug!(proxy_key = key.as_str(), "reusing pooled context");
                return Ok(context.clone());
            }
        }

        let _creating = self.gate.lock_creation().await;

        // Another job may have created the context while we waited.
        {
            let contexts = self.contexts.read().await;
            if let Some(context) = contexts.get(&key) {
                debug!(proxy_key = key.as_str(), "context created while waiting for lock");
                return Ok(context.clone());
            }
        }

        info!(proxy_key = key.as_str(), "creating browser context");
        let context = self.engine.create_context(proxy).await?;
        self.created_total.fetch_add(1, Ordering::Relaxed);

        let mut contexts = self.contexts.write().await;
        contexts.insert(key, context.clone());
        Ok(context)
    }

    /// Removes and closes the context for `key`, if pooled. The next job with
    /// that proxy identity gets a fresh context.
    pub async fn recycle(&self, key: &ProxyKey) -> bool {
        let removed = {
            let mut contexts = self.contexts.write().await;
            contexts.remove(key)
        };
        match removed {
            Some(context) => {
                info!(proxy_key = key.as_str(), "recycling browser context");
                context.close().await;
                true
            }
            None => false,
        }
    }

    /// Drops every pooled context. Returns how many were closed.
    pub async fn recycle_all(&self) -> usize {
        let drained: Vec<(ProxyKey, Arc<dyn EngineContext>)> = {
            let mut contexts = self.contexts.write().await;
            contexts.drain().collect()
        };
        let count = drained.len();
        for (key, context) in drained {
            info!(proxy_key = key.as_str(), "recycling browser context");
            context.close().await;
        }
        count
    }

    pub async fn pooled(&self) -> usize {
        self.contexts.read().await.len()
    }

    pub fn created_total(&self) -> u64 {
        self.created_total.load(Ordering::Relaxed)
    }
}
