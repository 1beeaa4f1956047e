use tokio::sync::{Mutex, MutexGuard};

/// Process-wide serialization points for browser operations that misbehave
/// when run concurrently.
///
/// Context creation, page creation and navigation each get their own lock so
/// that independent phases of different jobs can still overlap. The locks are
/// held only for the duration of the guarded engine call, never across a
/// whole job.
#[derive(Default)]
pub struct SerializationGate {
    creation: Mutex<()>,
    page: Mutex<()>,
    navigation: Mutex<()>,
}

impl SerializationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes browser context creation.
    pub async fn lock_creation(&self) -> MutexGuard<'_, ()> {
        self.creation.lock().await
    }

    /// Serializes page creation across all contexts.
    pub async fn lock_page(&self) -> MutexGuard<'_, ()> {
        self.page.lock().await
    }

    /// Serializes navigation. Held for the full navigate-and-wait, so only
    /// one page loads at a time; extraction runs unlocked.
    pub async fn lock_navigation(&self) -> MutexGuard<'_, ()> {
        self.navigation.lock().await
    }
}
