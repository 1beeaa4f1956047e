use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::Notify;
use uuid::Uuid;

/// FIFO queue of task ids awaiting a worker.
///
/// Push never blocks and never drops; pop parks the caller on a [`Notify`]
/// until an id arrives. Ordering is strict submission order.
#[derive(Default)]
pub struct JobQueue {
    items: Mutex<VecDeque<Uuid>>,
    notify: Notify,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, task_id: Uuid) {
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        items.push_back(task_id);
        drop(items);
        self.notify.notify_one();
    }

    pub fn push_all(&self, task_ids: impl IntoIterator<Item = Uuid>) {
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        let mut pushed = 0usize;
        for id in task_ids {
            items.push_back(id);
            pushed += 1;
        }
        drop(items);
        for _ in 0..pushed {
            self.notify.notify_one();
        }
    }

    /// Waits until a task id is available and removes it from the queue.
    pub async fn pop(&self) -> Uuid {
        loop {
            // Register interest before checking, otherwise a push that lands
            // between the check and the await would be missed.
            let notified = self.notify.notified();
            if let Some(id) = self.try_pop() {
                return id;
            }
            notified.await;
        }
    }

    pub fn try_pop(&self) -> Option<Uuid> {
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        items.pop_front()
    }

    pub fn depth(&self) -> usize {
        let items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        items.len()
    }

    /// Snapshot of the waiting task ids in queue order.
    pub fn snapshot(&self) -> Vec<Uuid> {
        let items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        items.iter().copied().collect()
    }

    /// Drops every waiting task id. Jobs already claimed by a worker are
    /// unaffected.
    pub fn clear(&self) -> usize {
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        let removed = items.len();
        items.clear();
        removed
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn pop_returns_in_submission_order() {
        let queue = JobQueue::new();
        let ids: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
        queue.push_all(ids.clone());

        for expected in &ids {
            assert_eq!(queue.pop().await, *expected);
        }
        assert_eq!(queue.depth(), 0);
    }

    #[tokio::test]
    async fn pop_wakes_on_later_push() {
        let queue = Arc::new(JobQueue::new());
        let id = Uuid::new_v4();

        let waiter = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.pop().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.push(id);

        let popped = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(popped, id);
    }

    #[tokio::test]
    async fn push_all_wakes_multiple_waiters() {
        let queue = Arc::new(JobQueue::new());
        let mut waiters = Vec::new();
        for _ in 0..3 {
            let queue = queue.clone();
            waiters.push(tokio::spawn(async move { queue.pop().await }));
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.push_all((0..3).map(|_| Uuid::new_v4()));

        for waiter in waiters {
            tokio::time::timeout(Duration::from_secs(1), waiter)
                .await
                .unwrap()
                .unwrap();
        }
    }
}
