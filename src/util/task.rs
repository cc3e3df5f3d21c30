use dashmap::DashMap;
use std::fmt::Display;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

pub struct AddTask<T, F, Fut>
where
    T: Eq + Clone + Display + Hash,
    F: (FnMut() -> Fut) + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    pub key: T,
    pub duration: Duration,
    pub handler: F,
}

/// Owned set of periodic tasks. The first run happens one full `duration` after the task is added.
/// Every task is aborted when the manager is dropped.
pub struct TasksManager<T: Eq + Hash> {
    runners: Arc<DashMap<T, JoinHandle<()>>>,
}

impl<T: Eq + Hash> Default for TasksManager<T> {
    fn default() -> Self {
        Self {
            runners: Arc::new(DashMap::new()),
        }
    }
}

impl<T> TasksManager<T>
where
    T: Eq + Clone + Display + Hash,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, key: &T) -> bool {
        self.runners
            .get(key)
            .is_some_and(|runner| !runner.is_finished())
    }

    pub fn len(&self) -> usize {
        self.runners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runners.is_empty()
    }

    /// Starts a periodic task, replacing (and aborting) any task already registered under the same key.
    pub fn add<F, Fut>(&self, mut options: AddTask<T, F, Fut>)
    where
        F: (FnMut() -> Fut) + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let runner = tokio::spawn(async move {
            let mut interval = time::interval(options.duration);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval.tick().await;
            loop {
                interval.tick().await;
                (options.handler)().await;
            }
        });
        if let Some(previous) = self.runners.insert(options.key.clone(), runner) {
            previous.abort();
            tracing::debug!("Replaced interval [{}]", &options.key);
        }
        tracing::debug!(
            "Started interval [{}] that will run every {}ms",
            &options.key,
            options.duration.as_millis()
        );
    }

    pub fn remove(&self, key: &T) {
        let Some((_, runner)) = self.runners.remove(key) else {
            return;
        };
        runner.abort();
        tracing::debug!("Deleted interval [{}]", key);
    }

    pub fn remove_all(&self) {
        self.runners.retain(|_, runner| {
            runner.abort();
            false
        });
    }
}

impl<T: Eq + Hash> Drop for TasksManager<T> {
    fn drop(&mut self) {
        for runner in self.runners.iter() {
            runner.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_task(
        key: &'static str,
        millis: u64,
        counter: Arc<AtomicUsize>,
    ) -> AddTask<&'static str, impl FnMut() -> std::future::Ready<()> + Send + 'static, std::future::Ready<()>>
    {
        AddTask {
            key,
            duration: Duration::from_millis(millis),
            handler: move || {
                counter.fetch_add(1, Ordering::SeqCst);
                std::future::ready(())
            },
        }
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_run_waits_one_period() {
        let tasks = TasksManager::new();
        let counter = Arc::new(AtomicUsize::new(0));
        tasks.add(counting_task("tick", 100, counter.clone()));

        settle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        time::sleep(Duration::from_millis(350)).await;
        settle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn replacing_a_key_aborts_the_old_task() {
        let tasks = TasksManager::new();
        let old = Arc::new(AtomicUsize::new(0));
        let new = Arc::new(AtomicUsize::new(0));
        tasks.add(counting_task("tick", 100, old.clone()));
        tasks.add(counting_task("tick", 100, new.clone()));

        time::sleep(Duration::from_millis(250)).await;
        settle().await;
        assert_eq!(old.load(Ordering::SeqCst), 0);
        assert_eq!(new.load(Ordering::SeqCst), 2);
        assert_eq!(tasks.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_manager_stops_everything() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let tasks = TasksManager::new();
            tasks.add(counting_task("a", 100, counter.clone()));
            tasks.add(counting_task("b", 100, counter.clone()));
            assert!(tasks.has(&"a"));
        }

        time::sleep(Duration::from_millis(500)).await;
        settle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn remove_stops_a_single_task() {
        let tasks = TasksManager::new();
        let kept = Arc::new(AtomicUsize::new(0));
        let removed = Arc::new(AtomicUsize::new(0));
        tasks.add(counting_task("kept", 100, kept.clone()));
        tasks.add(counting_task("removed", 100, removed.clone()));
        tasks.remove(&"removed");

        time::sleep(Duration::from_millis(150)).await;
        settle().await;
        assert_eq!(kept.load(Ordering::SeqCst), 1);
        assert_eq!(removed.load(Ordering::SeqCst), 0);
        assert!(!tasks.has(&"removed"));
    }
}
