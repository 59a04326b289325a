use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Debounced scheduler for node-file reloads.
///
/// Each `notify` bumps a per-path generation and schedules a task; when the
/// delay elapses the task runs the reload closure only if no newer
/// notification superseded it, so rapid successive change notifications for
/// one file coalesce into a single reload against the latest on-disk
/// content. `stop` cancels whatever is pending for a path.
#[derive(Debug, Clone)]
pub struct ReloadDebouncer {
    delay: Duration,
    generations: Arc<Mutex<HashMap<PathBuf, u64>>>,
}

pub const DEFAULT_RELOAD_DELAY: Duration = Duration::from_millis(150);

impl Default for ReloadDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_RELOAD_DELAY)
    }
}

impl ReloadDebouncer {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generations: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Schedules `reload` for `path` after the debounce delay, superseding
    /// any earlier pending notification for the same path.
    ///
    /// Must be called from within a tokio runtime; the reload closure runs
    /// on a spawned task.
    pub fn notify<F>(&self, path: PathBuf, reload: F)
    where
        F: FnOnce(&Path) + Send + 'static,
    {
        let generation = {
            let mut generations = lock_unpoisoned(&self.generations);
            let entry = generations.entry(path.clone()).or_insert(0);
            *entry += 1;
            *entry
        };

        let generations = self.generations.clone();
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let current = lock_unpoisoned(&generations).get(&path).copied();
            if current == Some(generation) {
                reload(&path);
            }
        });
    }

    /// Cancels any pending reload for `path`.
    pub fn stop(&self, path: &Path) {
        let mut generations = lock_unpoisoned(&self.generations);
        if let Some(entry) = generations.get_mut(path) {
            *entry += 1;
        }
    }

    /// Cancels all pending reloads.
    pub fn stop_all(&self) {
        let mut generations = lock_unpoisoned(&self.generations);
        for entry in generations.values_mut() {
            *entry += 1;
        }
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
