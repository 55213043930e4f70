//! Filesystem watcher feeding the incremental cache.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use tracing::{error, info};

const DEBOUNCE: Duration = Duration::from_millis(80);

/// Watches the storage tree and batches changed JSON files behind a short
/// debounce so a burst of writes becomes one update.
pub struct LiveWatcher {
    watcher: RecommendedWatcher,
    storage_path: PathBuf,
    last_event: Arc<Mutex<Option<Instant>>>,
    changed_files: Arc<Mutex<Vec<PathBuf>>>,
    on_change: Arc<dyn Fn(Vec<PathBuf>) + Send + Sync>,
}

impl LiveWatcher {
    pub fn new(
        storage_path: PathBuf,
        on_change: Arc<dyn Fn(Vec<PathBuf>) + Send + Sync>,
    ) -> Result<Self, notify::Error> {
        let changed_files = Arc::new(Mutex::new(Vec::new()));
        let changed_files_clone = changed_files.clone();
        let last_event = Arc::new(Mutex::new(None));
        let last_event_clone = last_event.clone();

        let config = Config::default().with_poll_interval(Duration::from_millis(100));

        let watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| match res {
                Ok(event) => {
                    *last_event_clone.lock() = Some(Instant::now());
                    if event.kind.is_modify() || event.kind.is_create() {
                        for path in event.paths {
                            if !is_relevant(&path) {
                                continue;
                            }
                            let mut files = changed_files_clone.lock();
                            if !files.contains(&path) {
                                files.push(path);
                            }
                        }
                    }
                }
                Err(err) => error!("file watcher error: {err}"),
            },
            config,
        )?;

        Ok(Self {
            watcher,
            storage_path,
            last_event,
            changed_files,
            on_change,
        })
    }

    pub fn start(&mut self) -> Result<(), notify::Error> {
        self.watcher
            .watch(&self.storage_path, RecursiveMode::Recursive)?;
        info!(path = %self.storage_path.display(), "watching storage for live updates");
        Ok(())
    }

    /// Drain the pending batch once the tree has been quiet for the debounce
    /// window. Called from the poll loop.
    pub fn process_changes(&self) {
        let mut files = self.changed_files.lock();
        if files.is_empty() {
            return;
        }

        if let Some(last) = *self.last_event.lock() {
            if last.elapsed() < DEBOUNCE {
                return;
            }
        }

        let changed = std::mem::take(&mut *files);
        drop(files);
        (self.on_change)(changed);
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.changed_files.lock().is_empty()
    }
}

/// JSON files only, skipping editor temp files.
fn is_relevant(path: &Path) -> bool {
    let Some(s) = path.to_str() else {
        return false;
    };
    if s.contains(".swp") || s.contains(".tmp") || s.contains('~') || s.contains("4913") {
        return false;
    }
    path.extension().is_some_and(|e| e == "json")
}
