use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use ocstats_core::{LiveWatcher, StatsCache, StoragePaths};

use crate::config::Settings;
use crate::state::StatsSnapshot;

/// Messages from the background refresher to the UI
pub enum RefreshMessage {
    /// Initial aggregate, from the cache or a full scan
    Loaded(StatsSnapshot),
    /// Incremental update for a batch of changed files
    Updated(StatsSnapshot, HashSet<String>),
    /// Refresh failed
    Error(String),
}

/// Background task that loads the aggregate once, then keeps it current by
/// feeding watcher batches through the incremental cache.
pub struct Refresher {
    settings: Settings,
    storage: StoragePaths,
}

impl Refresher {
    pub fn new(settings: Settings, storage: StoragePaths) -> Self {
        Self { settings, storage }
    }

    /// Start the refresher, returning a receiver for updates and a sender
    /// that forces a full rescan (`r` key).
    pub fn start(self) -> (mpsc::Receiver<RefreshMessage>, mpsc::Sender<()>) {
        let (tx, rx) = mpsc::channel(32);
        let (force_tx, force_rx) = mpsc::channel(4);

        tokio::spawn(async move {
            self.run(tx, force_rx).await;
        });

        (rx, force_tx)
    }

    async fn run(self, tx: mpsc::Sender<RefreshMessage>, mut force_rx: mpsc::Receiver<()>) {
        let cache = match StatsCache::new(self.storage.clone()) {
            Ok(cache) => Arc::new(cache),
            Err(err) => {
                let _ = tx
                    .send(RefreshMessage::Error(format!("cache init failed: {err}")))
                    .await;
                return;
            }
        };

        // Initial load off the async runtime, it may scan thousands of files.
        let initial = {
            let cache = cache.clone();
            tokio::task::spawn_blocking(move || cache.load_or_compute()).await
        };
        match initial {
            Ok(stats) => {
                info!(
                    days = stats.per_day.len(),
                    sessions = stats.totals.sessions.len(),
                    "initial stats loaded"
                );
                if tx
                    .send(RefreshMessage::Loaded(StatsSnapshot::from(stats)))
                    .await
                    .is_err()
                {
                    return;
                }
            }
            Err(err) => {
                let _ = tx
                    .send(RefreshMessage::Error(format!("initial load failed: {err}")))
                    .await;
                return;
            }
        }

        if !self.settings.watch {
            debug!("live watching disabled");
            // Still serve forced rescans.
            while force_rx.recv().await.is_some() {
                if Self::force_recompute(&cache, &tx).await.is_err() {
                    return;
                }
            }
            return;
        }

        let pending: Arc<Mutex<Vec<PathBuf>>> = Arc::new(Mutex::new(Vec::new()));
        let pending_clone = pending.clone();
        let mut watcher = match LiveWatcher::new(
            self.storage.root().to_path_buf(),
            Arc::new(move |files| pending_clone.lock().extend(files)),
        ) {
            Ok(watcher) => watcher,
            Err(err) => {
                let _ = tx
                    .send(RefreshMessage::Error(format!("watcher init failed: {err}")))
                    .await;
                return;
            }
        };
        if let Err(err) = watcher.start() {
            let _ = tx
                .send(RefreshMessage::Error(format!("watcher start failed: {err}")))
                .await;
            return;
        }

        let debounce = Duration::from_millis(self.settings.refresh_debounce_ms);

        loop {
            tokio::select! {
                _ = tokio::time::sleep(debounce) => {}
                forced = force_rx.recv() => {
                    if forced.is_none() || Self::force_recompute(&cache, &tx).await.is_err() {
                        break;
                    }
                    pending.lock().clear();
                    continue;
                }
            }
            if tx.is_closed() {
                break;
            }

            watcher.process_changes();
            let batch: Vec<String> = {
                let mut pending = pending.lock();
                pending
                    .drain(..)
                    .map(|p| p.to_string_lossy().into_owned())
                    .collect()
            };
            if batch.is_empty() {
                continue;
            }

            debug!(files = batch.len(), "processing changed files");
            let update = {
                let cache = cache.clone();
                tokio::task::spawn_blocking(move || cache.update_files(batch)).await
            };

            match update {
                Ok(update) => {
                    let affected: HashSet<String> = update.affected_sessions.clone();
                    if tx
                        .send(RefreshMessage::Updated(StatsSnapshot::from(update), affected))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                // update_files itself is infallible (unreadable files are
                // skipped), so this is a panicked blocking task.
                Err(err) => {
                    error!(error = %err, "stats update task failed");
                    if tx
                        .send(RefreshMessage::Error(format!("stats update failed: {err}")))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
            }
        }

        error!("refresher loop exited");
    }

    /// Full rescan for the `r` key. Err means the UI side is gone.
    async fn force_recompute(
        cache: &Arc<StatsCache>,
        tx: &mpsc::Sender<RefreshMessage>,
    ) -> Result<(), ()> {
        info!("forced full rescan");
        let stats = {
            let cache = cache.clone();
            tokio::task::spawn_blocking(move || cache.recompute()).await
        };
        match stats {
            Ok(stats) => tx
                .send(RefreshMessage::Loaded(StatsSnapshot::from(stats)))
                .await
                .map_err(|_| ()),
            Err(err) => tx
                .send(RefreshMessage::Error(format!("rescan failed: {err}")))
                .await
                .map_err(|_| ()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{AppState, StatsWindow};

    fn write_message(storage: &std::path::Path, session: &str, msg: &str, body: &str) {
        let dir = storage.join("message").join(session);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(format!("{msg}.json")), body).unwrap();
    }

    #[tokio::test]
    async fn test_initial_load_and_snapshot() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = tmp.path().join("storage");
        write_message(
            &storage,
            "ses_a",
            "msg_1",
            r#"{
                "id": "msg_1",
                "sessionID": "ses_a",
                "role": "assistant",
                "modelID": "claude-sonnet-4",
                "providerID": "anthropic",
                "tokens": {"input": 100, "output": 50},
                "time": {"created": 1760000000000, "completed": 1760000010000}
            }"#,
        );

        let storage_paths = StoragePaths::discover(Some(&storage));
        let cache_path = tmp.path().join("cache.json");
        let cache = StatsCache::with_cache_path(storage_paths, cache_path).unwrap();
        let stats = cache.load_or_compute();

        let mut state = AppState::new(StatsWindow::All, false);
        state.apply_snapshot(StatsSnapshot::from(stats));
        assert_eq!(state.day_list.len(), 1);
        let totals = state.windowed_totals();
        assert_eq!(totals.tokens.input, 100);
        assert_eq!(totals.sessions, 1);
    }

    #[tokio::test]
    async fn test_refresher_sends_loaded_without_watch() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = tmp.path().join("storage");
        std::fs::create_dir_all(storage.join("message")).unwrap();

        let storage_paths = StoragePaths::discover(Some(&storage));
        let settings = Settings {
            watch: false,
            ..Settings::default()
        };

        let (mut rx, _force_tx) = Refresher::new(settings, storage_paths).start();
        let msg = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out")
            .expect("channel closed");
        assert!(matches!(msg, RefreshMessage::Loaded(_)));
    }

    // update_files never fails, missing paths fall back to a recompute.
    #[test]
    fn test_update_files_handles_missing_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = tmp.path().join("storage");
        std::fs::create_dir_all(storage.join("message")).unwrap();

        let storage_paths = StoragePaths::discover(Some(&storage));
        let cache =
            StatsCache::with_cache_path(storage_paths, tmp.path().join("cache.json")).unwrap();
        cache.load_or_compute();

        let update = cache.update_files(vec![
            "/nonexistent/message/ses_x/msg_1.json".to_string(),
            storage.join("message/ses_x/gone.json").to_string_lossy().into_owned(),
        ]);
        assert!(update.affected_sessions.is_empty());
    }
}
