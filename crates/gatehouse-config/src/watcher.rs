//! File watching for rules hot-reload.
//!
//! Watches the rules file through the `notify` crate and surfaces
//! debounced change events. The caller (the server's reload task) decides
//! what to do with each event; reloading and validation happen there, so
//! a broken write never reaches the active rule set.

use crate::error::ConfigError;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

/// Debounced watcher over a single rules file.
///
/// Editors often produce bursts of writes for one save; the watcher
/// waits out the debounce interval after the first relevant event and
/// coalesces the whole burst into a single change.
pub struct RulesWatcher {
    // Dropping the watcher stops event delivery.
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<Event>,
    path: PathBuf,
    debounce: Duration,
}

impl RulesWatcher {
    /// Default debounce interval.
    pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

    /// Starts watching `path` with the default debounce.
    pub fn watch(path: &Path) -> Result<Self, ConfigError> {
        Self::watch_with_debounce(path, Self::DEFAULT_DEBOUNCE)
    }

    /// Starts watching `path`, coalescing changes within `debounce`.
    pub fn watch_with_debounce(path: &Path, debounce: Duration) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let (tx, rx) = mpsc::channel(64);
        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            if let Ok(event) = res {
                let _ = tx.blocking_send(event);
            }
        })
        .map_err(|e| ConfigError::Watcher(e.to_string()))?;

        // Watch the parent directory: editors that replace the file by
        // rename would otherwise detach the watch.
        let watch_target = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(path);
        watcher
            .watch(watch_target, RecursiveMode::NonRecursive)
            .map_err(|e| ConfigError::Watcher(e.to_string()))?;

        Ok(Self {
            _watcher: watcher,
            rx,
            path: path.to_path_buf(),
            debounce,
        })
    }

    /// Waits for the next debounced change to the rules file. Returns
    /// `None` when the watcher backend shuts down.
    ///
    /// After the first relevant event, the debounce interval is waited
    /// out and every event that arrived in the meantime is drained, so
    /// one save burst produces one change and the caller always reloads
    /// the final write of the burst.
    pub async fn next_change(&mut self) -> Option<PathBuf> {
        loop {
            let event = self.rx.recv().await?;
            if !self.is_relevant(&event) {
                continue;
            }

            tokio::time::sleep(self.debounce).await;
            while self.rx.try_recv().is_ok() {}
            return Some(self.path.clone());
        }
    }

    fn is_relevant(&self, event: &Event) -> bool {
        match event.kind {
            EventKind::Create(_) | EventKind::Modify(_) => {}
            _ => return false,
        }

        let Some(file_name) = self.path.file_name() else {
            return false;
        };
        event.paths.iter().any(|p| p.ends_with(file_name))
    }
}
