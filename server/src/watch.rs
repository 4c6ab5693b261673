//! Source tree watcher: debounced change events trigger a full refresh.

use crate::AppState;
use anyhow::{Context, Result};
use catalog::discover::is_document;
use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use std::path::Path;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(200);

/// Keeps the watcher alive. Dropping it stops watching and ends the refresh
/// thread once its channel drains.
pub struct WatchHandle {
    _debouncer: Debouncer<RecommendedWatcher>,
}

/// Watch `root` recursively. Bursts of events inside `window` collapse into
/// one refresh; refreshes run one at a time on a dedicated thread.
pub fn spawn(state: Arc<AppState>, root: &Path, window: Duration) -> Result<WatchHandle> {
    let (tx, rx) = mpsc::channel::<DebounceEventResult>();
    let mut debouncer = new_debouncer(window, tx).context("create file watcher")?;
    debouncer
        .watcher()
        .watch(root, RecursiveMode::Recursive)
        .with_context(|| format!("watch {}", root.display()))?;

    thread::Builder::new()
        .name("catalog-refresh".into())
        .spawn(move || {
            for result in rx {
                let events = match result {
                    Ok(events) => events,
                    Err(err) => {
                        tracing::warn!(error = %err, "watcher error");
                        continue;
                    }
                };
                let relevant = events.iter().filter(|e| is_relevant(&e.path)).count();
                if relevant == 0 {
                    continue;
                }
                tracing::info!(events = relevant, "source change detected, refreshing");
                if let Err(err) = state.refresh() {
                    tracing::error!(error = %format!("{err:#}"), "refresh failed, previous index kept");
                }
            }
            tracing::debug!("watcher stopped");
        })
        .context("spawn refresh thread")?;

    tracing::info!(root = %root.display(), window_ms = window.as_millis() as u64, "watching sources");
    Ok(WatchHandle { _debouncer: debouncer })
}

/// Documents, directories, and anything already gone: a removed folder no
/// longer reports as a directory.
fn is_relevant(path: &Path) -> bool {
    is_document(path) || path.is_dir() || !path.exists()
}
