//! Config-file watcher.
//!
//! Watches the config directory and nudges the reconcile worker's change
//! channel whenever the sensors file is written. Signals are cheap and
//! debounced downstream, so every relevant event just sends one.

use std::path::Path;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::SENSORS_CONFIG_FILE;

/// Starts watching `config_dir` for sensors-file changes.
///
/// The returned watcher must stay alive for the watch to stay active;
/// drop it to stop. Events arrive on notify's own thread, so the signal
/// is forwarded with a non-blocking send and a full channel (reload
/// already pending) simply drops the extra nudge.
pub fn watch_config_dir(
    config_dir: &Path,
    change_tx: mpsc::Sender<()>,
) -> notify::Result<RecommendedWatcher> {
    let mut watcher = notify::recommended_watcher(move |event: notify::Result<Event>| {
        let event = match event {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Config watch error");
                return;
            }
        };

        if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
            return;
        }
        if !event
            .paths
            .iter()
            .any(|p| p.file_name().is_some_and(|n| n == SENSORS_CONFIG_FILE))
        {
            return;
        }

        debug!("Sensors config changed on disk");
        let _ = change_tx.try_send(());
    })?;

    watcher.watch(config_dir, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}
