use chrono::{DateTime, Utc};
use focusguard_db::Database;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::WatcherConfig;
use crate::enforcement::EnforcementEngine;
use crate::session_recorder::{record_session, SharedRecorder};

/// Raw focus observation. `package` is `None` when nothing has focus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowEvent {
    pub package: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// One logical foreground transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppForegrounded {
    pub package_id: String,
}

/// Collapses noisy window notifications into single transitions.
#[derive(Debug)]
pub struct ForegroundWatcher {
    last_foreground_package: Option<String>,
    ignored: HashSet<String>,
}

impl ForegroundWatcher {
    pub fn new(own_package: &str, ignored_packages: &[String]) -> Self {
        let mut ignored: HashSet<String> = ignored_packages.iter().cloned().collect();
        ignored.insert(own_package.to_string());
        Self { last_foreground_package: None, ignored }
    }

    pub fn from_config(config: &WatcherConfig) -> Self {
        Self::new(&config.own_package, &config.ignored_packages)
    }

    pub fn on_window_event(&mut self, package_id: &str) -> Option<AppForegrounded> {
        if package_id.is_empty() || self.ignored.contains(package_id) {
            return None;
        }

        if self.last_foreground_package.as_deref() == Some(package_id) {
            return None;
        }

        self.last_foreground_package = Some(package_id.to_string());
        Some(AppForegrounded { package_id: package_id.to_string() })
    }

    /// Forget the last package so the next focus of it counts as a transition.
    pub fn on_focus_lost(&mut self) {
        self.last_foreground_package = None;
    }

    pub fn last_foreground_package(&self) -> Option<&str> {
        self.last_foreground_package.as_deref()
    }
}

/// Consumes window events until the channel closes, recording focus sessions
/// and forwarding transitions to the engine.
pub async fn run_watcher(
    mut watcher: ForegroundWatcher,
    mut events: mpsc::Receiver<WindowEvent>,
    recorder: SharedRecorder,
    database: Database,
    engine: Arc<EnforcementEngine>,
) {
    info!("Foreground watcher started");

    while let Some(event) = events.recv().await {
        let closed = recorder.write().await.update_focus(event.package.as_deref(), event.timestamp);
        if let Some(session) = closed {
            record_session(&database, &session).await;
        }

        match event.package.as_deref() {
            Some(package_id) => {
                if let Some(signal) = watcher.on_window_event(package_id) {
                    debug!("App switched to: {}", signal.package_id);
                    engine.on_app_foregrounded(&signal.package_id).await;
                }
            }
            None => watcher.on_focus_lost(),
        }
    }

    info!("Foreground watcher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn watcher() -> ForegroundWatcher {
        ForegroundWatcher::new("focusguard", &["waybar".to_string()])
    }

    #[test]
    fn test_repeated_events_emit_once() {
        let mut watcher = watcher();

        assert_eq!(
            watcher.on_window_event("firefox"),
            Some(AppForegrounded { package_id: "firefox".to_string() })
        );
        assert!(watcher.on_window_event("firefox").is_none());
        assert!(watcher.on_window_event("firefox").is_none());
        assert!(watcher.on_window_event("code").is_some());
        assert!(watcher.on_window_event("firefox").is_some());
    }

    #[test]
    fn test_own_and_system_packages_ignored() {
        let mut watcher = watcher();
        watcher.on_window_event("firefox");

        assert!(watcher.on_window_event("focusguard").is_none());
        assert!(watcher.on_window_event("waybar").is_none());
        assert!(watcher.on_window_event("").is_none());
        assert_eq!(watcher.last_foreground_package(), Some("firefox"));

        // Returning from the overlay is not a transition.
        assert!(watcher.on_window_event("firefox").is_none());
    }

    #[test]
    fn test_focus_lost_allows_reevaluation() {
        let mut watcher = watcher();
        watcher.on_window_event("firefox");
        watcher.on_focus_lost();

        assert!(watcher.last_foreground_package().is_none());
        assert!(watcher.on_window_event("firefox").is_some());
    }
}
