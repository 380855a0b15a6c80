use anyhow::Result;
use chrono::Utc;
use std::env;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::{mpsc, watch};
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::foreground_watcher::WindowEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositorType {
    Niri,
    Sway,
    Hyprland,
    Unknown,
}

pub fn detect_compositor() -> CompositorType {
    if env::var("NIRI_SOCKET").is_ok() {
        return CompositorType::Niri;
    }

    if env::var("SWAYSOCK").is_ok() {
        return CompositorType::Sway;
    }

    if env::var("HYPRLAND_INSTANCE_SIGNATURE").is_ok() {
        return CompositorType::Hyprland;
    }

    CompositorType::Unknown
}

pub fn compositor_command_exists(compositor: CompositorType) -> bool {
    match compositor {
        CompositorType::Niri => which::which("niri").is_ok(),
        CompositorType::Sway => which::which("swaymsg").is_ok(),
        CompositorType::Hyprland => which::which("hyprctl").is_ok(),
        CompositorType::Unknown => false,
    }
}

/// Polls the compositor for the focused application and publishes every
/// observation, repeated or not.
pub struct FocusSource {
    compositor: CompositorType,
    poll_interval: Duration,
    observable: watch::Sender<bool>,
}

impl FocusSource {
    pub fn new(compositor: CompositorType, poll_interval: Duration) -> Self {
        let (observable, _) = watch::channel(compositor_command_exists(compositor));
        Self { compositor, poll_interval, observable }
    }

    pub fn detect(poll_interval: Duration) -> Self {
        let compositor = detect_compositor();
        debug!("Detected compositor: {:?}", compositor);
        Self::new(compositor, poll_interval)
    }

    pub fn compositor(&self) -> CompositorType {
        self.compositor
    }

    /// Whether focus changes are currently being observed. Turns false for
    /// good once the source stops.
    pub fn availability(&self) -> watch::Receiver<bool> {
        self.observable.subscribe()
    }

    pub async fn run(self, sender: mpsc::Sender<WindowEvent>) {
        if !*self.observable.borrow() {
            warn!(
                "No supported compositor found ({:?}); foreground changes will not be observed",
                self.compositor
            );
            return;
        }

        info!("Polling {:?} for focus every {:?}", self.compositor, self.poll_interval);
        let mut ticker = interval(self.poll_interval);

        loop {
            ticker.tick().await;

            let package = match self.focused_package().await {
                Ok(package) => package,
                Err(e) => {
                    debug!("Focus query failed: {}", e);
                    continue;
                }
            };

            if sender.send(WindowEvent { package, timestamp: Utc::now() }).await.is_err() {
                debug!("Window event receiver closed, stopping focus source");
                self.observable.send_replace(false);
                return;
            }
        }
    }

    pub async fn focused_package(&self) -> Result<Option<String>> {
        let output = match self.compositor {
            CompositorType::Niri => {
                Command::new("niri").args(["msg", "--json", "focused-window"]).output().await?
            }
            CompositorType::Sway => Command::new("swaymsg").args(["-t", "get_tree"]).output().await?,
            CompositorType::Hyprland => {
                Command::new("hyprctl").args(["activewindow", "-j"]).output().await?
            }
            CompositorType::Unknown => return Ok(None),
        };

        if !output.status.success() {
            return Ok(None);
        }

        let value: serde_json::Value = serde_json::from_slice(&output.stdout)?;
        Ok(parse_focused_package(self.compositor, &value))
    }
}

pub fn parse_focused_package(
    compositor: CompositorType,
    value: &serde_json::Value,
) -> Option<String> {
    let field = match compositor {
        CompositorType::Niri => value.get("app_id"),
        CompositorType::Sway => find_focused_node(value).and_then(|node| {
            node.get("app_id")
                .filter(|v| !v.is_null())
                .or_else(|| node.pointer("/window_properties/class"))
        }),
        CompositorType::Hyprland => value.get("class"),
        CompositorType::Unknown => None,
    };

    field.and_then(|v| v.as_str()).filter(|s| !s.is_empty()).map(String::from)
}

fn find_focused_node(node: &serde_json::Value) -> Option<&serde_json::Value> {
    if node.get("focused").and_then(|f| f.as_bool()) == Some(true) {
        return Some(node);
    }

    ["nodes", "floating_nodes"]
        .iter()
        .filter_map(|key| node.get(*key).and_then(|n| n.as_array()))
        .flatten()
        .find_map(find_focused_node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_niri_focused_window() {
        let value = json!({ "id": 3, "app_id": "firefox", "title": "GitHub" });
        assert_eq!(
            parse_focused_package(CompositorType::Niri, &value),
            Some("firefox".to_string())
        );
        assert_eq!(parse_focused_package(CompositorType::Niri, &json!(null)), None);
    }

    #[test]
    fn test_parse_sway_tree() {
        let value = json!({
            "focused": false,
            "nodes": [
                { "focused": false, "nodes": [] },
                { "focused": false, "nodes": [], "floating_nodes": [
                    { "focused": true, "app_id": "org.example.Focus", "name": "Focus" }
                ]}
            ]
        });
        assert_eq!(
            parse_focused_package(CompositorType::Sway, &value),
            Some("org.example.Focus".to_string())
        );
    }

    #[test]
    fn test_parse_sway_xwayland_window_uses_class() {
        let value = json!({
            "focused": false,
            "nodes": [{ "focused": true, "app_id": null, "window_properties": { "class": "Steam" } }]
        });
        assert_eq!(parse_focused_package(CompositorType::Sway, &value), Some("Steam".to_string()));
    }

    #[test]
    fn test_parse_hyprland_active_window() {
        let value = json!({ "class": "kitty", "title": "zsh" });
        assert_eq!(parse_focused_package(CompositorType::Hyprland, &value), Some("kitty".to_string()));

        let empty = json!({ "class": "", "title": "" });
        assert_eq!(parse_focused_package(CompositorType::Hyprland, &empty), None);
    }

    #[tokio::test]
    async fn test_unknown_compositor_is_not_observable() {
        let source = FocusSource::new(CompositorType::Unknown, Duration::from_millis(10));
        let availability = source.availability();
        assert!(!*availability.borrow());

        let (sender, mut receiver) = mpsc::channel(1);
        source.run(sender).await;

        assert!(receiver.recv().await.is_none());
        assert!(!*availability.borrow());
    }
}
