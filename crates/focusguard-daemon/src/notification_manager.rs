use anyhow::Result;
use async_trait::async_trait;
use focusguard_common::MonitoredApp;
use notify_rust::{Notification as SystemNotification, Timeout, Urgency};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Passive notice used when a blocking surface cannot be shown.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_limit_reached(&self, app: &MonitoredApp) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct NotificationRequest {
    summary: String,
    body: String,
}

impl NotificationRequest {
    fn limit_reached(app: &MonitoredApp) -> Self {
        Self {
            summary: format!("Time limit reached for {}", app.app_name),
            body: format!(
                "You have used {} of {} minutes today. Please take a break.",
                app.current_usage_minutes, app.daily_limit_minutes
            ),
        }
    }
}

/// Desktop notifications sent from a background task.
pub struct NotificationManager {
    sender: mpsc::UnboundedSender<NotificationRequest>,
}

impl NotificationManager {
    pub fn new() -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<NotificationRequest>();

        tokio::spawn(async move {
            while let Some(request) = receiver.recv().await {
                if let Err(e) = Self::send_desktop_notification(&request) {
                    warn!("Failed to send notification: {}", e);
                }
            }
        });

        Self { sender }
    }

    fn send_desktop_notification(request: &NotificationRequest) -> Result<()> {
        SystemNotification::new()
            .summary(&request.summary)
            .body(&request.body)
            .icon("appointment-missed")
            .urgency(Urgency::Critical)
            .timeout(Timeout::Milliseconds(15000))
            .show()?;

        info!("Desktop notification sent: {}", request.summary);
        Ok(())
    }
}

impl Default for NotificationManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for NotificationManager {
    async fn notify_limit_reached(&self, app: &MonitoredApp) -> Result<()> {
        self.sender
            .send(NotificationRequest::limit_reached(app))
            .map_err(|e| anyhow::anyhow!("Failed to queue notification: {}", e))?;
        Ok(())
    }
}
