use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::focus_source::CompositorType;

/// Moves the user away from a blocked application.
#[async_trait]
pub trait Navigator: Send + Sync {
    async fn go_back(&self) -> Result<()>;
}

/// Focuses the previously focused window through the compositor's IPC.
pub struct CompositorNavigator {
    compositor: CompositorType,
    dry_run: bool,
}

impl CompositorNavigator {
    pub fn new(compositor: CompositorType, dry_run: bool) -> Self {
        Self { compositor, dry_run }
    }

    fn command(&self) -> Option<(&'static str, &'static [&'static str])> {
        match self.compositor {
            CompositorType::Niri => Some(("niri", &["msg", "action", "focus-window-previous"])),
            CompositorType::Sway => Some(("swaymsg", &["workspace", "back_and_forth"])),
            CompositorType::Hyprland => Some(("hyprctl", &["dispatch", "focuscurrentorlast"])),
            CompositorType::Unknown => None,
        }
    }
}

#[async_trait]
impl Navigator for CompositorNavigator {
    async fn go_back(&self) -> Result<()> {
        let Some((program, args)) = self.command() else {
            bail!("no supported compositor to navigate with");
        };

        if self.dry_run {
            info!("[dry run] would run: {} {}", program, args.join(" "));
            return Ok(());
        }

        let status = Command::new(program).args(args).status().await?;
        if !status.success() {
            bail!("{} exited with {}", program, status);
        }

        debug!("Navigated back via {}", program);
        Ok(())
    }
}
