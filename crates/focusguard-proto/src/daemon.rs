use zbus::proxy;

pub const SERVICE_NAME: &str = "org.focusguard.Daemon";
pub const INTERFACE_NAME: &str = "org.focusguard.Daemon";
pub const OBJECT_PATH: &str = "/org/focusguard/Daemon";
/// Well-known name owned by the client that renders blocking surfaces.
pub const UI_SERVICE_NAME: &str = "org.focusguard.Ui";

#[proxy(
    interface = "org.focusguard.Daemon",
    default_service = "org.focusguard.Daemon",
    default_path = "/org/focusguard/Daemon"
)]
pub trait FocusGuardDaemon {
    /// Presents a problem for the blocked app and returns its question.
    async fn request_challenge(&self) -> zbus::Result<String>;

    /// `correct`, `incorrect` or `no_challenge`.
    async fn submit_answer(&self, answer: i64) -> zbus::Result<String>;

    async fn take_break(&self) -> zbus::Result<bool>;

    async fn skip_challenge(&self) -> zbus::Result<bool>;

    async fn get_engine_state(&self) -> zbus::Result<String>;

    async fn get_today_statistics(&self) -> zbus::Result<String>;

    async fn get_recent_statistics(&self, days: u32) -> zbus::Result<String>;

    async fn list_apps(&self) -> zbus::Result<String>;

    async fn add_app(
        &self,
        package_id: &str,
        app_name: &str,
        daily_limit_minutes: u32,
    ) -> zbus::Result<String>;

    async fn remove_app(&self, package_id: &str) -> zbus::Result<String>;

    async fn set_app_limit(&self, package_id: &str, daily_limit_minutes: u32)
        -> zbus::Result<String>;

    async fn set_app_enabled(&self, package_id: &str, enabled: bool) -> zbus::Result<String>;

    async fn set_difficulty(&self, level: &str) -> zbus::Result<String>;

    async fn reset_today_statistics(&self) -> zbus::Result<String>;

    async fn reset_all_usage(&self) -> zbus::Result<String>;

    #[zbus(signal)]
    async fn blocking_surface_shown(
        &self,
        handle: u64,
        package_id: &str,
        app_name: &str,
        usage_minutes: u32,
        limit_minutes: u32,
    ) -> zbus::Result<()>;

    #[zbus(signal)]
    async fn challenge_surface_shown(
        &self,
        handle: u64,
        question: &str,
        time_limit_secs: u32,
    ) -> zbus::Result<()>;

    #[zbus(signal)]
    async fn surface_detached(&self, handle: u64) -> zbus::Result<()>;
}
