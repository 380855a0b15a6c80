pub mod blocking_events;
pub mod daily_statistics;
pub mod monitored_apps;
pub mod session_logs;
pub mod settings;

pub use blocking_events::BlockingEventQueries;
pub use daily_statistics::DailyStatisticsQueries;
pub use monitored_apps::MonitoredAppQueries;
pub use session_logs::SessionLogQueries;
pub use settings::SettingsQueries;
