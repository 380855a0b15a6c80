pub mod challenge;
pub mod config;
pub mod daemon;
pub mod dbus_impl;
pub mod enforcement;
pub mod focus_source;
pub mod foreground_watcher;
pub mod navigation;
pub mod notification_manager;
pub mod session_recorder;
pub mod statistics;
pub mod surface;
pub mod usage_sampler;
pub mod usage_source;

pub use enforcement::{AnswerOutcome, EngineOutcome, EngineState, EnforcementEngine};
