pub mod daemon;

pub use daemon::{FocusGuardDaemonProxy, INTERFACE_NAME, OBJECT_PATH, SERVICE_NAME, UI_SERVICE_NAME};
