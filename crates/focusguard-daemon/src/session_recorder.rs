use chrono::{DateTime, Local, Utc};
use focusguard_common::AppSession;
use focusguard_db::queries::SessionLogQueries;
use focusguard_db::{Database, NewSessionLog};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

pub type SharedRecorder = Arc<RwLock<SessionRecorder>>;

#[derive(Debug, Clone)]
struct FocusedPackage {
    package_id: String,
    started_at: DateTime<Utc>,
}

/// Turns the raw focus stream into closed foreground sessions.
#[derive(Debug, Default)]
pub struct SessionRecorder {
    current_focus: Option<FocusedPackage>,
}

impl SessionRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedRecorder {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Returns the session that ended because focus moved away, if any.
    pub fn update_focus(&mut self, package: Option<&str>, at: DateTime<Utc>) -> Option<AppSession> {
        match (&self.current_focus, package) {
            (Some(current), Some(new)) if current.package_id == new => None,
            (Some(_), Some(new)) => {
                let closed = self.close(at);
                self.current_focus =
                    Some(FocusedPackage { package_id: new.to_string(), started_at: at });
                closed
            }
            (Some(_), None) => self.close(at),
            (None, Some(new)) => {
                self.current_focus =
                    Some(FocusedPackage { package_id: new.to_string(), started_at: at });
                None
            }
            (None, None) => None,
        }
    }

    /// Closes the open session, e.g. on shutdown.
    pub fn flush(&mut self, at: DateTime<Utc>) -> Option<AppSession> {
        self.close(at)
    }

    /// Package and start time of the session still in progress.
    pub fn open_session(&self) -> Option<(&str, DateTime<Utc>)> {
        self.current_focus.as_ref().map(|f| (f.package_id.as_str(), f.started_at))
    }

    fn close(&mut self, at: DateTime<Utc>) -> Option<AppSession> {
        self.current_focus.take().map(|focus| AppSession {
            package_id: focus.package_id,
            started_at: focus.started_at,
            ended_at: at.max(focus.started_at),
        })
    }
}

/// Persists a closed session. Empty sessions are dropped.
pub async fn record_session(database: &Database, session: &AppSession) {
    if session.duration().num_milliseconds() <= 0 {
        return;
    }

    let date = session.ended_at.with_timezone(&Local).date_naive();
    let log = NewSessionLog::from_session(session, date);

    match SessionLogQueries::insert(database, &log).await {
        Ok(_) => debug!(
            "Session closed: app={}, duration={}s",
            session.package_id,
            session.duration().num_seconds()
        ),
        Err(e) => warn!("Failed to record session for {}: {}", session.package_id, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_bdd_given_new_recorder_when_app_focused_then_no_session_reported() {
        let mut recorder = SessionRecorder::new();

        assert!(recorder.update_focus(Some("firefox"), at(0)).is_none());
        assert_eq!(recorder.open_session(), Some(("firefox", at(0))));
    }

    #[test]
    fn test_bdd_given_focused_app_when_app_changes_then_session_reported() {
        let mut recorder = SessionRecorder::new();
        recorder.update_focus(Some("firefox"), at(0));

        let session = recorder.update_focus(Some("code"), at(90)).unwrap();

        assert_eq!(session.package_id, "firefox");
        assert_eq!(session.duration(), Duration::seconds(90));
        assert_eq!(recorder.open_session(), Some(("code", at(90))));
    }

    #[test]
    fn test_bdd_given_focused_app_when_same_app_then_no_session_reported() {
        let mut recorder = SessionRecorder::new();
        recorder.update_focus(Some("firefox"), at(0));

        assert!(recorder.update_focus(Some("firefox"), at(30)).is_none());
        assert_eq!(recorder.open_session(), Some(("firefox", at(0))));
    }

    #[test]
    fn test_bdd_given_focused_app_when_focus_lost_then_session_closed() {
        let mut recorder = SessionRecorder::new();
        recorder.update_focus(Some("firefox"), at(0));

        let session = recorder.update_focus(None, at(15)).unwrap();

        assert_eq!(session.duration(), Duration::seconds(15));
        assert!(recorder.open_session().is_none());
        assert!(recorder.flush(at(20)).is_none());
    }

    #[test]
    fn test_clock_going_backwards_yields_empty_session() {
        let mut recorder = SessionRecorder::new();
        recorder.update_focus(Some("firefox"), at(100));

        let session = recorder.flush(at(50)).unwrap();
        assert_eq!(session.duration(), Duration::zero());
    }
}
