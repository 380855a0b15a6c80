use async_trait::async_trait;
use focusguard_common::{Difficulty, MonitoredApp};
use focusguard_db::queries::settings::DIFFICULTY_LEVEL;
use focusguard_db::queries::{MonitoredAppQueries, SettingsQueries};
use focusguard_db::{Database, DbError};
use focusguard_proto::{INTERFACE_NAME, OBJECT_PATH, UI_SERVICE_NAME};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};
use zbus::fdo::DBusProxy;
use zbus::names::BusName;
use zbus::{interface, Connection};

use crate::enforcement::{AnswerOutcome, EngineOutcome, EngineState, EnforcementEngine};
use crate::statistics::StatisticsAggregator;
use crate::surface::{SurfaceError, SurfaceHandle, SurfaceProvider, SurfaceRequest};

pub struct FocusGuardService {
    engine: Arc<EnforcementEngine>,
    database: Database,
    statistics: StatisticsAggregator,
}

impl FocusGuardService {
    pub fn new(
        engine: Arc<EnforcementEngine>,
        database: Database,
        statistics: StatisticsAggregator,
    ) -> Self {
        Self { engine, database, statistics }
    }
}

#[interface(name = "org.focusguard.Daemon")]
impl FocusGuardService {
    async fn request_challenge(&self) -> String {
        match self.engine.request_challenge().await {
            EngineOutcome::ChallengePresented(problem) => problem.question,
            EngineOutcome::NoSession => "error:no_blocking_session".to_string(),
            EngineOutcome::SurfaceUnavailable => "error:surface_unavailable".to_string(),
            EngineOutcome::Resolved(action) => format!("resolved:{}", action.as_str()),
            other => format!("error:{:?}", other),
        }
    }

    async fn submit_answer(&self, answer: i64) -> String {
        match self.engine.submit_answer(answer).await {
            AnswerOutcome::Correct { .. } => "correct",
            AnswerOutcome::Incorrect => "incorrect",
            AnswerOutcome::NoChallenge => "no_challenge",
        }
        .to_string()
    }

    async fn take_break(&self) -> bool {
        matches!(self.engine.take_break().await, EngineOutcome::Resolved(_))
    }

    async fn skip_challenge(&self) -> bool {
        matches!(self.engine.skip_challenge().await, EngineOutcome::Resolved(_))
    }

    async fn get_engine_state(&self) -> String {
        engine_state_json(&self.engine.state().await)
    }

    async fn get_today_statistics(&self) -> String {
        match self.statistics.today_statistics().await {
            Ok(stats) => serde_json::to_string(&stats).unwrap_or_else(|_| "{}".to_string()),
            Err(e) => {
                warn!("Failed to load today's statistics: {}", e);
                format!("error:{}", e)
            }
        }
    }

    async fn get_recent_statistics(&self, days: u32) -> String {
        match self.statistics.recent(days).await {
            Ok(stats) => serde_json::to_string(&stats).unwrap_or_else(|_| "[]".to_string()),
            Err(e) => {
                warn!("Failed to load recent statistics: {}", e);
                format!("error:{}", e)
            }
        }
    }

    async fn list_apps(&self) -> String {
        match MonitoredAppQueries::list_all(&self.database).await {
            Ok(apps) => serde_json::to_string(&apps).unwrap_or_else(|_| "[]".to_string()),
            Err(e) => {
                warn!("Failed to list apps: {}", e);
                format!("error:{}", e)
            }
        }
    }

    async fn add_app(&self, package_id: &str, app_name: &str, daily_limit_minutes: u32) -> String {
        let app = MonitoredApp::new(package_id, app_name, daily_limit_minutes);
        reply(MonitoredAppQueries::create(&self.database, &app).await.map(|_| {
            info!("Now monitoring {} ({} minutes/day)", package_id, daily_limit_minutes);
        }))
    }

    async fn remove_app(&self, package_id: &str) -> String {
        match self.engine.remove_app(package_id).await {
            Ok(true) => "success".to_string(),
            Ok(false) => "error:not_found".to_string(),
            Err(e) => {
                warn!("Failed to remove {}: {}", package_id, e);
                format!("error:{}", e)
            }
        }
    }

    async fn set_app_limit(&self, package_id: &str, daily_limit_minutes: u32) -> String {
        let result =
            MonitoredAppQueries::set_daily_limit(&self.database, package_id, daily_limit_minutes)
                .await;
        reply(result)
    }

    async fn set_app_enabled(&self, package_id: &str, enabled: bool) -> String {
        reply(self.engine.set_app_enabled(package_id, enabled).await)
    }

    async fn set_difficulty(&self, level: &str) -> String {
        let difficulty: Difficulty = match level.parse() {
            Ok(difficulty) => difficulty,
            Err(e) => return format!("error:{}", e),
        };
        reply(SettingsQueries::set(&self.database, DIFFICULTY_LEVEL, difficulty.as_str()).await)
    }

    async fn reset_today_statistics(&self) -> String {
        reply(self.statistics.reset_today().await)
    }

    async fn reset_all_usage(&self) -> String {
        let result = MonitoredAppQueries::reset_all_usage(&self.database, chrono::Utc::now()).await;
        reply(result.map(|count| info!("Usage reset for {} apps", count)))
    }

    #[zbus(signal)]
    async fn blocking_surface_shown(
        signal_ctxt: &zbus::SignalContext<'_>,
        handle: u64,
        package_id: &str,
        app_name: &str,
        usage_minutes: u32,
        limit_minutes: u32,
    ) -> zbus::Result<()>;

    #[zbus(signal)]
    async fn challenge_surface_shown(
        signal_ctxt: &zbus::SignalContext<'_>,
        handle: u64,
        question: &str,
        time_limit_secs: u32,
    ) -> zbus::Result<()>;

    #[zbus(signal)]
    async fn surface_detached(
        signal_ctxt: &zbus::SignalContext<'_>,
        handle: u64,
    ) -> zbus::Result<()>;
}

fn reply(result: Result<(), DbError>) -> String {
    match result {
        Ok(()) => "success".to_string(),
        Err(e) => {
            warn!("Request failed: {}", e);
            format!("error:{}", e)
        }
    }
}

/// Engine state for clients. The expected answer is never included.
pub fn engine_state_json(state: &EngineState) -> String {
    let value = match state {
        EngineState::Idle => json!({ "state": "idle" }),
        EngineState::Blocking { package_id, app_name } => {
            json!({ "state": "blocking", "package_id": package_id, "app_name": app_name })
        }
        EngineState::ChallengePresented { package_id, app_name, problem } => json!({
            "state": "challenge_presented",
            "package_id": package_id,
            "app_name": app_name,
            "question": problem.question,
            "difficulty": problem.difficulty,
            "time_limit_secs": problem.time_limit_secs,
            "extra_time_reward_minutes": problem.extra_time_reward_minutes,
        }),
    };
    value.to_string()
}

/// Surfaces rendered by a UI client listening for the daemon's signals.
///
/// Attaching requires the client to own its well-known name on the bus.
pub struct DbusSurfaceProvider {
    connection: Option<Connection>,
    ui_name: String,
    next_handle: u64,
    attached: HashSet<SurfaceHandle>,
}

impl DbusSurfaceProvider {
    pub fn new(connection: Option<Connection>) -> Self {
        Self::with_ui_name(connection, UI_SERVICE_NAME)
    }

    pub fn with_ui_name(connection: Option<Connection>, ui_name: impl Into<String>) -> Self {
        Self { connection, ui_name: ui_name.into(), next_handle: 0, attached: HashSet::new() }
    }

    async fn require_renderer(&self) -> Result<(), SurfaceError> {
        let Some(connection) = &self.connection else {
            return Err(SurfaceError::CapabilityUnavailable("no D-Bus connection".to_string()));
        };

        let name = BusName::try_from(self.ui_name.as_str())
            .map_err(|e| SurfaceError::Failed(format!("invalid UI name {}: {}", self.ui_name, e)))?;
        let dbus =
            DBusProxy::new(connection).await.map_err(|e| SurfaceError::Failed(e.to_string()))?;
        let present =
            dbus.name_has_owner(name).await.map_err(|e| SurfaceError::Failed(e.to_string()))?;

        if !present {
            return Err(SurfaceError::CapabilityUnavailable(format!(
                "no UI client owns {}",
                self.ui_name
            )));
        }
        Ok(())
    }

    async fn emit<B>(&self, name: &str, body: &B) -> Result<(), SurfaceError>
    where
        B: serde::Serialize + zbus::zvariant::DynamicType,
    {
        let Some(connection) = &self.connection else {
            return Err(SurfaceError::CapabilityUnavailable("no D-Bus connection".to_string()));
        };

        connection
            .emit_signal(None::<()>, OBJECT_PATH, INTERFACE_NAME, name, body)
            .await
            .map_err(|e| SurfaceError::Failed(e.to_string()))
    }
}

#[async_trait]
impl SurfaceProvider for DbusSurfaceProvider {
    async fn attach(&mut self, request: SurfaceRequest) -> Result<SurfaceHandle, SurfaceError> {
        self.require_renderer().await?;
        let handle = SurfaceHandle(self.next_handle + 1);

        match &request {
            SurfaceRequest::FullScreen(content) => {
                self.emit(
                    "BlockingSurfaceShown",
                    &(
                        handle.0,
                        content.package_id.as_str(),
                        content.app_name.as_str(),
                        content.usage_minutes,
                        content.limit_minutes,
                    ),
                )
                .await?
            }
            SurfaceRequest::Modal(content) => {
                self.emit(
                    "ChallengeSurfaceShown",
                    &(handle.0, content.question.as_str(), content.time_limit_secs),
                )
                .await?
            }
        }

        self.next_handle = handle.0;
        self.attached.insert(handle);
        Ok(handle)
    }

    async fn detach(&mut self, handle: SurfaceHandle) -> Result<(), SurfaceError> {
        if !self.attached.remove(&handle) {
            return Ok(());
        }
        self.emit("SurfaceDetached", &handle.0).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use focusguard_common::{ArithmeticProblem, Expression};

    #[test]
    fn test_state_json_hides_answer() {
        let problem = ArithmeticProblem::new(
            Expression::Multiply { a: 14, b: 7 },
            98,
            Difficulty::Medium,
        );
        let state = EngineState::ChallengePresented {
            package_id: "org.example.Focus".to_string(),
            app_name: "Focus".to_string(),
            problem,
        };

        let value: serde_json::Value = serde_json::from_str(&engine_state_json(&state)).unwrap();
        assert_eq!(value["state"], "challenge_presented");
        assert_eq!(value["question"], "14 × 7 = ?");
        assert_eq!(value["difficulty"], "MEDIUM");
        assert!(value.get("answer").is_none());
    }

    #[test]
    fn test_idle_state_json() {
        assert_eq!(engine_state_json(&EngineState::Idle), r#"{"state":"idle"}"#);
    }

    #[tokio::test]
    async fn test_provider_without_connection_is_unavailable() {
        let mut provider = DbusSurfaceProvider::new(None);
        let request = SurfaceRequest::Modal(crate::surface::ChallengeContent {
            package_id: "org.example.Focus".to_string(),
            question: "2 + 2 = ?".to_string(),
            time_limit_secs: 30,
            extra_time_reward_minutes: 5,
        });

        let result = provider.attach(request).await;
        assert!(matches!(result, Err(SurfaceError::CapabilityUnavailable(_))));
        assert!(provider.detach(SurfaceHandle(1)).await.is_ok());
    }

    fn blocking_request() -> SurfaceRequest {
        SurfaceRequest::FullScreen(crate::surface::BlockingContent {
            package_id: "org.example.Focus".to_string(),
            app_name: "Focus".to_string(),
            usage_minutes: 40,
            limit_minutes: 30,
        })
    }

    #[tokio::test]
    async fn test_provider_requires_ui_client_on_bus() {
        let Ok(connection) = Connection::session().await else {
            println!("Session bus not available, skipping UI client test");
            return;
        };

        let ui_name = format!("org.focusguard.Ui.Test{}", std::process::id());
        let mut provider = DbusSurfaceProvider::with_ui_name(Some(connection), ui_name.clone());

        let result = provider.attach(blocking_request()).await;
        assert!(matches!(result, Err(SurfaceError::CapabilityUnavailable(_))));

        let ui = zbus::ConnectionBuilder::session()
            .unwrap()
            .name(ui_name.as_str())
            .unwrap()
            .build()
            .await
            .unwrap();
        let handle = provider.attach(blocking_request()).await.unwrap();
        assert!(provider.detach(handle).await.is_ok());
        drop(ui);
    }
}
