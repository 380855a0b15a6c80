use chrono::{DateTime, Local, Utc};
use focusguard_common::{ArithmeticProblem, BlockingAction, MonitoredApp};
use focusguard_db::queries::{BlockingEventQueries, MonitoredAppQueries};
use focusguard_db::{Database, NewBlockingEvent};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::challenge::{ChallengeGenerator, DifficultySource};
use crate::config::ChallengeConfig;
use crate::navigation::Navigator;
use crate::notification_manager::Notifier;
use crate::statistics::StatisticsAggregator;
use crate::surface::{
    BlockingContent, ChallengeContent, SurfaceDispatcher, SurfaceHandle, SurfaceRequest,
};
use crate::usage_sampler::UsageSampler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Resolve a challenge like "skip" once its time limit runs out.
    pub enforce_time_limit: bool,
    /// Granted when a generated problem fails its own consistency check.
    pub fallback_reward_minutes: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from(&ChallengeConfig::default())
    }
}

impl From<&ChallengeConfig> for EngineSettings {
    fn from(config: &ChallengeConfig) -> Self {
        Self {
            enforce_time_limit: config.enforce_time_limit,
            fallback_reward_minutes: config.fallback_reward_minutes,
        }
    }
}

/// Collaborators handed to the engine at construction.
pub struct EngineDependencies {
    pub database: Database,
    pub sampler: Arc<UsageSampler>,
    pub statistics: StatisticsAggregator,
    pub surfaces: SurfaceDispatcher,
    pub navigator: Arc<dyn Navigator>,
    pub notifier: Arc<dyn Notifier>,
    pub difficulty: Arc<dyn DifficultySource>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attachment {
    None,
    OverlayShown,
    ChallengeShown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Blocking { package_id: String, app_name: String },
    ChallengePresented { package_id: String, app_name: String, problem: ArithmeticProblem },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineOutcome {
    /// Absent or disabled app.
    NotMonitored,
    WithinLimit,
    Blocked,
    AlreadyBlocking,
    /// No surface could be shown; the user got a passive notice instead.
    SurfaceUnavailable,
    ChallengePresented(ArithmeticProblem),
    Resolved(BlockingAction),
    NoSession,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    Correct { extra_time_minutes: u32 },
    Incorrect,
    NoChallenge,
}

#[derive(Debug)]
struct BlockingSession {
    package_id: String,
    app_name: String,
    attachment: Attachment,
    problem: Option<ArithmeticProblem>,
    started: Instant,
    blocked_at: DateTime<Utc>,
    overlay: Option<SurfaceHandle>,
    challenge: Option<SurfaceHandle>,
    generation: u64,
}

#[derive(Debug, Default)]
struct EngineInner {
    session: Option<BlockingSession>,
    generation: u64,
}

impl EngineInner {
    fn state(&self) -> EngineState {
        match &self.session {
            None => EngineState::Idle,
            Some(session) => match &session.problem {
                Some(problem) => EngineState::ChallengePresented {
                    package_id: session.package_id.clone(),
                    app_name: session.app_name.clone(),
                    problem: problem.clone(),
                },
                None => EngineState::Blocking {
                    package_id: session.package_id.clone(),
                    app_name: session.app_name.clone(),
                },
            },
        }
    }

    fn is_blocking(&self, package_id: &str) -> bool {
        self.session.as_ref().is_some_and(|s| s.package_id == package_id)
    }
}

/// Decides when to block, drives the challenge flow and applies outcomes.
///
/// All transitions run under one lock, so bursts of foreground signals and
/// user actions observe each other's effects in order.
pub struct EnforcementEngine {
    database: Database,
    sampler: Arc<UsageSampler>,
    statistics: StatisticsAggregator,
    generator: ChallengeGenerator,
    surfaces: SurfaceDispatcher,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    difficulty: Arc<dyn DifficultySource>,
    settings: EngineSettings,
    inner: Mutex<EngineInner>,
}

impl EnforcementEngine {
    pub fn new(deps: EngineDependencies, settings: EngineSettings) -> Self {
        info!(
            "Initializing enforcement engine (enforce_time_limit: {})",
            settings.enforce_time_limit
        );

        Self {
            database: deps.database,
            sampler: deps.sampler,
            statistics: deps.statistics,
            generator: ChallengeGenerator::new(),
            surfaces: deps.surfaces,
            navigator: deps.navigator,
            notifier: deps.notifier,
            difficulty: deps.difficulty,
            settings,
            inner: Mutex::new(EngineInner::default()),
        }
    }

    pub async fn state(&self) -> EngineState {
        self.inner.lock().await.state()
    }

    /// Identifies the active blocking session, if any.
    pub async fn session_generation(&self) -> Option<u64> {
        self.inner.lock().await.session.as_ref().map(|s| s.generation)
    }

    pub async fn on_app_foregrounded(&self, package_id: &str) -> EngineOutcome {
        let mut inner = self.inner.lock().await;

        let stored = match MonitoredAppQueries::find(&self.database, package_id).await {
            Ok(Some(app)) if app.enabled => app,
            Ok(_) => {
                debug!("App not monitored: {}", package_id);
                self.teardown(&mut inner).await;
                return EngineOutcome::NotMonitored;
            }
            Err(e) => {
                warn!("Failed to look up {}: {}", package_id, e);
                return EngineOutcome::NotMonitored;
            }
        };

        let app = match self.sampler.refresh_package(package_id).await {
            Ok(Some(app)) => app,
            Ok(None) => {
                self.teardown(&mut inner).await;
                return EngineOutcome::NotMonitored;
            }
            Err(e) => {
                warn!("Using stored usage for {}: {}", package_id, e);
                stored
            }
        };

        debug!(
            "Usage for {}: {}/{} minutes",
            app.package_id, app.current_usage_minutes, app.daily_limit_minutes
        );

        if !app.is_over_limit() {
            self.teardown(&mut inner).await;
            return EngineOutcome::WithinLimit;
        }

        if inner.is_blocking(package_id) {
            debug!("Already blocking {}, skipping", package_id);
            return EngineOutcome::AlreadyBlocking;
        }

        self.teardown(&mut inner).await;

        let request = SurfaceRequest::FullScreen(BlockingContent {
            package_id: app.package_id.clone(),
            app_name: app.app_name.clone(),
            usage_minutes: app.current_usage_minutes,
            limit_minutes: app.daily_limit_minutes,
        });

        let handle = match self.surfaces.attach(request).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Cannot show blocking surface for {}: {}", app.package_id, e);
                self.notify_fallback(&app).await;
                self.record_event(NewBlockingEvent {
                    package_id: app.package_id.clone(),
                    app_name: app.app_name.clone(),
                    blocked_at: Utc::now(),
                    action: BlockingAction::SurfaceUnavailable,
                    problem_attempted: false,
                    problem_solved: false,
                    extra_time_earned_minutes: 0,
                    date: Local::now().date_naive(),
                })
                .await;
                return EngineOutcome::SurfaceUnavailable;
            }
        };

        inner.generation += 1;
        inner.session = Some(BlockingSession {
            package_id: app.package_id.clone(),
            app_name: app.app_name.clone(),
            attachment: Attachment::OverlayShown,
            problem: None,
            started: Instant::now(),
            blocked_at: Utc::now(),
            overlay: Some(handle),
            challenge: None,
            generation: inner.generation,
        });

        if let Err(e) = self.statistics.increment_apps_blocked().await {
            warn!("Failed to count blocked app: {}", e);
        }

        info!(
            "Time limit exceeded, blocking {} ({}/{} minutes)",
            app.app_name, app.current_usage_minutes, app.daily_limit_minutes
        );
        EngineOutcome::Blocked
    }

    /// "Solve problem": presents a fresh problem at the configured difficulty.
    /// Asking again while a problem is shown returns the same problem.
    pub async fn request_challenge(self: &Arc<Self>) -> EngineOutcome {
        let mut inner = self.inner.lock().await;

        let Some(session) = inner.session.as_ref() else {
            return EngineOutcome::NoSession;
        };
        if let Some(problem) = &session.problem {
            return EngineOutcome::ChallengePresented(problem.clone());
        }
        let package_id = session.package_id.clone();

        let difficulty = self.difficulty.current_difficulty().await;
        let problem = self.generator.generate(difficulty);

        debug_assert!(problem.is_consistent(), "inconsistent problem generated: {:?}", problem);
        if !problem.is_consistent() {
            error!("Generated an inconsistent problem {:?}, granting fallback reward", problem);
            return self.grant_fallback(&mut inner).await;
        }

        let request = SurfaceRequest::Modal(ChallengeContent {
            package_id: package_id.clone(),
            question: problem.question.clone(),
            time_limit_secs: problem.time_limit_secs,
            extra_time_reward_minutes: problem.extra_time_reward_minutes,
        });

        let handle = match self.surfaces.attach(request).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Cannot show challenge surface for {}: {}", package_id, e);
                return self.fail_open(&mut inner).await;
            }
        };

        let Some(session) = inner.session.as_mut() else {
            self.surfaces.detach(handle).await;
            return EngineOutcome::NoSession;
        };
        session.challenge = Some(handle);
        session.attachment = Attachment::ChallengeShown;
        session.problem = Some(problem.clone());
        let generation = session.generation;

        if let Err(e) = self.statistics.increment_problems_attempted().await {
            warn!("Failed to count attempted problem: {}", e);
        }

        if self.settings.enforce_time_limit {
            self.arm_time_limit(generation, Duration::from_secs(u64::from(problem.time_limit_secs)));
        }

        info!("Presented {} problem for {}", problem.difficulty, package_id);
        EngineOutcome::ChallengePresented(problem)
    }

    pub async fn submit_answer(&self, answer: i64) -> AnswerOutcome {
        let mut inner = self.inner.lock().await;

        let Some(problem) = inner.session.as_ref().and_then(|s| s.problem.as_ref()) else {
            return AnswerOutcome::NoChallenge;
        };

        if !problem.check_answer(answer) {
            debug!("Incorrect answer {} submitted", answer);
            return AnswerOutcome::Incorrect;
        }

        let reward = problem.extra_time_reward_minutes;
        let Some(session) = inner.session.take() else {
            return AnswerOutcome::NoChallenge;
        };

        if let Err(e) = self.statistics.increment_problems_solved().await {
            warn!("Failed to count solved problem: {}", e);
        }
        self.grant(&session.package_id, reward).await;
        self.detach_all(&session).await;
        self.record_session_event(&session, BlockingAction::ProblemSolved, true, reward).await;

        info!(
            "Problem solved for {} after {:?}, granted {} minutes",
            session.app_name,
            session.started.elapsed(),
            reward
        );
        AnswerOutcome::Correct { extra_time_minutes: reward }
    }

    /// "Take a break" from the blocking surface.
    pub async fn take_break(&self) -> EngineOutcome {
        let mut inner = self.inner.lock().await;
        self.resolve_with_break(&mut inner, BlockingAction::BreakTaken).await
    }

    /// "Skip" from the challenge surface.
    pub async fn skip_challenge(&self) -> EngineOutcome {
        let mut inner = self.inner.lock().await;
        self.resolve_with_break(&mut inner, BlockingAction::Skipped).await
    }

    /// Time limit of the challenge in session `generation` ran out.
    pub async fn expire_challenge(&self, generation: u64) -> EngineOutcome {
        let mut inner = self.inner.lock().await;

        let current = inner.session.as_ref().is_some_and(|s| {
            s.generation == generation && s.attachment == Attachment::ChallengeShown
        });
        if !current {
            debug!("Ignoring stale challenge timer for session {}", generation);
            return EngineOutcome::NoSession;
        }

        info!("Challenge time limit expired");
        self.resolve_with_break(&mut inner, BlockingAction::Expired).await
    }

    /// Deletes the app and its derived rows, tearing down its session first.
    pub async fn remove_app(&self, package_id: &str) -> focusguard_db::Result<bool> {
        let mut inner = self.inner.lock().await;

        if inner.is_blocking(package_id) {
            info!("Removing blocked app {}, tearing down its session", package_id);
            self.teardown(&mut inner).await;
        }

        MonitoredAppQueries::delete(&self.database, package_id).await
    }

    /// Enables or disables monitoring; disabling lifts an active block.
    pub async fn set_app_enabled(&self, package_id: &str, enabled: bool) -> focusguard_db::Result<()> {
        let mut inner = self.inner.lock().await;

        MonitoredAppQueries::set_enabled(&self.database, package_id, enabled).await?;

        if !enabled && inner.is_blocking(package_id) {
            self.teardown(&mut inner).await;
        }
        Ok(())
    }

    /// Detaches any surfaces without recording a resolution.
    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;
        self.teardown(&mut inner).await;
    }

    async fn resolve_with_break(
        &self,
        inner: &mut EngineInner,
        action: BlockingAction,
    ) -> EngineOutcome {
        let Some(session) = inner.session.take() else {
            return EngineOutcome::NoSession;
        };

        if let Err(e) = self.statistics.increment_breaks_taken().await {
            warn!("Failed to count break: {}", e);
        }
        self.detach_all(&session).await;
        if let Err(e) = self.navigator.go_back().await {
            warn!("Failed to navigate away from {}: {}", session.package_id, e);
        }
        self.record_session_event(&session, action, false, 0).await;

        info!("Blocking session for {} resolved: {}", session.app_name, action.as_str());
        EngineOutcome::Resolved(action)
    }

    async fn fail_open(&self, inner: &mut EngineInner) -> EngineOutcome {
        let Some(session) = inner.session.take() else {
            return EngineOutcome::NoSession;
        };

        self.detach_all(&session).await;
        match MonitoredAppQueries::find(&self.database, &session.package_id).await {
            Ok(Some(app)) => self.notify_fallback(&app).await,
            Ok(None) => {}
            Err(e) => warn!("Failed to load {} for notification: {}", session.package_id, e),
        }
        self.record_session_event(&session, BlockingAction::SurfaceUnavailable, false, 0).await;

        EngineOutcome::SurfaceUnavailable
    }

    async fn grant_fallback(&self, inner: &mut EngineInner) -> EngineOutcome {
        let Some(session) = inner.session.take() else {
            return EngineOutcome::NoSession;
        };

        let reward = self.settings.fallback_reward_minutes;
        self.grant(&session.package_id, reward).await;
        self.detach_all(&session).await;
        self.record_session_event(&session, BlockingAction::FallbackGranted, false, reward).await;

        EngineOutcome::Resolved(BlockingAction::FallbackGranted)
    }

    async fn grant(&self, package_id: &str, minutes: u32) {
        match MonitoredAppQueries::grant_extra_time(&self.database, package_id, minutes).await {
            Ok(app) => {
                debug!("Daily limit for {} raised to {} minutes", package_id, app.daily_limit_minutes)
            }
            Err(e) => warn!("Failed to grant {} minutes to {}: {}", minutes, package_id, e),
        }
    }

    async fn teardown(&self, inner: &mut EngineInner) {
        if let Some(session) = inner.session.take() {
            self.detach_all(&session).await;
            debug!("Blocking session for {} torn down", session.package_id);
        }
    }

    async fn detach_all(&self, session: &BlockingSession) {
        for handle in [session.challenge, session.overlay].into_iter().flatten() {
            self.surfaces.detach(handle).await;
        }
    }

    async fn notify_fallback(&self, app: &MonitoredApp) {
        if let Err(e) = self.notifier.notify_limit_reached(app).await {
            warn!("Failed to notify limit breach for {}: {}", app.package_id, e);
        }
    }

    async fn record_session_event(
        &self,
        session: &BlockingSession,
        action: BlockingAction,
        solved: bool,
        extra_minutes: u32,
    ) {
        self.record_event(NewBlockingEvent {
            package_id: session.package_id.clone(),
            app_name: session.app_name.clone(),
            blocked_at: session.blocked_at,
            action,
            problem_attempted: session.problem.is_some(),
            problem_solved: solved,
            extra_time_earned_minutes: extra_minutes,
            date: Local::now().date_naive(),
        })
        .await;
    }

    async fn record_event(&self, event: NewBlockingEvent) {
        if let Err(e) = BlockingEventQueries::insert(&self.database, &event).await {
            warn!("Failed to record blocking event for {}: {}", event.package_id, e);
        }
    }

    fn arm_time_limit(self: &Arc<Self>, generation: u64, limit: Duration) {
        let engine = Arc::downgrade(self);

        tokio::spawn(async move {
            tokio::time::sleep(limit).await;
            if let Some(engine) = engine.upgrade() {
                engine.expire_challenge(generation).await;
            }
        });
    }
}
