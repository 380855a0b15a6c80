#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use focusguard_common::{Difficulty, MonitoredApp};
use focusguard_daemon::challenge::SettingsDifficulty;
use focusguard_daemon::enforcement::{EngineDependencies, EngineSettings, EnforcementEngine};
use focusguard_daemon::navigation::Navigator;
use focusguard_daemon::notification_manager::Notifier;
use focusguard_daemon::statistics::StatisticsAggregator;
use focusguard_daemon::surface::{
    SurfaceDispatcher, SurfaceError, SurfaceHandle, SurfaceProvider, SurfaceRequest,
};
use focusguard_daemon::usage_sampler::UsageSampler;
use focusguard_daemon::usage_source::{UsageQuery, UsageQueryError};
use focusguard_db::queries::MonitoredAppQueries;
use focusguard_db::{Database, DatabaseConfig};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::{Notify, Semaphore};

pub async fn setup_test_database() -> (Database, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("focusguard-test.db");

    let db = Database::new(DatabaseConfig { path: path.to_string_lossy().to_string() })
        .await
        .unwrap();
    db.run_migrations().await.unwrap();

    (db, dir)
}

/// Holds a usage query open until the test releases it.
pub struct Gate {
    pub entered: Notify,
    pub release: Semaphore,
}

impl Gate {
    pub fn new() -> Self {
        Self { entered: Notify::new(), release: Semaphore::new(0) }
    }
}

/// Usage source answering from a table of per-package minutes.
#[derive(Default)]
pub struct FakeUsage {
    minutes: Mutex<HashMap<String, u64>>,
    failing: Mutex<HashSet<String>>,
    access_denied: AtomicBool,
    total_minutes: AtomicU64,
    queries: AtomicUsize,
    gate: Option<Arc<Gate>>,
}

impl FakeUsage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated(gate: Arc<Gate>) -> Self {
        Self { gate: Some(gate), ..Self::default() }
    }

    pub fn set_minutes(&self, package_id: &str, minutes: u64) {
        self.minutes.lock().unwrap().insert(package_id.to_string(), minutes);
    }

    pub fn fail_for(&self, package_id: &str) {
        self.failing.lock().unwrap().insert(package_id.to_string());
    }

    pub fn deny_access(&self) {
        self.access_denied.store(true, Ordering::SeqCst);
    }

    pub fn set_total_minutes(&self, minutes: u64) {
        self.total_minutes.store(minutes, Ordering::SeqCst);
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UsageQuery for FakeUsage {
    async fn check_access(&self) -> Result<(), UsageQueryError> {
        if self.access_denied.load(Ordering::SeqCst) {
            return Err(UsageQueryError::AccessUnavailable("permission revoked".to_string()));
        }
        Ok(())
    }

    async fn query_foreground_time(
        &self,
        package_id: &str,
        _start: DateTime<Local>,
        _end: DateTime<Local>,
    ) -> Result<Duration, UsageQueryError> {
        self.queries.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.release.acquire().await.unwrap().forget();
        }

        if self.failing.lock().unwrap().contains(package_id) {
            return Err(UsageQueryError::Query {
                package: package_id.to_string(),
                reason: "transient failure".to_string(),
            });
        }

        let minutes = self.minutes.lock().unwrap().get(package_id).copied().unwrap_or(0);
        Ok(Duration::from_secs(minutes * 60))
    }

    async fn query_total_foreground_time(
        &self,
        _start: DateTime<Local>,
        _end: DateTime<Local>,
    ) -> Result<Duration, UsageQueryError> {
        Ok(Duration::from_secs(self.total_minutes.load(Ordering::SeqCst) * 60))
    }
}

#[derive(Debug, Default)]
pub struct SurfaceLog {
    pub full_screen_attaches: usize,
    pub modal_attaches: usize,
    pub detach_calls: usize,
    pub attached: HashSet<u64>,
    next: u64,
}

impl SurfaceLog {
    pub fn attach_calls(&self) -> usize {
        self.full_screen_attaches + self.modal_attaches
    }
}

/// Which surface kinds the fake provider is able to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surfaces {
    All,
    FullScreenOnly,
    None,
}

pub struct FakeSurfaces {
    log: Arc<Mutex<SurfaceLog>>,
    accepts: Surfaces,
}

#[async_trait]
impl SurfaceProvider for FakeSurfaces {
    async fn attach(&mut self, request: SurfaceRequest) -> Result<SurfaceHandle, SurfaceError> {
        let allowed = match (&request, self.accepts) {
            (_, Surfaces::All) => true,
            (SurfaceRequest::FullScreen(_), Surfaces::FullScreenOnly) => true,
            _ => false,
        };
        if !allowed {
            return Err(SurfaceError::CapabilityUnavailable("overlay permission".to_string()));
        }

        let mut log = self.log.lock().unwrap();
        match request {
            SurfaceRequest::FullScreen(_) => log.full_screen_attaches += 1,
            SurfaceRequest::Modal(_) => log.modal_attaches += 1,
        }
        log.next += 1;
        let handle = log.next;
        log.attached.insert(handle);
        Ok(SurfaceHandle(handle))
    }

    async fn detach(&mut self, handle: SurfaceHandle) -> Result<(), SurfaceError> {
        let mut log = self.log.lock().unwrap();
        log.detach_calls += 1;
        log.attached.remove(&handle.0);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeNavigator {
    calls: AtomicUsize,
}

impl FakeNavigator {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Navigator for FakeNavigator {
    async fn go_back(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeNotifier {
    notified: Mutex<Vec<String>>,
}

impl FakeNotifier {
    pub fn notified(&self) -> Vec<String> {
        self.notified.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn notify_limit_reached(&self, app: &MonitoredApp) -> Result<()> {
        self.notified.lock().unwrap().push(app.package_id.clone());
        Ok(())
    }
}

pub struct Harness {
    pub db: Database,
    pub engine: Arc<EnforcementEngine>,
    pub sampler: Arc<UsageSampler>,
    pub statistics: StatisticsAggregator,
    pub usage: Arc<FakeUsage>,
    pub surfaces: Arc<Mutex<SurfaceLog>>,
    pub navigator: Arc<FakeNavigator>,
    pub notifier: Arc<FakeNotifier>,
    _dir: TempDir,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_options(EngineSettings::default(), Surfaces::All).await
    }

    pub async fn without_surfaces() -> Self {
        Self::with_options(EngineSettings::default(), Surfaces::None).await
    }

    pub async fn without_modal() -> Self {
        Self::with_options(EngineSettings::default(), Surfaces::FullScreenOnly).await
    }

    pub async fn with_options(settings: EngineSettings, surfaces: Surfaces) -> Self {
        let (db, dir) = setup_test_database().await;

        let usage = Arc::new(FakeUsage::new());
        let sampler = Arc::new(UsageSampler::new(db.clone(), usage.clone()));
        let statistics = StatisticsAggregator::new(db.clone());
        let accepts = surfaces;
        let surfaces = Arc::new(Mutex::new(SurfaceLog::default()));
        let navigator = Arc::new(FakeNavigator::default());
        let notifier = Arc::new(FakeNotifier::default());

        let engine = Arc::new(EnforcementEngine::new(
            EngineDependencies {
                database: db.clone(),
                sampler: sampler.clone(),
                statistics: statistics.clone(),
                surfaces: SurfaceDispatcher::spawn(FakeSurfaces { log: surfaces.clone(), accepts }),
                navigator: navigator.clone(),
                notifier: notifier.clone(),
                difficulty: Arc::new(SettingsDifficulty::new(db.clone(), Difficulty::Medium)),
            },
            settings,
        ));

        Self { db, engine, sampler, statistics, usage, surfaces, navigator, notifier, _dir: dir }
    }

    /// Adds a monitored app whose measured usage is `usage_minutes`.
    pub async fn monitor(&self, package_id: &str, limit_minutes: u32, usage_minutes: u32) {
        let app = MonitoredApp::new(package_id, package_id, limit_minutes);
        MonitoredAppQueries::create(&self.db, &app).await.unwrap();
        MonitoredAppQueries::update_usage(&self.db, package_id, usage_minutes, None)
            .await
            .unwrap();
        self.usage.set_minutes(package_id, u64::from(usage_minutes));
    }

    pub async fn app(&self, package_id: &str) -> MonitoredApp {
        MonitoredAppQueries::get(&self.db, package_id).await.unwrap()
    }

    pub fn attach_calls(&self) -> usize {
        self.surfaces.lock().unwrap().attach_calls()
    }

    pub fn live_surfaces(&self) -> usize {
        self.surfaces.lock().unwrap().attached.len()
    }
}
