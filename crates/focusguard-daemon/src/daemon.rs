use anyhow::{Context, Result};
use chrono::{Local, Utc};
use focusguard_db::{Database, DatabaseConfig};
use focusguard_proto::{OBJECT_PATH, SERVICE_NAME};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};
use zbus::{Connection, ConnectionBuilder};

use crate::challenge::SettingsDifficulty;
use crate::config::DaemonConfig;
use crate::dbus_impl::{DbusSurfaceProvider, FocusGuardService};
use crate::enforcement::{EngineDependencies, EngineSettings, EnforcementEngine};
use crate::focus_source::FocusSource;
use crate::foreground_watcher::{run_watcher, ForegroundWatcher};
use crate::navigation::CompositorNavigator;
use crate::notification_manager::NotificationManager;
use crate::session_recorder::{record_session, SessionRecorder, SharedRecorder};
use crate::statistics::{refresh_daily_totals, StatisticsAggregator};
use crate::surface::SurfaceDispatcher;
use crate::usage_sampler::UsageSampler;
use crate::usage_source::{SessionLogUsage, UsageQuery};

pub async fn initialize_database(config: &DaemonConfig) -> Result<Database> {
    info!("Initializing database");

    let path = config.database_path();
    if let Some(parent) = std::path::Path::new(&path).parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create database directory: {:?}", parent))?;
    }

    let database = Database::new(DatabaseConfig { path })
        .await
        .context("Failed to connect to database")?;

    database.run_migrations().await.context("Failed to run migrations")?;
    let version = database.verify_migrations().await.context("Failed to read schema version")?;

    info!("Database initialized successfully (schema version {})", version);
    Ok(database)
}

async fn connect_bus() -> zbus::Result<Connection> {
    ConnectionBuilder::session()?.name(SERVICE_NAME)?.build().await
}

pub async fn run() -> Result<()> {
    info!("Initializing daemon");

    let config = DaemonConfig::load()?;
    let database = initialize_database(&config).await?;

    let focus_source =
        FocusSource::detect(Duration::from_millis(config.watcher.poll_interval_ms));

    let recorder = SessionRecorder::shared();
    let usage: Arc<dyn UsageQuery> = Arc::new(SessionLogUsage::new(
        database.clone(),
        Arc::clone(&recorder),
        focus_source.availability(),
    ));
    let sampler = Arc::new(UsageSampler::new(database.clone(), Arc::clone(&usage)));
    let statistics = StatisticsAggregator::new(database.clone());

    if let Err(e) = statistics.ensure_today().await {
        warn!("Failed to prepare today's statistics: {}", e);
    }

    let connection = match connect_bus().await {
        Ok(connection) => Some(connection),
        Err(e) => {
            warn!("D-Bus unavailable, limits will only be announced by notification: {}", e);
            None
        }
    };

    let engine = Arc::new(EnforcementEngine::new(
        EngineDependencies {
            database: database.clone(),
            sampler: Arc::clone(&sampler),
            statistics: statistics.clone(),
            surfaces: SurfaceDispatcher::spawn(DbusSurfaceProvider::new(connection.clone())),
            navigator: Arc::new(CompositorNavigator::new(
                focus_source.compositor(),
                config.enforcement.dry_run,
            )),
            notifier: Arc::new(NotificationManager::new()),
            difficulty: Arc::new(SettingsDifficulty::new(
                database.clone(),
                config.challenge.default_difficulty,
            )),
        },
        EngineSettings::from(&config.challenge),
    ));

    if let Some(connection) = &connection {
        let service =
            FocusGuardService::new(Arc::clone(&engine), database.clone(), statistics.clone());
        connection
            .object_server()
            .at(OBJECT_PATH, service)
            .await
            .context("Failed to register D-Bus service")?;
        info!("DBus service registered at {}", SERVICE_NAME);
    }

    let (event_sender, event_receiver) = mpsc::channel(64);
    let source_task = tokio::spawn(focus_source.run(event_sender));
    let watcher_task = tokio::spawn(run_watcher(
        ForegroundWatcher::from_config(&config.watcher),
        event_receiver,
        Arc::clone(&recorder),
        database.clone(),
        Arc::clone(&engine),
    ));
    let sampler_task = spawn_sampler(
        Arc::clone(&sampler),
        statistics.clone(),
        database.clone(),
        usage,
        Duration::from_secs(config.sampler.interval_secs),
    );

    info!("Daemon running, waiting for shutdown signal...");
    wait_for_shutdown().await?;

    sampler_task.abort();
    source_task.abort();
    if let Err(e) = watcher_task.await {
        debug!("Watcher task ended abnormally: {}", e);
    }

    flush_open_session(&recorder, &database).await;
    engine.shutdown().await;
    database.close().await;

    info!("Daemon shutdown complete");
    Ok(())
}

fn spawn_sampler(
    sampler: Arc<UsageSampler>,
    statistics: StatisticsAggregator,
    database: Database,
    usage: Arc<dyn UsageQuery>,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval_timer = interval(period);

        loop {
            interval_timer.tick().await;

            match sampler.refresh().await {
                Ok(Some(report)) => debug!("Usage refreshed: {:?}", report),
                Ok(None) => {}
                Err(e) => warn!("Usage sampling failed, keeping existing counters: {}", e),
            }

            refresh_daily_totals(&statistics, &database, usage.as_ref(), Local::now()).await;
        }
    })
}

async fn flush_open_session(recorder: &SharedRecorder, database: &Database) {
    let closed = recorder.write().await.flush(Utc::now());
    if let Some(session) = closed {
        record_session(database, &session).await;
    }
}

async fn wait_for_shutdown() -> Result<()> {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
        let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down gracefully...");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down gracefully...");
            }
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down gracefully...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await?;
        info!("Received Ctrl+C, shutting down gracefully...");
    }

    Ok(())
}
