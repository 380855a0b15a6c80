mod common;

use chrono::{DateTime, Duration, Local, Utc};
use common::Harness;
use focusguard_daemon::enforcement::EngineState;
use focusguard_daemon::foreground_watcher::{run_watcher, ForegroundWatcher, WindowEvent};
use focusguard_daemon::session_recorder::SessionRecorder;
use focusguard_daemon::statistics::{estimate_time_saved, refresh_daily_totals};
use focusguard_db::queries::{MonitoredAppQueries, SessionLogQueries};
use tokio::sync::mpsc;

fn event(package: Option<&str>, at: DateTime<Utc>) -> WindowEvent {
    WindowEvent { package: package.map(String::from), timestamp: at }
}

#[tokio::test]
async fn test_noisy_window_events_block_once_and_record_sessions() {
    let h = Harness::new().await;
    h.monitor("Focus", 30, 45).await;

    let recorder = SessionRecorder::shared();
    let (sender, receiver) = mpsc::channel(16);
    let task = tokio::spawn(run_watcher(
        ForegroundWatcher::new("focusguard", &["waybar".to_string()]),
        receiver,
        recorder.clone(),
        h.db.clone(),
        h.engine.clone(),
    ));

    let start = Utc::now() - Duration::minutes(10);
    let events = [
        event(Some("Focus"), start),
        event(Some("Focus"), start + Duration::seconds(1)),
        event(Some("focusguard"), start + Duration::seconds(2)),
        event(Some("Focus"), start + Duration::seconds(3)),
        event(None, start + Duration::seconds(60)),
        event(Some("Focus"), start + Duration::seconds(90)),
        event(Some("Focus"), start + Duration::seconds(91)),
    ];
    for e in events {
        sender.send(e).await.unwrap();
    }
    drop(sender);
    task.await.unwrap();

    assert_eq!(h.attach_calls(), 1);
    assert!(matches!(h.engine.state().await, EngineState::Blocking { .. }));

    let logs = SessionLogQueries::list_for_package(&h.db, "Focus").await.unwrap();
    let focusguard_logs = SessionLogQueries::list_for_package(&h.db, "focusguard").await.unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(focusguard_logs.len(), 1);
    assert_eq!(logs.iter().map(|l| l.duration_ms).sum::<i64>(), 59_000);

    let open = recorder.read().await.open_session().map(|(p, _)| p.to_string());
    assert_eq!(open, Some("Focus".to_string()));
}

#[tokio::test]
async fn test_daily_totals_are_pushed_into_statistics() {
    let h = Harness::new().await;
    h.monitor("Focus", 30, 50).await;
    h.monitor("Games", 20, 10).await;
    h.usage.set_total_minutes(140);

    let apps = MonitoredAppQueries::list_enabled(&h.db).await.unwrap();
    assert_eq!(estimate_time_saved(&apps), 10);

    refresh_daily_totals(&h.statistics, &h.db, h.usage.as_ref(), Local::now()).await;
    refresh_daily_totals(&h.statistics, &h.db, h.usage.as_ref(), Local::now()).await;

    let stats = h.statistics.today_statistics().await.unwrap();
    assert_eq!(stats.total_screen_time_minutes, 140);
    assert_eq!(stats.time_saved_minutes, 10);
    assert_eq!(stats.problems_solved, 0);
}

#[tokio::test]
async fn test_statistics_counters_and_reset() {
    let h = Harness::new().await;

    h.statistics.increment_breaks_taken().await.unwrap();
    h.statistics.increment_breaks_taken().await.unwrap();
    h.statistics.increment_problems_solved().await.unwrap();
    h.statistics.set_screen_time(90).await.unwrap();
    h.statistics.set_screen_time(90).await.unwrap();

    let stats = h.statistics.today_statistics().await.unwrap();
    assert_eq!(stats.breaks_taken, 2);
    assert_eq!(stats.problems_solved, 1);
    assert_eq!(stats.total_screen_time_minutes, 90);

    let recent = h.statistics.recent(7).await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].date, Local::now().date_naive());

    h.statistics.reset_today().await.unwrap();
    let stats = h.statistics.today_statistics().await.unwrap();
    assert_eq!(stats.breaks_taken, 0);
    assert_eq!(stats.total_screen_time_minutes, 0);
}
