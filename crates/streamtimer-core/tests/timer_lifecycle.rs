//! End-to-end accumulator tests.
//!
//! These tests drive the public registry/handle surface the way the web and
//! CLI adapters do: enqueue rewards, flip lifecycle states, kill and revive
//! tenants, and verify what lands on disk.

use chrono::Utc;
use streamtimer_core::storage::EmergencyLog;
use streamtimer_core::{TenantStore, TimerConfig, TimerEvent, TimerRegistry};
use tempfile::TempDir;

fn stream_config() -> TimerConfig {
    let now = Utc::now();
    TimerConfig {
        start_time: now,
        initial_start_time: now,
        min_duration_seconds: 600,
        max_duration_seconds: 0,
        seconds_per_sub_tier1: 60,
        seconds_per_sub_tier2: 120,
        seconds_per_bits: 60,
        min_bits_to_trigger: 100,
        ..TimerConfig::default()
    }
}

#[tokio::test]
async fn rewards_extend_the_deadline() {
    let tmp = TempDir::new().unwrap();
    let registry = TimerRegistry::with_data_dir(tmp.path().to_path_buf());
    let timer = registry.timer("streamer1").unwrap();
    timer.update_config(stream_config()).unwrap();
    timer.flush().await.unwrap();

    let before = timer.remaining_time();

    timer.enqueue_sub("SubViewer", "1000", false, 1); // +60
    timer.enqueue_sub("GiftTarget", "2000", true, 2); // +240
    timer.enqueue_bits("Cheerer", 200, 1); // +120
    timer.add_manual_time(500, "raid bonus"); // +500
    timer.flush().await.unwrap();

    let snap = timer.snapshot();
    assert_eq!(snap.state.total_added_seconds, 920);
    assert_eq!(snap.state.event_log.len(), 4);
    assert!(timer.remaining_time() >= before);
    assert!(timer.is_running());
}

#[tokio::test]
async fn state_survives_tenant_disposal_and_revival() {
    let tmp = TempDir::new().unwrap();
    let registry = TimerRegistry::with_data_dir(tmp.path().to_path_buf());

    {
        let timer = registry.timer("streamer1").unwrap();
        timer.update_config(stream_config()).unwrap();
        timer.enqueue_sub("Viewer", "3000", false, 1);
        registry.remove("streamer1").await;
    }

    let revived = registry.timer("streamer1").unwrap();
    let snap = revived.snapshot();
    assert_eq!(snap.state.total_added_seconds, 180);
    assert_eq!(snap.state.event_log.len(), 1);
    assert_eq!(snap.config.seconds_per_sub_tier1, 60);
}

#[tokio::test]
async fn pause_resume_keeps_the_countdown_honest() {
    let tmp = TempDir::new().unwrap();
    let registry = TimerRegistry::with_data_dir(tmp.path().to_path_buf());
    let timer = registry.timer("streamer1").unwrap();
    timer.update_config(stream_config()).unwrap();

    timer.pause().unwrap();
    timer.flush().await.unwrap();
    let frozen = timer.remaining_time();

    tokio::time::sleep(std::time::Duration::from_millis(1200)).await;
    assert_eq!(timer.remaining_time(), frozen);

    timer.start().unwrap();
    timer.flush().await.unwrap();
    let snap = timer.snapshot();
    assert!(snap.state.total_paused_seconds >= 1);
    // The resumed projection differs from the frozen one only by jitter.
    let resumed = timer.remaining_time();
    assert!((frozen.num_seconds() - resumed.num_seconds()).abs() <= 2);
}

#[tokio::test]
async fn stranded_events_recover_once_despite_duplicate_lines() {
    let tmp = TempDir::new().unwrap();

    // Simulate a tenant whose events missed the queue in a previous run:
    // the same sub event was appended twice (replay duplication).
    let store = TenantStore::new(tmp.path(), "streamer1").unwrap();
    store.save_config(&stream_config()).unwrap();
    let emergency = EmergencyLog::new(store.emergency_path());
    let stranded = TimerEvent::Sub {
        message_id: "sub-streamer1-777".into(),
        user_display: "Viewer".into(),
        tier: "1000".into(),
        count: 1,
    };
    emergency.append(&stranded).unwrap();
    emergency.append(&stranded).unwrap();

    let registry = TimerRegistry::with_data_dir(tmp.path().to_path_buf());
    let timer = registry.timer("streamer1").unwrap();
    timer.flush().await.unwrap();

    let snap = timer.snapshot();
    assert_eq!(snap.state.total_added_seconds, 60);
    assert_eq!(snap.state.event_log.len(), 1);
    assert!(!store.emergency_path().exists());
}

#[tokio::test]
async fn concurrent_producers_all_land() {
    let tmp = TempDir::new().unwrap();
    let registry = TimerRegistry::with_data_dir(tmp.path().to_path_buf());
    let timer = registry.timer("streamer1").unwrap();
    timer.update_config(stream_config()).unwrap();

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let handle = timer.clone();
        tasks.push(tokio::spawn(async move {
            for _ in 0..25 {
                handle.add_manual_time(10, "burst");
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }
    timer.flush().await.unwrap();

    let snap = timer.snapshot();
    assert_eq!(snap.state.total_added_seconds, 8 * 25 * 10);
    assert_eq!(snap.state.event_log.len(), 8 * 25);
}

#[tokio::test]
async fn persisted_documents_match_the_live_snapshot() {
    let tmp = TempDir::new().unwrap();
    let registry = TimerRegistry::with_data_dir(tmp.path().to_path_buf());
    let timer = registry.timer("streamer1").unwrap();
    timer.update_config(stream_config()).unwrap();
    timer.enqueue_bits("Cheerer", 150, 1); // one full block -> +60
    timer.flush().await.unwrap();

    let store = TenantStore::new(tmp.path(), "streamer1").unwrap();
    assert_eq!(store.load_state().unwrap(), timer.snapshot().state);
    assert_eq!(store.load_config().unwrap(), timer.snapshot().config);
}
