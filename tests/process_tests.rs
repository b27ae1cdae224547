// Process listing strategies, CPU attribution, filtering/sorting and the poller

mod common;

use std::path::Path;
use std::time::{Duration, Instant};

use common::{FakeProcessTable, raw_process};
use vitals::error::MonitorError;
use vitals::models::ProcessEntry;
use vitals::process_repo::{
    CpuTimeTracker, FullProcessProvider, PollerSettings, ProcessAccess, ProcessPoller,
    ProcessProvider, RestrictedProcessProvider, SortKey, SortOrder, TermSignal, filter_processes,
    sort_processes,
};

fn entry(pid: u32, name: &str, cpu: f64, memory: u64) -> ProcessEntry {
    ProcessEntry {
        pid,
        name: name.to_string(),
        bundle_identifier: None,
        cpu_usage: cpu,
        memory_bytes: memory,
        user: "alice".into(),
        is_active: true,
        icon: None,
    }
}

#[test]
fn tracker_reports_cpu_share_since_previous_poll() {
    let mut tracker = CpuTimeTracker::new();
    let t0 = Instant::now();
    let first = tracker.update(
        [(1, Duration::from_millis(1000)), (2, Duration::from_millis(0))],
        t0,
    );
    assert_eq!(first.get(&1), Some(&0.0));
    assert_eq!(first.get(&2), Some(&0.0));

    let second = tracker.update(
        [
            (1, Duration::from_millis(1500)),
            (2, Duration::from_millis(2500)),
            (3, Duration::from_millis(9000)),
        ],
        t0 + Duration::from_secs(1),
    );
    assert!((second[&1] - 50.0).abs() < 1e-9);
    assert!((second[&2] - 250.0).abs() < 1e-9);
    assert_eq!(second[&3], 0.0);
    assert_eq!(tracker.tracked(), 3);
}

#[test]
fn tracker_forgets_exited_pids() {
    let mut tracker = CpuTimeTracker::new();
    let t0 = Instant::now();
    tracker.update([(1, Duration::from_secs(1)), (2, Duration::from_secs(1))], t0);
    tracker.update([(2, Duration::from_secs(2))], t0 + Duration::from_secs(1));
    assert_eq!(tracker.tracked(), 1);
    let usage = tracker.update([(1, Duration::from_secs(5))], t0 + Duration::from_secs(2));
    assert_eq!(usage[&1], 0.0);
}

#[test]
fn filter_matches_name_case_insensitively_or_pid() {
    let entries = vec![
        entry(123, "firefox", 0.0, 0),
        entry(456, "Terminal", 0.0, 0),
        entry(789, "sshd", 0.0, 0),
    ];
    let names = |v: Vec<ProcessEntry>| v.into_iter().map(|e| e.name).collect::<Vec<_>>();
    assert_eq!(names(filter_processes(&entries, "FIRE")), vec!["firefox"]);
    assert_eq!(names(filter_processes(&entries, "term")), vec!["Terminal"]);
    assert_eq!(names(filter_processes(&entries, "78")), vec!["sshd"]);
    assert_eq!(filter_processes(&entries, "").len(), 3);
    assert!(filter_processes(&entries, "nothing").is_empty());
}

#[test]
fn sort_by_each_key() {
    let mut entries = vec![
        entry(3, "beta", 10.0, 300),
        entry(1, "Alpha", 50.0, 100),
        entry(2, "gamma", 30.0, 200),
    ];
    let pids = |v: &[ProcessEntry]| v.iter().map(|e| e.pid).collect::<Vec<_>>();

    sort_processes(&mut entries, SortKey::default(), SortOrder::default());
    assert_eq!(pids(&entries), vec![1, 2, 3]);

    sort_processes(&mut entries, SortKey::Memory, SortOrder::Ascending);
    assert_eq!(pids(&entries), vec![1, 2, 3]);

    sort_processes(&mut entries, SortKey::Name, SortOrder::Ascending);
    assert_eq!(pids(&entries), vec![1, 3, 2]);

    sort_processes(&mut entries, SortKey::Pid, SortOrder::Descending);
    assert_eq!(pids(&entries), vec![3, 2, 1]);
}

#[test]
fn sort_ties_break_on_pid() {
    let mut entries = vec![
        entry(9, "a", 5.0, 0),
        entry(4, "b", 5.0, 0),
        entry(6, "c", 5.0, 0),
    ];
    sort_processes(&mut entries, SortKey::Cpu, SortOrder::Ascending);
    assert_eq!(
        entries.iter().map(|e| e.pid).collect::<Vec<_>>(),
        vec![4, 6, 9]
    );
}

#[test]
fn full_provider_lists_every_process() {
    let table = FakeProcessTable::new(
        vec![
            raw_process(1, "systemd", 100, 0, None),
            raw_process(200, "firefox", 100, 1000, Some("org.mozilla.firefox")),
        ],
        Some(1000),
    );
    let provider = FullProcessProvider::new(table.clone());
    assert_eq!(provider.access(), ProcessAccess::Full);

    let first = provider.list_processes();
    assert_eq!(first.len(), 2);
    assert!(first.iter().all(|e| e.cpu_usage == 0.0));
    let firefox = first.iter().find(|e| e.pid == 200).unwrap();
    assert_eq!(firefox.bundle_identifier.as_deref(), Some("org.mozilla.firefox"));
    assert_eq!(firefox.icon.as_deref(), Some("org.mozilla.firefox"));
    assert_eq!(firefox.user, "user1000");
    assert_eq!(firefox.memory_bytes, 200 * 1024);

    std::thread::sleep(Duration::from_millis(5));
    table.set_rows(vec![raw_process(200, "firefox", 600, 1000, Some("org.mozilla.firefox"))]);
    let second = provider.list_processes();
    assert_eq!(second.len(), 1);
    assert!(second[0].cpu_usage > 0.0);
}

#[test]
fn full_provider_signals_through_table() {
    let table = FakeProcessTable::new(vec![raw_process(42, "worker", 0, 1000, None)], None);
    let provider = FullProcessProvider::new(table.clone());
    assert!(provider.terminate(42));
    assert!(provider.force_terminate(42));
    assert!(!provider.terminate(7));
    assert_eq!(
        table.signals(),
        vec![(42, TermSignal::Terminate), (42, TermSignal::Kill)]
    );
}

fn mixed_table() -> FakeProcessTable {
    FakeProcessTable::new(
        vec![
            raw_process(10, "gnome-terminal", 0, 1000, Some("org.gnome.Terminal")),
            raw_process(11, "bash", 0, 1000, None),
            raw_process(12, "gdm", 0, 0, Some("org.gnome.Shell")),
        ],
        Some(1000),
    )
}

#[test]
fn restricted_provider_lists_own_applications_only() {
    let provider = RestrictedProcessProvider::new(mixed_table());
    assert_eq!(provider.access(), ProcessAccess::Restricted);
    let pids: Vec<_> = provider.list_processes().iter().map(|e| e.pid).collect();
    assert_eq!(pids, vec![10]);
}

#[test]
fn restricted_provider_terminates_visible_pids_only() {
    let table = mixed_table();
    let provider = RestrictedProcessProvider::new(table.clone());
    assert!(!provider.terminate(10));

    provider.list_processes();
    assert!(provider.terminate(10));
    assert!(!provider.terminate(11));
    assert!(!provider.force_terminate(12));
    assert_eq!(table.signals(), vec![(10, TermSignal::Terminate)]);
}

#[test]
fn restricted_provider_without_owner_is_empty() {
    let table = mixed_table();
    let provider = RestrictedProcessProvider::new(FakeProcessTable {
        uid: None,
        ..table
    });
    assert!(provider.list_processes().is_empty());
}

#[test]
fn access_detected_from_environment() {
    assert_eq!(
        ProcessAccess::from_environment(false, false, false, Some(Path::new("/home/alice"))),
        ProcessAccess::Full
    );
    assert_eq!(
        ProcessAccess::from_environment(true, false, false, None),
        ProcessAccess::Restricted
    );
    assert_eq!(
        ProcessAccess::from_environment(false, true, false, None),
        ProcessAccess::Restricted
    );
    assert_eq!(
        ProcessAccess::from_environment(false, false, true, None),
        ProcessAccess::Restricted
    );
    assert_eq!(
        ProcessAccess::from_environment(
            false,
            false,
            false,
            Some(Path::new("/Users/alice/Library/Containers/com.example.vitals/Data"))
        ),
        ProcessAccess::Restricted
    );
}

fn poller_over(table: &FakeProcessTable) -> ProcessPoller {
    ProcessPoller::new(
        Box::new(FullProcessProvider::new(table.clone())),
        PollerSettings {
            poll_interval: Duration::from_secs(60),
            selected_history_capacity: 3,
        },
    )
    .unwrap()
}

#[test]
fn poller_rejects_zero_settings() {
    let table = mixed_table();
    let err = ProcessPoller::new(
        Box::new(FullProcessProvider::new(table.clone())),
        PollerSettings {
            poll_interval: Duration::ZERO,
            ..PollerSettings::default()
        },
    )
    .err();
    assert!(matches!(
        err,
        Some(MonitorError::InvalidSetting {
            name: "poll_interval"
        })
    ));
    let err = ProcessPoller::new(
        Box::new(FullProcessProvider::new(table)),
        PollerSettings {
            selected_history_capacity: 0,
            ..PollerSettings::default()
        },
    )
    .err();
    assert!(err.is_some());
}

#[tokio::test]
async fn poller_tracks_selected_process_history() {
    let table = mixed_table();
    let poller = poller_over(&table);

    let listed = poller.refresh_now().await;
    assert_eq!(listed.len(), 3);
    assert_eq!(poller.processes().len(), 3);
    assert!(poller.selected_history().is_empty());

    poller.select(Some(10));
    assert_eq!(poller.selected_process().map(|e| e.name), Some("gnome-terminal".into()));
    for _ in 0..4 {
        poller.refresh_now().await;
    }
    let history = poller.selected_history();
    assert_eq!(history.len(), 3);
    assert!(history.iter().all(|s| s.memory_bytes == 10 * 1024));

    poller.select(Some(11));
    poller.refresh_now().await;
    assert_eq!(poller.selected_history().len(), 1);
    assert_eq!(poller.selected_history()[0].memory_bytes, 11 * 1024);
}

#[tokio::test]
async fn poller_clears_selection_when_process_exits() {
    let table = mixed_table();
    let poller = poller_over(&table);
    poller.select(Some(12));
    poller.refresh_now().await;
    assert_eq!(poller.selected_history().len(), 1);

    table.set_rows(vec![raw_process(10, "gnome-terminal", 0, 1000, None)]);
    poller.refresh_now().await;
    assert_eq!(poller.selected_pid(), None);
    assert!(poller.selected_history().is_empty());
    assert!(!poller.terminate_selected());
}

#[tokio::test]
async fn poller_terminates_selected_process() {
    let table = mixed_table();
    let poller = poller_over(&table);
    assert!(!poller.terminate_selected());
    poller.select(Some(11));
    assert!(poller.terminate_selected());
    assert!(poller.force_terminate_selected());
    assert_eq!(
        table.signals(),
        vec![(11, TermSignal::Terminate), (11, TermSignal::Kill)]
    );
    assert_eq!(poller.provider().access(), ProcessAccess::Full);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn poller_loop_publishes_until_shutdown() {
    let table = mixed_table();
    let poller = ProcessPoller::new(
        Box::new(FullProcessProvider::new(table.clone())),
        PollerSettings {
            poll_interval: Duration::from_millis(20),
            selected_history_capacity: 10,
        },
    )
    .unwrap();
    let mut rx = poller.subscribe();
    poller.start();
    poller.start();
    tokio::time::timeout(Duration::from_secs(2), rx.changed())
        .await
        .expect("first poll published")
        .unwrap();
    assert_eq!(rx.borrow().len(), 3);
    poller.shutdown().await;
    assert!(!poller.is_running());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn poller_shutdown_does_not_wait_out_a_long_interval() {
    let poller = poller_over(&mixed_table());
    let mut rx = poller.subscribe();
    poller.start();
    tokio::time::timeout(Duration::from_secs(2), rx.changed())
        .await
        .expect("first poll published")
        .unwrap();

    tokio::time::timeout(Duration::from_secs(1), poller.shutdown())
        .await
        .expect("shutdown interrupts the sleep");
    assert!(!poller.is_running());
}
