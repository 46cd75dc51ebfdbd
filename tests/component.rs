// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

use flowmeta::{
    AppError, CacheConfig, Component, Config, Interface, MetricsRegistry, MetricsSnapshot,
    MockPoller, PollError, PollReply, PollRequest, Poller, SnapshotRecord,
    normalize_sampler_name, save_snapshot,
};
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};
use tokio::sync::{Mutex, mpsc};

const MINUTE: Duration = Duration::from_secs(60);

fn ip(addr: &str) -> IpAddr {
    addr.parse().unwrap()
}

fn gi(if_index: u32) -> (String, Interface) {
    ("127_0_0_1".to_string(), MockPoller::describe(if_index))
}

async fn start<P: Poller>(config: Config, metrics: &MetricsRegistry, poller: P) -> Component<P> {
    let component = Component::new(config, metrics.clone(), poller).unwrap();
    component.start().await.unwrap();
    component
}

/// Lets workers and the sweeper catch up
async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

async fn advance_minutes(minutes: u32) {
    for _ in 0..minutes {
        tokio::time::advance(MINUTE).await;
        settle().await;
    }
}

fn expect_miss<P: Poller>(component: &Component<P>, sampler: &str, if_index: u32) {
    match component.lookup(ip(sampler), if_index) {
        Err(AppError::CacheMiss) => {}
        other => panic!("expected cache miss for {sampler}/{if_index}, got {other:?}"),
    }
}

#[tokio::test]
async fn lookup_misses_then_hits() {
    let metrics = MetricsRegistry::new();
    let component = start(Config::default(), &metrics, MockPoller::new()).await;

    expect_miss(&component, "127.0.0.1", 765);
    settle().await;
    assert_eq!(component.lookup(ip("127.0.0.1"), 765).unwrap(), gi(765));

    component.stop().await.unwrap();
}

#[tokio::test]
async fn communities_gate_resolution() {
    let mut config = Config::default();
    config.poller.default_community = "notpublic".to_string();
    config
        .poller
        .communities
        .insert(ip("127.0.0.1"), "public".to_string());
    config
        .poller
        .communities
        .insert(ip("127.0.0.2"), "private".to_string());
    let metrics = MetricsRegistry::new();
    let component = start(config, &metrics, MockPoller::new()).await;

    // "public" is accepted
    expect_miss(&component, "127.0.0.1", 765);
    settle().await;
    assert_eq!(component.lookup(ip("127.0.0.1"), 765).unwrap(), gi(765));

    // "private" never resolves
    expect_miss(&component, "127.0.0.2", 765);
    settle().await;
    expect_miss(&component, "127.0.0.2", 765);

    // neither does the default community
    expect_miss(&component, "127.0.0.3", 765);
    settle().await;
    expect_miss(&component, "127.0.0.3", 765);

    component.stop().await.unwrap();
    assert!(metrics.poll_failures(&ip("127.0.0.2"), "timeout") >= 1);
    assert!(metrics.poll_failures(&ip("127.0.0.3"), "timeout") >= 1);
    assert_eq!(metrics.snapshot().samplers, 1);
}

#[tokio::test]
async fn cache_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.cache.persist_file = Some(dir.path().join("cache"));

    let metrics = MetricsRegistry::new();
    let component = start(config.clone(), &metrics, MockPoller::new()).await;
    expect_miss(&component, "127.0.0.1", 765);
    settle().await;
    assert_eq!(component.lookup(ip("127.0.0.1"), 765).unwrap(), gi(765));
    component.stop().await.unwrap();

    let metrics = MetricsRegistry::new();
    let component = start(config, &metrics, MockPoller::new()).await;
    assert_eq!(component.lookup(ip("127.0.0.1"), 765).unwrap(), gi(765));
    component.stop().await.unwrap();

    assert_eq!(component.poller().polls(), 0);
    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.miss, 0);
    assert_eq!(snapshot.hit, 1);
    assert_eq!(snapshot.size, 1);
}

#[tokio::test]
async fn unreadable_snapshot_starts_cold() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache");
    std::fs::write(&path, "{ definitely not a snapshot").unwrap();
    let mut config = Config::default();
    config.cache.persist_file = Some(path.clone());

    let metrics = MetricsRegistry::new();
    let component = start(config, &metrics, MockPoller::new()).await;
    expect_miss(&component, "127.0.0.1", 765);
    settle().await;
    component.stop().await.unwrap();

    // The broken file was replaced by a valid snapshot on stop
    let restored = flowmeta::load_snapshot(&path).await.unwrap().unwrap();
    assert_eq!(restored.len(), 1);
}

#[tokio::test]
async fn snapshot_failure_does_not_fail_stop() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.cache.persist_file = Some(dir.path().join("missing-dir").join("cache"));

    let metrics = MetricsRegistry::new();
    let component = start(config, &metrics, MockPoller::new()).await;
    expect_miss(&component, "127.0.0.1", 765);
    settle().await;

    assert!(component.stop().await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn entries_are_refreshed_before_expiring() {
    let metrics = MetricsRegistry::new();
    let component = start(Config::default(), &metrics, MockPoller::new()).await;

    expect_miss(&component, "127.0.0.1", 765);
    settle().await;
    assert_eq!(component.lookup(ip("127.0.0.1"), 765).unwrap(), gi(765));

    advance_minutes(25).await;
    let _ = component.lookup(ip("127.0.0.1"), 765);
    advance_minutes(25).await;
    let _ = component.lookup(ip("127.0.0.1"), 765);

    // Past the refresh horizon: refreshed in background and still served
    advance_minutes(25).await;
    settle().await;
    assert_eq!(component.lookup(ip("127.0.0.1"), 765).unwrap(), gi(765));

    component.stop().await.unwrap();

    assert_eq!(
        metrics.snapshot(),
        MetricsSnapshot {
            hit: 4,
            miss: 1,
            expired: 0,
            size: 1,
            samplers: 1,
            refresh_runs: 37, // 75/2
            refresh: 1,
            coalesced_count: 0,
            busy_count: 0,
        }
    );
    assert_eq!(component.poller().polls(), 2);
}

#[tokio::test(start_paused = true)]
async fn entries_expire_without_refresh() {
    let mut config = Config::default();
    config.cache = CacheConfig {
        duration: MINUTE * 10,
        refresh: Duration::ZERO,
        check_interval: MINUTE * 2,
        persist_file: None,
    };
    let metrics = MetricsRegistry::new();
    let component = start(config, &metrics, MockPoller::new()).await;

    expect_miss(&component, "127.0.0.1", 765);
    settle().await;
    assert!(component.lookup(ip("127.0.0.1"), 765).is_ok());

    advance_minutes(12).await;
    component.stop().await.unwrap();

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.expired, 1);
    assert_eq!(snapshot.refresh, 0);
    assert_eq!(snapshot.size, 0);
    assert_eq!(snapshot.samplers, 0);
}

#[tokio::test(start_paused = true)]
async fn restored_stale_entry_is_refreshed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache");
    save_snapshot(
        &path,
        &[SnapshotRecord {
            sampler: ip("127.0.0.1"),
            if_index: 765,
            sampler_name: normalize_sampler_name(&ip("127.0.0.1")),
            interface: MockPoller::describe(765),
            last_updated: SystemTime::now() - MINUTE * 61,
        }],
    )
    .await
    .unwrap();

    let mut config = Config::default();
    config.cache.persist_file = Some(path);
    let metrics = MetricsRegistry::new();
    let component = start(config, &metrics, MockPoller::new()).await;

    assert_eq!(component.lookup(ip("127.0.0.1"), 765).unwrap(), gi(765));
    advance_minutes(2).await;
    component.stop().await.unwrap();

    assert_eq!(component.poller().polls(), 1);
    assert_eq!(metrics.snapshot().refresh, 1);
}

#[test]
fn invalid_refresh_schedule_is_rejected() {
    let check = |duration: u32, refresh: u32, interval: u32| {
        let mut config = Config::default();
        config.cache.duration = MINUTE * duration;
        config.cache.refresh = MINUTE * refresh;
        config.cache.check_interval = MINUTE * interval;
        Component::new(config, MetricsRegistry::new(), MockPoller::new())
    };

    assert!(matches!(check(10, 5, 1), Err(AppError::Config(_))));
    assert!(matches!(check(10, 15, 12), Err(AppError::Config(_))));
    assert!(check(10, 0, 2).is_ok());
}

#[tokio::test]
async fn start_stop_with_multiple_workers() {
    let mut config = Config::default();
    config.poller.workers = 5;
    let metrics = MetricsRegistry::new();
    let component = start(config, &metrics, MockPoller::new()).await;

    component.stop().await.unwrap();
}

#[tokio::test]
async fn stop_without_start() {
    let component =
        Component::new(Config::default(), MetricsRegistry::new(), MockPoller::new()).unwrap();
    component.stop().await.unwrap();
}

/// Holds every poll until the test lets it through
struct GatedPoller {
    accept: Mutex<mpsc::Receiver<()>>,
    accepted: std::sync::Mutex<Vec<Vec<u32>>>,
}

impl Poller for GatedPoller {
    async fn poll(&self, request: &PollRequest) -> Result<PollReply, PollError> {
        if self.accept.lock().await.recv().await.is_none() {
            return Err(PollError::Timeout);
        }
        self.accepted
            .lock()
            .unwrap()
            .push(request.if_indexes.clone());
        Ok(PollReply {
            sampler_name: normalize_sampler_name(&request.sampler),
            interfaces: request
                .if_indexes
                .iter()
                .map(|&if_index| (if_index, MockPoller::describe(if_index)))
                .collect(),
        })
    }
}

#[tokio::test]
async fn concurrent_misses_are_coalesced() {
    let (accept_tx, accept_rx) = mpsc::channel(1);
    let poller = GatedPoller {
        accept: Mutex::new(accept_rx),
        accepted: std::sync::Mutex::new(Vec::new()),
    };
    let metrics = MetricsRegistry::new();
    let component = start(Config::default(), &metrics, poller).await;

    expect_miss(&component, "127.0.0.1", 765);
    settle().await;
    // The worker is now blocked on 765, queue more requests
    for if_index in 766..=769 {
        expect_miss(&component, "127.0.0.1", if_index);
    }
    accept_tx.send(()).await.unwrap();
    settle().await;

    assert_eq!(metrics.snapshot().coalesced_count, 4);

    accept_tx.send(()).await.unwrap();
    settle().await;
    assert_eq!(
        *component.poller().accepted.lock().unwrap(),
        vec![vec![765], vec![766, 767, 768, 769]]
    );
    for if_index in 765..=769 {
        assert_eq!(component.lookup(ip("127.0.0.1"), if_index).unwrap(), gi(if_index));
    }

    component.stop().await.unwrap();
}

#[tokio::test]
async fn stop_interrupts_blocked_poll() {
    let (_accept_tx, accept_rx) = mpsc::channel(1);
    let poller = GatedPoller {
        accept: Mutex::new(accept_rx),
        accepted: std::sync::Mutex::new(Vec::new()),
    };
    let metrics = MetricsRegistry::new();
    let component = start(Config::default(), &metrics, poller).await;

    expect_miss(&component, "127.0.0.1", 765);
    settle().await;

    tokio::time::timeout(Duration::from_secs(1), component.stop())
        .await
        .unwrap()
        .unwrap();
    assert!(component.poller().accepted.lock().unwrap().is_empty());
    assert_eq!(metrics.snapshot().size, 0);
}

/// Takes 50ms per poll and remembers how many polls overlapped
#[derive(Default)]
struct SlowPoller {
    active: AtomicUsize,
    peak: AtomicUsize,
    inner: MockPoller,
}

impl Poller for SlowPoller {
    async fn poll(&self, request: &PollRequest) -> Result<PollReply, PollError> {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.inner.poll(request).await
    }
}

#[tokio::test(start_paused = true)]
async fn many_workers_keep_one_poll_per_sampler() {
    let mut config = Config::default();
    config.poller.workers = 4;
    let metrics = MetricsRegistry::new();
    let component = start(config, &metrics, SlowPoller::default()).await;

    for if_index in [765, 766, 767] {
        expect_miss(&component, "127.0.0.1", if_index);
        settle().await;
    }
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(component.poller().peak.load(Ordering::SeqCst), 1);
    assert_eq!(component.poller().inner.polls(), 2);
    for if_index in [765, 766, 767] {
        assert_eq!(component.lookup(ip("127.0.0.1"), if_index).unwrap(), gi(if_index));
    }

    component.stop().await.unwrap();
}
