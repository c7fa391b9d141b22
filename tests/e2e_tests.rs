//! End-to-end tests through the public library API
//!
//! Real resolver, real connect probes and real schedulers against
//! loopback listeners. Tests that need outside DNS or raw-socket
//! privileges are ignored by default.

use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;
use tcping::{
    dns::{AddressResolver, DnsAddressResolver, SharedResolver},
    executor::parse_destinations,
    models::Config,
    probe::{build_prober, ConnectProbe, Prober, SharedProber},
    logging::ProbeLogger,
    ProbeMode, SessionState, TargetSession, WatchdogScheduler,
};
use tokio_util::sync::CancellationToken;

fn resolver() -> SharedResolver {
    Arc::new(DnsAddressResolver::from_system())
}

fn connect_prober(timeout: Duration) -> SharedProber {
    Arc::new(ConnectProbe::new(Some(timeout), 0))
}

fn open_port() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

#[tokio::test]
async fn test_single_target_run_against_listener() {
    let (_listener, port) = open_port();
    let mut session = TargetSession::new("127.0.0.1", port, false, resolver(), connect_prober(Duration::from_secs(2)));

    let mut lines = Vec::new();
    let cancel = CancellationToken::new();
    let taken = session
        .run(Some(3), Duration::ZERO, &cancel, |record| lines.push(record.info_line()))
        .await
        .unwrap();

    assert_eq!(taken, 3);
    assert_eq!(lines.len(), 3);
    assert!(lines.iter().all(|line| line.contains("; Time: ")));

    let summary = session.summary().unwrap();
    assert_eq!(summary.total, 3);
    assert_eq!(summary.successful, 3);
    assert_eq!(summary.loss_percentage, 0.0);
    assert!(summary.min_ms >= 0.0 && summary.min_ms <= summary.average_ms);
    assert!(summary.average_ms <= summary.max_ms);
}

#[tokio::test]
async fn test_refused_probes_are_data_not_errors() {
    let port = closed_port();
    let mut session = TargetSession::new("127.0.0.1", port, false, resolver(), connect_prober(Duration::from_secs(1)));

    let cancel = CancellationToken::new();
    session.run(Some(2), Duration::ZERO, &cancel, |_| {}).await.unwrap();

    assert_eq!(session.state(), SessionState::Idle);
    let summary = session.summary().unwrap();
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.loss_percentage, 100.0);
    assert_eq!((summary.min_ms, summary.max_ms, summary.average_ms), (0.0, 0.0, 0.0));
}

#[tokio::test]
async fn test_unbounded_run_stops_on_cancel() {
    let (_listener, port) = open_port();
    let mut session = TargetSession::new("127.0.0.1", port, false, resolver(), connect_prober(Duration::from_secs(1)));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        trigger.cancel();
    });

    let taken = tokio::time::timeout(
        Duration::from_secs(5),
        session.run(None, Duration::from_millis(50), &cancel, |_| {}),
    )
    .await
    .expect("run did not observe cancellation")
    .unwrap();

    assert!(taken >= 1);
    assert_eq!(session.history().len(), taken);
}

#[tokio::test]
async fn test_watchdog_rounds_over_mixed_targets() {
    let (_listener, open) = open_port();
    let closed = closed_port();
    let raw = [
        format!("127.0.0.1:{}", open),
        format!("127.0.0.1:{}", closed),
        "[::1]:80".to_string(),
    ];
    let destinations = parse_destinations(&raw).unwrap();

    let config = Config {
        timeout_seconds: 1.0,
        delay_seconds: 0.0,
        max_workers: 2,
        ..Default::default()
    };
    let prober = build_prober(&config).unwrap();
    let mut scheduler =
        WatchdogScheduler::from_destinations(&destinations, &config, resolver(), prober, ProbeLogger::quiet())
            .unwrap();

    let mut rounds = Vec::new();
    let cancel = CancellationToken::new();
    let summaries = scheduler
        .run(Some(3), &cancel, |report| rounds.push(report.clone()))
        .await
        .unwrap();

    assert_eq!(rounds.len(), 3);
    assert_eq!(rounds[0].fatal.len(), 1);
    assert_eq!(rounds[0].rows.len(), 2);
    assert!(rounds[1].fatal.is_empty());
    assert_eq!(rounds[1].rows.len(), 2);

    // A failed probe pins the round minimum at -1
    assert_eq!(rounds[2].min_seconds, -1.0);
    assert!(rounds[2].max_seconds >= 0.0);

    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].successful, 3);
    assert_eq!(summaries[1].failed, 3);
    assert!(!scheduler.all_fatal());
    assert_eq!(scheduler.sessions()[2].state(), SessionState::Fatal);
}

#[tokio::test]
async fn test_watchdog_unbounded_keeps_partial_results_on_cancel() {
    let (_listener, port) = open_port();
    let destinations = parse_destinations(&[format!("127.0.0.1:{}", port)]).unwrap();
    let config = Config {
        timeout_seconds: 1.0,
        delay_seconds: 0.05,
        ..Default::default()
    };
    let mut scheduler = WatchdogScheduler::from_destinations(
        &destinations,
        &config,
        resolver(),
        connect_prober(Duration::from_secs(1)),
        ProbeLogger::quiet(),
    )
    .unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        trigger.cancel();
    });

    let summaries = tokio::time::timeout(Duration::from_secs(5), scheduler.run(None, &cancel, |_| {}))
        .await
        .expect("watchdog did not observe cancellation")
        .unwrap();

    assert_eq!(summaries.len(), 1);
    assert!(summaries[0].total >= 1);
    assert_eq!(summaries[0].total as u64, scheduler.rounds_completed());
    assert!(scheduler.last_round().is_some());
}

#[tokio::test]
async fn test_build_prober_follows_mode() {
    let config = Config::default();
    assert_eq!(build_prober(&config).unwrap().mode(), ProbeMode::Connect);
}

#[tokio::test]
#[ignore = "requires outside DNS"]
async fn test_resolve_public_name() {
    let resolver = DnsAddressResolver::from_system();
    let address = resolver.resolve("example.com", false).await.unwrap();
    assert!(address.is_ipv4());
}

#[tokio::test]
#[ignore = "requires CAP_NET_RAW"]
async fn test_raw_probe_against_listener() {
    let (_listener, port) = open_port();
    let config = Config {
        mode: ProbeMode::Raw,
        timeout_seconds: 1.0,
        ..Default::default()
    };
    let prober = build_prober(&config).unwrap();
    let record = prober
        .probe(format!("127.0.0.1:{}", port).parse().unwrap())
        .await
        .unwrap();
    assert!(!record.is_failed());
}
