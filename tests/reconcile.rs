//! Reconcile loop behavior against fake collaborators.

use std::sync::atomic::Ordering;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rack_external::reconcile::{Cadence, FetchError, Intervals, RackExternalService};
use rack_external::services::{rack_services, ReconcileOutcome, TimeWriter};
use rack_external::Shutdown;

mod common;

use common::{connection_set, Calls, Failure, Harness};

fn applied(outcome: Option<&ReconcileOutcome>) -> bool {
    matches!(outcome, Some(ReconcileOutcome::Applied))
}

fn unchanged(outcome: Option<&ReconcileOutcome>) -> bool {
    matches!(outcome, Some(ReconcileOutcome::Unchanged))
}

#[tokio::test]
async fn fresh_agent_without_connections_applies_everything_once() {
    let harness = Harness::new();
    let mut service = harness.service();

    let report = service.tick().await;

    assert!(report.skipped.is_none());
    assert!(applied(report.outcome("NTP")));
    assert!(applied(report.outcome("DNS")));
    assert!(applied(report.outcome("proxy")));
    assert_eq!(report.cadence, Cadence::Fast);
    assert_eq!(service.interval(), Duration::from_secs(5));

    // Proxy disabled: turned off, nothing written.
    assert!(harness.calls.with_prefix("proxy.write").is_empty());
    assert_eq!(
        harness.calls.with_prefix("supervisor.off"),
        vec!["supervisor.off proxy_rack (not enabled)"]
    );
    assert_eq!(harness.calls.with_prefix("supervisor.restart"), vec!["supervisor.restart ntp_rack"]);
    assert_eq!(harness.calls.with_prefix("dns.reload").len(), 1);
}

#[tokio::test]
async fn second_identical_tick_is_a_no_op() {
    let harness = Harness::new();
    let mut service = harness.service();

    service.tick().await;
    harness.calls.clear();

    let report = service.tick().await;
    assert!(unchanged(report.outcome("NTP")));
    assert!(unchanged(report.outcome("DNS")));
    assert!(unchanged(report.outcome("proxy")));
    assert!(harness.calls.all().is_empty());
}

#[tokio::test]
async fn two_regions_feed_dns_and_proxy_and_slow_down() {
    let harness = Harness::new();
    let mut service = harness.service();
    service.tick().await;
    harness.calls.clear();

    harness.region.update(|state| {
        state.connections = connection_set(&[
            ("region-a:0", "10.0.0.5:5250"),
            ("region-b:0", "10.0.0.9:5250"),
        ]);
        state.proxy.enabled = true;
        state.proxy.port = 8000;
    });

    let report = service.tick().await;

    assert!(unchanged(report.outcome("NTP")));
    assert!(applied(report.outcome("DNS")));
    assert!(applied(report.outcome("proxy")));
    assert_eq!(report.cadence, Cadence::Slow);
    assert_eq!(service.interval(), Duration::from_secs(30));

    assert_eq!(
        harness.calls.with_prefix("dns.options"),
        vec![r#"dns.options ["10.0.0.5", "10.0.0.9"] dnssec=no"#]
    );
    assert_eq!(
        harness.calls.with_prefix("proxy.write"),
        vec![r#"proxy.write [] ["http://10.0.0.5:8000", "http://10.0.0.9:8000"] v4=false port=8000"#]
    );
    assert_eq!(harness.calls.with_prefix("supervisor.on"), vec!["supervisor.on proxy_rack"]);
    assert_eq!(harness.calls.with_prefix("supervisor.reload"), vec!["supervisor.reload proxy_rack"]);
}

#[tokio::test]
async fn adding_a_trusted_network_reapplies_dns_only() {
    let harness = Harness::new();
    let mut service = harness.service();
    service.tick().await;
    harness.calls.clear();

    harness.region.update(|state| state.dns.trusted_networks.push("10.10.0.0/16".into()));
    let report = service.tick().await;

    assert!(unchanged(report.outcome("NTP")));
    assert!(applied(report.outcome("DNS")));
    assert!(unchanged(report.outcome("proxy")));
    assert_eq!(
        harness.calls.with_prefix("dns.configuration"),
        vec![r#"dns.configuration [] ["10.10.0.0/16", "192.168.1.0/24"]"#]
    );
}

#[tokio::test]
async fn reordered_connections_do_not_reconfigure() {
    let harness = Harness::new();
    harness.region.update(|state| {
        state.connections = connection_set(&[
            ("region-a:0", "10.0.0.7:5250"),
            ("region-a:1", "10.0.0.5:5250"),
        ]);
    });
    let mut service = harness.service();
    service.tick().await;
    harness.calls.clear();

    // Same region, new instance with a higher address, plus a label swap.
    harness.region.update(|state| {
        state.connections = connection_set(&[
            ("region-a:1", "10.0.0.7:5250"),
            ("region-a:0", "10.0.0.5:5250"),
            ("region-a:2", "10.0.0.8:5250"),
        ]);
    });
    let report = service.tick().await;

    assert!(unchanged(report.outcome("DNS")));
    assert!(unchanged(report.outcome("proxy")));
}

#[tokio::test]
async fn proxy_failure_does_not_block_other_services() {
    let harness = Harness::new();
    harness.region.update(|state| {
        state.proxy.enabled = true;
        state.connections = connection_set(&[("region-a:0", "10.0.0.5:5250")]);
    });
    harness.proxy_writer.fail.store(true, Ordering::SeqCst);
    let mut service = harness.service();

    let report = service.tick().await;
    assert!(applied(report.outcome("NTP")));
    assert!(applied(report.outcome("DNS")));
    assert!(matches!(report.outcome("proxy"), Some(ReconcileOutcome::Failed(_))));
    assert_eq!(report.cadence, Cadence::Slow);

    // NTP and DNS stored their state; the proxy retries the same target.
    harness.proxy_writer.fail.store(false, Ordering::SeqCst);
    harness.calls.clear();
    let report = service.tick().await;
    assert!(unchanged(report.outcome("NTP")));
    assert!(unchanged(report.outcome("DNS")));
    assert!(applied(report.outcome("proxy")));
    assert_eq!(harness.calls.with_prefix("proxy.write").len(), 1);
}

#[tokio::test]
async fn fetch_failures_skip_services_and_go_fast() {
    for failure in [Failure::UnknownNode, Failure::NoConnections, Failure::Unexpected] {
        let harness = Harness::new();
        harness.region.update(|state| {
            state.connections = connection_set(&[("region-a:0", "10.0.0.5:5250")]);
        });
        let mut service = harness.service();

        let report = service.tick().await;
        assert_eq!(report.cadence, Cadence::Slow);
        harness.calls.clear();

        harness.region.update(|state| state.failure = Some(failure));
        let report = service.tick().await;

        assert!(report.outcomes.is_empty());
        assert_eq!(report.cadence, Cadence::Fast);
        assert_eq!(service.interval(), Duration::from_secs(5));
        assert!(harness.calls.all().is_empty(), "{:?} must not touch services", failure);

        match (failure, report.skipped) {
            (Failure::UnknownNode, Some(FetchError::UnknownNode)) => {}
            (Failure::NoConnections, Some(FetchError::NoConnections)) => {}
            (Failure::Unexpected, Some(FetchError::Other(_))) => {}
            (failure, skipped) => panic!("{:?} classified as {:?}", failure, skipped),
        }

        // Last applied state survived: recovery with the same data is a no-op.
        harness.region.update(|state| state.failure = None);
        let report = service.tick().await;
        assert!(unchanged(report.outcome("NTP")));
        assert!(unchanged(report.outcome("DNS")));
        assert!(unchanged(report.outcome("proxy")));
    }
}

#[tokio::test]
async fn region_role_marks_proxy_managed_elsewhere() {
    let harness = Harness::new();
    harness.region.update(|state| {
        state.controller.is_region = true;
        state.proxy.enabled = true;
    });
    let mut service = harness.service();

    let report = service.tick().await;

    assert!(applied(report.outcome("NTP")));
    assert!(applied(report.outcome("DNS")));
    assert!(applied(report.outcome("proxy")));
    assert_eq!(
        harness.calls.all(),
        vec!["supervisor.any proxy_rack (managed by region)"]
    );
}

#[tokio::test]
async fn run_stops_after_shutdown() {
    let harness = Harness::new();
    let service = harness.service_with_intervals(Intervals {
        fast: Duration::from_millis(20),
        slow: Duration::from_millis(20),
    });
    let shutdown = Shutdown::new();

    let handle = tokio::spawn(service.run(shutdown.subscribe()));

    // First tick runs immediately, then one per interval.
    tokio::time::sleep(Duration::from_millis(200)).await;
    shutdown.trigger();
    handle.await.unwrap();

    let calls_after_stop = harness.region.calls.load(Ordering::SeqCst);
    assert!(calls_after_stop >= 8, "expected at least two ticks, saw {} calls", calls_after_stop);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(harness.region.calls.load(Ordering::SeqCst), calls_after_stop);
}

/// Time writer that holds its blocking thread until released.
struct HeldTimeWriter {
    calls: Calls,
    release: Mutex<mpsc::Receiver<()>>,
}

impl TimeWriter for HeldTimeWriter {
    fn configure(&self, _references: &[String], _peers: &[String]) -> std::io::Result<()> {
        self.calls.push("ntp.configure started");
        let _ = self.release.lock().unwrap().recv_timeout(Duration::from_secs(10));
        self.calls.push("ntp.configure finished");
        Ok(())
    }
}

#[tokio::test]
async fn services_in_one_tick_run_concurrently() {
    let harness = Harness::new();
    let (release, held) = mpsc::channel();
    let time_writer = Arc::new(HeldTimeWriter {
        calls: harness.calls.clone(),
        release: Mutex::new(held),
    });
    let services = rack_services(
        time_writer,
        harness.dns_writer.clone(),
        harness.proxy_writer.clone(),
        harness.supervisor.clone(),
    );
    let mut service = RackExternalService::new(
        "abc123",
        harness.region.clone(),
        harness.region.clone(),
        services,
        Intervals::default(),
    );

    let tick = tokio::spawn(async move { service.tick().await });

    // DNS and proxy finish while NTP is still held.
    let calls = harness.calls.clone();
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let done = !calls.with_prefix("dns.reload").is_empty()
                && !calls.with_prefix("supervisor.ensure proxy_rack").is_empty();
            if done {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("DNS and proxy waited for NTP");

    assert_eq!(harness.calls.with_prefix("ntp.configure"), vec!["ntp.configure started"]);
    assert!(harness.calls.with_prefix("supervisor.restart ntp_rack").is_empty());

    release.send(()).unwrap();
    let report = tick.await.unwrap();
    assert!(applied(report.outcome("NTP")));
    assert!(applied(report.outcome("DNS")));
    assert!(applied(report.outcome("proxy")));
    assert_eq!(harness.calls.with_prefix("supervisor.restart"), vec!["supervisor.restart ntp_rack"]);
}
