//! Per-destination probing state

use crate::dns::SharedResolver;
use crate::error::{AppError, Result};
use crate::logging::ProbeLogger;
use crate::models::ProbeRecord;
use crate::probe::SharedProber;
use crate::stats::StatisticsSummary;
use crate::types::SessionState;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// One destination's resolved address, probe history and lifecycle.
///
/// The address is resolved on the first probe and never changes after
/// that. A resolution failure moves the session to [`SessionState::Fatal`]
/// for good; later probes return the same error without touching the
/// network.
pub struct TargetSession {
    destination: String,
    port: u16,
    use_ipv6: bool,
    resolved_address: Option<IpAddr>,
    history: Vec<ProbeRecord>,
    state: SessionState,
    fatal_reason: Option<String>,
    resolver: SharedResolver,
    prober: SharedProber,
    logger: ProbeLogger,
    correlation_id: Option<String>,
}

impl TargetSession {
    pub fn new(
        destination: impl Into<String>,
        port: u16,
        use_ipv6: bool,
        resolver: SharedResolver,
        prober: SharedProber,
    ) -> Self {
        Self {
            destination: destination.into(),
            port,
            use_ipv6,
            resolved_address: None,
            history: Vec::new(),
            state: SessionState::Idle,
            fatal_reason: None,
            resolver,
            prober,
            logger: ProbeLogger::quiet(),
            correlation_id: None,
        }
    }

    pub fn with_logger(mut self, logger: ProbeLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn resolved_address(&self) -> Option<IpAddr> {
        self.resolved_address
    }

    pub fn history(&self) -> &[ProbeRecord] {
        &self.history
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Why the destination was given up on, once `Fatal`
    pub fn fatal_reason(&self) -> Option<&str> {
        self.fatal_reason.as_deref()
    }

    pub fn is_live(&self) -> bool {
        self.state.is_live()
    }

    /// Address shown in summaries: the resolved one, or the name as given
    pub fn display_address(&self) -> String {
        self.resolved_address
            .map(|address| address.to_string())
            .unwrap_or_else(|| self.destination.clone())
    }

    /// Take one measurement and append it to the history
    pub async fn probe_once(&mut self) -> Result<ProbeRecord> {
        if self.state == SessionState::Fatal {
            let reason = self.fatal_reason.clone().unwrap_or_else(|| self.destination.clone());
            return Err(AppError::invalid_destination(reason));
        }

        let correlation_id = match &self.correlation_id {
            Some(id) => id.clone(),
            None => {
                let id = self.logger.log_session_start(&self.destination, self.port).await;
                self.correlation_id = Some(id.clone());
                id
            }
        };

        let address = match self.resolved_address {
            Some(address) => address,
            None => self.resolve(&correlation_id).await?,
        };

        self.state = SessionState::Probing;
        match self.prober.probe(SocketAddr::new(address, self.port)).await {
            Ok(record) => {
                self.logger.log_probe(&correlation_id, &record).await;
                self.history.push(record.clone());
                self.state = SessionState::Recorded;
                Ok(record)
            }
            Err(error) => {
                self.state = SessionState::Idle;
                Err(error)
            }
        }
    }

    async fn resolve(&mut self, correlation_id: &str) -> Result<IpAddr> {
        let outcome = self.resolver.resolve(&self.destination, self.use_ipv6).await;
        self.logger.log_resolution(correlation_id, &self.destination, &outcome).await;

        match outcome {
            Ok(address) => {
                self.resolved_address = Some(address);
                Ok(address)
            }
            Err(error) => {
                if let AppError::InvalidDestination(reason) = &error {
                    self.state = SessionState::Fatal;
                    self.fatal_reason = Some(reason.clone());
                }
                Err(error)
            }
        }
    }

    /// Probe repeatedly, `count` times or until cancelled when unbounded.
    ///
    /// `observer` sees every record as soon as it is taken. Between probes
    /// the loop sleeps `delay - elapsed` when the probe succeeded faster than
    /// `delay`. Cancellation interrupts both the sleep and a probe in flight;
    /// an interrupted probe is not recorded.
    pub async fn run<F>(
        &mut self,
        count: Option<u32>,
        delay: Duration,
        cancel: &CancellationToken,
        mut observer: F,
    ) -> Result<usize>
    where
        F: FnMut(&ProbeRecord),
    {
        let mut taken: u32 = 0;

        while count.map_or(true, |limit| taken < limit) {
            if cancel.is_cancelled() {
                break;
            }

            let record = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                outcome = self.probe_once() => outcome?,
            };
            observer(&record);
            self.settle();
            taken += 1;

            if count.map_or(false, |limit| taken >= limit) {
                break;
            }

            if let Some(pause) = pause_after(&record, delay) {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(pause) => {}
                }
            }
        }

        // A probe dropped by cancellation leaves the session mid-flight
        if self.state == SessionState::Probing {
            self.state = SessionState::Idle;
        }

        Ok(taken as usize)
    }

    /// Hand the last record off: `Recorded` goes back to `Idle`
    pub fn settle(&mut self) {
        if self.state == SessionState::Recorded {
            self.state = SessionState::Idle;
        }
    }

    /// Summary over everything recorded so far
    pub fn summary(&self) -> Result<StatisticsSummary> {
        StatisticsSummary::summarize(&self.history, self.display_address(), self.port)
    }
}

/// Remaining part of `delay` after a successful probe, if any
fn pause_after(record: &ProbeRecord, delay: Duration) -> Option<Duration> {
    let elapsed = record.elapsed_seconds();
    let delay_seconds = delay.as_secs_f64();
    if delay_seconds > elapsed && elapsed > 0.0 {
        Some(Duration::from_secs_f64(delay_seconds - elapsed))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::AddressResolver;
    use crate::probe::{ConnectProbe, Prober};
    use crate::types::ProbeMode;
    use async_trait::async_trait;
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Hands out a different address on every lookup
    struct RoundRobinResolver {
        lookups: AtomicUsize,
    }

    #[async_trait]
    impl AddressResolver for RoundRobinResolver {
        async fn resolve(&self, _host: &str, _use_ipv6: bool) -> Result<IpAddr> {
            let n = self.lookups.fetch_add(1, Ordering::SeqCst) as u8;
            Ok(IpAddr::V4(Ipv4Addr::new(10, 0, 0, n + 1)))
        }
    }

    struct FailingResolver;

    #[async_trait]
    impl AddressResolver for FailingResolver {
        async fn resolve(&self, host: &str, _use_ipv6: bool) -> Result<IpAddr> {
            Err(AppError::invalid_destination(host.to_string()))
        }
    }

    struct FixedResolver(IpAddr);

    #[async_trait]
    impl AddressResolver for FixedResolver {
        async fn resolve(&self, _host: &str, _use_ipv6: bool) -> Result<IpAddr> {
            Ok(self.0)
        }
    }

    /// Replays scripted elapsed values and remembers its targets
    struct ScriptedProber {
        script: Mutex<Vec<f64>>,
        targets: Mutex<Vec<SocketAddr>>,
    }

    impl ScriptedProber {
        fn new(script: &[f64]) -> Arc<Self> {
            let mut script = script.to_vec();
            script.reverse();
            Arc::new(Self {
                script: Mutex::new(script),
                targets: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Prober for ScriptedProber {
        async fn probe(&self, target: SocketAddr) -> Result<ProbeRecord> {
            self.targets.lock().unwrap().push(target);
            let elapsed = self.script.lock().unwrap().pop().unwrap_or(0.001);
            Ok(ProbeRecord::from_seconds(elapsed, target.ip().to_string(), target.port()))
        }

        fn mode(&self) -> ProbeMode {
            ProbeMode::Connect
        }
    }

    fn round_robin() -> Arc<RoundRobinResolver> {
        Arc::new(RoundRobinResolver {
            lookups: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_resolved_address_is_cached() {
        let resolver = round_robin();
        let prober = ScriptedProber::new(&[0.01, 0.02]);
        let mut session = TargetSession::new("rr.example", 80, false, resolver.clone(), prober.clone());

        session.probe_once().await.unwrap();
        let first = session.resolved_address();
        session.probe_once().await.unwrap();

        assert_eq!(session.resolved_address(), first);
        assert_eq!(resolver.lookups.load(Ordering::SeqCst), 1);

        let targets = prober.targets.lock().unwrap();
        assert_eq!(targets[0], targets[1]);
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.state(), SessionState::Recorded);

        session.settle();
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_run_returns_to_idle_after_each_record() {
        let prober = ScriptedProber::new(&[0.01, 0.02]);
        let mut session = TargetSession::new("rr.example", 80, false, round_robin(), prober);
        let cancel = CancellationToken::new();
        let mut observed = Vec::new();

        session
            .run(Some(2), Duration::ZERO, &cancel, |record| observed.push(record.elapsed_seconds()))
            .await
            .unwrap();

        assert_eq!(observed, vec![0.01, 0.02]);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_unresolvable_destination_is_fatal() {
        let prober = ScriptedProber::new(&[]);
        let mut session = TargetSession::new("google.csom", 80, false, Arc::new(FailingResolver), prober.clone());

        let err = session.probe_once().await.unwrap_err();
        assert!(matches!(err, AppError::InvalidDestination(_)));
        assert_eq!(session.state(), SessionState::Fatal);
        assert!(session.history().is_empty());

        // Stays fatal without probing again
        let err = session.probe_once().await.unwrap_err();
        assert!(err.to_string().contains("google.csom"));
        assert!(prober.targets.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_closed_port_records_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let prober = Arc::new(ConnectProbe::new(Some(Duration::from_secs(1)), 0));
        let resolver = Arc::new(FixedResolver(IpAddr::V4(Ipv4Addr::LOCALHOST)));
        let mut session = TargetSession::new("localhost", port, false, resolver, prober);

        let record = session.probe_once().await.unwrap();
        assert!(record.is_failed());
        assert_eq!(record.elapsed_seconds(), -1.0);
    }

    #[tokio::test]
    async fn test_run_takes_count_probes_and_observes_each() {
        let prober = ScriptedProber::new(&[0.001, -1.0, 0.002]);
        let mut session = TargetSession::new("h", 80, false, round_robin(), prober);
        let cancel = CancellationToken::new();
        let mut seen = Vec::new();

        let taken = session
            .run(Some(3), Duration::from_millis(1), &cancel, |record| {
                seen.push(record.is_failed())
            })
            .await
            .unwrap();

        assert_eq!(taken, 3);
        assert_eq!(seen, vec![false, true, false]);

        let summary = session.summary().unwrap();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.address, "10.0.0.1");
    }

    #[tokio::test]
    async fn test_unbounded_run_stops_on_cancel() {
        let prober = ScriptedProber::new(&[]);
        let mut session = TargetSession::new("h", 80, false, round_robin(), prober);
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        let mut observed = 0;
        let taken = session
            .run(None, Duration::from_millis(5), &cancel, |_| {
                observed += 1;
                if observed == 5 {
                    canceller.cancel();
                }
            })
            .await
            .unwrap();

        assert_eq!(taken, 5);
        assert_eq!(session.history().len(), 5);
    }

    #[tokio::test]
    async fn test_run_propagates_fatal_error() {
        let prober = ScriptedProber::new(&[]);
        let mut session = TargetSession::new("nowhere", 80, false, Arc::new(FailingResolver), prober);
        let cancel = CancellationToken::new();

        let err = session.run(Some(4), Duration::ZERO, &cancel, |_| {}).await.unwrap_err();
        assert!(err.is_target_fatal());
    }

    #[test]
    fn test_pause_after() {
        let delay = Duration::from_millis(500);
        let fast = ProbeRecord::from_seconds(0.1, "h", 1);
        let pause = pause_after(&fast, delay).unwrap();
        assert!((pause.as_secs_f64() - 0.4).abs() < 1e-9);

        assert!(pause_after(&ProbeRecord::failed("h", 1), delay).is_none());
        assert!(pause_after(&ProbeRecord::from_seconds(0.7, "h", 1), delay).is_none());
        assert!(pause_after(&ProbeRecord::from_seconds(0.0, "h", 1), delay).is_none());
    }

    #[test]
    fn test_summary_requires_records() {
        let session = TargetSession::new("h", 80, false, round_robin(), ScriptedProber::new(&[]));
        assert!(matches!(session.summary(), Err(AppError::EmptyInput(_))));
        assert_eq!(session.display_address(), "h");
    }

    /// Succeeds a fixed number of times, then loses its socket
    struct ExhaustingProber {
        remaining: AtomicUsize,
    }

    #[async_trait]
    impl Prober for ExhaustingProber {
        async fn probe(&self, target: SocketAddr) -> Result<ProbeRecord> {
            if self.remaining.fetch_sub(1, Ordering::SeqCst) == 0 {
                return Err(AppError::raw_socket("Too many open files"));
            }
            Ok(ProbeRecord::from_seconds(0.01, target.ip().to_string(), target.port()))
        }

        fn mode(&self) -> ProbeMode {
            ProbeMode::Raw
        }
    }

    #[tokio::test]
    async fn test_socket_error_keeps_recorded_history() {
        let prober = Arc::new(ExhaustingProber {
            remaining: AtomicUsize::new(2),
        });
        let resolver = Arc::new(FixedResolver(IpAddr::V4(Ipv4Addr::LOCALHOST)));
        let mut session = TargetSession::new("localhost", 80, false, resolver, prober);
        let cancel = CancellationToken::new();

        let err = session.run(Some(5), Duration::ZERO, &cancel, |_| {}).await.unwrap_err();

        assert_eq!(err.category(), "RAW");
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.summary().unwrap().successful, 2);
    }
}
