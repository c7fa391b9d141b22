//! Multi-target round scheduling

use super::session::TargetSession;
use crate::dns::SharedResolver;
use crate::error::{AppError, Result};
use crate::logging::ProbeLogger;
use crate::models::{Config, ProbeRecord};
use crate::probe::SharedProber;
use crate::stats::StatisticsSummary;
use futures::future::join_all;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// One destination's record within a round
#[derive(Debug, Clone, Serialize)]
pub struct RoundRow {
    pub destination: String,
    pub record: ProbeRecord,
}

/// Everything one round produced, in configuration order
#[derive(Debug, Clone, Serialize)]
pub struct RoundReport {
    /// 1-based round number
    pub round: u64,
    pub rows: Vec<RoundRow>,
    /// Destinations that failed to resolve during this round, with the reason
    pub fatal: Vec<(String, String)>,
    /// Largest elapsed seconds in the round, never below 0
    pub max_seconds: f64,
    /// Smallest elapsed seconds in the round; `-1` if any probe failed,
    /// infinite if the round has no records
    pub min_seconds: f64,
}

impl RoundReport {
    fn new(round: u64, rows: Vec<RoundRow>, fatal: Vec<(String, String)>) -> Self {
        let (max_seconds, min_seconds) = round_envelope(rows.iter().map(|row| &row.record));
        Self {
            round,
            rows,
            fatal,
            max_seconds,
            min_seconds,
        }
    }

    /// How long to wait before the next round.
    ///
    /// Only when the slowest probe beat `delay` and no probe failed.
    pub fn pause_before_next(&self, delay: Duration) -> Option<Duration> {
        let delay_seconds = delay.as_secs_f64();
        if self.max_seconds < delay_seconds && self.min_seconds > 0.0 {
            Some(Duration::from_secs_f64(delay_seconds - self.max_seconds))
        } else {
            None
        }
    }
}

/// Max starting at 0 and min starting at +inf over the round's records
pub fn round_envelope<'a>(records: impl IntoIterator<Item = &'a ProbeRecord>) -> (f64, f64) {
    records
        .into_iter()
        .fold((0.0f64, f64::INFINITY), |(max, min), record| {
            let elapsed = record.elapsed_seconds();
            (max.max(elapsed), min.min(elapsed))
        })
}

/// Drives a set of sessions through synchronized rounds
pub struct WatchdogScheduler {
    sessions: Vec<TargetSession>,
    delay: Duration,
    max_workers: usize,
    logger: ProbeLogger,
    rounds_completed: u64,
    last_round: Option<RoundReport>,
}

impl WatchdogScheduler {
    pub fn new(sessions: Vec<TargetSession>, delay: Duration, max_workers: usize) -> Self {
        Self {
            sessions,
            delay,
            max_workers: max_workers.max(1),
            logger: ProbeLogger::quiet(),
            rounds_completed: 0,
            last_round: None,
        }
    }

    /// Build one session per parsed destination
    pub fn from_destinations(
        destinations: &[(String, String)],
        config: &Config,
        resolver: SharedResolver,
        prober: SharedProber,
        logger: ProbeLogger,
    ) -> Result<Self> {
        let mut sessions = Vec::with_capacity(destinations.len());
        for (host, port) in destinations {
            let port: u16 = port
                .parse()
                .map_err(|_| AppError::invalid_port_specification(format!("{}:{}", host, port)))?;
            sessions.push(
                TargetSession::new(host.clone(), port, config.use_ipv6, resolver.clone(), prober.clone())
                    .with_logger(logger.clone()),
            );
        }

        Ok(Self::new(sessions, config.delay(), config.max_workers).with_logger(logger))
    }

    pub fn with_logger(mut self, logger: ProbeLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn sessions(&self) -> &[TargetSession] {
        &self.sessions
    }

    pub fn rounds_completed(&self) -> u64 {
        self.rounds_completed
    }

    pub fn last_round(&self) -> Option<&RoundReport> {
        self.last_round.as_ref()
    }

    pub fn has_live_sessions(&self) -> bool {
        self.sessions.iter().any(TargetSession::is_live)
    }

    /// True when there were targets and every one of them failed to resolve
    pub fn all_fatal(&self) -> bool {
        !self.sessions.is_empty() && !self.has_live_sessions()
    }

    /// Probe every live session once, at most `max_workers` at a time.
    ///
    /// A failure that is not scoped to one target still lets the other
    /// probes of the round finish; their records are kept and the partial
    /// round becomes [`last_round`](Self::last_round) before the error is
    /// returned. A partial round does not count as completed.
    pub async fn run_round(&mut self) -> Result<RoundReport> {
        let semaphore = Semaphore::new(self.max_workers);
        let semaphore = &semaphore;

        let tasks = self
            .sessions
            .iter_mut()
            .filter(|session| session.is_live())
            .map(|session| async move {
                let outcome = match semaphore.acquire().await {
                    Ok(_permit) => session.probe_once().await,
                    Err(e) => Err(AppError::internal(format!("Worker pool closed: {}", e))),
                };
                (session.destination().to_string(), outcome)
            });

        let outcomes = join_all(tasks).await;
        self.sessions.iter_mut().for_each(TargetSession::settle);

        let mut rows = Vec::with_capacity(outcomes.len());
        let mut fatal = Vec::new();
        let mut failure = None;
        for (destination, outcome) in outcomes {
            match outcome {
                Ok(record) => rows.push(RoundRow { destination, record }),
                Err(error) if error.is_target_fatal() => fatal.push((destination, error.to_string())),
                Err(error) => {
                    failure.get_or_insert(error);
                }
            }
        }

        let report = RoundReport::new(self.rounds_completed + 1, rows, fatal);
        if let Some(error) = failure {
            self.last_round = Some(report);
            return Err(error);
        }

        self.rounds_completed += 1;
        Ok(report)
    }

    /// Run rounds until `rounds` are done, every target is fatal, or `cancel` fires.
    ///
    /// A round in progress always completes; cancellation is observed
    /// between rounds and cuts the inter-round sleep short. Returns the
    /// summaries of every target that recorded at least one probe.
    ///
    /// On an error that is not scoped to one target the loop stops and the
    /// error is returned. Everything recorded up to that point stays
    /// available through [`summaries`](Self::summaries).
    pub async fn run<F>(
        &mut self,
        rounds: Option<u32>,
        cancel: &CancellationToken,
        mut observer: F,
    ) -> Result<Vec<StatisticsSummary>>
    where
        F: FnMut(&RoundReport),
    {
        let mut completed: u32 = 0;

        while rounds.map_or(true, |limit| completed < limit) {
            if cancel.is_cancelled() || !self.has_live_sessions() {
                break;
            }

            let report = self.run_round().await?;
            observer(&report);
            completed += 1;

            let pause = report.pause_before_next(self.delay);
            self.logger
                .log_round(
                    report.round,
                    report.rows.len(),
                    report.max_seconds,
                    report.min_seconds,
                    pause.map_or(0.0, |p| p.as_secs_f64() * 1000.0),
                )
                .await;
            self.last_round = Some(report);

            if rounds.map_or(false, |limit| completed >= limit) {
                break;
            }

            if let Some(pause) = pause {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(pause) => {}
                }
            }
        }

        Ok(self.summaries())
    }

    /// Summaries for targets with history, in configuration order
    pub fn summaries(&self) -> Vec<StatisticsSummary> {
        self.sessions
            .iter()
            .filter_map(|session| session.summary().ok())
            .collect()
    }
}

/// Split `host` / `host:port` destinations, defaulting the port to 80.
///
/// Bare IPv6 literals must be bracketed (`[::1]:443`); the brackets are
/// dropped from the returned host.
pub fn parse_destinations<S: AsRef<str>>(destinations: &[S]) -> Result<Vec<(String, String)>> {
    destinations
        .iter()
        .map(|destination| parse_destination(destination.as_ref()))
        .collect()
}

fn parse_destination(destination: &str) -> Result<(String, String)> {
    let input = destination.trim();
    let invalid = || AppError::invalid_port_specification(destination.to_string());

    let (host, port) = if let Some(rest) = input.strip_prefix('[') {
        let (host, after) = rest.split_once(']').ok_or_else(invalid)?;
        match after {
            "" => (host, None),
            _ => (host, Some(after.strip_prefix(':').ok_or_else(invalid)?)),
        }
    } else {
        match input.matches(':').count() {
            0 => (input, None),
            1 => {
                let (host, port) = input.split_once(':').ok_or_else(invalid)?;
                (host, Some(port))
            }
            _ => return Err(invalid()),
        }
    };

    if host.is_empty() {
        return Err(invalid());
    }

    let port = match port {
        None => crate::defaults::DEFAULT_PORT_STR.to_string(),
        Some(port) => {
            let number: u16 = port.parse().map_err(|_| invalid())?;
            if number == 0 {
                return Err(invalid());
            }
            number.to_string()
        }
    };

    Ok((host.to_string(), port))
}
