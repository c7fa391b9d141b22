//! Probe execution engine
//!
//! This module contains:
//! - Target sessions: per-destination address cache, history and probe loop
//! - The watchdog scheduler: synchronized rounds over many sessions with a
//!   bounded worker pool and cancellation between rounds
//! - Destination parsing for `host:port` arguments

pub mod session;
pub mod watchdog;

pub use session::TargetSession;
pub use watchdog::{parse_destinations, round_envelope, RoundReport, RoundRow, WatchdogScheduler};

use tokio_util::sync::CancellationToken;

/// Cancel `token` on the first Ctrl-C
pub fn cancel_on_interrupt(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    })
}
