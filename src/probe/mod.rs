//! Handshake probes
//!
//! A probe takes one latency measurement against an already-resolved
//! socket address. Refused, reset and timed-out handshakes come back as
//! failed [`ProbeRecord`]s; only environment problems (a raw socket that
//! cannot be opened) are errors.

pub mod connect;
pub mod raw;
pub mod timing;

pub use connect::ConnectProbe;
pub use raw::RawSynProbe;
pub use timing::{timed, timed_blocking, Stopwatch, Timed};

use crate::error::Result;
use crate::models::{Config, ProbeRecord};
use crate::types::ProbeMode;
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;

/// Trait for handshake measurement strategies
#[async_trait]
pub trait Prober: Send + Sync {
    /// Measure one handshake against `target`
    async fn probe(&self, target: SocketAddr) -> Result<ProbeRecord>;

    /// Strategy this prober implements
    fn mode(&self) -> ProbeMode;
}

/// Shared handle used by sessions
pub type SharedProber = Arc<dyn Prober>;

/// Build the prober selected by the configuration.
///
/// Raw mode opens a throwaway channel first so that a missing privilege is
/// reported before any target is probed.
pub fn build_prober(config: &Config) -> Result<SharedProber> {
    match config.mode {
        ProbeMode::Connect => Ok(Arc::new(ConnectProbe::new(
            config.timeout(),
            config.payload_size,
        ))),
        ProbeMode::Raw => {
            RawSynProbe::check_privileges()?;
            Ok(Arc::new(RawSynProbe::new(config.timeout())))
        }
    }
}
