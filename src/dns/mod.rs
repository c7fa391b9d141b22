//! Destination name resolution
//!
//! A target is resolved once; the session caches the address it gets back.
//! Every failure here is an [`AppError::InvalidDestination`], which ends the
//! target's session.

use crate::error::{AppError, Result};
use async_trait::async_trait;
use std::net::IpAddr;
use std::sync::Arc;
use trust_dns_resolver::{
    config::{ResolverConfig, ResolverOpts},
    system_conf, TokioAsyncResolver,
};

/// Forward lookup of a destination to a single numeric address
#[async_trait]
pub trait AddressResolver: Send + Sync {
    /// Resolve `host` to one address of the requested family
    async fn resolve(&self, host: &str, use_ipv6: bool) -> Result<IpAddr>;
}

/// Shared handle used by sessions
pub type SharedResolver = Arc<dyn AddressResolver>;

/// Resolver backed by the system DNS configuration
pub struct DnsAddressResolver {
    resolver: TokioAsyncResolver,
}

impl DnsAddressResolver {
    /// Build from the system resolver configuration, falling back to the
    /// library defaults when it cannot be read
    pub fn from_system() -> Self {
        let (config, mut opts) = system_conf::read_system_conf()
            .unwrap_or_else(|_| (ResolverConfig::default(), ResolverOpts::default()));
        opts.timeout = crate::defaults::DNS_LOOKUP_TIMEOUT;
        opts.attempts = 1;

        Self {
            resolver: TokioAsyncResolver::tokio(config, opts),
        }
    }

    /// Build with an explicit configuration
    pub fn with_config(config: ResolverConfig, opts: ResolverOpts) -> Self {
        Self {
            resolver: TokioAsyncResolver::tokio(config, opts),
        }
    }
}

#[async_trait]
impl AddressResolver for DnsAddressResolver {
    async fn resolve(&self, host: &str, use_ipv6: bool) -> Result<IpAddr> {
        if let Some(literal) = literal_address(host, use_ipv6) {
            return literal;
        }

        let name = host.trim();
        if name.is_empty() {
            return Err(AppError::invalid_destination("empty host name"));
        }

        let address = if use_ipv6 {
            let lookup = self
                .resolver
                .ipv6_lookup(name)
                .await
                .map_err(|e| AppError::invalid_destination(format!("{}: {}", name, e)))?;
            lookup.iter().next().map(|record| IpAddr::V6(record.0))
        } else {
            let lookup = self
                .resolver
                .ipv4_lookup(name)
                .await
                .map_err(|e| AppError::invalid_destination(format!("{}: {}", name, e)))?;
            lookup.iter().next().map(|record| IpAddr::V4(record.0))
        };

        address.ok_or_else(|| {
            AppError::invalid_destination(format!(
                "{}: no {} records",
                name,
                if use_ipv6 { "AAAA" } else { "A" }
            ))
        })
    }
}

/// Short-circuit numeric destinations.
///
/// Returns `None` when `host` is not an address literal and needs a lookup.
pub fn literal_address(host: &str, use_ipv6: bool) -> Option<Result<IpAddr>> {
    let trimmed = host.trim();
    let unbracketed = trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(trimmed);

    let address: IpAddr = unbracketed.parse().ok()?;
    let family_matches = address.is_ipv6() == use_ipv6;

    Some(if family_matches {
        Ok(address)
    } else {
        Err(AppError::invalid_destination(format!(
            "{} is not an {} address",
            host,
            if use_ipv6 { "IPv6" } else { "IPv4" }
        )))
    })
}
