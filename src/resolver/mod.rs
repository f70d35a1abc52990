// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! DNS boundary of the report.
//!
//! [`DnsLookup`] is the seam to the operating system's resolver: forward lookups, NS lookups, and
//! CNAME lookups. [`SystemResolver`] implements it on top of `hickory-resolver` using the local
//! system configuration. On top of this seam, [`resolve_hostname`] and [`resolve_name_servers`]
//! fold lookup failures into tagged results so that they never abort a service's enrichment.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hickory_resolver::TokioResolver;
use tracing::{debug, instrument, trace};

pub use error::Error;
pub use name_servers::{resolve_name_servers, NameServer, NameServerSet};
pub use resolution::{resolve_hostname, HostResolution};

pub mod error;
mod name_servers;
mod resolution;

pub type ResolverResult<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone)]
pub struct ResolverOpts {
    /// Number of attempts per query before giving up
    pub attempts: usize,
    /// Timeout of a single query attempt
    pub timeout: Duration,
}

impl Default for ResolverOpts {
    fn default() -> Self {
        ResolverOpts {
            attempts: 2,
            timeout: Duration::from_secs(5),
        }
    }
}

#[async_trait]
pub trait DnsLookup: Send + Sync {
    /// Forward lookup of `hostname`; addresses are returned in resolver order.
    async fn lookup_ip(&self, hostname: &str) -> ResolverResult<Vec<IpAddr>>;

    /// Looks up the authoritative name servers of `domain`.
    async fn lookup_ns(&self, domain: &str) -> ResolverResult<Vec<String>>;

    /// Looks up the canonical name of `domain`, i.e., the end of its CNAME chain.
    ///
    /// A name with addresses but without an alias is its own canonical name.
    async fn lookup_cname(&self, domain: &str) -> ResolverResult<String>;
}

#[async_trait]
impl<T: DnsLookup + ?Sized> DnsLookup for Arc<T> {
    async fn lookup_ip(&self, hostname: &str) -> ResolverResult<Vec<IpAddr>> {
        (**self).lookup_ip(hostname).await
    }

    async fn lookup_ns(&self, domain: &str) -> ResolverResult<Vec<String>> {
        (**self).lookup_ns(domain).await
    }

    async fn lookup_cname(&self, domain: &str) -> ResolverResult<String> {
        (**self).lookup_cname(domain).await
    }
}

#[derive(Clone)]
pub struct SystemResolver {
    inner: Arc<TokioResolver>,
    opts: Arc<ResolverOpts>,
}

impl SystemResolver {
    /// Creates a resolver from the local system configuration.
    ///
    /// Unix: Parses `/etc/resolv.conf`.
    pub fn from_system_config(opts: ResolverOpts) -> ResolverResult<Self> {
        let mut builder = TokioResolver::builder_tokio()?;
        let hickory_opts = builder.options_mut();
        hickory_opts.attempts = opts.attempts;
        hickory_opts.timeout = opts.timeout;
        debug!(
            "Created system resolver with {} attempts and {} s timeout",
            opts.attempts,
            opts.timeout.as_secs()
        );

        Ok(SystemResolver {
            inner: Arc::new(builder.build()),
            opts: Arc::new(opts),
        })
    }

    pub fn opts(&self) -> &ResolverOpts {
        &self.opts
    }
}

#[async_trait]
impl DnsLookup for SystemResolver {
    #[instrument(level = "debug", skip(self))]
    async fn lookup_ip(&self, hostname: &str) -> ResolverResult<Vec<IpAddr>> {
        let lookup = self.inner.lookup_ip(hostname).await?;
        let ips: Vec<IpAddr> = lookup.iter().collect();
        trace!("Received {} addresses", ips.len());

        Ok(ips)
    }

    #[instrument(level = "debug", skip(self))]
    async fn lookup_ns(&self, domain: &str) -> ResolverResult<Vec<String>> {
        let lookup = self.inner.ns_lookup(domain).await?;
        let name_servers: Vec<String> = lookup.iter().map(|ns| trim_root(ns.to_string())).collect();
        trace!("Received name servers {:?}", name_servers);

        if name_servers.is_empty() {
            return Err(Error::NoRecords);
        }
        Ok(name_servers)
    }

    /// Follows the CNAME chain through an address lookup of `domain`.
    #[instrument(level = "debug", skip(self))]
    async fn lookup_cname(&self, domain: &str) -> ResolverResult<String> {
        let lookup = self.inner.lookup_ip(domain).await?;
        let records = lookup.as_lookup();
        let targets = records
            .record_iter()
            .filter_map(|record| record.data().as_cname().map(|cname| cname.0.to_string()));
        let has_addresses = records.record_iter().any(|record| record.data().ip_addr().is_some());

        let cname = canonical_name(domain, targets, has_addresses);
        trace!("Received canonical name {:?}", cname);

        cname
    }
}

/// The last target of a CNAME chain or, for a name with addresses but no alias, the name itself.
fn canonical_name<I: IntoIterator<Item = String>>(
    domain: &str,
    targets: I,
    has_addresses: bool,
) -> ResolverResult<String> {
    match targets.into_iter().last() {
        Some(target) => Ok(trim_root(target)),
        None if has_addresses => Ok(trim_root(domain.to_string())),
        None => Err(Error::NoRecords),
    }
}

fn trim_root(name: String) -> String {
    match name.strip_suffix('.') {
        Some(trimmed) if !trimmed.is_empty() => trimmed.to_string(),
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use spectral::prelude::*;

    use super::*;

    #[test]
    fn trim_root_strips_trailing_dot() {
        assert_that(&trim_root("ns1.example.com.".to_string())).is_equal_to("ns1.example.com".to_string());
    }

    #[test]
    fn trim_root_keeps_relative_names_and_root() {
        assert_that(&trim_root("ns1.example.com".to_string())).is_equal_to("ns1.example.com".to_string());
        assert_that(&trim_root(".".to_string())).is_equal_to(".".to_string());
    }

    #[test]
    fn canonical_name_is_last_target_of_chain() {
        let targets = vec!["edge.example.net.".to_string(), "global.cdn.example.org.".to_string()];

        let cname = canonical_name("www.example.com", targets, true);

        assert_that(&cname).is_ok().is_equal_to("global.cdn.example.org".to_string());
    }

    #[test]
    fn canonical_name_of_plain_host_is_the_host() {
        let cname = canonical_name("www.example.com.", Vec::new(), true);

        assert_that(&cname).is_ok().is_equal_to("www.example.com".to_string());
    }

    #[test]
    fn canonical_name_needs_records() {
        let cname = canonical_name("www.example.com", Vec::new(), false);

        assert_that(&cname).is_err();
    }
}
