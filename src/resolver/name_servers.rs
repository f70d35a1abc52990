use std::collections::btree_set::Iter;
use std::collections::BTreeSet;
use std::fmt;

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, instrument, trace};

use crate::resolver::DnsLookup;

pub static NS_RESOLUTION_FAILED: &str = "NS resolution failed";

/// One entry of a domain's delegation information.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NameServer {
    /// Host name of an authoritative name server from an NS lookup
    Authoritative(String),
    /// Canonical name of a domain without NS records
    Alias(String),
    /// Neither NS nor CNAME lookup succeeded
    Unresolved,
}

impl fmt::Display for NameServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameServer::Authoritative(name) | NameServer::Alias(name) => f.write_str(name),
            NameServer::Unresolved => f.write_str(NS_RESOLUTION_FAILED),
        }
    }
}

/// Deduplicated name servers of all domains of one service.
///
/// Iteration yields entries sorted, but the order carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NameServerSet {
    inner: BTreeSet<NameServer>,
}

impl NameServerSet {
    pub fn new() -> NameServerSet {
        Default::default()
    }

    pub fn insert(&mut self, name_server: NameServer) -> bool {
        self.inner.insert(name_server)
    }

    pub fn contains(&self, name_server: &NameServer) -> bool {
        self.inner.contains(name_server)
    }

    /// Checks for an authoritative or alias entry with the given name.
    pub fn contains_name(&self, name: &str) -> bool {
        self.inner.iter().any(|x| match x {
            NameServer::Authoritative(n) | NameServer::Alias(n) => n == name,
            NameServer::Unresolved => false,
        })
    }

    pub fn has_unresolved(&self) -> bool {
        self.inner.contains(&NameServer::Unresolved)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> Iter<'_, NameServer> {
        self.inner.iter()
    }

    pub fn to_strings(&self) -> Vec<String> {
        self.inner.iter().map(ToString::to_string).collect()
    }
}

impl Extend<NameServer> for NameServerSet {
    fn extend<T: IntoIterator<Item = NameServer>>(&mut self, iter: T) {
        self.inner.extend(iter)
    }
}

impl FromIterator<NameServer> for NameServerSet {
    fn from_iter<T: IntoIterator<Item = NameServer>>(iter: T) -> Self {
        NameServerSet {
            inner: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for NameServerSet {
    type Item = NameServer;
    type IntoIter = std::collections::btree_set::IntoIter<NameServer>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

/// Resolves the name servers of all `domains` into one combined set.
///
/// Domains are looked up concurrently. A domain without NS records falls back to its CNAME; if
/// that fails as well, the set receives `NameServer::Unresolved`.
#[instrument(name = "resolve name servers", level = "debug", skip(lookup, domains), fields(domains = domains.len()))]
pub async fn resolve_name_servers<L: DnsLookup + ?Sized, S: AsRef<str>>(lookup: &L, domains: &[S]) -> NameServerSet {
    let futures: Vec<_> = domains
        .iter()
        .map(|domain| name_servers_for_domain(lookup, domain.as_ref()))
        .collect();

    let name_servers: NameServerSet = join_all(futures).await.into_iter().flatten().collect();
    trace!("Resolved name servers {:?}", name_servers);

    name_servers
}

async fn name_servers_for_domain<L: DnsLookup + ?Sized>(lookup: &L, domain: &str) -> Vec<NameServer> {
    match lookup.lookup_ns(domain).await {
        Ok(name_servers) => return name_servers.into_iter().map(NameServer::Authoritative).collect(),
        Err(err) => debug!("NS lookup for '{}' failed: {}; trying CNAME", domain, err),
    }

    match lookup.lookup_cname(domain).await {
        Ok(cname) => vec![NameServer::Alias(cname)],
        Err(err) => {
            debug!("CNAME lookup for '{}' failed: {}", domain, err);
            vec![NameServer::Unresolved]
        }
    }
}
