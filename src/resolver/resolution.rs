use std::net::IpAddr;

use serde::Serialize;
use tracing::debug;

use crate::resolver::{DnsLookup, Error};

pub static HOST_RESOLUTION_FAILED: &str = "Host resolution failed";

/// Result of a forward lookup for one origin host name.
///
/// A successful resolution always carries at least one address; an empty answer is folded into
/// `Failed` with `Error::NoRecords`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HostResolution {
    Resolved(Vec<IpAddr>),
    Failed(Error),
}

impl HostResolution {
    pub fn is_resolved(&self) -> bool {
        matches!(self, HostResolution::Resolved(_))
    }

    pub fn addresses(&self) -> &[IpAddr] {
        match self {
            HostResolution::Resolved(ips) => ips,
            HostResolution::Failed(_) => &[],
        }
    }

    pub fn err(&self) -> Option<&Error> {
        match self {
            HostResolution::Resolved(_) => None,
            HostResolution::Failed(err) => Some(err),
        }
    }

    /// Renders the resolution for report output; never empty.
    pub fn to_strings(&self) -> Vec<String> {
        match self {
            HostResolution::Resolved(ips) => ips.iter().map(ToString::to_string).collect(),
            HostResolution::Failed(_) => vec![HOST_RESOLUTION_FAILED.to_string()],
        }
    }
}

pub async fn resolve_hostname<L: DnsLookup + ?Sized>(lookup: &L, hostname: &str) -> HostResolution {
    match lookup.lookup_ip(hostname).await {
        Ok(ips) if !ips.is_empty() => HostResolution::Resolved(ips),
        Ok(_) => {
            debug!("Lookup of '{}' returned no addresses", hostname);
            HostResolution::Failed(Error::NoRecords)
        }
        Err(err) => {
            debug!("Lookup of '{}' failed: {}", hostname, err);
            HostResolution::Failed(err)
        }
    }
}
