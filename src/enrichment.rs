// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Enrichment of one service into an [`AggregatedServiceReport`].
//!
//! Backends with their origin addresses, domains with their name servers, and traffic statistics
//! are gathered concurrently. A failing step degrades the record by an [`EnrichmentError`]; the
//! enrichment itself never fails.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{debug, instrument, warn};

use crate::provider::{self, ProviderApi, StatsWindow};
use crate::report::{AggregatedServiceReport, DomainList, EnrichmentError, Origin, Step, TrafficStats};
use crate::resolver::{resolve_hostname, resolve_name_servers, DnsLookup, NameServer, NameServerSet};
use crate::service::ServiceRef;

#[derive(Debug, Default)]
struct BackendOrigins {
    origins: Vec<Origin>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

#[instrument(name = "enrich service", level = "info", skip(provider, dns, service), fields(service = %service.name, id = %service.id))]
pub async fn enrich<P: ProviderApi + ?Sized, D: DnsLookup + ?Sized>(
    provider: &P,
    dns: &D,
    service: &ServiceRef,
) -> AggregatedServiceReport {
    let mut report = AggregatedServiceReport::new(service);

    let (backends, (domains, name_servers, domains_err), traffic) = tokio::join!(
        backend_origins(provider, dns, service),
        domains_and_name_servers(provider, dns, &service.id),
        traffic(provider, &service.id),
    );

    match backends {
        Ok(backends) => {
            report.origins = backends.origins;
            report.created_at = backends.created_at;
            report.updated_at = backends.updated_at;
        }
        Err(err) => report.errors.push(err),
    }

    report.domains = domains;
    report.name_servers = name_servers;
    if let Some(err) = domains_err {
        report.errors.push(err);
    }

    match traffic {
        Ok(traffic) => report.traffic = traffic,
        Err(err) => report.errors.push(err),
    }

    if report.is_degraded() {
        warn!(
            "Service '{}' ({}) is incomplete: {}",
            service.name,
            service.id,
            report
                .errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ")
        );
    }
    debug!(
        "Enriched service '{}' with {} origins, {} name servers, and {} requests",
        service.name,
        report.origins.len(),
        report.name_servers.len(),
        report.traffic.requests
    );

    report
}

async fn backend_origins<P: ProviderApi + ?Sized, D: DnsLookup + ?Sized>(
    provider: &P,
    dns: &D,
    service: &ServiceRef,
) -> Result<BackendOrigins, EnrichmentError> {
    let version = service.active_version.ok_or_else(|| {
        let err = provider::Error::NoActiveVersion {
            service_id: service.id.clone(),
        };
        EnrichmentError::from_error(Step::Version, &err)
    })?;

    let backends = provider
        .list_backends(&service.id, version)
        .await
        .map_err(|err| EnrichmentError::from_error(Step::Backends, &err))?;

    let backends: Vec<_> = backends
        .iter()
        .filter_map(|backend| {
            backend
                .hostname
                .as_deref()
                .map(str::trim)
                .filter(|hostname| !hostname.is_empty())
                .map(|hostname| (hostname, backend))
        })
        .collect();

    let created_at = backends.iter().filter_map(|(_, x)| x.created_at).min();
    let updated_at = backends.iter().filter_map(|(_, x)| x.updated_at).max();

    let resolutions = backends
        .iter()
        .map(|(hostname, _)| async move { Origin::new(*hostname, resolve_hostname(dns, hostname).await) });
    let origins = join_all(resolutions).await;

    Ok(BackendOrigins {
        origins,
        created_at,
        updated_at,
    })
}

async fn domains_and_name_servers<P: ProviderApi + ?Sized, D: DnsLookup + ?Sized>(
    provider: &P,
    dns: &D,
    service_id: &str,
) -> (DomainList, NameServerSet, Option<EnrichmentError>) {
    match provider.list_service_domains(service_id).await {
        Ok(domains) => {
            let names: Vec<String> = domains.into_iter().map(|x| x.name).collect();
            let name_servers = resolve_name_servers(dns, &names).await;
            (DomainList::Found(names), name_servers, None)
        }
        Err(err) => {
            let name_servers = std::iter::once(NameServer::Unresolved).collect();
            let err = EnrichmentError::from_error(Step::Domains, &err);
            (DomainList::Unavailable, name_servers, Some(err))
        }
    }
}

async fn traffic<P: ProviderApi + ?Sized>(provider: &P, service_id: &str) -> Result<TrafficStats, EnrichmentError> {
    provider
        .get_stats(service_id, &StatsWindow::PAST_TWO_MONTHS)
        .await
        .map(|response| TrafficStats::from(&response))
        .map_err(|err| EnrichmentError::from_error(Step::Stats, &err))
}
