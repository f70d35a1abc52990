// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::Serialize;

use crate::report::{Reports, Step};

pub trait Statistics<'a> {
    type StatsOut;

    fn statistics(&'a self) -> Self::StatsOut;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportsStats {
    pub services: usize,
    pub degraded: usize,
    pub origins: usize,
    pub unresolved_origins: usize,
    /// Distinct name servers across all services
    pub name_servers: usize,
    pub requests: u64,
    pub errors: BTreeMap<Step, usize>,
}

impl<'a> Statistics<'a> for Reports {
    type StatsOut = ReportsStats;

    fn statistics(&'a self) -> Self::StatsOut {
        let mut stats = ReportsStats {
            services: self.len(),
            ..Default::default()
        };
        let mut name_servers = HashSet::new();

        for report in self.iter() {
            if report.is_degraded() {
                stats.degraded += 1;
            }
            stats.origins += report.origins.len();
            stats.unresolved_origins += report.origins.iter().filter(|x| !x.resolution.is_resolved()).count();
            name_servers.extend(report.name_servers.iter());
            stats.requests = stats.requests.saturating_add(report.traffic.requests);
            for step in report.failed_steps() {
                *stats.errors.entry(step).or_insert(0) += 1;
            }
        }
        stats.name_servers = name_servers.len();

        stats
    }
}

impl fmt::Display for ReportsStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} services ({} degraded), {} origins ({} unresolved), {} name servers, {} requests",
            self.services, self.degraded, self.origins, self.unresolved_origins, self.name_servers, self.requests
        )
    }
}

#[cfg(test)]
mod tests {
    use spectral::prelude::*;

    use super::*;
    use crate::report::{AggregatedServiceReport, EnrichmentError, Origin};
    use crate::resolver::{Error as ResolverError, HostResolution, NameServer};
    use crate::service::ServiceRef;

    #[test]
    fn statistics_of_reports() {
        let mut first = AggregatedServiceReport::new(&ServiceRef::new("a", "1", Some(1)));
        first.origins = vec![
            Origin::new("a.example.net", HostResolution::Resolved(vec!["192.0.2.1".parse().unwrap()])),
            Origin::new("b.example.net", HostResolution::Failed(ResolverError::Timeout)),
        ];
        first.name_servers = vec![NameServer::Authoritative("ns1.example.org".to_string())]
            .into_iter()
            .collect();
        first.traffic.requests = 100;
        let mut second = AggregatedServiceReport::new(&ServiceRef::new("b", "2", Some(1)));
        second.name_servers = vec![
            NameServer::Authoritative("ns1.example.org".to_string()),
            NameServer::Unresolved,
        ]
        .into_iter()
        .collect();
        second.traffic.requests = 50;
        second.errors.push(EnrichmentError::new(Step::Stats, "timeout"));
        second.errors.push(EnrichmentError::new(Step::Domains, "timeout"));
        let reports = Reports::new(vec![first, second]);

        let stats = reports.statistics();

        assert_that(&stats.services).is_equal_to(2);
        assert_that(&stats.degraded).is_equal_to(1);
        assert_that(&stats.origins).is_equal_to(2);
        assert_that(&stats.unresolved_origins).is_equal_to(1);
        assert_that(&stats.name_servers).is_equal_to(2);
        assert_that(&stats.requests).is_equal_to(150);
        assert_that(&stats.errors.get(&Step::Stats)).is_some().is_equal_to(&1);
        assert_that(&stats.to_string())
            .is_equal_to("2 services (1 degraded), 2 origins (1 unresolved), 2 name servers, 150 requests".to_string());
    }

    #[test]
    fn errors_are_counted_by_step() {
        let mut first = AggregatedServiceReport::new(&ServiceRef::new("a", "1", Some(1)));
        first.errors.push(EnrichmentError::new(
            Step::Stats,
            "unexpected status code: status code: 500, body: upstream",
        ));
        let mut second = AggregatedServiceReport::new(&ServiceRef::new("b", "2", Some(1)));
        second.errors.push(EnrichmentError::new(
            Step::Stats,
            "unexpected status code: status code: 503, body: overloaded",
        ));
        let reports = Reports::new(vec![first, second]);

        let stats = reports.statistics();

        assert_that(&stats.errors.len()).is_equal_to(1);
        assert_that(&stats.errors.get(&Step::Stats)).is_some().is_equal_to(&2);
    }
}
