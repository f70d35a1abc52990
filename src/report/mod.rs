// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Aggregated records of all services and their deterministic ranking.

use std::fmt;
use std::slice::Iter;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::resolver::{HostResolution, NameServerSet};
use crate::service::ServiceRef;
use crate::utils::serialize::ser_opt_timestamp;

pub use traffic::{StatusCounters, TrafficStats};

pub mod traffic;

pub static NO_DOMAINS_FOUND: &str = "No Domains Found";

/// A backend's origin host name together with the result of its forward lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Origin {
    pub hostname: String,
    pub resolution: HostResolution,
}

impl Origin {
    pub fn new<T: Into<String>>(hostname: T, resolution: HostResolution) -> Origin {
        Origin {
            hostname: hostname.into(),
            resolution,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainList {
    Found(Vec<String>),
    /// Listing the domains failed; the cause is recorded as an annotation
    Unavailable,
}

impl DomainList {
    pub fn names(&self) -> &[String] {
        match self {
            DomainList::Found(names) => names,
            DomainList::Unavailable => &[],
        }
    }

    pub fn to_strings(&self) -> Vec<String> {
        match self {
            DomainList::Found(names) => names.clone(),
            DomainList::Unavailable => vec![NO_DOMAINS_FOUND.to_string()],
        }
    }
}

impl Default for DomainList {
    fn default() -> Self {
        DomainList::Found(Vec::new())
    }
}

/// Part of an enrichment that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Step {
    Version,
    Backends,
    Domains,
    Stats,
    Task,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let str = match self {
            Step::Version => "Version",
            Step::Backends => "Backends",
            Step::Domains => "Domains",
            Step::Stats => "Stats",
            Step::Task => "Task",
        };
        f.write_str(str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{step}: {reason}")]
pub struct EnrichmentError {
    pub step: Step,
    pub reason: String,
}

impl EnrichmentError {
    pub fn new<T: Into<String>>(step: Step, reason: T) -> EnrichmentError {
        EnrichmentError {
            step,
            reason: reason.into(),
        }
    }

    /// Renders the error and its chain of sources.
    pub fn from_error(step: Step, err: &dyn std::error::Error) -> EnrichmentError {
        let mut reason = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            reason.push_str(": ");
            reason.push_str(&cause.to_string());
            source = cause.source();
        }
        EnrichmentError { step, reason }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedServiceReport {
    pub service_name: String,
    pub service_id: String,
    pub origins: Vec<Origin>,
    /// Earliest creation of any listed backend
    #[serde(serialize_with = "ser_opt_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    /// Most recent update of any listed backend
    #[serde(serialize_with = "ser_opt_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    pub domains: DomainList,
    pub name_servers: NameServerSet,
    pub traffic: TrafficStats,
    pub errors: Vec<EnrichmentError>,
}

impl AggregatedServiceReport {
    pub fn new(service: &ServiceRef) -> AggregatedServiceReport {
        AggregatedServiceReport {
            service_name: service.name.clone(),
            service_id: service.id.clone(),
            origins: Vec::new(),
            created_at: None,
            updated_at: None,
            domains: DomainList::default(),
            name_servers: NameServerSet::new(),
            traffic: TrafficStats::default(),
            errors: Vec::new(),
        }
    }

    /// A record without any enrichment, e.g. for a task that panicked or was cancelled.
    pub fn degraded<T: Into<String>>(service: &ServiceRef, reason: T) -> AggregatedServiceReport {
        let mut report = AggregatedServiceReport::new(service);
        report.errors.push(EnrichmentError::new(Step::Task, reason));
        report
    }

    pub fn is_degraded(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn failed_steps(&self) -> impl Iterator<Item = Step> + '_ {
        self.errors.iter().map(|x| x.step)
    }

    pub fn origin_names(&self) -> Vec<&str> {
        self.origins.iter().map(|x| x.hostname.as_str()).collect()
    }

    /// Addresses of all origins in origin order; an unresolved origin contributes the failure sentinel.
    pub fn addresses(&self) -> Vec<String> {
        self.origins.iter().flat_map(|x| x.resolution.to_strings()).collect()
    }

    /// Checks if any domain has a label `s3`, i.e. the service fronts an S3 bucket.
    pub fn has_s3_domain(&self) -> bool {
        self.domains
            .names()
            .iter()
            .any(|domain| domain.split('.').any(|label| label.eq_ignore_ascii_case("s3")))
    }
}

/// Frozen collection of all records of one aggregation run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Reports {
    inner: Vec<AggregatedServiceReport>,
}

impl Reports {
    pub fn new(reports: Vec<AggregatedServiceReport>) -> Reports {
        Reports { inner: reports }
    }

    /// Sorts by requests descending, ties by service name then service id ascending.
    pub fn ranked(mut self) -> Reports {
        self.inner.sort_by(|a, b| {
            b.traffic
                .requests
                .cmp(&a.traffic.requests)
                .then_with(|| a.service_name.cmp(&b.service_name))
                .then_with(|| a.service_id.cmp(&b.service_id))
        });
        self
    }

    /// Keeps services with more than one domain of which at least one has a label `s3`.
    pub fn filter_s3_domains(self) -> Reports {
        let inner = self
            .inner
            .into_iter()
            .filter(|x| x.domains.names().len() > 1 && x.has_s3_domain())
            .collect();
        Reports { inner }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> Iter<'_, AggregatedServiceReport> {
        self.inner.iter()
    }

    pub fn degraded(&self) -> impl Iterator<Item = &AggregatedServiceReport> {
        self.inner.iter().filter(|x| x.is_degraded())
    }

    pub fn get(&self, service_id: &str) -> Option<&AggregatedServiceReport> {
        self.inner.iter().find(|x| x.service_id == service_id)
    }
}

impl IntoIterator for Reports {
    type Item = AggregatedServiceReport;
    type IntoIter = std::vec::IntoIter<AggregatedServiceReport>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

impl<'a> IntoIterator for &'a Reports {
    type Item = &'a AggregatedServiceReport;
    type IntoIter = Iter<'a, AggregatedServiceReport>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

impl From<Vec<AggregatedServiceReport>> for Reports {
    fn from(reports: Vec<AggregatedServiceReport>) -> Self {
        Reports::new(reports)
    }
}

#[cfg(test)]
mod tests {
    use spectral::prelude::*;

    use super::*;
    use crate::resolver::Error as ResolverError;

    fn report(name: &str, id: &str, requests: u64) -> AggregatedServiceReport {
        let mut report = AggregatedServiceReport::new(&ServiceRef::new(name, id, Some(1)));
        report.traffic.requests = requests;
        report
    }

    fn names(reports: &Reports) -> Vec<String> {
        reports.iter().map(|x| x.service_name.clone()).collect()
    }

    #[test]
    fn ranked_by_requests_descending() {
        let reports = Reports::new(vec![report("a", "1", 10), report("b", "2", 500), report("c", "3", 3)]);

        let ranked = reports.ranked();

        let requests: Vec<_> = ranked.iter().map(|x| x.traffic.requests).collect();
        assert_that(&requests).is_equal_to(vec![500, 10, 3]);
    }

    #[test]
    fn ties_are_broken_by_name_then_id() {
        let reports = Reports::new(vec![
            report("zeta", "1", 7),
            report("alpha", "9", 7),
            report("alpha", "2", 7),
            report("omega", "5", 8),
        ]);

        let ranked = reports.ranked();

        let keys: Vec<_> = ranked
            .iter()
            .map(|x| format!("{}/{}", x.service_name, x.service_id))
            .collect();
        assert_that(&keys).is_equal_to(vec![
            "omega/5".to_string(),
            "alpha/2".to_string(),
            "alpha/9".to_string(),
            "zeta/1".to_string(),
        ]);
    }

    #[test]
    fn ranking_an_empty_collection() {
        let ranked = Reports::default().ranked();

        assert_that(&ranked.is_empty()).is_true();
    }

    #[test]
    fn s3_filter_requires_multiple_domains() {
        let mut single = report("single", "1", 0);
        single.domains = DomainList::Found(vec!["bucket.s3.amazonaws.com".to_string()]);
        let mut multi = report("multi", "2", 0);
        multi.domains = DomainList::Found(vec![
            "www.example.com".to_string(),
            "assets.s3.eu-west-1.amazonaws.com".to_string(),
        ]);
        let mut no_s3 = report("no-s3", "3", 0);
        no_s3.domains = DomainList::Found(vec!["www.example.com".to_string(), "s3example.com".to_string()]);
        let reports = Reports::new(vec![single, multi, no_s3]);

        let filtered = reports.filter_s3_domains();

        assert_that(&names(&filtered)).is_equal_to(vec!["multi".to_string()]);
    }

    #[test]
    fn unavailable_domains_render_sentinel() {
        let domains = DomainList::Unavailable;

        assert_that(&domains.to_strings()).is_equal_to(vec!["No Domains Found".to_string()]);
        assert_that(&domains.names().is_empty()).is_true();
    }

    #[test]
    fn addresses_keep_origin_order_and_sentinels() {
        let mut report = report("a", "1", 0);
        report.origins = vec![
            Origin::new("one.example.com", HostResolution::Resolved(vec!["192.0.2.1".parse().unwrap()])),
            Origin::new("two.example.com", HostResolution::Failed(ResolverError::Timeout)),
        ];

        assert_that(&report.origin_names()).is_equal_to(vec!["one.example.com", "two.example.com"]);
        assert_that(&report.addresses())
            .is_equal_to(vec!["192.0.2.1".to_string(), "Host resolution failed".to_string()]);
    }

    #[test]
    fn failed_steps_of_all_records() {
        let ok = report("ok", "1", 1);
        let degraded = AggregatedServiceReport::degraded(&ServiceRef::new("bad", "2", None), "cancelled");
        let reports = Reports::new(vec![ok, degraded]);

        let failed: Vec<Step> = reports.iter().flat_map(|x| x.failed_steps()).collect();

        assert_that(&failed).is_equal_to(vec![Step::Task]);
        assert_that(&reports.degraded().count()).is_equal_to(1);
    }

    #[test]
    fn error_chain_is_rendered() {
        let err = crate::Error::from(crate::provider::Error::NoActiveVersion {
            service_id: "abc".to_string(),
        });

        let enrichment_error = EnrichmentError::from_error(Step::Version, &err);

        assert_that(&enrichment_error.to_string())
            .is_equal_to("Version: provider API failed: service abc has no version metadata".to_string());
    }
}
