// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Fan-out of one enrichment task per service.
//!
//! Tasks run in a sliding window of at most `max_concurrent_tasks`. Each task appends exactly one
//! record to the shared result collection; a task that panics is replaced by a degraded record.
//! Cancelling the aggregation, either by its deadline or by [`Aggregator::cancel_token`], stops
//! launching tasks and lets the in-flight tasks finish immediately with a degraded record.

use std::any::Any;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::task::{self, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn, Span};
use tracing_futures::Instrument;

use crate::enrichment::enrich;
use crate::provider::ProviderApi;
use crate::report::{AggregatedServiceReport, Reports};
use crate::resolver::DnsLookup;
use crate::service::ServiceRef;
use crate::utils::buffer_unordered_with_gate::StreamExtBufferUnorderedWithGate;
use crate::Result;

pub static CANCELLED: &str = "cancelled";

#[derive(Debug, Clone)]
pub struct AggregatorOpts {
    pub max_concurrent_tasks: usize,
    /// Overall time limit of one aggregation
    pub deadline: Option<Duration>,
}

impl Default for AggregatorOpts {
    fn default() -> Self {
        AggregatorOpts {
            max_concurrent_tasks: 8,
            deadline: None,
        }
    }
}

type Collection = Arc<Mutex<Vec<AggregatedServiceReport>>>;

pub struct Aggregator<P, D> {
    provider: Arc<P>,
    dns: Arc<D>,
    opts: AggregatorOpts,
    cancel: CancellationToken,
}

impl<P, D> Aggregator<P, D>
where
    P: ProviderApi + 'static,
    D: DnsLookup + 'static,
{
    pub fn new(provider: P, dns: D, opts: AggregatorOpts) -> Aggregator<P, D> {
        Aggregator {
            provider: Arc::new(provider),
            dns: Arc::new(dns),
            opts,
            cancel: CancellationToken::new(),
        }
    }

    pub fn opts(&self) -> &AggregatorOpts {
        &self.opts
    }

    /// Token to cancel a running aggregation. Once cancelled, the aggregator stays cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    #[instrument(name = "aggregate", level = "info", skip(self, services), fields(services = services.len()))]
    pub async fn aggregate(&self, services: Vec<ServiceRef>) -> Reports {
        let total = services.len();
        let results: Collection = Arc::new(Mutex::new(Vec::with_capacity(total)));
        let deadline = self.opts.deadline.map(|x| spawn_deadline(x, self.cancel.clone()));

        let tasks = services.into_iter().map(|service| {
            let handle = task::spawn(run_task(
                self.provider.clone(),
                self.dns.clone(),
                service.clone(),
                self.cancel.clone(),
                results.clone(),
            )
            .instrument(Span::current()));
            async move { (service, handle.await) }
        });
        let mut finished = stream::iter(tasks).buffered_unordered_with_gate(self.opts.max_concurrent_tasks, self.cancel.clone());

        while let Some((service, res)) = finished.next().await {
            if let Err(err) = res {
                let reason = if err.is_panic() {
                    format!("panicked: {}", panic_message(err.into_panic()))
                } else {
                    "aborted".to_string()
                };
                error!("Task for service '{}' ({}) failed: {}", service.name, service.id, reason);
                append(&results, AggregatedServiceReport::degraded(&service, reason));
            }
        }
        let launched = finished.pulled();
        drop(finished);

        if let Some(deadline) = deadline {
            deadline.abort();
        }
        if launched < total {
            warn!(
                "Aggregation cancelled: {} of {} services were not started and are missing from the report",
                total - launched,
                total
            );
        }

        let reports = std::mem::take(&mut *results.lock().unwrap_or_else(PoisonError::into_inner));
        info!("Aggregated {} of {} services", reports.len(), total);

        Reports::new(reports)
    }
}

async fn run_task<P: ProviderApi, D: DnsLookup>(
    provider: Arc<P>,
    dns: Arc<D>,
    service: ServiceRef,
    cancel: CancellationToken,
    results: Collection,
) {
    let report = tokio::select! {
        report = enrich(provider.as_ref(), dns.as_ref(), &service) => report,
        _ = cancel.cancelled() => {
            debug!("Enrichment of service '{}' cancelled", service.name);
            AggregatedServiceReport::degraded(&service, CANCELLED)
        }
    };
    append(&results, report);
}

fn append(results: &Mutex<Vec<AggregatedServiceReport>>, report: AggregatedServiceReport) {
    results.lock().unwrap_or_else(PoisonError::into_inner).push(report);
}

fn spawn_deadline(deadline: Duration, cancel: CancellationToken) -> JoinHandle<()> {
    task::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(deadline) => {
                warn!("Deadline of {:?} reached; cancelling aggregation", deadline);
                cancel.cancel();
            }
            _ = cancel.cancelled() => {}
        }
    })
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Lists all services of the account; the only failure that aborts a report.
#[instrument(name = "fetch services", level = "info", skip(provider))]
pub async fn fetch_services<P: ProviderApi + ?Sized>(provider: &P) -> Result<Vec<ServiceRef>> {
    let services = provider.list_services().await?;
    debug!("Fetched {} services", services.len());

    Ok(services.into_iter().map(ServiceRef::from).collect())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use spectral::prelude::*;

    use super::*;
    use crate::provider::StatsData;
    use crate::report::Step;
    use crate::utils::tests::{Call, FakeDns, FakeProvider};

    fn provider_with_services(n: usize) -> (FakeProvider, Vec<ServiceRef>) {
        let mut provider = FakeProvider::new();
        let mut services = Vec::new();
        for i in 0..n {
            let id = format!("svc{}", i);
            let name = format!("service-{}.example.com", i);
            provider = provider
                .with_service(&id, &name, Some(1))
                .with_backend(&id, Some("origin.example.net"), "2020-01-01T00:00:00Z", "2021-01-01T00:00:00Z")
                .with_stats(
                    &id,
                    vec![StatsData {
                        requests: i as u64,
                        ..Default::default()
                    }],
                );
            services.push(ServiceRef::new(name, id, Some(1)));
        }
        (provider, services)
    }

    fn ids(reports: &Reports) -> HashSet<String> {
        reports.iter().map(|x| x.service_id.clone()).collect()
    }

    #[tokio::test]
    async fn one_record_per_service() {
        crate::utils::tests::logging::init();
        let (provider, services) = provider_with_services(20);
        let aggregator = Aggregator::new(provider, FakeDns::new(), AggregatorOpts::default());

        let reports = aggregator.aggregate(services).await;

        assert_that(&reports.len()).is_equal_to(20);
        assert_that(&ids(&reports).len()).is_equal_to(20);
    }

    #[tokio::test]
    async fn concurrency_is_bounded() {
        crate::utils::tests::logging::init();
        let (provider, services) = provider_with_services(12);
        let provider = Arc::new(provider.with_latency(Duration::from_millis(10)));
        let opts = AggregatorOpts {
            max_concurrent_tasks: 3,
            deadline: None,
        };
        let aggregator = Aggregator::new(provider.clone(), FakeDns::new(), opts);

        let reports = aggregator.aggregate(services).await;

        assert_that(&reports.len()).is_equal_to(12);
        assert_that(&provider.peak_concurrency()).is_less_than_or_equal_to(3);
        assert_that(&provider.peak_concurrency()).is_greater_than_or_equal_to(1);
    }

    #[tokio::test]
    async fn partial_failures_keep_every_record() {
        crate::utils::tests::logging::init();
        let (provider, services) = provider_with_services(4);
        let provider = provider
            .failing("svc0", Call::Backends)
            .failing("svc1", Call::Domains)
            .failing("svc2", Call::Stats);
        let aggregator = Aggregator::new(provider, FakeDns::new(), AggregatorOpts::default());

        let reports = aggregator.aggregate(services).await;

        assert_that(&reports.len()).is_equal_to(4);
        assert_that(&reports.degraded().count()).is_equal_to(3);
        assert_that(&reports.get("svc3").map(|x| x.is_degraded())).is_some().is_false();
    }

    #[tokio::test]
    async fn panicking_task_yields_degraded_record() {
        crate::utils::tests::logging::init();
        let (provider, services) = provider_with_services(3);
        let provider = provider.panicking("svc1");
        let aggregator = Aggregator::new(provider, FakeDns::new(), AggregatorOpts::default());

        let reports = aggregator.aggregate(services).await;

        assert_that(&reports.len()).is_equal_to(3);
        let degraded = reports.get("svc1").unwrap();
        assert_that(&degraded.failed_steps().collect::<Vec<_>>()).is_equal_to(vec![Step::Task]);
        assert_that(&degraded.errors[0].reason.contains("panicked")).is_true();
        assert_that(&reports.get("svc0").map(|x| x.is_degraded())).is_some().is_false();
    }

    #[tokio::test]
    async fn cancelled_before_start_launches_nothing() {
        crate::utils::tests::logging::init();
        let (provider, services) = provider_with_services(5);
        let aggregator = Aggregator::new(provider, FakeDns::new(), AggregatorOpts::default());
        aggregator.cancel_token().cancel();

        let reports = aggregator.aggregate(services).await;

        assert_that(&reports.is_empty()).is_true();
    }

    #[tokio::test]
    async fn deadline_cancels_in_flight_tasks() {
        crate::utils::tests::logging::init();
        let (provider, services) = provider_with_services(10);
        let provider = provider.with_latency(Duration::from_millis(500));
        let opts = AggregatorOpts {
            max_concurrent_tasks: 2,
            deadline: Some(Duration::from_millis(50)),
        };
        let aggregator = Aggregator::new(provider, FakeDns::new(), opts);

        let reports = aggregator.aggregate(services).await;

        assert_that(&reports.len()).is_equal_to(2);
        for report in &reports {
            assert_that(&report.errors).has_length(1);
            assert_that(&report.errors[0].step).is_equal_to(Step::Task);
            assert_that(&report.errors[0].reason.as_str()).is_equal_to(CANCELLED);
        }
    }

    #[tokio::test]
    async fn fetches_services_with_active_versions() {
        crate::utils::tests::logging::init();
        let provider = FakeProvider::new()
            .with_service("svc1", "www.example.com", Some(4))
            .with_service("svc2", "api.example.com", None);

        let services = fetch_services(&provider).await;

        assert_that(&services).is_ok().has_length(2);
        let services = services.unwrap();
        assert_that(&services[0].active_version).is_some().is_equal_to(4);
        assert_that(&services[1].active_version).is_none();
    }

    #[tokio::test]
    async fn failing_service_listing_is_fatal() {
        crate::utils::tests::logging::init();
        let provider = FakeProvider::new().failing("", Call::Services);

        let services = fetch_services(&provider).await;

        assert_that(&services).is_err();
    }
}
