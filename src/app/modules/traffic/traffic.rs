// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};

use crate::aggregation::{fetch_services, Aggregator};
use crate::app::modules::traffic::config::TrafficConfig;
use crate::app::modules::{AppModule, Environment, PartialError, PartialResult};
use crate::app::utils::{time, time_infallible};
use crate::app::{output, AppConfig, ExitStatus};
use crate::provider::{FastlyClient, ProviderApi};
use crate::report::Reports;
use crate::resolver::{DnsLookup, SystemResolver};
use crate::service::ServiceRef;
use crate::statistics::Statistics;

pub struct Traffic {}

impl AppModule<TrafficConfig> for Traffic {}

impl Traffic {
    pub async fn init<'a>(
        app_config: &'a AppConfig,
        config: &'a TrafficConfig,
    ) -> PartialResult<FetchServices<'a, FastlyClient, SystemResolver>> {
        let provider = FastlyClient::new(app_config.api_token.as_str(), app_config.fastly_client_opts())
            .context("Failed to create Fastly API client")?;
        let dns =
            SystemResolver::from_system_config(app_config.resolver_opts()).context("Failed to create DNS resolver")?;

        Traffic::with_boundaries(app_config, config, provider, dns)
    }

    pub fn with_boundaries<'a, P, D>(
        app_config: &'a AppConfig,
        config: &'a TrafficConfig,
        provider: P,
        dns: D,
    ) -> PartialResult<FetchServices<'a, P, D>>
    where
        P: ProviderApi + 'static,
        D: DnsLookup + 'static,
    {
        let env = Self::init_env(app_config, config)?;
        let provider = Arc::new(provider);
        let aggregator = Aggregator::new(provider.clone(), dns, app_config.aggregator_opts());

        env.console.print_aggregator_opts(aggregator.opts());

        Ok(FetchServices {
            env,
            provider,
            aggregator,
        })
    }
}

pub struct FetchServices<'a, P, D> {
    env: Environment<'a, TrafficConfig>,
    provider: Arc<P>,
    aggregator: Aggregator<Arc<P>, D>,
}

impl<'a, P, D> FetchServices<'a, P, D>
where
    P: ProviderApi + 'static,
    D: DnsLookup + 'static,
{
    pub async fn fetch_services(self) -> PartialResult<Aggregate<'a, P, D>> {
        if self.env.console.not_quiet() {
            self.env.console.caption("Listing services.");
        }

        info!("Listing services.");
        let (services, run_time) = match time(fetch_services(self.provider.as_ref())).await {
            Ok(res) => res,
            Err(err) => {
                self.env.console.error(format!("Failed to list services: {:#}", anyhow::Error::from(err)));
                return Err(PartialError::Failed(ExitStatus::Failed));
            }
        };
        info!("Finished listing services.");

        if self.env.console.not_quiet() {
            self.env.console.info(format!(
                "Received {} services within {} ms.",
                services.len(),
                run_time.as_millis()
            ));
        }
        if services.is_empty() {
            self.env.console.attention("No services found.");
        }

        Ok(Aggregate {
            env: self.env,
            aggregator: self.aggregator,
            services,
        })
    }
}

pub struct Aggregate<'a, P, D> {
    env: Environment<'a, TrafficConfig>,
    aggregator: Aggregator<Arc<P>, D>,
    services: Vec<ServiceRef>,
}

impl<'a, P, D> Aggregate<'a, P, D>
where
    P: ProviderApi + 'static,
    D: DnsLookup + 'static,
{
    pub async fn aggregate(self) -> PartialResult<OutputReports<'a>> {
        if self.env.console.not_quiet() {
            self.env.console.caption("Enriching services.");
        }
        self.env.console.print_estimates(self.services.len());

        let cancel = self.aggregator.cancel_token();
        let ctrl_c = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Received Ctrl-C; cancelling aggregation");
                cancel.cancel();
            }
        });

        info!("Aggregating services.");
        let (reports, run_time) = time_infallible(self.aggregator.aggregate(self.services)).await;
        ctrl_c.abort();
        info!("Finished aggregation.");

        Ok(OutputReports::new(self.env, reports, run_time))
    }
}

pub struct OutputReports<'a> {
    env: Environment<'a, TrafficConfig>,
    reports: Reports,
    run_time: Duration,
}

impl<'a> OutputReports<'a> {
    fn new(env: Environment<'a, TrafficConfig>, reports: Reports, run_time: Duration) -> OutputReports<'a> {
        env.console.print_statistics(&reports, run_time);

        let reports = reports.ranked();
        let reports = if env.mod_config.s3_only {
            reports.filter_s3_domains()
        } else {
            reports
        };

        OutputReports { env, reports, run_time }
    }

    pub fn output(self) -> PartialResult<ExitStatus> {
        output::output(&self.env.app_config.output_config, &self.reports)?;

        self.env.console.print_error_counts(&self.reports.statistics().errors);
        let degraded = self.reports.degraded().count();
        if degraded > 0 && self.env.console.not_quiet() {
            self.env.console.attention(format!(
                "{} of {} services are incomplete; rerun with --show-errors for details.",
                degraded,
                self.reports.len()
            ));
        }
        self.env.console.print_finished();
        info!("Reported {} services in {} ms.", self.reports.len(), self.run_time.as_millis());

        Ok(ExitStatus::Ok)
    }
}

#[cfg(test)]
mod tests {
    use std::convert::TryFrom;

    use spectral::prelude::*;

    use super::*;
    use crate::app::cli_parser::create_parser;
    use crate::provider::StatsData;
    use crate::utils::tests::{Call, FakeDns, FakeProvider};

    fn app_config() -> AppConfig {
        let args = create_parser()
            .try_get_matches_from(["fastly-report", "--api-token", "token", "--quiet", "traffic"])
            .unwrap();
        AppConfig::try_from(&args).unwrap()
    }

    fn stats(requests: u64) -> Vec<StatsData> {
        vec![StatsData {
            requests,
            hit_ratio: Some(0.5),
            ..Default::default()
        }]
    }

    fn provider() -> FakeProvider {
        FakeProvider::new()
            .with_service("a", "small.example.com", Some(1))
            .with_stats("a", stats(10))
            .with_domains("a", &["small.example.com"])
            .with_service("b", "assets.example.com", Some(1))
            .with_stats("b", stats(500))
            .with_domains("b", &["assets.example.com", "bucket.s3.amazonaws.com"])
    }

    #[tokio::test]
    async fn reports_are_ranked_by_requests() {
        crate::utils::tests::logging::init();
        let app_config = app_config();
        let config = TrafficConfig::default();

        let output = Traffic::with_boundaries(&app_config, &config, provider(), FakeDns::new())
            .unwrap()
            .fetch_services()
            .await
            .unwrap()
            .aggregate()
            .await
            .unwrap();

        let ids: Vec<&str> = output.reports.iter().map(|x| x.service_id.as_str()).collect();
        assert_that(&ids).is_equal_to(vec!["b", "a"]);
    }

    #[tokio::test]
    async fn s3_only_keeps_services_with_s3_domain() {
        crate::utils::tests::logging::init();
        let app_config = app_config();
        let config = TrafficConfig { s3_only: true };

        let output = Traffic::with_boundaries(&app_config, &config, provider(), FakeDns::new())
            .unwrap()
            .fetch_services()
            .await
            .unwrap()
            .aggregate()
            .await
            .unwrap();

        assert_that(&output.reports.len()).is_equal_to(1);
        assert_that(&output.reports.get("b")).is_some();
    }

    #[tokio::test]
    async fn failing_service_listing_fails_module() {
        crate::utils::tests::logging::init();
        let app_config = app_config();
        let config = TrafficConfig::default();
        let provider = provider().failing("", Call::Services);

        let res = Traffic::with_boundaries(&app_config, &config, provider, FakeDns::new())
            .unwrap()
            .fetch_services()
            .await;

        assert_that(&matches!(res, Err(PartialError::Failed(ExitStatus::Failed)))).is_true();
    }
}
