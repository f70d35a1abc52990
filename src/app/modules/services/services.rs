// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::io::Write;

use anyhow::Context;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{info, warn};

use crate::app::modules::services::config::ServicesConfig;
use crate::app::modules::{AppModule, Environment, PartialError, PartialResult};
use crate::app::utils::time_infallible;
use crate::app::{output, AppConfig, ExitStatus};
use crate::output::csv::{self, CsvFormatter, CsvOptions};
use crate::provider::{FastlyClient, ProviderApi, Service, ServiceDetail};
use crate::utils::serialize::ser_opt_timestamp;

pub static SERVICE_COLUMNS: [&str; 5] = ["service id", "service name", "versions", "active", "last updated"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceOverview {
    pub service_id: String,
    pub service_name: String,
    pub versions: usize,
    pub active: bool,
    #[serde(serialize_with = "ser_opt_timestamp")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl From<&ServiceDetail> for ServiceOverview {
    fn from(detail: &ServiceDetail) -> Self {
        ServiceOverview {
            service_id: detail.id.clone(),
            service_name: detail.name.clone(),
            versions: detail.versions.len(),
            active: detail.is_active(),
            last_updated: detail.last_updated(),
        }
    }
}

/// Service overviews, most recently updated first.
#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct ServiceOverviews {
    services: Vec<ServiceOverview>,
}

impl ServiceOverviews {
    pub fn new(mut services: Vec<ServiceOverview>) -> ServiceOverviews {
        services.sort_by(|a, b| {
            b.last_updated
                .cmp(&a.last_updated)
                .then_with(|| a.service_name.cmp(&b.service_name))
                .then_with(|| a.service_id.cmp(&b.service_id))
        });
        ServiceOverviews { services }
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ServiceOverview> {
        self.services.iter()
    }
}

impl CsvFormatter for ServiceOverviews {
    fn output<W: Write>(&self, writer: &mut W, opts: &CsvOptions) -> crate::Result<()> {
        if !opts.no_header() {
            csv::write_row(writer, SERVICE_COLUMNS.iter())?;
        }
        for service in &self.services {
            csv::write_row(
                writer,
                [
                    service.service_id.clone(),
                    service.service_name.clone(),
                    service.versions.to_string(),
                    service.active.to_string(),
                    csv::timestamp(&service.last_updated),
                ],
            )?;
        }

        Ok(())
    }
}

pub struct Services {}

impl AppModule<ServicesConfig> for Services {}

impl Services {
    pub fn init<'a>(
        app_config: &'a AppConfig,
        config: &'a ServicesConfig,
    ) -> PartialResult<ListServices<'a, FastlyClient>> {
        let provider = FastlyClient::new(app_config.api_token.as_str(), app_config.fastly_client_opts())
            .context("Failed to create Fastly API client")?;

        Services::with_provider(app_config, config, provider)
    }

    pub fn with_provider<'a, P: ProviderApi>(
        app_config: &'a AppConfig,
        config: &'a ServicesConfig,
        provider: P,
    ) -> PartialResult<ListServices<'a, P>> {
        let env = Self::init_env(app_config, config)?;

        Ok(ListServices { env, provider })
    }
}

pub struct ListServices<'a, P> {
    env: Environment<'a, ServicesConfig>,
    provider: P,
}

impl<'a, P: ProviderApi> ListServices<'a, P> {
    pub async fn list_services(self) -> PartialResult<FetchDetails<'a, P>> {
        if self.env.console.not_quiet() {
            self.env.console.caption("Listing services.");
        }

        info!("Listing services.");
        let services = match self.provider.list_services().await {
            Ok(services) => services,
            Err(err) => {
                self.env
                    .console
                    .error(format!("Failed to list services: {:#}", anyhow::Error::from(err)));
                return Err(PartialError::Failed(ExitStatus::Failed));
            }
        };
        info!("Finished listing services.");

        Ok(FetchDetails {
            env: self.env,
            provider: self.provider,
            services,
        })
    }
}

pub struct FetchDetails<'a, P> {
    env: Environment<'a, ServicesConfig>,
    provider: P,
    services: Vec<Service>,
}

impl<'a, P: ProviderApi> FetchDetails<'a, P> {
    pub async fn fetch_details(self) -> PartialResult<OutputServices<'a>> {
        if self.env.console.not_quiet() {
            self.env
                .console
                .info(format!("Fetching details of {} services.", self.services.len()));
        }

        let provider = &self.provider;
        let details = stream::iter(self.services.iter())
            .map(|service| async move { (service, provider.get_service_details(&service.id).await) })
            .buffer_unordered(self.env.app_config.max_concurrent_services)
            .collect::<Vec<_>>();
        let (details, run_time) = time_infallible(details).await;

        let mut failures = 0;
        let mut overviews = Vec::with_capacity(details.len());
        for (service, res) in details {
            match res {
                Ok(detail) => overviews.push(ServiceOverview::from(&detail)),
                Err(err) => {
                    failures += 1;
                    warn!("Failed to fetch details of service '{}' ({}): {}", service.name, service.id, err);
                }
            }
        }

        if self.env.console.not_quiet() {
            self.env.console.info(format!(
                "Received details of {} services within {} ms.",
                overviews.len(),
                run_time.as_millis()
            ));
        }
        if failures > 0 {
            self.env
                .console
                .attention(format!("Failed to fetch details of {} services.", failures));
        }

        let overviews = if self.env.mod_config.all {
            overviews
        } else {
            overviews.into_iter().filter(|x| x.active).collect()
        };

        Ok(OutputServices {
            env: self.env,
            services: ServiceOverviews::new(overviews),
        })
    }
}

pub struct OutputServices<'a> {
    env: Environment<'a, ServicesConfig>,
    services: ServiceOverviews,
}

impl OutputServices<'_> {
    pub fn output(self) -> PartialResult<ExitStatus> {
        output::output(&self.env.app_config.output_config, &self.services)?;
        self.env.console.print_finished();

        Ok(ExitStatus::Ok)
    }
}
