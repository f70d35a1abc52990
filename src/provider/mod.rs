// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Boundary to the CDN provider's management API.
//!
//! [`ProviderApi`] lists the operations the report needs. [`FastlyClient`] implements them
//! against the Fastly REST API. Every call is a single request; there is no pagination and no
//! retry. Each request carries the configured timeout.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument, trace};

pub use error::Error;
pub use types::{Backend, Domain, Service, ServiceDetail, StatsData, StatsMeta, StatsResponse, User, Version};

pub mod error;
pub mod types;

pub type Result<T> = std::result::Result<T, Error>;

pub static FASTLY_API_URL: &str = "https://api.fastly.com";
static API_KEY_HEADER: &str = "Fastly-Key";

/// Time window and sampling interval of a statistics query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsWindow {
    pub from: &'static str,
    /// Sampling interval: `minute`, `hour`, or `day`
    pub by: &'static str,
}

impl StatsWindow {
    pub const PAST_TWO_MONTHS: StatsWindow = StatsWindow {
        from: "two months ago",
        by: "day",
    };
}

#[async_trait]
pub trait ProviderApi: Send + Sync {
    async fn list_services(&self) -> Result<Vec<Service>>;

    async fn list_backends(&self, service_id: &str, version: u32) -> Result<Vec<Backend>>;

    async fn list_service_domains(&self, service_id: &str) -> Result<Vec<Domain>>;

    async fn get_stats(&self, service_id: &str, window: &StatsWindow) -> Result<StatsResponse>;

    async fn list_customer_users(&self, customer_id: &str) -> Result<Vec<User>>;

    async fn get_service_details(&self, service_id: &str) -> Result<ServiceDetail>;
}

#[async_trait]
impl<T: ProviderApi + ?Sized> ProviderApi for Arc<T> {
    async fn list_services(&self) -> Result<Vec<Service>> {
        (**self).list_services().await
    }

    async fn list_backends(&self, service_id: &str, version: u32) -> Result<Vec<Backend>> {
        (**self).list_backends(service_id, version).await
    }

    async fn list_service_domains(&self, service_id: &str) -> Result<Vec<Domain>> {
        (**self).list_service_domains(service_id).await
    }

    async fn get_stats(&self, service_id: &str, window: &StatsWindow) -> Result<StatsResponse> {
        (**self).get_stats(service_id, window).await
    }

    async fn list_customer_users(&self, customer_id: &str) -> Result<Vec<User>> {
        (**self).list_customer_users(customer_id).await
    }

    async fn get_service_details(&self, service_id: &str) -> Result<ServiceDetail> {
        (**self).get_service_details(service_id).await
    }
}

#[derive(Debug, Clone)]
pub struct FastlyClientOpts {
    base_url: String,
    timeout: Duration,
}

impl FastlyClientOpts {
    pub fn new<T: Into<String>>(base_url: T, timeout: Duration) -> FastlyClientOpts {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        FastlyClientOpts { base_url, timeout }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for FastlyClientOpts {
    fn default() -> Self {
        FastlyClientOpts::new(FASTLY_API_URL, Duration::from_secs(10))
    }
}

#[derive(Clone)]
pub struct FastlyClient {
    client: Client,
    api_token: Arc<String>,
    opts: Arc<FastlyClientOpts>,
}

impl fmt::Debug for FastlyClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FastlyClient")
            .field("api_token", &"<redacted>")
            .field("opts", &self.opts)
            .finish()
    }
}

impl FastlyClient {
    pub fn new<T: Into<String>>(api_token: T, opts: FastlyClientOpts) -> Result<FastlyClient> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(opts.timeout)
            .build()
            .map_err(|e| Error::HttpClientError {
                why: "failed to build HTTP client",
                source: e,
            })?;

        Ok(FastlyClient {
            client,
            api_token: Arc::new(api_token.into()),
            opts: Arc::new(opts),
        })
    }

    pub fn opts(&self) -> &FastlyClientOpts {
        &self.opts
    }

    async fn do_call<T: DeserializeOwned>(&self, path: &str, query_params: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}{}", self.opts.base_url, path);
        debug!("GET {}", url);

        let res = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, self.api_token.as_str())
            .header(reqwest::header::ACCEPT, "application/json")
            .query(query_params)
            .send()
            .await
            .map_err(|e| Error::HttpClientError {
                why: "call failed",
                source: e,
            })?;

        let status = res.status();
        let body = res.text().await.map_err(|e| Error::HttpClientError {
            why: "reading body failed",
            source: e,
        })?;
        trace!("Received status {} and body {}", status, body);

        if !status.is_success() {
            return Err(Error::HttpClientErrorMessage {
                why: "unexpected status code",
                details: format!("status code: {}, body: {}", status, body),
            });
        }

        serde_json::from_str::<T>(&body).map_err(Error::from)
    }
}

#[async_trait]
impl ProviderApi for FastlyClient {
    #[instrument(name = "list services", level = "info", skip(self))]
    async fn list_services(&self) -> Result<Vec<Service>> {
        self.do_call("/service", &[]).await
    }

    #[instrument(name = "list backends", level = "debug", skip(self))]
    async fn list_backends(&self, service_id: &str, version: u32) -> Result<Vec<Backend>> {
        let path = format!("/service/{}/version/{}/backend", service_id, version);
        self.do_call(&path, &[]).await
    }

    #[instrument(name = "list domains", level = "debug", skip(self))]
    async fn list_service_domains(&self, service_id: &str) -> Result<Vec<Domain>> {
        let path = format!("/service/{}/domain", service_id);
        self.do_call(&path, &[]).await
    }

    #[instrument(name = "get stats", level = "debug", skip(self))]
    async fn get_stats(&self, service_id: &str, window: &StatsWindow) -> Result<StatsResponse> {
        let path = format!("/stats/service/{}", service_id);
        self.do_call(&path, &[("from", window.from), ("by", window.by)]).await
    }

    #[instrument(name = "list users", level = "info", skip(self))]
    async fn list_customer_users(&self, customer_id: &str) -> Result<Vec<User>> {
        let path = format!("/customer/{}/users", customer_id);
        self.do_call(&path, &[]).await
    }

    #[instrument(name = "get service details", level = "debug", skip(self))]
    async fn get_service_details(&self, service_id: &str) -> Result<ServiceDetail> {
        let path = format!("/service/{}/details", service_id);
        self.do_call(&path, &[]).await
    }
}
