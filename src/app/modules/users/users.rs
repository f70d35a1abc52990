// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::io::Write;

use anyhow::Context;
use serde::Serialize;
use tracing::{debug, info};

use crate::app::modules::users::config::UsersConfig;
use crate::app::modules::{AppModule, Environment, PartialError, PartialResult};
use crate::app::utils::time;
use crate::app::{output, AppConfig, ExitStatus};
use crate::output::csv::{self, CsvFormatter, CsvOptions};
use crate::provider::{FastlyClient, ProviderApi, User};

pub static USER_COLUMNS: [&str; 3] = ["updated at", "login", "role"];

/// Users of one customer account, most recently updated first.
#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct CustomerUsers {
    users: Vec<User>,
}

impl CustomerUsers {
    pub fn new(mut users: Vec<User>) -> CustomerUsers {
        // Users never updated go last
        users.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.login.cmp(&b.login)));
        CustomerUsers { users }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, User> {
        self.users.iter()
    }
}

impl CsvFormatter for CustomerUsers {
    fn output<W: Write>(&self, writer: &mut W, opts: &CsvOptions) -> crate::Result<()> {
        if !opts.no_header() {
            csv::write_row(writer, USER_COLUMNS.iter())?;
        }
        for user in &self.users {
            csv::write_row(
                writer,
                [
                    csv::timestamp(&user.updated_at),
                    user.login.clone(),
                    user.role.clone().unwrap_or_default(),
                ],
            )?;
        }

        Ok(())
    }
}

pub struct Users {}

impl AppModule<UsersConfig> for Users {}

impl Users {
    pub fn init<'a>(app_config: &'a AppConfig, config: &'a UsersConfig) -> PartialResult<CustomerId<'a, FastlyClient>> {
        let provider = FastlyClient::new(app_config.api_token.as_str(), app_config.fastly_client_opts())
            .context("Failed to create Fastly API client")?;

        Users::with_provider(app_config, config, provider)
    }

    pub fn with_provider<'a, P: ProviderApi>(
        app_config: &'a AppConfig,
        config: &'a UsersConfig,
        provider: P,
    ) -> PartialResult<CustomerId<'a, P>> {
        let env = Self::init_env(app_config, config)?;

        Ok(CustomerId { env, provider })
    }
}

pub struct CustomerId<'a, P> {
    env: Environment<'a, UsersConfig>,
    provider: P,
}

impl<'a, P: ProviderApi> CustomerId<'a, P> {
    /// Uses the configured customer id or the customer of the first listed service.
    pub async fn customer_id(self) -> PartialResult<ListUsers<'a, P>> {
        if let Some(customer_id) = self.env.mod_config.customer_id.clone() {
            return Ok(ListUsers {
                env: self.env,
                provider: self.provider,
                customer_id,
            });
        }

        info!("No customer id given; looking it up from services.");
        let services = match self.provider.list_services().await {
            Ok(services) => services,
            Err(err) => {
                self.env
                    .console
                    .error(format!("Failed to list services: {:#}", anyhow::Error::from(err)));
                return Err(PartialError::Failed(ExitStatus::Failed));
            }
        };
        let customer_id = services.into_iter().find_map(|x| x.customer_id);
        debug!("Found customer id {:?}", customer_id);

        match customer_id {
            Some(customer_id) => Ok(ListUsers {
                env: self.env,
                provider: self.provider,
                customer_id,
            }),
            None => {
                self.env
                    .console
                    .error("No customer id given and no service carries one. Aborting.");
                Err(PartialError::Failed(ExitStatus::Failed))
            }
        }
    }
}

pub struct ListUsers<'a, P> {
    env: Environment<'a, UsersConfig>,
    provider: P,
    customer_id: String,
}

impl<'a, P: ProviderApi> ListUsers<'a, P> {
    pub async fn list_users(self) -> PartialResult<OutputUsers<'a>> {
        if self.env.console.not_quiet() {
            self.env
                .console
                .caption(format!("Listing users of customer {}.", self.customer_id));
        }

        info!("Listing users.");
        let (users, run_time) = match time(self.provider.list_customer_users(&self.customer_id)).await {
            Ok(res) => res,
            Err(err) => {
                self.env
                    .console
                    .error(format!("Failed to list users: {:#}", anyhow::Error::from(err)));
                return Err(PartialError::Failed(ExitStatus::Failed));
            }
        };
        info!("Finished listing users.");

        if self.env.console.not_quiet() {
            self.env
                .console
                .info(format!("Received {} users within {} ms.", users.len(), run_time.as_millis()));
        }

        Ok(OutputUsers {
            env: self.env,
            users: CustomerUsers::new(users),
        })
    }
}

pub struct OutputUsers<'a> {
    env: Environment<'a, UsersConfig>,
    users: CustomerUsers,
}

impl OutputUsers<'_> {
    pub fn output(self) -> PartialResult<ExitStatus> {
        output::output(&self.env.app_config.output_config, &self.users)?;
        self.env.console.print_finished();

        Ok(ExitStatus::Ok)
    }
}

#[cfg(test)]
mod tests {
    use std::convert::TryFrom;

    use spectral::prelude::*;

    use super::*;
    use crate::app::cli_parser::create_parser;
    use crate::utils::tests::{Call, FakeProvider};

    fn app_config() -> AppConfig {
        let args = create_parser()
            .try_get_matches_from(["fastly-report", "--api-token", "token", "--quiet", "users"])
            .unwrap();
        AppConfig::try_from(&args).unwrap()
    }

    fn provider() -> FakeProvider {
        FakeProvider::new()
            .with_service("a", "www.example.com", Some(1))
            .with_user("customer", "alice@example.com", "2021-01-01T00:00:00Z")
            .with_user("customer", "bob@example.com", "2021-06-01T00:00:00Z")
            .with_user("customer", "carol@example.com", "2020-03-01T00:00:00Z")
    }

    #[tokio::test]
    async fn users_of_first_service_customer_newest_first() {
        crate::utils::tests::logging::init();
        let app_config = app_config();
        let config = UsersConfig::default();

        let output = Users::with_provider(&app_config, &config, provider())
            .unwrap()
            .customer_id()
            .await
            .unwrap()
            .list_users()
            .await
            .unwrap();

        let logins: Vec<&str> = output.users.iter().map(|x| x.login.as_str()).collect();
        assert_that(&logins).is_equal_to(vec!["bob@example.com", "alice@example.com", "carol@example.com"]);
    }

    #[tokio::test]
    async fn explicit_customer_id_skips_service_listing() {
        crate::utils::tests::logging::init();
        let app_config = app_config();
        let config = UsersConfig {
            customer_id: Some("customer".to_string()),
        };
        let provider = provider().failing("", Call::Services);

        let output = Users::with_provider(&app_config, &config, provider)
            .unwrap()
            .customer_id()
            .await
            .unwrap()
            .list_users()
            .await
            .unwrap();

        assert_that(&output.users.len()).is_equal_to(3);
    }

    #[tokio::test]
    async fn no_customer_fails_module() {
        crate::utils::tests::logging::init();
        let app_config = app_config();
        let config = UsersConfig::default();

        let res = Users::with_provider(&app_config, &config, FakeProvider::new())
            .unwrap()
            .customer_id()
            .await;

        assert_that(&matches!(res, Err(PartialError::Failed(ExitStatus::Failed)))).is_true();
    }

    #[tokio::test]
    async fn failing_user_listing_fails_module() {
        crate::utils::tests::logging::init();
        let app_config = app_config();
        let config = UsersConfig::default();
        let provider = provider().failing("customer", Call::Users);

        let res = Users::with_provider(&app_config, &config, provider)
            .unwrap()
            .customer_id()
            .await
            .unwrap()
            .list_users()
            .await;

        assert_that(&matches!(res, Err(PartialError::Failed(ExitStatus::Failed)))).is_true();
    }

    #[test]
    fn csv_output() {
        let users = CustomerUsers::new(vec![User {
            id: None,
            login: "alice@example.com".to_string(),
            name: None,
            role: Some("engineer".to_string()),
            created_at: None,
            updated_at: Some(crate::utils::tests::ts("2021-01-01T00:00:00Z")),
        }]);
        let mut buf = Vec::new();

        users.output(&mut buf, &CsvOptions::default()).unwrap();

        let text = String::from_utf8(buf).unwrap();
        assert_that(&text.as_str())
            .is_equal_to("updated at,login,role\n2021-01-01T00:00:00Z,alice@example.com,engineer\n");
    }
}
