// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::convert::TryInto;

use anyhow::{Context, Result};
use clap::ArgMatches;
use tracing::info;

use crate::app::modules::PartialResultExt;
use crate::app::AppConfig;
use crate::app::ExitStatus;

pub mod config;
#[allow(clippy::module_inception)]
mod users;

use config::UsersConfig;
use users::Users;

pub use users::CustomerUsers;

pub async fn run(args: &ArgMatches, app_config: &AppConfig) -> Result<ExitStatus> {
    info!("users module selected.");
    let args = args
        .subcommand_matches("users")
        .context("users module selected without its arguments")?;
    let config: UsersConfig = args.try_into()?;

    let steps = async {
        Users::init(app_config, &config)?
            .customer_id()
            .await?
            .list_users()
            .await?
            .output()
    };

    steps.await.into_result()
}
