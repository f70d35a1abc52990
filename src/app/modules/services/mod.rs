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
mod services;

use config::ServicesConfig;
use services::Services;

pub use services::{ServiceOverview, ServiceOverviews};

pub async fn run(args: &ArgMatches, app_config: &AppConfig) -> Result<ExitStatus> {
    info!("services module selected.");
    let args = args
        .subcommand_matches("services")
        .context("services module selected without its arguments")?;
    let config: ServicesConfig = args.try_into()?;

    let steps = async {
        Services::init(app_config, &config)?
            .list_services()
            .await?
            .fetch_details()
            .await?
            .output()
    };

    steps.await.into_result()
}
