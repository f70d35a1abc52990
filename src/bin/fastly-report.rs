// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::convert::TryInto;
use std::env;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::ArgMatches;
use tracing::{debug, error, info};

use fastly_report::app::logging::Logging;
use fastly_report::app::modules;
use fastly_report::app::output::styles;
use fastly_report::app::{cli_parser, AppConfig, ExitStatus};

#[tokio::main]
async fn main() {
    let args = match cli_parser::create_parser().try_get_matches() {
        Ok(args) => args,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => err.exit(),
        Err(err) => {
            let _ = err.print();
            std::process::exit(ExitStatus::CliParsingFailed as i32);
        }
    };

    setup_terminal(&args);

    if let Err(err) = start_logging(&args) {
        eprintln!("Failed to initialize logging: {:#}", err);
        std::process::exit(ExitStatus::UnrecoverableError as i32);
    }
    debug!("Parsed args and set up logging.");

    let app_config: AppConfig = match (&args).try_into() {
        Ok(config) => config,
        Err(err) => {
            error!("Failed to parse configuration: {:#}", err);
            eprintln!("Failed to parse configuration: {:#}", err);
            std::process::exit(ExitStatus::ConfigParsingFailed as i32);
        }
    };
    debug!("Parsed app config {:?}", app_config);

    let exit_status = match run(&args, &app_config).await {
        Ok(exit_status) => exit_status,
        Err(err) => {
            error!("Failed to execute command: {:#}", err);
            eprintln!("Failed to execute command: {:#}", err);
            ExitStatus::Failed
        }
    };
    info!("Exiting with {:?}", exit_status);

    std::process::exit(exit_status as i32);
}

fn setup_terminal(args: &ArgMatches) {
    if args.get_flag("no-color") {
        styles::no_color_mode();
    }
    if args.get_flag("ascii") {
        styles::ascii_mode();
    }
}

fn start_logging(args: &ArgMatches) -> Result<()> {
    let color = !args.get_flag("no-color");
    Logging::new(
        args.get_count("v"),
        env::var_os("RUST_LOG"),
        color,
        args.get_flag("debug"),
    )
    .start()
}

async fn run(args: &ArgMatches, app_config: &AppConfig) -> Result<ExitStatus> {
    match args.subcommand_name() {
        Some("traffic") => modules::traffic::run(args, app_config).await,
        Some("users") => modules::users::run(args, app_config).await,
        Some("services") => modules::services::run(args, app_config).await,
        _ => {
            cli_parser::create_parser().print_help()?;
            Ok(ExitStatus::CliParsingFailed)
        }
    }
}
