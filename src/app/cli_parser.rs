// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! This file is used by the build script. Therefore all functions generating the app command line parser must be included
//! here. It would be nicer to move at least the subcommands to the corresponding modules, but then all logic, all crates
//! etc. used there have to be available for the build script which makes it much more complex.

use clap::{value_parser, Arg, ArgAction, Command};

pub static SUPPORTED_OUTPUT_FORMATS: &[&str] = &["csv", "json"];

pub static API_TOKEN_ENV_VAR: &str = "FASTLY_API_TOKEN";

pub fn create_parser() -> Command {
    Command::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .disable_help_subcommand(true)
        .propagate_version(true)
        .infer_subcommands(true)
        .subcommand_required(true)
        .arg(
            Arg::new("api-token")
                .long("api-token")
                .value_name("TOKEN")
                .global(true)
                .help("Sets the Fastly API token; defaults to the environment variable FASTLY_API_TOKEN"),
        )
        .arg(
            Arg::new("api-url")
                .long("api-url")
                .value_name("URL")
                .default_value("https://api.fastly.com")
                .global(true)
                .help("Sets the base URL of the Fastly API"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_name("DURATION")
                .default_value("10s")
                .global(true)
                .help("Sets the timeout of each API request, e.g., 10s or 1m"),
        )
        .arg(
            Arg::new("dns-timeout")
                .long("dns-timeout")
                .value_name("DURATION")
                .default_value("5s")
                .global(true)
                .help("Sets the timeout of each DNS query"),
        )
        .arg(
            Arg::new("dns-attempts")
                .long("dns-attempts")
                .value_name("NUMBER")
                .default_value("2")
                .value_parser(value_parser!(usize))
                .global(true)
                .help("Sets the number of attempts of each DNS query"),
        )
        .arg(
            Arg::new("max-concurrent-services")
                .long("max-concurrent-services")
                .value_name("NUMBER")
                .default_value("8")
                .value_parser(value_parser!(usize))
                .global(true)
                .help("Sets max. number of services to enrich concurrently"),
        )
        .arg(
            Arg::new("deadline")
                .long("deadline")
                .value_name("DURATION")
                .global(true)
                .help("Cancels all outstanding work after this duration, e.g., 2m")
                .long_help(
                    "Cancels all outstanding work after this duration, e.g., 2m. Services already in flight are reported with a cancellation annotation; services not started yet are missing from the report.",
                ),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FORMAT")
                .default_value("csv")
                .value_parser(SUPPORTED_OUTPUT_FORMATS.to_vec())
                .global(true)
                .help("Sets the output format for result presentation"),
        )
        .arg(
            Arg::new("output-options")
                .long("output-options")
                .value_name("OPTION")
                .value_delimiter(',')
                .action(ArgAction::Append)
                .global(true)
                .help("Sets output options")
                .long_help(
                    "* csv: wide, no-header
* json: pretty",
                ),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Does not print anything but results"),
        )
        .arg(
            Arg::new("no-color")
                .long("no-color")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Disables colorful output"),
        )
        .arg(
            Arg::new("ascii")
                .long("ascii")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Uses only ASCII compatible characters for output"),
        )
        .arg(
            Arg::new("show-errors")
                .long("show-errors")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Shows error counts"),
        )
        .arg(
            Arg::new("v")
                .short('v')
                .action(ArgAction::Count)
                .global(true)
                .help("Sets the level of verbosity"),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Uses debug formatting for logging -- much more verbose"),
        )
        .subcommand(traffic_subcommand())
        .subcommand(users_subcommand())
        .subcommand(services_subcommand())
}

fn traffic_subcommand() -> Command {
    Command::new("traffic")
        .about("Reports origins, name servers, and traffic of all services ranked by requests")
        .arg(
            Arg::new("s3-only")
                .long("s3-only")
                .action(ArgAction::SetTrue)
                .help("Reports only services with multiple domains of which at least one is an S3 domain"),
        )
}

fn users_subcommand() -> Command {
    Command::new("users")
        .about("Lists the users of a customer account, most recently updated first")
        .arg(
            Arg::new("customer-id")
                .index(1)
                .value_name("CUSTOMER ID")
                .help("Customer id; defaults to the customer of the first listed service"),
        )
}

fn services_subcommand() -> Command {
    Command::new("services")
        .about("Lists active services with their number of versions, most recently updated first")
        .arg(
            Arg::new("all")
                .long("all")
                .action(ArgAction::SetTrue)
                .help("Includes services without an active version"),
        )
}
