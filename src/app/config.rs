// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::convert::TryFrom;
use std::fmt;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::ArgMatches;

use crate::aggregation::AggregatorOpts;
use crate::app::cli_parser::API_TOKEN_ENV_VAR;
use crate::output::csv::CsvOptions;
use crate::output::json::JsonOptions;
use crate::output::{OutputConfig, OutputType};
use crate::provider::FastlyClientOpts;
use crate::resolver::ResolverOpts;

pub struct AppConfig {
    pub api_token: String,
    pub api_url: String,
    pub timeout: Duration,
    pub dns_timeout: Duration,
    pub dns_attempts: usize,
    pub max_concurrent_services: usize,
    pub deadline: Option<Duration>,
    pub quiet: bool,
    pub no_color: bool,
    pub ascii: bool,
    pub show_errors: bool,
    pub output: OutputType,
    pub output_config: OutputConfig,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_token", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("timeout", &self.timeout)
            .field("dns_timeout", &self.dns_timeout)
            .field("dns_attempts", &self.dns_attempts)
            .field("max_concurrent_services", &self.max_concurrent_services)
            .field("deadline", &self.deadline)
            .field("quiet", &self.quiet)
            .field("no_color", &self.no_color)
            .field("ascii", &self.ascii)
            .field("show_errors", &self.show_errors)
            .field("output", &self.output)
            .field("output_config", &self.output_config)
            .finish()
    }
}

impl AppConfig {
    pub fn fastly_client_opts(&self) -> FastlyClientOpts {
        FastlyClientOpts::new(self.api_url.as_str(), self.timeout)
    }

    pub fn resolver_opts(&self) -> ResolverOpts {
        ResolverOpts {
            attempts: self.dns_attempts,
            timeout: self.dns_timeout,
        }
    }

    pub fn aggregator_opts(&self) -> AggregatorOpts {
        AggregatorOpts {
            max_concurrent_tasks: self.max_concurrent_services,
            deadline: self.deadline,
        }
    }
}

impl TryFrom<&ArgMatches> for AppConfig {
    type Error = anyhow::Error;

    fn try_from(args: &ArgMatches) -> std::result::Result<Self, Self::Error> {
        let output = args
            .get_one::<String>("output")
            .map(|x| OutputType::try_from(x.as_str()).context("failed to parse output type"))
            .unwrap_or(Ok(OutputType::Csv))?;
        let max_concurrent_services = args.get_one::<usize>("max-concurrent-services").copied().unwrap_or(8);
        if max_concurrent_services == 0 {
            return Err(anyhow!("max-concurrent-services must be at least 1"));
        }

        let config = AppConfig {
            api_token: api_token(
                args.get_one::<String>("api-token").map(String::as_str),
                std::env::var(API_TOKEN_ENV_VAR).ok(),
            )?,
            api_url: args
                .get_one::<String>("api-url")
                .cloned()
                .unwrap_or_else(|| crate::provider::FASTLY_API_URL.to_string()),
            timeout: duration(args, "timeout")?.unwrap_or_else(|| Duration::from_secs(10)),
            dns_timeout: duration(args, "dns-timeout")?.unwrap_or_else(|| Duration::from_secs(5)),
            dns_attempts: args.get_one::<usize>("dns-attempts").copied().unwrap_or(2),
            max_concurrent_services,
            deadline: duration(args, "deadline")?,
            quiet: args.get_flag("quiet"),
            no_color: args.get_flag("no-color"),
            ascii: args.get_flag("ascii"),
            show_errors: args.get_flag("show-errors"),
            output_config: output_config(output, args)?,
            output,
        };

        Ok(config)
    }
}

/// The command line argument takes precedence over the environment.
fn api_token(arg: Option<&str>, env: Option<String>) -> Result<String> {
    arg.map(ToString::to_string)
        .or(env)
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .ok_or_else(|| anyhow!("no API token; set {} or use --api-token", API_TOKEN_ENV_VAR))
}

fn duration(args: &ArgMatches, name: &str) -> Result<Option<Duration>> {
    args.get_one::<String>(name)
        .map(|x| humantime::parse_duration(x).with_context(|| format!("failed to parse {}", name)))
        .transpose()
}

fn output_config(output_type: OutputType, args: &ArgMatches) -> Result<OutputConfig> {
    let options: Vec<&str> = args
        .get_many::<String>("output-options")
        .map(|xs| xs.map(String::as_str).collect())
        .unwrap_or_default();
    parse_output_options(output_type, options)
}

fn parse_output_options(output_type: OutputType, options: Vec<&str>) -> Result<OutputConfig> {
    match output_type {
        OutputType::Csv => {
            let options = CsvOptions::try_from(options).context("failed to parse csv options")?;
            Ok(OutputConfig::csv(options))
        }
        OutputType::Json => {
            let options = JsonOptions::try_from(options).context("failed to parse json options")?;
            Ok(OutputConfig::json(options))
        }
    }
}

#[cfg(test)]
mod tests {
    use spectral::prelude::*;

    use super::*;
    use crate::app::cli_parser::create_parser;

    fn config(args: &[&str]) -> Result<AppConfig> {
        let mut argv = vec!["fastly-report", "--api-token", "token"];
        argv.extend_from_slice(args);
        let matches = create_parser().try_get_matches_from(argv)?;
        AppConfig::try_from(&matches)
    }

    #[test]
    fn defaults() {
        let config = config(&["traffic"]).unwrap();

        assert_that(&config.api_token).is_equal_to("token".to_string());
        assert_that(&config.api_url).is_equal_to("https://api.fastly.com".to_string());
        assert_that(&config.timeout).is_equal_to(Duration::from_secs(10));
        assert_that(&config.dns_timeout).is_equal_to(Duration::from_secs(5));
        assert_that(&config.dns_attempts).is_equal_to(2);
        assert_that(&config.max_concurrent_services).is_equal_to(8);
        assert_that(&config.deadline).is_none();
        assert_that(&config.output).is_equal_to(OutputType::Csv);
    }

    #[test]
    fn global_options_after_subcommand() {
        let config = config(&[
            "traffic",
            "--deadline",
            "2m",
            "--timeout",
            "500ms",
            "--max-concurrent-services",
            "3",
            "-o",
            "json",
            "--output-options",
            "pretty",
        ])
        .unwrap();

        assert_that(&config.deadline).is_some().is_equal_to(Duration::from_secs(120));
        assert_that(&config.timeout).is_equal_to(Duration::from_millis(500));
        assert_that(&config.aggregator_opts().max_concurrent_tasks).is_equal_to(3);
        assert_that(&config.output).is_equal_to(OutputType::Json);
    }

    #[test]
    fn invalid_duration() {
        let config = config(&["traffic", "--timeout", "soon"]);

        assert_that(&config).is_err();
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let config = config(&["traffic", "--max-concurrent-services", "0"]);

        assert_that(&config).is_err();
    }

    #[test]
    fn token_argument_wins_over_environment() {
        let token = api_token(Some("from-arg"), Some("from-env".to_string()));

        assert_that(&token).is_ok().is_equal_to("from-arg".to_string());
    }

    #[test]
    fn token_from_environment() {
        let token = api_token(None, Some("from-env\n".to_string()));

        assert_that(&token).is_ok().is_equal_to("from-env".to_string());
    }

    #[test]
    fn missing_or_blank_token() {
        assert_that(&api_token(None, None)).is_err();
        assert_that(&api_token(Some("  "), None)).is_err();
    }

    #[test]
    fn debug_does_not_leak_token() {
        let config = config(&["traffic"]).unwrap();

        assert_that(&format!("{:?}", config).contains("\"token\"")).is_false();
    }
}
