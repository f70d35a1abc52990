// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::convert::TryFrom;

use clap::ArgMatches;

#[derive(Debug, Default)]
pub struct TrafficConfig {
    /// Keep only services with several domains, one of them an S3 bucket
    pub s3_only: bool,
}

impl TryFrom<&ArgMatches> for TrafficConfig {
    type Error = anyhow::Error;

    fn try_from(args: &ArgMatches) -> std::result::Result<Self, Self::Error> {
        let config = TrafficConfig {
            s3_only: args.get_flag("s3-only"),
        };

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::convert::TryInto;

    use spectral::prelude::*;

    use super::*;
    use crate::app::cli_parser::create_parser;

    fn traffic_config(args: &[&str]) -> TrafficConfig {
        let matches = create_parser().try_get_matches_from(args).unwrap();
        let matches = matches.subcommand_matches("traffic").unwrap();
        matches.try_into().unwrap()
    }

    #[test]
    fn defaults_to_all_services() {
        let config = traffic_config(&["fastly-report", "traffic"]);

        assert_that(&config.s3_only).is_false();
    }

    #[test]
    fn s3_only() {
        let config = traffic_config(&["fastly-report", "traffic", "--s3-only"]);

        assert_that(&config.s3_only).is_true();
    }
}
