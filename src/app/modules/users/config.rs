// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::convert::TryFrom;

use anyhow::anyhow;
use clap::ArgMatches;

#[derive(Debug, Default)]
pub struct UsersConfig {
    /// Falls back to the customer of the first listed service if absent
    pub customer_id: Option<String>,
}

impl TryFrom<&ArgMatches> for UsersConfig {
    type Error = anyhow::Error;

    fn try_from(args: &ArgMatches) -> std::result::Result<Self, Self::Error> {
        let customer_id = match args.get_one::<String>("customer-id").map(|x| x.trim()) {
            Some("") => return Err(anyhow!("customer id must not be empty")),
            Some(id) => Some(id.to_string()),
            None => None,
        };

        Ok(UsersConfig { customer_id })
    }
}

#[cfg(test)]
mod tests {
    use std::convert::TryInto;

    use spectral::prelude::*;

    use super::*;
    use crate::app::cli_parser::create_parser;

    fn users_config(args: &[&str]) -> anyhow::Result<UsersConfig> {
        let matches = create_parser().try_get_matches_from(args).unwrap();
        let matches = matches.subcommand_matches("users").unwrap();
        matches.try_into()
    }

    #[test]
    fn customer_id_is_optional() {
        let config = users_config(&["fastly-report", "users"]).unwrap();

        assert_that(&config.customer_id).is_none();
    }

    #[test]
    fn customer_id() {
        let config = users_config(&["fastly-report", "users", "x4xCwxxJxGCx123Rx5xTx"]).unwrap();

        assert_that(&config.customer_id)
            .is_some()
            .is_equal_to("x4xCwxxJxGCx123Rx5xTx".to_string());
    }

    #[test]
    fn blank_customer_id_is_rejected() {
        let res = users_config(&["fastly-report", "users", " "]);

        assert_that(&res.is_err()).is_true();
    }
}
