// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::convert::TryFrom;

use clap::ArgMatches;

#[derive(Debug, Default)]
pub struct ServicesConfig {
    /// Include services without an active version
    pub all: bool,
}

impl TryFrom<&ArgMatches> for ServicesConfig {
    type Error = anyhow::Error;

    fn try_from(args: &ArgMatches) -> std::result::Result<Self, Self::Error> {
        let config = ServicesConfig {
            all: args.get_flag("all"),
        };

        Ok(config)
    }
}
