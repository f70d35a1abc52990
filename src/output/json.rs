// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::collections::HashSet;
use std::convert::TryFrom;
use std::io::Write;

use serde::Serialize;

use super::OutputFormat;
use crate::{Error, Result};

#[derive(Debug, Default)]
pub struct JsonOptions {
    /// Pretty formatting
    pretty: bool,
}

impl JsonOptions {
    pub fn new(pretty: bool) -> JsonOptions {
        JsonOptions { pretty }
    }
}

#[derive(Debug, Default)]
pub struct JsonFormat {
    opts: JsonOptions,
}

impl JsonFormat {
    pub fn new(opts: JsonOptions) -> JsonFormat {
        JsonFormat { opts }
    }
}

impl<'a> TryFrom<Vec<&'a str>> for JsonOptions {
    type Error = Error;

    fn try_from(values: Vec<&'a str>) -> std::result::Result<Self, Self::Error> {
        let options: HashSet<&str> = values.into_iter().collect();
        Ok(JsonOptions {
            pretty: options.contains("pretty"),
        })
    }
}

impl<T: Serialize> OutputFormat<T> for JsonFormat {
    fn output<W: Write>(&self, writer: &mut W, data: &T) -> Result<()> {
        if self.opts.pretty {
            serde_json::to_writer_pretty(&mut *writer, data)?;
        } else {
            serde_json::to_writer(&mut *writer, data)?;
        }
        writeln!(writer)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use spectral::prelude::*;

    use super::*;
    use crate::output::{Output, OutputConfig};
    use crate::report::{AggregatedServiceReport, Reports};
    use crate::service::ServiceRef;

    #[test]
    fn json_serialization() {
        crate::utils::tests::logging::init();
        let opts = JsonOptions::default();
        let config = OutputConfig::json(opts);
        let output = Output::new(&config);
        let mut report = AggregatedServiceReport::new(&ServiceRef::new("www.example.com", "svc1", Some(1)));
        report.traffic.requests = 42;
        let reports = Reports::new(vec![report]);

        let mut buf = Vec::new();
        let res = output.output(&mut buf, &reports);

        assert_that(&res).is_ok();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_that(&value[0]["service_id"].as_str()).is_some().is_equal_to("svc1");
        assert_that(&value[0]["traffic"]["requests"].as_u64()).is_some().is_equal_to(42);
        assert_that(&value[0]["domains"]["found"].is_array()).is_true();
    }

    #[test]
    fn parse_options() {
        let opts = JsonOptions::try_from(vec!["pretty"]).unwrap();

        assert_that(&opts.pretty).is_true();
    }
}
