// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::convert::TryFrom;
use std::io::Write;

use serde::Serialize;

use crate::Error;
use crate::Result;

pub mod csv;
pub mod json;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputType {
    Csv,
    Json,
}

impl TryFrom<&str> for OutputType {
    type Error = Error;

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        match value {
            "csv" => Ok(OutputType::Csv),
            "json" => Ok(OutputType::Json),
            _ => Err(Error::ParserError {
                what: value.to_string(),
                to: "OutputType",
                why: "invalid output type".to_string(),
            }),
        }
    }
}

pub trait OutputFormat<T> {
    fn output<W: Write>(&self, writer: &mut W, data: &T) -> Result<()>;
}

#[derive(Debug)]
pub enum OutputConfig {
    Csv { format: csv::CsvFormat },
    Json { format: json::JsonFormat },
}

impl OutputConfig {
    pub fn csv(opts: csv::CsvOptions) -> Self {
        OutputConfig::Csv {
            format: csv::CsvFormat::new(opts),
        }
    }

    pub fn json(opts: json::JsonOptions) -> Self {
        OutputConfig::Json {
            format: json::JsonFormat::new(opts),
        }
    }
}

#[derive(Debug)]
pub struct Output<'a> {
    config: &'a OutputConfig,
}

impl Output<'_> {
    pub fn new(config: &OutputConfig) -> Output<'_> {
        Output { config }
    }
}

impl<T: Serialize + csv::CsvFormatter> OutputFormat<T> for Output<'_> {
    fn output<W: Write>(&self, writer: &mut W, data: &T) -> Result<()> {
        match self.config {
            OutputConfig::Csv { format } => format.output(writer, data),
            OutputConfig::Json { format } => format.output(writer, data),
        }
    }
}

#[cfg(test)]
mod tests {
    use spectral::prelude::*;

    use super::*;

    #[test]
    fn parse_output_type() {
        assert_that(&OutputType::try_from("csv")).is_ok().is_equal_to(OutputType::Csv);
        assert_that(&OutputType::try_from("json")).is_ok().is_equal_to(OutputType::Json);
        assert_that(&OutputType::try_from("summary")).is_err();
    }
}
