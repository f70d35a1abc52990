// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Comma separated output with one header line and one line per item.
//!
//! Multi-valued cells are rendered as `[a b c]` so they never contain a comma. Cells that
//! nevertheless contain a comma, a quote, or a line break, e.g. a service name, are quoted.

use std::borrow::Cow;
use std::collections::HashSet;
use std::convert::TryFrom;
use std::io::Write;

use chrono::{DateTime, SecondsFormat, Utc};

use super::OutputFormat;
use crate::report::{AggregatedServiceReport, Reports};
use crate::{Error, Result};

pub static STATUS_COLUMNS: [&str; 10] = [
    "400status",
    "401status",
    "403status",
    "404status",
    "500status",
    "501status",
    "502status",
    "503status",
    "504status",
    "505status",
];

pub static REPORT_COLUMNS: [&str; 4] = ["service name", "origin", "domains", "hit-ratio"];

pub static WIDE_REPORT_COLUMNS: [&str; 10] = [
    "service name",
    "service id",
    "requests",
    "origin",
    "created date",
    "last updated",
    "ip",
    "domains",
    "name-servers",
    "hit-ratio",
];

#[derive(Debug, Clone, Default)]
pub struct CsvOptions {
    /// Add ids, requests, timestamps, addresses, and name servers
    wide: bool,
    /// Omit the header line
    no_header: bool,
}

impl CsvOptions {
    pub fn new(wide: bool, no_header: bool) -> CsvOptions {
        CsvOptions { wide, no_header }
    }

    pub fn wide(&self) -> bool {
        self.wide
    }

    pub fn no_header(&self) -> bool {
        self.no_header
    }
}

impl<'a> TryFrom<Vec<&'a str>> for CsvOptions {
    type Error = Error;

    fn try_from(values: Vec<&'a str>) -> std::result::Result<Self, Self::Error> {
        let options: HashSet<&str> = values.into_iter().collect();
        Ok(CsvOptions {
            wide: options.contains("wide"),
            no_header: options.contains("no-header"),
        })
    }
}

#[derive(Debug, Default)]
pub struct CsvFormat {
    opts: CsvOptions,
}

impl CsvFormat {
    pub fn new(opts: CsvOptions) -> CsvFormat {
        CsvFormat { opts }
    }

    pub fn opts(&self) -> &CsvOptions {
        &self.opts
    }
}

pub trait CsvFormatter {
    fn output<W: Write>(&self, writer: &mut W, opts: &CsvOptions) -> Result<()>;
}

impl<T: CsvFormatter> OutputFormat<T> for CsvFormat {
    fn output<W: Write>(&self, writer: &mut W, data: &T) -> Result<()> {
        data.output(writer, &self.opts)
    }
}

impl CsvFormatter for Reports {
    fn output<W: Write>(&self, writer: &mut W, opts: &CsvOptions) -> Result<()> {
        if !opts.no_header {
            let header = if opts.wide {
                WIDE_REPORT_COLUMNS.iter().chain(STATUS_COLUMNS.iter())
            } else {
                REPORT_COLUMNS.iter().chain(STATUS_COLUMNS.iter())
            };
            write_row(writer, header)?;
        }

        for report in self.iter() {
            let row = if opts.wide { wide_row(report) } else { row(report) };
            write_row(writer, row.iter())?;
        }

        Ok(())
    }
}

fn row(report: &AggregatedServiceReport) -> Vec<String> {
    let mut row = vec![
        report.service_name.clone(),
        list(report.origin_names()),
        list(report.domains.to_strings()),
        format!("{:.6}", report.traffic.hit_ratio),
    ];
    row.extend(report.traffic.status.values().iter().map(ToString::to_string));
    row
}

fn wide_row(report: &AggregatedServiceReport) -> Vec<String> {
    let mut row = vec![
        report.service_name.clone(),
        report.service_id.clone(),
        report.traffic.requests.to_string(),
        list(report.origin_names()),
        timestamp(&report.created_at),
        timestamp(&report.updated_at),
        list(report.addresses()),
        list(report.domains.to_strings()),
        list(report.name_servers.to_strings()),
        format!("{:.6}", report.traffic.hit_ratio),
    ];
    row.extend(report.traffic.status.values().iter().map(ToString::to_string));
    row
}

/// Renders a list of values as `[a b c]`.
pub fn list<I, T>(values: I) -> String
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    let values: Vec<T> = values.into_iter().collect();
    let values: Vec<&str> = values.iter().map(|x| x.as_ref()).collect();
    format!("[{}]", values.join(" "))
}

pub fn timestamp(ts: &Option<DateTime<Utc>>) -> String {
    ts.map(|x| x.to_rfc3339_opts(SecondsFormat::Secs, true)).unwrap_or_default()
}

pub fn write_row<W, I, T>(writer: &mut W, cells: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    let cells: Vec<String> = cells.into_iter().map(|x| escape(x.as_ref()).into_owned()).collect();
    writeln!(writer, "{}", cells.join(","))?;
    Ok(())
}

fn escape(cell: &str) -> Cow<'_, str> {
    if cell.contains(|c| matches!(c, ',' | '"' | '\n' | '\r')) {
        Cow::Owned(format!("\"{}\"", cell.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(cell)
    }
}
