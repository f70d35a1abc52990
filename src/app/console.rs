// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Progress and diagnostics for humans.
//!
//! Everything printed by [`Console`] goes to stderr; stdout is reserved for the report itself.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use yansi::Painted;

use crate::aggregation::AggregatorOpts;
use crate::app::output::styles;
use crate::app::AppConfig;
use crate::statistics::Statistics;

#[derive(Debug, Default)]
pub struct ConsoleOpts {
    quiet: bool,
    show_errors: bool,
}

impl From<&AppConfig> for ConsoleOpts {
    fn from(app_config: &AppConfig) -> Self {
        ConsoleOpts {
            quiet: app_config.quiet,
            show_errors: app_config.show_errors,
        }
    }
}

#[derive(Debug)]
pub struct Console {
    opts: ConsoleOpts,
}

impl Console {
    pub fn new(opts: ConsoleOpts) -> Console {
        Console { opts }
    }

    pub fn print_aggregator_opts(&self, opts: &AggregatorOpts) {
        if self.not_quiet() {
            self.caption(format!(
                "{}: concurrent services={}, deadline={}",
                Fmt::emph("Options"),
                opts.max_concurrent_tasks,
                opts.deadline
                    .map(|x| humantime::format_duration(x).to_string())
                    .unwrap_or_else(|| "none".to_string()),
            ));
        }
    }

    pub fn print_estimates(&self, num_services: usize) {
        if self.not_quiet() {
            let services = if num_services == 1 {
                "1 service".to_string()
            } else {
                format!("{} services", num_services)
            };
            self.info(format!("Enriching {} with origins, name servers, and traffic.", services));
        }
    }

    /// Prints how many services failed in each enrichment step.
    pub fn print_error_counts<K: fmt::Display>(&self, counts: &BTreeMap<K, usize>) {
        if !self.show_errors() {
            return;
        }

        self.info("Error counts");
        if counts.is_empty() {
            self.ok("No errors occurred.");
        } else {
            for (k, v) in counts.iter() {
                self.itemize(format!("{} failed {} times", k, v));
            }
        }
    }

    pub fn print_statistics<'a, T: Statistics<'a>>(&self, data: &'a T, total_run_time: Duration)
    where
        <T as Statistics<'a>>::StatsOut: fmt::Display,
    {
        if self.not_quiet() {
            let statistics = data.statistics();
            self.info(format!(
                "Received {} within {} ms of total run time.",
                statistics,
                total_run_time.as_millis()
            ));
        }
    }

    pub fn print_finished(&self) {
        if self.not_quiet() {
            self.finished();
        }
    }

    pub fn emphasize<T: fmt::Display>(&self, item: T) {
        eprintln!("{}", Fmt::emph(item))
    }

    pub fn info<T: AsRef<str>>(&self, str: T) {
        eprintln!("{} {}", styles::info_prefix(), str.as_ref());
    }

    pub fn attention<T: AsRef<str>>(&self, str: T) {
        eprintln!("{} {}", Fmt::attention(styles::attention_prefix()), str.as_ref());
    }

    pub fn finished(&self) {
        self.emphasize(format!("{} Finished.", styles::finished_prefix()));
    }

    pub fn caption<T: AsRef<str>>(&self, str: T) {
        self.emphasize(format!("{} {}", styles::caption_prefix(), str.as_ref()));
    }

    /// Printed even in quiet mode.
    pub fn error<T: AsRef<str>>(&self, str: T) {
        eprintln!("{} {}", Fmt::error(styles::error_prefix()), str.as_ref());
    }

    pub fn ok<T: AsRef<str>>(&self, str: T) {
        eprintln!("{} {}", Fmt::ok(styles::ok_prefix()), str.as_ref());
    }

    pub fn itemize<T: AsRef<str>>(&self, str: T) {
        eprintln!(" {} {}", styles::itemization_prefix(), str.as_ref());
    }

    pub fn not_quiet(&self) -> bool {
        !self.opts.quiet
    }

    /** Check if detailed error counts should be printed
     *
     * This is true, if `quiet` is not set and `show_errors` is set.
     */
    pub fn show_errors(&self) -> bool {
        !self.opts.quiet && self.opts.show_errors
    }
}

pub struct Fmt {}

impl Fmt {
    pub fn emph<T: fmt::Display>(item: T) -> Painted<T> {
        Painted {
            value: item,
            style: styles::EMPH,
        }
    }

    pub fn attention<T: fmt::Display>(item: T) -> Painted<T> {
        Painted {
            value: item,
            style: styles::ATTENTION,
        }
    }

    pub fn error<T: fmt::Display>(item: T) -> Painted<T> {
        Painted {
            value: item,
            style: styles::ERROR,
        }
    }

    pub fn ok<T: fmt::Display>(item: T) -> Painted<T> {
        Painted {
            value: item,
            style: styles::OK,
        }
    }
}

#[cfg(test)]
mod tests {
    use spectral::prelude::*;

    use super::*;

    #[test]
    fn quiet_suppresses_error_counts() {
        let console = Console::new(ConsoleOpts {
            quiet: true,
            show_errors: true,
        });

        assert_that(&console.not_quiet()).is_false();
        assert_that(&console.show_errors()).is_false();
    }

    #[test]
    fn show_errors_needs_opt_in() {
        let console = Console::new(ConsoleOpts::default());

        assert_that(&console.not_quiet()).is_true();
        assert_that(&console.show_errors()).is_false();
    }

    #[test]
    fn fmt_keeps_styled_item() {
        let emph = Fmt::emph("Options");

        assert_that(&emph.value).is_equal_to("Options");
        assert_that(&emph.to_string().contains("Options")).is_true();
    }
}
