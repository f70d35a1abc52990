// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::io::{self, Write};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::output::csv::CsvFormatter;
use crate::output::{Output, OutputConfig, OutputFormat};

pub mod styles;

/// Writes results to stdout; everything else goes to stderr.
pub fn output<T: Serialize + CsvFormatter>(config: &OutputConfig, data: &T) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    let output = Output::new(config);
    output
        .output(&mut handle, data)
        .context("Failed to print results to stdout.")?;
    handle.flush().context("Failed to flush stdout.")
}
