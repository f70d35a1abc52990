// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! fastly-report builds a ranked traffic and network report for all services of a Fastly account.
//!
//! Every service is enriched by its own task: backend origins are resolved to IP addresses, the
//! authoritative name servers of all service domains are collected, and the request statistics of
//! the past two months are fetched. The [`aggregation::Aggregator`] runs these tasks in a bounded
//! sliding window and collects the results into [`report::Reports`] which can be ranked and
//! written by [`output`].

pub use error::Error;

#[cfg(feature = "app-lib")]
pub mod app;
pub mod aggregation;
pub mod enrichment;
pub mod error;
pub mod output;
pub mod provider;
pub mod report;
pub mod resolver;
pub mod service;
pub mod statistics;
pub(crate) mod utils;

pub type Result<T> = std::result::Result<T, Error>;
