// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use serde::Serialize;

use crate::provider::{StatsData, StatsResponse};

/// Client and server error counters of one service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounters {
    pub status_400: u64,
    pub status_401: u64,
    pub status_403: u64,
    pub status_404: u64,
    pub status_500: u64,
    pub status_501: u64,
    pub status_502: u64,
    pub status_503: u64,
    pub status_504: u64,
    pub status_505: u64,
}

impl StatusCounters {
    pub const CODES: [u16; 10] = [400, 401, 403, 404, 500, 501, 502, 503, 504, 505];

    /// Counters in the order of [`StatusCounters::CODES`].
    pub fn values(&self) -> [u64; 10] {
        [
            self.status_400,
            self.status_401,
            self.status_403,
            self.status_404,
            self.status_500,
            self.status_501,
            self.status_502,
            self.status_503,
            self.status_504,
            self.status_505,
        ]
    }

    fn add(&mut self, data: &StatsData) {
        self.status_400 = self.status_400.saturating_add(data.status_400);
        self.status_401 = self.status_401.saturating_add(data.status_401);
        self.status_403 = self.status_403.saturating_add(data.status_403);
        self.status_404 = self.status_404.saturating_add(data.status_404);
        self.status_500 = self.status_500.saturating_add(data.status_500);
        self.status_501 = self.status_501.saturating_add(data.status_501);
        self.status_502 = self.status_502.saturating_add(data.status_502);
        self.status_503 = self.status_503.saturating_add(data.status_503);
        self.status_504 = self.status_504.saturating_add(data.status_504);
        self.status_505 = self.status_505.saturating_add(data.status_505);
    }
}

/// Traffic of one service over the whole stats window.
///
/// Requests and status counters are summed over all data points. The hit ratio is the mean of the
/// data points' hit ratios weighted by their requests; data points without a hit ratio do not
/// count.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrafficStats {
    pub requests: u64,
    pub hit_ratio: f64,
    pub status: StatusCounters,
}

impl TrafficStats {
    pub fn from_data_points<'a, I: IntoIterator<Item = &'a StatsData>>(data_points: I) -> TrafficStats {
        let mut stats = TrafficStats::default();
        let mut weighted_hits = 0f64;
        let mut weight = 0u64;

        for data in data_points {
            stats.requests = stats.requests.saturating_add(data.requests);
            stats.status.add(data);
            if let Some(hit_ratio) = data.hit_ratio {
                weighted_hits += hit_ratio * data.requests as f64;
                weight = weight.saturating_add(data.requests);
            }
        }
        if weight > 0 {
            stats.hit_ratio = weighted_hits / weight as f64;
        }

        stats
    }
}

impl From<&StatsResponse> for TrafficStats {
    fn from(response: &StatsResponse) -> Self {
        TrafficStats::from_data_points(&response.data)
    }
}

#[cfg(test)]
mod tests {
    use spectral::prelude::*;

    use super::*;

    fn day(requests: u64, hit_ratio: Option<f64>, status_404: u64, status_503: u64) -> StatsData {
        StatsData {
            requests,
            hit_ratio,
            status_404,
            status_503,
            ..Default::default()
        }
    }

    #[test]
    fn sums_requests_and_counters() {
        let data = vec![day(100, Some(0.5), 3, 0), day(300, Some(0.9), 1, 2)];

        let stats = TrafficStats::from_data_points(&data);

        assert_that(&stats.requests).is_equal_to(400);
        assert_that(&stats.status.status_404).is_equal_to(4);
        assert_that(&stats.status.status_503).is_equal_to(2);
        assert_that(&stats.status.values()).is_equal_to([0, 0, 0, 4, 0, 0, 0, 2, 0, 0]);
    }

    #[test]
    fn hit_ratio_is_weighted_by_requests() {
        let data = vec![day(100, Some(0.5), 0, 0), day(300, Some(0.9), 0, 0)];

        let stats = TrafficStats::from_data_points(&data);

        assert_that(&stats.hit_ratio).is_close_to(0.8, 1e-9);
    }

    #[test]
    fn days_without_hit_ratio_are_skipped() {
        let data = vec![day(100, Some(0.6), 0, 0), day(50, None, 0, 0)];

        let stats = TrafficStats::from_data_points(&data);

        assert_that(&stats.requests).is_equal_to(150);
        assert_that(&stats.hit_ratio).is_close_to(0.6, 1e-9);
    }

    #[test]
    fn empty_response_is_zero() {
        let response = StatsResponse {
            status: Some("success".to_string()),
            msg: None,
            meta: None,
            data: Vec::new(),
        };

        let stats = TrafficStats::from(&response);

        assert_that(&stats).is_equal_to(TrafficStats::default());
    }

    #[test]
    fn codes_and_values_line_up() {
        let counters = StatusCounters {
            status_400: 1,
            status_505: 10,
            ..Default::default()
        };

        assert_that(&counters.get(400)).is_some().is_equal_to(1);
        assert_that(&counters.get(505)).is_some().is_equal_to(10);
        assert_that(&counters.values().len()).is_equal_to(StatusCounters::CODES.len());
    }
}
