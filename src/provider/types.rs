// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Response bodies of the Fastly management API as far as this crate needs them.
//!
//! Unknown fields are ignored; fields which the API sometimes omits or sets to `null` are
//! optional or defaulted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub customer_id: Option<String>,
    /// Number of the currently active version
    pub version: Option<u32>,
    #[serde(default)]
    pub versions: Vec<Version>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Version {
    pub number: u32,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub locked: bool,
    pub comment: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Backend {
    pub name: Option<String>,
    pub hostname: Option<String>,
    pub address: Option<String>,
    pub port: Option<u16>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Domain {
    pub name: String,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatsResponse {
    pub status: Option<String>,
    pub msg: Option<String>,
    pub meta: Option<StatsMeta>,
    #[serde(default)]
    pub data: Vec<StatsData>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatsMeta {
    pub from: Option<String>,
    pub to: Option<String>,
    pub by: Option<String>,
    pub region: Option<String>,
}

/// Statistics of one interval of the requested window.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StatsData {
    pub start_time: Option<u64>,
    pub requests: u64,
    pub hit_ratio: Option<f64>,
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

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct User {
    pub id: Option<String>,
    pub login: String,
    pub name: Option<String>,
    pub role: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceDetail {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub versions: Vec<Version>,
    pub active_version: Option<Version>,
    /// Latest version, active or not
    pub version: Option<Version>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ServiceDetail {
    pub fn is_active(&self) -> bool {
        self.active_version.as_ref().map(|v| v.active).unwrap_or(false)
    }

    /// Last update of the latest version, falling back to the service's update time.
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.version.as_ref().and_then(|v| v.updated_at).or(self.updated_at)
    }
}
