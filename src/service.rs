// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::fmt;

use serde::Serialize;

use crate::provider::Service;

/// Identity of one service as listed by the provider; the input of one enrichment task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ServiceRef {
    pub name: String,
    pub id: String,
    /// Version whose backends describe the service's origins
    pub active_version: Option<u32>,
}

impl ServiceRef {
    pub fn new<S: Into<String>, T: Into<String>>(name: S, id: T, active_version: Option<u32>) -> ServiceRef {
        ServiceRef {
            name: name.into(),
            id: id.into(),
            active_version,
        }
    }
}

impl fmt::Display for ServiceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

impl From<&Service> for ServiceRef {
    fn from(service: &Service) -> Self {
        ServiceRef::new(service.name.clone(), service.id.clone(), active_version(service))
    }
}

impl From<Service> for ServiceRef {
    fn from(service: Service) -> Self {
        let active_version = active_version(&service);
        ServiceRef::new(service.name, service.id, active_version)
    }
}

/// Prefers the service's own version field, then a version flagged active, then the highest.
fn active_version(service: &Service) -> Option<u32> {
    service
        .version
        .or_else(|| service.versions.iter().find(|v| v.active).map(|v| v.number))
        .or_else(|| service.versions.iter().map(|v| v.number).max())
}
