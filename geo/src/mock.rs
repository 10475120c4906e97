// TripShare
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Geocoding API implementation backed by an in-memory map for testing purposes.

use crate::{Coordinates, GeoError, GeoResult, Geocoder};
use async_trait::async_trait;
use futures::lock::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Geocoder that uses an in-memory map of addresses to coordinates.
///
/// Addresses not in the map are reported as not found.  Clones share the same query counters.
#[derive(Clone)]
pub struct MockGeocoder {
    /// Mapping of addresses to coordinates.
    data: Arc<HashMap<String, Coordinates>>,

    /// Number of times each address has been queried.
    queries: Arc<Mutex<HashMap<String, usize>>>,
}

impl MockGeocoder {
    /// Address that causes lookups to fail with an upstream error.
    pub const RETURN_ERROR: &'static str = "return-error";

    /// Creates a new mock geocoder based on a list of `(address, lat, lng)` tuples.
    pub fn new(raw_data: &[(&'static str, f64, f64)]) -> Self {
        let mut data = HashMap::with_capacity(raw_data.len());
        for (address, lat, lng) in raw_data {
            data.insert((*address).to_owned(), Coordinates { lat: *lat, lng: *lng });
        }
        Self { data: Arc::from(data), queries: Arc::default() }
    }

    /// Returns the number of times `address` has been resolved.
    pub async fn query_count(&self, address: &str) -> usize {
        let queries = self.queries.lock().await;
        queries.get(address).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Geocoder for MockGeocoder {
    async fn resolve(&self, address: &str) -> GeoResult<Coordinates> {
        {
            let mut queries = self.queries.lock().await;
            *queries.entry(address.to_owned()).or_insert(0) += 1;
        }

        if address == Self::RETURN_ERROR {
            return Err(GeoError::Upstream("Geocoder is down".to_owned()));
        }
        self.data.get(address).copied().ok_or(GeoError::AddressNotFound)
    }
}
