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

//! APIs to resolve free-text addresses to geographic coordinates.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tripshare_core::driver::DriverError;

mod caching;
pub use caching::{CachingGeocoder, CachingGeocoderOptions};
mod google;
pub use google::{GoogleGeocoder, GoogleGeocoderOptions};
#[cfg(any(test, feature = "testutils"))]
mod mock;
#[cfg(any(test, feature = "testutils"))]
pub use mock::MockGeocoder;

/// Geocoding errors.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum GeoError {
    /// Indicates that the provider does not know about the requested address.
    #[error("Could not find coordinates for specified address.")]
    AddressNotFound,

    /// Indicates a failure talking to the provider or an unexpected response from it.
    #[error("Geocoding request failed: {0}")]
    Upstream(String),
}

impl From<GeoError> for DriverError {
    fn from(e: GeoError) -> Self {
        match e {
            GeoError::AddressNotFound => DriverError::AddressNotFound,
            e @ GeoError::Upstream(_) => DriverError::BackendError(e.to_string()),
        }
    }
}

/// Result type for this module.
pub type GeoResult<T> = Result<T, GeoError>;

/// A pair of geographic coordinates in decimal degrees.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct Coordinates {
    /// Latitude.
    pub lat: f64,

    /// Longitude.
    pub lng: f64,
}

/// Interface to resolve addresses to coordinates.
#[async_trait]
pub trait Geocoder {
    /// Figures out the coordinates of `address`.
    ///
    /// Returns `GeoError::AddressNotFound` when the provider has no results for the address.
    async fn resolve(&self, address: &str) -> GeoResult<Coordinates>;
}
