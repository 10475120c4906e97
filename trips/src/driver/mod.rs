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

//! Business logic for trips.

use crate::db;
use crate::model::{Trip, TripView};
use derivative::Derivative;
use std::sync::Arc;
use std::time::Duration;
use tripshare_core::db::{Db, DbError};
use tripshare_core::driver::{DriverError, DriverResult};
use tripshare_core::env::get_optional_var;
use tripshare_core::model::{TripId, UserId};
use tripshare_geo::Geocoder;
use tripshare_storage::ObjectStore;

mod create;
mod delete;
mod get;
#[cfg(test)]
pub(crate) mod testutils;
mod update;

/// Default value for the `IMAGE_URL_TTL` setting when not specified.
const DEFAULT_IMAGE_URL_TTL_SECONDS: u64 = 60 * 60;

/// Message returned when a trip does not exist or is not visible to the requester.
pub(crate) const TRIPS_NOT_FOUND: &str = "Trip(s) not found.";

/// Configuration options for the trips driver.
#[derive(Clone, Debug)]
#[cfg_attr(test, derive(PartialEq))]
pub struct TripsOptions {
    /// The validity of the URLs generated to fetch trip pictures.
    pub image_url_ttl: Duration,
}

impl Default for TripsOptions {
    fn default() -> Self {
        Self { image_url_ttl: Duration::from_secs(DEFAULT_IMAGE_URL_TTL_SECONDS) }
    }
}

impl TripsOptions {
    /// Creates a new set of options from environment variables.
    pub fn from_env(prefix: &str) -> Result<Self, String> {
        Ok(Self {
            image_url_ttl: get_optional_var::<Duration>(prefix, "IMAGE_URL_TTL")?
                .unwrap_or_else(|| Duration::from_secs(DEFAULT_IMAGE_URL_TTL_SECONDS)),
        })
    }
}

/// Business logic.
///
/// The public operations exposed by the driver are all "one shot": they start and commit a
/// transaction, so it's incorrect for the caller to use two separate calls.  For this reason,
/// these operations consume the driver in an attempt to minimize the possibility of executing
/// two operations.
#[derive(Derivative)]
#[derivative(Clone(bound = ""))]
pub struct TripsDriver {
    /// The database that the driver uses for persistence.
    db: Arc<dyn Db + Send + Sync>,

    /// The object store that holds trip pictures.
    store: Arc<dyn ObjectStore + Send + Sync>,

    /// The service to resolve trip addresses to coordinates.
    geocoder: Arc<dyn Geocoder + Send + Sync>,

    /// Options for the trips driver.
    opts: TripsOptions,
}

impl TripsDriver {
    /// Creates a new driver backed by the given dependencies.
    pub fn new(
        db: Arc<dyn Db + Send + Sync>,
        store: Arc<dyn ObjectStore + Send + Sync>,
        geocoder: Arc<dyn Geocoder + Send + Sync>,
        opts: TripsOptions,
    ) -> Self {
        Self { db, store, geocoder, opts }
    }

    /// Converts `trip` to its public representation with a fresh URL for its picture.
    async fn view(&self, trip: Trip) -> DriverResult<TripView> {
        let image_url = match trip.image() {
            Some(key) => Some(self.store.access_url(key, self.opts.image_url_ttl).await?),
            None => None,
        };
        Ok(trip.into_view(image_url))
    }

    /// Gets the trip `trip_id` on behalf of `requester`, who must be its creator.
    ///
    /// Missing trips and trips owned by someone else are indistinguishable to the caller.
    async fn get_owned_trip(&self, requester: UserId, trip_id: TripId) -> DriverResult<Trip> {
        let trip = match db::get_trip(&mut self.db.ex().await?, trip_id).await {
            Ok(trip) => trip,
            Err(DbError::NotFound) => return Err(trips_not_found()),
            Err(e) => return Err(e.into()),
        };
        if *trip.creator_id() != requester {
            return Err(trips_not_found());
        }
        Ok(trip)
    }
}

/// Returns the error for trips that do not exist or are not visible to the requester.
fn trips_not_found() -> DriverError {
    DriverError::NotFound(TRIPS_NOT_FOUND.to_owned())
}

/// Converts a failure to persist a write that must not leak details to the caller.
fn write_failed(e: DbError) -> DriverError {
    DriverError::BackendError(e.to_string())
}
