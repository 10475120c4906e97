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

//! Extends the driver with the read-only trip queries.

use crate::db;
use crate::driver::{TripsDriver, trips_not_found};
use crate::model::TripView;
use tripshare_authn::db as authn_db;
use tripshare_core::db::DbError;
use tripshare_core::driver::DriverResult;
use tripshare_core::model::{TripId, UserId};

impl TripsDriver {
    /// Gets the trip `trip_id`.
    pub async fn get_trip(self, trip_id: TripId) -> DriverResult<TripView> {
        let trip = match db::get_trip(&mut self.db.ex().await?, trip_id).await {
            Ok(trip) => trip,
            Err(DbError::NotFound) => return Err(trips_not_found()),
            Err(e) => return Err(e.into()),
        };
        self.view(trip).await
    }

    /// Gets all trips owned by `user_id`, sorted by title.
    pub async fn get_trips_by_user(self, user_id: UserId) -> DriverResult<Vec<TripView>> {
        let mut ex = self.db.ex().await?;
        match authn_db::get_user_by_id(&mut ex, user_id).await {
            Ok(_) => (),
            Err(DbError::NotFound) => return Err(trips_not_found()),
            Err(e) => return Err(e.into()),
        }
        let trips = db::get_trips_by_user(&mut ex, user_id).await?;
        drop(ex);

        let mut views = Vec::with_capacity(trips.len());
        for trip in trips {
            views.push(self.view(trip).await?);
        }
        Ok(views)
    }
}
