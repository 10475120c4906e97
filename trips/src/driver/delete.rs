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

//! Extends the driver with the `delete_trip` method.

use crate::db;
use crate::driver::{TripsDriver, trips_not_found, write_failed};
use tripshare_authn::db as authn_db;
use tripshare_core::db::DbError;
use tripshare_core::driver::DriverResult;
use tripshare_core::model::{TripId, UserId};
use tripshare_storage::delete_quietly;

impl TripsDriver {
    /// Deletes the trip `trip_id`, which must be owned by `requester`, and removes it from the
    /// requester's owned-set.
    ///
    /// The trip's picture is deleted afterwards on a best-effort basis.
    pub async fn delete_trip(self, requester: UserId, trip_id: TripId) -> DriverResult<()> {
        let trip = self.get_owned_trip(requester, trip_id).await?;

        let mut tx = self.db.begin().await?;
        match db::delete_trip(tx.ex(), trip_id).await {
            Ok(()) => (),
            Err(DbError::NotFound) => return Err(trips_not_found()),
            Err(e) => return Err(write_failed(e)),
        }
        authn_db::remove_user_trip(tx.ex(), requester, trip_id).await.map_err(write_failed)?;
        tx.commit().await.map_err(write_failed)?;

        if let Some(key) = trip.image() {
            delete_quietly(self.store.as_ref(), key).await;
        }
        Ok(())
    }
}
