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

//! Extends the driver with the `create_trip` method.

use crate::db;
use crate::driver::{TripsDriver, write_failed};
use crate::model::{Trip, TripContent, TripView};
use tripshare_authn::db as authn_db;
use tripshare_core::db::DbError;
use tripshare_core::driver::{DriverError, DriverResult};
use tripshare_core::model::{TripId, UserId};
use tripshare_storage::{Upload, delete_quietly};

impl TripsDriver {
    /// Creates a new trip owned by `requester` at `address` with the given picture.
    ///
    /// The trip and the requester's owned-set are updated atomically, and the transaction only
    /// commits once the public view of the trip is ready.  If any of this fails, the uploaded
    /// picture is deleted again.
    pub async fn create_trip(
        self,
        requester: UserId,
        content: TripContent,
        address: String,
        image: Upload,
    ) -> DriverResult<TripView> {
        match authn_db::get_user_by_id(&mut self.db.ex().await?, requester).await {
            Ok(_) => (),
            Err(DbError::NotFound) => {
                return Err(DriverError::NotFound(format!(
                    "User with ID {} not found.",
                    requester
                )));
            }
            Err(e) => return Err(e.into()),
        }

        let coordinates = self.geocoder.resolve(&address).await?;

        let key = self.store.put(image).await?;

        let trip = Trip::new(
            TripId::generate(),
            content,
            Some(key.clone()),
            address,
            coordinates,
            requester,
        );
        let result: DriverResult<TripView> = async {
            let mut tx = self.db.begin().await.map_err(write_failed)?;
            db::create_trip(tx.ex(), &trip).await.map_err(write_failed)?;
            authn_db::add_user_trip(tx.ex(), requester, *trip.id()).await.map_err(write_failed)?;
            let view = self.view(trip).await?;
            tx.commit().await.map_err(write_failed)?;
            Ok(view)
        }
        .await;
        if result.is_err() {
            delete_quietly(self.store.as_ref(), &key).await;
        }
        result
    }
}
