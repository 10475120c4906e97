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

//! Extends the driver with the `update_trip` method.

use crate::db;
use crate::driver::{TripsDriver, write_failed};
use crate::model::{TripContent, TripView};
use tripshare_core::driver::DriverResult;
use tripshare_core::model::{TripId, UserId};

impl TripsDriver {
    /// Replaces the title and description of the trip `trip_id`, which must be owned by
    /// `requester`.
    pub async fn update_trip(
        self,
        requester: UserId,
        trip_id: TripId,
        content: TripContent,
    ) -> DriverResult<TripView> {
        let trip = self.get_owned_trip(requester, trip_id).await?;

        db::update_trip(&mut self.db.ex().await?, trip_id, &content)
            .await
            .map_err(write_failed)?;

        self.view(trip.with_content(content)).await
    }
}
