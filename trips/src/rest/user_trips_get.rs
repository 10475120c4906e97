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

//! API to get all trips created by a user.

use crate::driver::TripsDriver;
use crate::model::TripView;
use crate::rest::parse_user_id;
use axum::Json;
use axum::extract::{Path, State};
use tripshare_core::rest::{RestError, RestResult};

/// Message returned to the client when the query fails for reasons outside of its control.
const FAILURE: &str = "Failed to fetch trip(s), please try again.";

/// GET handler for this API.
pub(crate) async fn handler(
    State(driver): State<TripsDriver>,
    Path(user_id): Path<String>,
) -> RestResult<Json<Vec<TripView>>> {
    let user_id = parse_user_id(&user_id)?;

    let views = driver
        .get_trips_by_user(user_id)
        .await
        .map_err(|e| RestError::from_driver(e, FAILURE))?;

    Ok(Json(views))
}
