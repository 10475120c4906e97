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

//! API to list all users.

use crate::driver::AuthnDriver;
use crate::model::UserProfile;
use axum::Json;
use axum::extract::State;
use tripshare_core::rest::{RestError, RestResult};

/// GET handler for this API.
pub(crate) async fn handler(
    State(driver): State<AuthnDriver>,
) -> RestResult<Json<Vec<UserProfile>>> {
    let users = driver
        .list_users()
        .await
        .map_err(|e| RestError::from_driver(e, "Failed to fetch users, please try again."))?;
    Ok(Json(users))
}
