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

//! REST interface for trips.

use crate::driver::{TRIPS_NOT_FOUND, TripsDriver};
use axum::Router;
use log::debug;
use serde::{Deserialize, Serialize};
use tripshare_authn::driver::TokenIssuer;
use tripshare_authn::rest::require_auth;
use tripshare_core::model::{TripId, UserId};
use tripshare_core::rest::{RestError, RestResult};

mod trip_delete;
mod trip_get;
mod trip_patch;
mod trips_post;
#[cfg(test)]
mod testutils;
mod user_trips_get;

pub use trip_patch::TripPatchRequest;

/// Message returned by the server after an operation that has no other result.
#[derive(Debug, Deserialize, PartialEq, Serialize)]
pub struct MessageResponse {
    /// Human-readable description of the outcome.
    pub message: String,
}

/// Parses a trip identifier from a path parameter.
///
/// Identifiers that cannot exist are reported in the same way as missing trips.
fn parse_trip_id(raw: &str) -> RestResult<TripId> {
    TripId::parse(raw).map_err(|e| {
        debug!("Rejecting trip ID {}: {}", raw, e);
        RestError::NotFound(TRIPS_NOT_FOUND.to_owned())
    })
}

/// Parses a user identifier from a path parameter.
///
/// Identifiers that cannot exist are reported in the same way as users without trips.
fn parse_user_id(raw: &str) -> RestResult<UserId> {
    UserId::parse(raw).map_err(|e| {
        debug!("Rejecting user ID {}: {}", raw, e);
        RestError::NotFound(TRIPS_NOT_FOUND.to_owned())
    })
}

/// Creates the router for the trip endpoints.
///
/// The `driver` is a configured instance of the `TripsDriver` and `tokens` verifies the
/// credentials of callers of the APIs that modify trips.
pub fn app(driver: TripsDriver, tokens: TokenIssuer) -> Router {
    use axum::middleware::from_fn_with_state;
    use axum::routing::{get, patch, post};

    let auth = from_fn_with_state(tokens, require_auth);

    Router::new()
        .route("/api/trips", post(trips_post::handler).route_layer(auth.clone()))
        .route("/api/trips/user/:user_id", get(user_trips_get::handler))
        .route(
            "/api/trips/:trip_id",
            patch(trip_patch::handler)
                .delete(trip_delete::handler)
                .route_layer(auth)
                .get(trip_get::handler),
        )
        .with_state(driver)
}
