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

//! REST interface for user accounts and authentication.

use crate::driver::AuthnDriver;
use crate::model::AccessToken;
use axum::Router;
use serde::{Deserialize, Serialize};
use tripshare_core::model::UserId;

mod api_signin_post;
mod api_signup_post;
mod api_users_get;
mod gate;
mod httputils;
#[cfg(test)]
mod testutils;

pub use api_signin_post::SigninRequest;
pub use gate::require_auth;
pub use httputils::get_bearer_auth;

/// Message returned by the server after a successful sign up or sign in.
#[derive(Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    /// Identifier of the user that signed in.
    pub user_id: UserId,

    /// Token to authenticate further requests by this user.
    pub token: AccessToken,
}

/// Creates the router for the user account endpoints.
///
/// The `driver` is a configured instance of the `AuthnDriver` to handle accounts.
pub fn app(driver: AuthnDriver) -> Router {
    use axum::routing::{get, post};

    Router::new()
        .route("/api/users", get(api_users_get::handler))
        .route("/api/users/signup", post(api_signup_post::handler))
        .route("/api/users/signin", post(api_signin_post::handler))
        .with_state(driver)
}
