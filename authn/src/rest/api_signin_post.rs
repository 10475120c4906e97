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

//! API to sign in to an existing user account.

use crate::driver::AuthnDriver;
use crate::model::Password;
use crate::rest::AuthResponse;
use axum::Json;
use axum::extract::State;
use log::debug;
use serde::{Deserialize, Serialize};
use tripshare_core::model::EmailAddress;
use tripshare_core::rest::{JsonBody, RestError, RestResult};
use validator::Validate;

/// Message returned to the client when sign in fails for reasons outside of its control.
const FAILURE: &str = "Sign in failed, please try again.";

/// Message sent to the server to sign in.
#[derive(Default, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct SigninRequest {
    /// Email address of the account.
    #[validate(required, length(min = 1))]
    pub email: Option<String>,

    /// Password of the account.
    #[validate(required, length(min = 1))]
    pub password: Option<String>,
}

/// POST handler for this API.
pub(crate) async fn handler(
    State(driver): State<AuthnDriver>,
    JsonBody(request): JsonBody<SigninRequest>,
) -> RestResult<Json<AuthResponse>> {
    request.validate()?;

    // Credentials that cannot possibly belong to an account are indistinguishable from wrong
    // credentials.
    let email = EmailAddress::new(request.email.unwrap_or_default()).map_err(|e| {
        debug!("Rejecting sign in: {}", e);
        RestError::InvalidCredentials
    })?;
    let password = Password::new(request.password.unwrap_or_default()).map_err(|e| {
        debug!("Rejecting sign in: {}", e);
        RestError::InvalidCredentials
    })?;

    let session =
        driver.signin(email, password).await.map_err(|e| RestError::from_driver(e, FAILURE))?;

    Ok(Json(AuthResponse { user_id: session.user_id(), token: session.take_access_token() }))
}
