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

//! Gate for the APIs that require an authenticated caller.

use crate::driver::TokenIssuer;
use crate::rest::get_bearer_auth;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http::Method;
use tripshare_core::rest::RestError;

/// Middleware that rejects requests without a valid bearer token.
///
/// The identity asserted by the token is attached to the request as an extension of type
/// `Identity`, which handlers behind the gate can extract with `axum::Extension`.  Preflight
/// `OPTIONS` requests always pass through.
///
/// Install with `axum::middleware::from_fn_with_state(tokens, require_auth)`.
pub async fn require_auth(
    State(tokens): State<TokenIssuer>,
    mut request: Request,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS {
        return next.run(request).await;
    }

    let token = match get_bearer_auth(request.headers()) {
        Ok(token) => token,
        Err(e) => return e.into_response(),
    };
    let identity = match tokens.verify(token.as_str()) {
        Ok(identity) => identity,
        Err(e) => return RestError::from(e).into_response(),
    };

    request.extensions_mut().insert(identity);
    next.run(request).await
}
