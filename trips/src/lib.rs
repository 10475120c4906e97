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

//! Trip sharing service.
//!
//! This crate provides the APIs to create, query, update and delete trips, and assembles them
//! with the user account APIs from `tripshare-authn` into the full TripShare server.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

use axum::Router;
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderName, ORIGIN};
use http::Method;
use std::error::Error;
use std::net::SocketAddr;
use std::path::Path;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tripshare_authn::driver::AuthnDriver;
use tripshare_core::rest::route_not_found;

pub mod db;
pub mod driver;
use driver::TripsDriver;
pub mod model;
mod rest;

/// Path prefix under which locally-stored images are served.
pub const UPLOADS_PREFIX: &str = "/uploads/images";

/// Creates the router for the whole server.
///
/// If `uploads_dir` is provided, the files in it are served statically under `UPLOADS_PREFIX`
/// for the benefit of the local object store.
pub fn app(authn: AuthnDriver, trips: TripsDriver, uploads_dir: Option<&Path>) -> Router {
    let tokens = authn.tokens().clone();

    let mut router = Router::new()
        .merge(tripshare_authn::rest::app(authn))
        .merge(rest::app(trips, tokens));
    if let Some(dir) = uploads_dir {
        router = router.nest_service(UPLOADS_PREFIX, ServeDir::new(dir));
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([
            ORIGIN,
            HeaderName::from_static("x-requested-with"),
            CONTENT_TYPE,
            ACCEPT,
            AUTHORIZATION,
        ]);

    router.fallback(route_not_found).layer(cors)
}

/// Serves `app` on `bind_addr` until the process is terminated.
pub async fn serve(bind_addr: impl Into<SocketAddr>, app: Router) -> Result<(), Box<dyn Error>> {
    let listener = TcpListener::bind(bind_addr.into()).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
