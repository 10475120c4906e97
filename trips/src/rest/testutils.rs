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

//! Test utilities for the REST layer.

use crate::driver;
use crate::model::TripView;
use crate::rest::app;
use axum::Router;
use std::time::Duration;
use tripshare_authn::model::{AccessToken, Identity};
use tripshare_core::db::Executor;
use tripshare_core::model::{EmailAddress, UserId};
use tripshare_geo::MockGeocoder;
use tripshare_storage::MockObjectStore;

pub(crate) use crate::driver::testutils::{EMPIRE_ADDRESS, EMPIRE_COORDINATES};

/// State of a running test.
pub(crate) struct TestContext {
    /// Driver-level test context backing the app.
    inner: driver::testutils::TestContext,

    /// The app under test.
    app: Router,
}

impl TestContext {
    /// Initializes the app using an in-memory database, geocoder and object store.
    pub(crate) async fn setup() -> Self {
        let inner = driver::testutils::TestContext::setup().await;
        let app = app(inner.driver(), inner.authn().driver().tokens().clone());
        Self { inner, app }
    }

    /// Gets a clone of the app router.
    pub(crate) fn app(&self) -> Router {
        self.app.clone()
    }

    /// Gets a direct executor against the database.
    pub(crate) async fn ex(&self) -> Executor {
        self.inner.ex().await
    }

    /// Gets the geocoder backing the app.
    pub(crate) fn geocoder(&self) -> &MockGeocoder {
        self.inner.geocoder()
    }

    /// Gets the object store backing the app.
    pub(crate) fn store(&self) -> &MockObjectStore {
        self.inner.store()
    }

    /// Signs up a user with `email` and returns their identifier and a token to act as them.
    pub(crate) async fn signup(&self, email: &str) -> (UserId, AccessToken) {
        let session = self.inner.signup(email).await;
        (session.user_id(), session.take_access_token())
    }

    /// Issues a valid token for `user_id`, which need not exist.
    pub(crate) fn token_for(&self, user_id: UserId) -> AccessToken {
        self.inner
            .authn()
            .issue_token(&Identity::new(user_id, EmailAddress::from("ghost@example.com")))
    }

    /// Moves the clock forward so that all previously-issued tokens are expired.
    pub(crate) fn advance_clock_past_token_expiry(&self) {
        self.inner.authn().clock().advance(Duration::from_secs(31 * 60));
    }

    /// Creates a trip without going through the REST interface.
    pub(crate) async fn create_trip(&self, user_id: UserId, title: &str) -> TripView {
        self.inner.create_trip(user_id, title).await
    }

    /// Closes the database connection.
    pub(crate) async fn close(self) {
        self.inner.db().close().await;
    }
}
