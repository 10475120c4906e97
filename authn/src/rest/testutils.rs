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
use crate::model::{AccessToken, Identity, Session};
use crate::rest::app;
use axum::Router;
use std::sync::Arc;
use tripshare_core::db::Executor;
use tripshare_storage::MockObjectStore;

/// State of a running test.
pub(crate) struct TestContext {
    /// Driver-level test context backing the app.
    inner: driver::testutils::TestContext,

    /// The app under test.
    app: Router,
}

impl TestContext {
    /// Initializes the app using an in-memory database and object store.
    pub(crate) async fn setup() -> Self {
        let db = Arc::from(tripshare_core::db::sqlite::testutils::setup().await);
        let inner = driver::testutils::TestContext::setup_with(
            db,
            Arc::from(MockObjectStore::default()),
        )
        .await;
        let app = app(inner.driver());
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

    /// Gets the object store backing the app.
    pub(crate) fn store(&self) -> &MockObjectStore {
        self.inner.store()
    }

    /// Signs up a user with `email` without going through the REST interface.
    pub(crate) async fn signup(&self, email: &str) -> Session {
        self.inner.signup(email).await
    }

    /// Verifies `token` and returns the identity it asserts.  Panics if the token is invalid.
    pub(crate) fn verify(&self, token: &AccessToken) -> Identity {
        self.inner.driver().tokens().verify(token.as_str()).unwrap()
    }

    /// Closes the database connection.
    pub(crate) async fn close(self) {
        self.inner.db().close().await;
    }
}
