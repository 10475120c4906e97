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

//! Test utilities for the trips driver.

use crate::db;
use crate::driver::{TripsDriver, TripsOptions};
use crate::model::{TripContent, TripView};
use std::sync::Arc;
use tripshare_authn::driver::testutils::{TestContext as AuthnTestContext, test_image};
use tripshare_authn::model::Session;
use tripshare_core::db::{Db, Executor};
use tripshare_core::model::UserId;
use tripshare_geo::MockGeocoder;
use tripshare_storage::MockObjectStore;

/// An address known to the mock geocoder.
pub(crate) const EMPIRE_ADDRESS: &str = "20 W 34th St, New York";

/// Coordinates of `EMPIRE_ADDRESS`.
pub(crate) const EMPIRE_COORDINATES: (f64, f64) = (40.7484405, -73.9856644);

/// State of a running test.
pub(crate) struct TestContext {
    /// Context of the authentication service, used to create users.
    authn: AuthnTestContext,

    /// The geocoder used to resolve trip addresses.
    geocoder: Arc<MockGeocoder>,

    /// The object store that captures uploaded trip pictures.
    store: Arc<MockObjectStore>,

    /// The driver under test.
    driver: TripsDriver,
}

impl TestContext {
    /// Initializes the driver using an in-memory database, a mock geocoder and an in-memory
    /// object store shared with the authentication service.
    pub(crate) async fn setup() -> Self {
        let db: Arc<dyn Db + Send + Sync> =
            Arc::new(tripshare_core::db::sqlite::testutils::setup().await);
        let store = Arc::from(MockObjectStore::default());
        let authn = AuthnTestContext::setup_with(db.clone(), store.clone()).await;
        db::init_schema(&mut db.ex().await.unwrap()).await.unwrap();

        let geocoder = Arc::from(MockGeocoder::new(&[(
            EMPIRE_ADDRESS,
            EMPIRE_COORDINATES.0,
            EMPIRE_COORDINATES.1,
        )]));
        let driver =
            TripsDriver::new(db, store.clone(), geocoder.clone(), TripsOptions::default());

        Self { authn, geocoder, store, driver }
    }

    /// Gets the context of the authentication service.
    pub(crate) fn authn(&self) -> &AuthnTestContext {
        &self.authn
    }

    /// Syntactic sugar to sign up a user with `email`.
    pub(crate) async fn signup(&self, email: &str) -> Session {
        self.authn.signup(email).await
    }

    /// Syntactic sugar to create a trip titled `title` owned by `user_id`.
    pub(crate) async fn create_trip(&self, user_id: UserId, title: &str) -> TripView {
        let content = TripContent::new(title.to_owned(), "Some description".to_owned());
        self.driver
            .clone()
            .create_trip(user_id, content, EMPIRE_ADDRESS.to_owned(), test_image())
            .await
            .unwrap()
    }

    /// Gets the mock geocoder.
    pub(crate) fn geocoder(&self) -> &MockGeocoder {
        &self.geocoder
    }

    /// Gets the object store backing the driver.
    pub(crate) fn store(&self) -> &MockObjectStore {
        &self.store
    }

    /// Gets access to the database used by this test context.
    pub(crate) fn db(&self) -> &(dyn Db + Send + Sync) {
        self.driver.db.as_ref()
    }

    /// Gets a direct executor against the database.
    pub(crate) async fn ex(&self) -> Executor {
        self.driver.db.ex().await.unwrap()
    }

    /// Gets a copy of the driver in this test context.
    pub(crate) fn driver(&self) -> TripsDriver {
        self.driver.clone()
    }
}
