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

//! Utilities to help testing services that integrate with the `authn` features.

use crate::db;
use crate::driver::{AuthnDriver, AuthnOptions, TokenIssuer, TokenOptions};
use crate::model::{AccessToken, Identity, Password, Session};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tripshare_core::clocks::testutils::SettableClock;
#[cfg(test)]
use tripshare_core::db::Executor;
use tripshare_core::db::Db;
use tripshare_core::model::EmailAddress;
use tripshare_storage::{MockObjectStore, Upload};

/// Secret used to sign tokens in tests.
pub const TEST_JWT_KEY: &str = "test-jwt-key";

/// Password of all users created via `TestContext::signup`.
pub const TEST_PASSWORD: &str = "test0password";

/// Lowest work factor accepted by bcrypt, to keep tests fast.
const TEST_PASSWORD_COST: u32 = 4;

/// Returns a small image that passes upload validation.
pub fn test_image() -> Upload {
    Upload::new(Bytes::from_static(b"\x89PNG\r\n\x1a\nfake image"), "image/png").unwrap()
}

/// State of a running test.
pub struct TestContext {
    /// The clock used to issue and verify tokens.
    clock: Arc<SettableClock>,

    /// The object store that captures uploaded profile pictures.
    store: Arc<MockObjectStore>,

    /// The driver to handle authentication flows.
    driver: AuthnDriver,
}

impl TestContext {
    /// Initializes the driver using an in-memory database, a settable clock and an in-memory
    /// object store.
    #[cfg(test)]
    pub(crate) async fn setup() -> Self {
        let db = Arc::from(tripshare_core::db::sqlite::testutils::setup().await);
        Self::setup_with(db, Arc::from(MockObjectStore::default())).await
    }

    /// Initializes the test context using the given already-initialized objects.
    pub async fn setup_with(db: Arc<dyn Db + Send + Sync>, store: Arc<MockObjectStore>) -> Self {
        db::init_schema(&mut db.ex().await.unwrap()).await.unwrap();

        let now = OffsetDateTime::from_unix_timestamp(1_683_707_400).unwrap();
        let clock = Arc::from(SettableClock::new(now));
        let tokens = TokenIssuer::new(
            TokenOptions { key: TEST_JWT_KEY.to_owned(), ttl: Duration::from_secs(30 * 60) },
            clock.clone(),
        );
        let opts = AuthnOptions { password_cost: TEST_PASSWORD_COST, ..Default::default() };
        let driver = AuthnDriver::new(db, store.clone(), tokens, opts);

        TestContext { clock, store, driver }
    }

    /// Syntactic sugar to sign up a user with `email` for testing purposes.
    pub async fn signup(&self, email: &str) -> Session {
        self.driver
            .clone()
            .signup(
                "First".to_owned(),
                "Last".to_owned(),
                EmailAddress::new(email).unwrap(),
                Password::from(TEST_PASSWORD),
                test_image(),
            )
            .await
            .unwrap()
    }

    /// Syntactic sugar to sign up a user with `email` and return the token to act as them.
    pub async fn signup_token(&self, email: &str) -> AccessToken {
        self.signup(email).await.take_access_token()
    }

    /// Issues a token for an arbitrary `identity`, which need not exist in the database.
    pub fn issue_token(&self, identity: &Identity) -> AccessToken {
        self.driver.tokens().issue(identity).unwrap()
    }

    /// Gets the clock used to issue and verify tokens.
    pub fn clock(&self) -> &SettableClock {
        &self.clock
    }

    /// Gets the object store backing the driver.
    pub fn store(&self) -> &MockObjectStore {
        &self.store
    }

    /// Gets access to the database used by this test context.
    pub fn db(&self) -> &(dyn Db + Send + Sync) {
        self.driver.db.as_ref()
    }

    /// Gets a direct executor against the database.
    #[cfg(test)]
    pub(crate) async fn ex(&self) -> Executor {
        self.driver.db.ex().await.unwrap()
    }

    /// Gets a copy of the driver in this test context.
    pub fn driver(&self) -> AuthnDriver {
        self.driver.clone()
    }
}
