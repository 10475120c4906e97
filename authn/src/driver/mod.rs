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

//! Business logic for user accounts and authentication.

use derivative::Derivative;
use std::sync::Arc;
use std::time::Duration;
use tripshare_core::db::Db;
use tripshare_core::driver::{DriverError, DriverResult};
use tripshare_core::env::get_optional_var;
use tripshare_core::model::ModelError;
use tripshare_storage::ObjectStore;

mod signin;
mod signup;
#[cfg(any(test, feature = "testutils"))]
pub mod testutils;
mod tokens;
pub use tokens::{TokenIssuer, TokenOptions};
mod users;

/// Default value for the `PASSWORD_COST` setting when not specified.
const DEFAULT_PASSWORD_COST: u32 = 12;

/// Default value for the `IMAGE_URL_TTL` setting when not specified.
const DEFAULT_IMAGE_URL_TTL_SECONDS: u64 = 30 * 60;

/// Configuration options for the authentication driver.
#[derive(Clone, Debug)]
#[cfg_attr(test, derive(PartialEq))]
pub struct AuthnOptions {
    /// The bcrypt work factor to hash new passwords with.
    pub password_cost: u32,

    /// The validity of the URLs generated to fetch profile pictures.
    pub image_url_ttl: Duration,
}

impl Default for AuthnOptions {
    fn default() -> Self {
        Self {
            password_cost: DEFAULT_PASSWORD_COST,
            image_url_ttl: Duration::from_secs(DEFAULT_IMAGE_URL_TTL_SECONDS),
        }
    }
}

impl AuthnOptions {
    /// Creates a new set of options from environment variables.
    pub fn from_env(prefix: &str) -> Result<Self, String> {
        Ok(Self {
            password_cost: get_optional_var::<u32>(prefix, "PASSWORD_COST")?
                .unwrap_or(DEFAULT_PASSWORD_COST),
            image_url_ttl: get_optional_var::<Duration>(prefix, "IMAGE_URL_TTL")?
                .unwrap_or_else(|| Duration::from_secs(DEFAULT_IMAGE_URL_TTL_SECONDS)),
        })
    }
}

/// Business logic.
///
/// The public operations exposed by the driver are all "one shot": they start and commit a
/// transaction, so it's incorrect for the caller to use two separate calls.  For this reason,
/// these operations consume the driver in an attempt to minimize the possibility of executing
/// two operations.
#[derive(Derivative)]
#[derivative(Clone(bound = ""))]
pub struct AuthnDriver {
    /// The database that the driver uses for persistence.
    db: Arc<dyn Db + Send + Sync>,

    /// The object store that holds profile pictures.
    store: Arc<dyn ObjectStore + Send + Sync>,

    /// Issuer of the access tokens handed out on sign up and sign in.
    tokens: TokenIssuer,

    /// Options for the authentication driver.
    opts: AuthnOptions,
}

impl AuthnDriver {
    /// Creates a new driver backed by the given dependencies.
    pub fn new(
        db: Arc<dyn Db + Send + Sync>,
        store: Arc<dyn ObjectStore + Send + Sync>,
        tokens: TokenIssuer,
        opts: AuthnOptions,
    ) -> Self {
        Self { db, store, tokens, opts }
    }

    /// Returns the token issuer used by this driver so that other services can verify the tokens
    /// it hands out.
    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }
}

/// Runs the CPU-intensive `op` outside of the async executor.
///
/// Failures of the operation itself, such as a broken password hash, are backend errors: they are
/// never the fault of the caller.
async fn run_blocking<F, T>(op: F) -> DriverResult<T>
where
    F: FnOnce() -> Result<T, ModelError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(op).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(DriverError::BackendError(e.to_string())),
        Err(e) => Err(DriverError::BackendError(format!("Blocking task failed: {}", e))),
    }
}
