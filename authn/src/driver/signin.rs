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

//! Extends the driver with the `signin` method.

use crate::db;
use crate::driver::{AuthnDriver, run_blocking};
use crate::model::{Identity, Password, Session};
use log::debug;
use tripshare_core::db::DbError;
use tripshare_core::driver::{DriverError, DriverResult};
use tripshare_core::model::EmailAddress;

impl AuthnDriver {
    /// Signs in the user with `email` and `password`.
    ///
    /// Unknown users and wrong passwords are indistinguishable to the caller.
    pub async fn signin(self, email: EmailAddress, password: Password) -> DriverResult<Session> {
        let user = match db::get_user_by_email(&mut self.db.ex().await?, &email).await {
            Ok(user) => user,
            Err(DbError::NotFound) => {
                debug!("Sign in attempt for unknown user {}", email);
                return Err(DriverError::InvalidCredentials);
            }
            Err(e) => return Err(e.into()),
        };

        let hash = user.password().clone();
        if !run_blocking(move || password.verify(&hash)).await? {
            debug!("Sign in attempt with wrong password for {}", email);
            return Err(DriverError::InvalidCredentials);
        }

        let identity = Identity::new(user.id(), user.email().clone());
        let access_token = self.tokens.issue(&identity)?;
        Ok(Session::new(user.id(), access_token))
    }
}
