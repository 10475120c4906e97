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

//! Extends the driver with the `signup` method.

use crate::db;
use crate::driver::{AuthnDriver, run_blocking};
use crate::model::{Identity, Password, Session, User};
use tripshare_core::db::DbError;
use tripshare_core::driver::{DriverError, DriverResult};
use tripshare_core::model::{EmailAddress, UserId};
use tripshare_storage::{Upload, delete_quietly};

impl AuthnDriver {
    /// Creates a new account for a user with the given details and profile picture, and signs
    /// them in.
    pub async fn signup(
        self,
        first_name: String,
        last_name: String,
        email: EmailAddress,
        password: Password,
        image: Upload,
    ) -> DriverResult<Session> {
        match db::get_user_by_email(&mut self.db.ex().await?, &email).await {
            Ok(_) => return Err(DriverError::EmailInUse),
            Err(DbError::NotFound) => (),
            Err(e) => return Err(e.into()),
        }

        let cost = self.opts.password_cost;
        let password = run_blocking(move || password.hash(cost)).await?;

        let key = self.store.put(image).await?;

        let user = User::new(UserId::generate(), first_name, last_name, email, password)
            .with_image(Some(key.clone()));
        let result = async {
            let mut tx = self.db.begin().await?;
            db::create_user(tx.ex(), &user).await?;
            tx.commit().await
        }
        .await;
        match result {
            Ok(()) => (),
            Err(e) => {
                delete_quietly(self.store.as_ref(), &key).await;
                return match e {
                    DbError::AlreadyExists => Err(DriverError::EmailInUse),
                    e => Err(e.into()),
                };
            }
        }

        let identity = Identity::new(user.id(), user.email().clone());
        let access_token = self.tokens.issue(&identity)?;
        Ok(Session::new(user.id(), access_token))
    }
}
