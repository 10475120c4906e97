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

//! Extends the driver with the `list_users` method.

use crate::db;
use crate::driver::AuthnDriver;
use crate::model::UserProfile;
use tripshare_core::driver::DriverResult;

impl AuthnDriver {
    /// Lists all users without their password hashes, attaching a fresh URL to fetch each
    /// profile picture.
    pub async fn list_users(self) -> DriverResult<Vec<UserProfile>> {
        let users = db::get_users(&mut self.db.ex().await?).await?;

        let mut profiles = Vec::with_capacity(users.len());
        for user in users {
            let image_url = match user.image() {
                Some(key) => Some(self.store.access_url(key, self.opts.image_url_ttl).await?),
                None => None,
            };
            profiles.push(user.into_profile(image_url));
        }
        Ok(profiles)
    }
}
