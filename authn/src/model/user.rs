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

//! The `User` data type.

use crate::model::HashedPassword;
use serde::Serialize;
use std::collections::BTreeSet;
use tripshare_core::model::{EmailAddress, TripId, UserId};
use tripshare_storage::StorageKey;

/// Representation of a user's information.
#[derive(Clone, Debug, PartialEq)]
pub struct User {
    /// Unique identifier of the user.
    id: UserId,

    /// Given name.
    first_name: String,

    /// Family name.
    last_name: String,

    /// Email of the user, which doubles as the sign in key.
    email: EmailAddress,

    /// Hashed password.
    password: HashedPassword,

    /// Profile picture, if any.
    image: Option<StorageKey>,

    /// Trips created by this user.
    trips: BTreeSet<TripId>,
}

impl User {
    /// Creates a new user with the given fields and without trips.
    pub fn new(
        id: UserId,
        first_name: String,
        last_name: String,
        email: EmailAddress,
        password: HashedPassword,
    ) -> Self {
        Self { id, first_name, last_name, email, password, image: None, trips: BTreeSet::new() }
    }

    /// Modifies a user to set its profile picture.
    pub fn with_image(mut self, image: Option<StorageKey>) -> Self {
        self.image = image;
        self
    }

    /// Modifies a user to set the trips it owns.
    pub fn with_trips(mut self, trips: BTreeSet<TripId>) -> Self {
        self.trips = trips;
        self
    }

    /// Gets the user's identifier.
    pub fn id(&self) -> UserId {
        self.id
    }

    /// Gets the user's given name.
    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    /// Gets the user's family name.
    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    /// Gets the user's email address.
    pub fn email(&self) -> &EmailAddress {
        &self.email
    }

    /// Gets the user's password as a hash.
    pub fn password(&self) -> &HashedPassword {
        &self.password
    }

    /// Gets the user's profile picture.
    pub fn image(&self) -> Option<&StorageKey> {
        self.image.as_ref()
    }

    /// Gets the trips owned by the user.
    pub fn trips(&self) -> &BTreeSet<TripId> {
        &self.trips
    }

    /// Converts the user into its public representation, dropping the password hash.
    pub fn into_profile(self, image_url: Option<String>) -> UserProfile {
        UserProfile {
            id: self.id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            image: self.image,
            image_url,
            trips: self.trips,
        }
    }
}

/// Public representation of a user, safe to hand out to any client.
#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Unique identifier of the user.
    pub id: UserId,

    /// Given name.
    pub first_name: String,

    /// Family name.
    pub last_name: String,

    /// Email of the user.
    pub email: EmailAddress,

    /// Profile picture, if any.
    pub image: Option<StorageKey>,

    /// Time-limited URL to fetch the profile picture.
    pub image_url: Option<String>,

    /// Trips created by this user.
    pub trips: BTreeSet<TripId>,
}
