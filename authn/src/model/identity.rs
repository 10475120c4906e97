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

//! The `Identity` data type.

use tripshare_core::model::{EmailAddress, UserId};

/// The authenticated subject of a request, as asserted by a verified access token.
#[derive(Clone, Debug, PartialEq)]
pub struct Identity {
    /// Identifier of the user.
    user_id: UserId,

    /// Email address of the user at the time the token was issued.
    email: EmailAddress,
}

impl Identity {
    /// Creates a new identity.
    pub fn new(user_id: UserId, email: EmailAddress) -> Self {
        Self { user_id, email }
    }

    /// Gets the identifier of the user.
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Gets the email address of the user.
    pub fn email(&self) -> &EmailAddress {
        &self.email
    }
}
