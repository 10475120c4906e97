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

//! The `Session` data type.

use crate::model::AccessToken;
use tripshare_core::model::UserId;

/// Outcome of a successful sign up or sign in.
#[derive(Debug, PartialEq)]
pub struct Session {
    /// Identifier of the user that signed in.
    user_id: UserId,

    /// Token to authenticate further requests by this user.
    access_token: AccessToken,
}

impl Session {
    /// Creates a new session for `user_id` backed by `access_token`.
    pub(crate) fn new(user_id: UserId, access_token: AccessToken) -> Self {
        Self { user_id, access_token }
    }

    /// Gets the identifier of the user that owns the session.
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Gets the session's access token.
    pub fn access_token(&self) -> &AccessToken {
        &self.access_token
    }

    /// Consumes the session and extracts its access token.
    pub fn take_access_token(self) -> AccessToken {
        self.access_token
    }
}
