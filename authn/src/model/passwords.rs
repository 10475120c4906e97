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

//! Plain and bcrypt-hashed passwords.

use std::fmt;
use tripshare_core::model::{ModelError, ModelResult};

/// Longest password accepted, in bytes.  bcrypt silently truncates longer inputs.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Wraps a `bcrypt` failure into a model error.
fn bcrypt_error(e: bcrypt::BcryptError) -> ModelError {
    ModelError(format!("Password error: {}", e))
}

/// A plain password as typed by the user.  Never printed.
#[derive(PartialEq)]
#[cfg_attr(any(test, feature = "testutils"), derive(Clone))]
pub struct Password(String);

impl Password {
    /// Wraps `s` after checking that bcrypt can use all of it.
    pub fn new<S: Into<String>>(s: S) -> ModelResult<Self> {
        let s = s.into();
        if s.len() > MAX_PASSWORD_BYTES {
            return Err(ModelError("Password is too long".to_owned()));
        }
        Ok(Password(s))
    }

    /// Returns the plain text of the password.
    #[cfg(any(test, feature = "testutils"))]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Computes the bcrypt hash of the password with work factor `cost`.
    ///
    /// CPU bound: callers on the async runtime must go through `spawn_blocking`.
    pub fn hash(self, cost: u32) -> ModelResult<HashedPassword> {
        bcrypt::hash(self.0, cost).map(HashedPassword).map_err(bcrypt_error)
    }

    /// Checks the password against a stored `hash`.
    ///
    /// CPU bound: callers on the async runtime must go through `spawn_blocking`.
    pub fn verify(self, hash: &HashedPassword) -> ModelResult<bool> {
        bcrypt::verify(self.0, &hash.0).map_err(bcrypt_error)
    }
}

#[cfg(any(test, feature = "testutils"))]
impl From<&'static str> for Password {
    fn from(s: &'static str) -> Self {
        Password::new(s).expect("Hardcoded passwords must be valid")
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("scrubbed password")
    }
}

/// A bcrypt hash as stored in the `users` table.  Never printed.
#[derive(Clone, PartialEq)]
pub struct HashedPassword(String);

impl HashedPassword {
    /// Wraps an existing hash, such as one read from the database.
    pub fn new<S: Into<String>>(s: S) -> Self {
        HashedPassword(s.into())
    }

    /// Returns the hash in its textual `$2b$...` form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("scrubbed hash")
    }
}
