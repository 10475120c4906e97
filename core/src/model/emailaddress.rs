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

//! Email addresses that identify TripShare accounts.

use crate::model::{ModelError, ModelResult};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use validator::ValidateEmail;

/// Longest address that fits in the `users.email` column.
pub(crate) const MAX_EMAIL_LENGTH: usize = 254;

/// A syntactically valid email address.
///
/// Addresses are compared byte by byte, so `Ana@example.com` and `ana@example.com` name two
/// different accounts.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Validates the untrusted `s` and wraps it.
    pub fn new<S: Into<String>>(s: S) -> ModelResult<Self> {
        let s = s.into();
        let problem = if s.trim().is_empty() {
            Some("Email address cannot be empty".to_owned())
        } else if s.len() > MAX_EMAIL_LENGTH {
            Some(format!("Email address is longer than {} characters", MAX_EMAIL_LENGTH))
        } else if !s.validate_email() {
            Some(format!("Email does not look like a valid address '{}'", s))
        } else {
            None
        };
        match problem {
            Some(msg) => Err(ModelError(msg)),
            None => Ok(Self(s)),
        }
    }

    /// Wraps `s` without validating it, to exercise code paths that read corrupt rows.
    #[cfg(any(test, feature = "testutils"))]
    pub fn new_invalid<S: Into<String>>(s: S) -> Self {
        Self(s.into())
    }

    /// Returns the address as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = ModelError;

    fn try_from(s: String) -> ModelResult<Self> {
        Self::new(s)
    }
}

#[cfg(any(test, feature = "testutils"))]
impl From<&str> for EmailAddress {
    fn from(raw: &str) -> Self {
        Self::new(raw).expect("Hardcoded email addresses for testing must be valid")
    }
}

impl<'de> Deserialize<'de> for EmailAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        EmailAddress::new(raw).map_err(serde::de::Error::custom)
    }
}
