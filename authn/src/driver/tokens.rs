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

//! Issuance and verification of signed, time-limited access tokens.

use crate::model::{AccessToken, Identity};
use derivative::Derivative;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tripshare_core::clocks::Clock;
use tripshare_core::driver::{DriverError, DriverResult};
use tripshare_core::env::{get_optional_var, get_required_var};
use tripshare_core::model::{EmailAddress, UserId};

/// Default value for the `TTL` setting when not specified.
const DEFAULT_TOKEN_TTL_SECONDS: u64 = 30 * 60;

/// Configuration options for the token issuer.
#[derive(Derivative)]
#[derivative(Debug)]
#[cfg_attr(test, derivative(PartialEq))]
pub struct TokenOptions {
    /// Secret used to sign and verify tokens.
    #[derivative(Debug = "ignore")]
    pub key: String,

    /// Validity of newly-issued tokens.
    pub ttl: Duration,
}

impl TokenOptions {
    /// Creates a new set of options from environment variables.
    pub fn from_env(prefix: &str) -> Result<Self, String> {
        Ok(Self {
            key: get_required_var::<String>(prefix, "KEY")?,
            ttl: get_optional_var::<Duration>(prefix, "TTL")?
                .unwrap_or_else(|| Duration::from_secs(DEFAULT_TOKEN_TTL_SECONDS)),
        })
    }
}

/// Contents of an access token.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct Claims {
    /// Identifier of the user the token was issued to.
    user_id: String,

    /// Email address of the user the token was issued to.
    user_email: String,

    /// Issuance time in seconds since the epoch.
    iat: i64,

    /// Expiration time in seconds since the epoch.
    exp: i64,
}

/// Signs and verifies access tokens with a server-held secret.
#[derive(Clone)]
pub struct TokenIssuer {
    /// Clock instance to obtain the current time.
    clock: Arc<dyn Clock + Send + Sync>,

    /// Key to sign new tokens with.
    encoding_key: EncodingKey,

    /// Key to verify presented tokens with.
    decoding_key: DecodingKey,

    /// Validity of newly-issued tokens.
    ttl: Duration,
}

impl TokenIssuer {
    /// Creates a new issuer configured by `opts` that obtains the time from `clock`.
    pub fn new(opts: TokenOptions, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            clock,
            encoding_key: EncodingKey::from_secret(opts.key.as_bytes()),
            decoding_key: DecodingKey::from_secret(opts.key.as_bytes()),
            ttl: opts.ttl,
        }
    }

    /// Issues a new token that asserts the given `identity`.
    pub fn issue(&self, identity: &Identity) -> DriverResult<AccessToken> {
        let iat = self.clock.now_timestamp();
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            user_id: identity.user_id().to_string(),
            user_email: identity.email().as_str().to_owned(),
            iat,
            exp: iat.saturating_add(ttl),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| DriverError::BackendError(format!("Failed to sign token: {}", e)))?;
        Ok(AccessToken::new(token)?)
    }

    /// Verifies that `token` was issued by us and has not expired yet, and returns the identity
    /// it asserts.
    pub fn verify(&self, token: &str) -> DriverResult<Identity> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp"]);

        let claims = match decode::<Claims>(token, &self.decoding_key, &validation) {
            Ok(data) => data.claims,
            Err(e) => {
                debug!("Rejecting token: {}", e);
                return Err(DriverError::Unauthorized("Invalid token".to_owned()));
            }
        };

        if claims.exp <= self.clock.now_timestamp() {
            return Err(DriverError::Unauthorized("Token expired".to_owned()));
        }

        let user_id = UserId::parse(&claims.user_id)
            .map_err(|e| DriverError::Unauthorized(format!("Invalid token subject: {}", e)))?;
        let email = EmailAddress::new(claims.user_email)
            .map_err(|e| DriverError::Unauthorized(format!("Invalid token subject: {}", e)))?;
        Ok(Identity::new(user_id, email))
    }
}
