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

//! Utilities to deal with HTTP authorization.

use crate::model::AccessToken;
use http::header::HeaderMap;
use log::debug;
use tripshare_core::rest::{RestError, RestResult, get_unique_header};

/// Logs why the credentials of a request were rejected and returns the error to report.
fn reject(message: &str) -> RestError {
    debug!("Rejecting credentials: {}", message);
    RestError::Unauthorized
}

/// Assumes that the `headers` contain a bearer access token and extracts it.
///
/// The token is the second word of the `Authorization` header and the first word must name the
/// `Bearer` scheme.
pub fn get_bearer_auth(headers: &HeaderMap) -> RestResult<AccessToken> {
    let authz = match get_unique_header(headers, "Authorization") {
        Ok(Some(value)) => value,
        Ok(None) => return Err(reject("Missing Authorization header")),
        Err(_) => return Err(reject("Authorization header has more than one value")),
    };

    let authz = match authz.to_str() {
        Ok(value) => value,
        Err(e) => return Err(reject(&format!("Bad encoding in Authorization header: {}", e))),
    };

    let mut fields = authz.split(' ');
    match fields.next() {
        Some(scheme) if scheme.eq_ignore_ascii_case("Bearer") => (),
        _ => return Err(reject("Unsupported scheme")),
    }
    let payload = match fields.next() {
        Some(s) if !s.is_empty() => s,
        _ => return Err(reject("Bad Authorization header: missing payload")),
    };

    AccessToken::new(payload).map_err(|e| reject(&e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_get_bearer_auth_ok() {
        let mut headers = HeaderMap::new();
        headers.append("Authorization", "Bearer some.token".parse().unwrap());
        assert_eq!(AccessToken::new("some.token").unwrap(), get_bearer_auth(&headers).unwrap());
    }

    #[test]
    fn test_get_bearer_auth_scheme_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.append("Authorization", "bearer abc".parse().unwrap());
        assert_eq!(AccessToken::new("abc").unwrap(), get_bearer_auth(&headers).unwrap());
    }

    #[test]
    fn test_get_bearer_auth_takes_second_word() {
        let mut headers = HeaderMap::new();
        headers.append("Authorization", "Bearer abc def".parse().unwrap());
        assert_eq!(AccessToken::new("abc").unwrap(), get_bearer_auth(&headers).unwrap());
    }

    /// Runs `get_bearer_auth` with an invalid set of header `values` and ensures that the call
    /// fails with an `Unauthorized` error.
    fn do_get_bearer_auth_error_test(values: &[&[u8]]) {
        let mut headers = HeaderMap::new();
        for value in values {
            headers.append("Authorization", HeaderValue::from_bytes(value).unwrap());
        }
        assert_eq!(RestError::Unauthorized, get_bearer_auth(&headers).unwrap_err());
    }

    #[test]
    fn test_get_bearer_auth_missing() {
        do_get_bearer_auth_error_test(&[]);
    }

    #[test]
    fn test_get_bearer_auth_duplicate() {
        do_get_bearer_auth_error_test(&[b"Bearer a", b"Bearer b"]);
    }

    #[test]
    fn test_get_bearer_auth_bad_encoding() {
        do_get_bearer_auth_error_test(&[b"Bearer \xc3\x28"]);
    }

    #[test]
    fn test_get_bearer_auth_bad_scheme() {
        do_get_bearer_auth_error_test(&[b"Basic abc"]);
        do_get_bearer_auth_error_test(&[b"abc"]);
    }

    #[test]
    fn test_get_bearer_auth_missing_payload() {
        do_get_bearer_auth_error_test(&[b"Bearer"]);
        do_get_bearer_auth_error_test(&[b"Bearer "]);
    }
}
