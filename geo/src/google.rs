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

//! Geocoding API implementation backed by the Google Geocoding service.

use crate::{Coordinates, GeoError, GeoResult, Geocoder};
use async_trait::async_trait;
use bytes::{Buf, Bytes};
use derivative::Derivative;
use log::debug;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tripshare_core::env::get_required_var;

/// Endpoint of the Google Geocoding API for JSON responses.
const GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Converts a `reqwest::Error` to a `GeoError`.
fn reqwest_error_to_geo_error(e: reqwest::Error) -> GeoError {
    GeoError::Upstream(e.to_string())
}

/// Converts a `reqwest::Response` to a `GeoError`.  The response should have a non-OK status.
async fn http_response_to_geo_error(response: Response) -> GeoError {
    let status = response.status();
    match response.text().await {
        Ok(text) => GeoError::Upstream(format!(
            "HTTP request returned status {} with text '{}'",
            status, text
        )),
        Err(e) => GeoError::Upstream(format!(
            "HTTP request returned status {} and failed to get text due to {}",
            status, e
        )),
    }
}

/// Request to the Google Geocoding service to resolve an address.
#[derive(Serialize)]
struct GeocodeRequest<'a, 'b> {
    /// The address to resolve.
    address: &'a str,

    /// The API key to use.
    key: &'b str,
}

/// Geometry information as encoded within `GeocodeResult`.
#[derive(Deserialize)]
struct Geometry {
    /// The resolved coordinates.
    location: Coordinates,
}

/// A single candidate returned for a query.
#[derive(Deserialize)]
struct GeocodeResult {
    /// Geometry of the candidate.
    geometry: Geometry,
}

/// Response from the Google Geocoding service to a `GeocodeRequest`.
#[derive(Deserialize)]
struct GeocodeResponse {
    /// Outcome of the query, such as `OK` or `ZERO_RESULTS`.
    status: String,

    /// Candidates for the address, best match first.
    #[serde(default)]
    results: Vec<GeocodeResult>,

    /// Details about a failed query.
    error_message: Option<String>,
}

/// Interprets the body of a response from the geocoding service.
fn parse_response(bytes: Bytes) -> GeoResult<Coordinates> {
    let response: GeocodeResponse = serde_json::from_reader(bytes.reader())
        .map_err(|e| GeoError::Upstream(format!("Invalid geocoding response: {}", e)))?;

    match response.status.as_str() {
        "OK" => match response.results.into_iter().next() {
            Some(result) => Ok(result.geometry.location),
            None => Err(GeoError::AddressNotFound),
        },
        "ZERO_RESULTS" => Err(GeoError::AddressNotFound),
        status => Err(GeoError::Upstream(match response.error_message {
            Some(message) => format!("Geocoding service returned {}: {}", status, message),
            None => format!("Geocoding service returned {}", status),
        })),
    }
}

/// Options to configure a `GoogleGeocoder`.
#[derive(Derivative)]
#[derivative(Debug)]
#[cfg_attr(test, derivative(PartialEq))]
pub struct GoogleGeocoderOptions {
    /// The API key to use to contact the Google Geocoding service.
    #[derivative(Debug = "ignore")]
    pub key: String,
}

impl GoogleGeocoderOptions {
    /// Creates a set of options from environment variables whose name is prefixed with the
    /// given `prefix`.
    ///
    /// This will use variables such as `<prefix>_KEY`.
    pub fn from_env(prefix: &str) -> Result<Self, String> {
        Ok(Self { key: get_required_var::<String>(prefix, "KEY")? })
    }
}

/// Geocoder that uses the Google Geocoding service.
#[derive(Clone)]
pub struct GoogleGeocoder {
    /// Google API key.
    key: String,

    /// Asynchronous HTTP client with which to issue the service requests.
    client: Client,
}

impl GoogleGeocoder {
    /// Creates a new Google-backed geocoder using `opts` for configuration.
    pub fn new(opts: GoogleGeocoderOptions) -> Self {
        Self { key: opts.key, client: Client::default() }
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn resolve(&self, address: &str) -> GeoResult<Coordinates> {
        let request = GeocodeRequest { address, key: &self.key };
        let response = self
            .client
            .get(GEOCODE_URL)
            .query(&request)
            .send()
            .await
            .map_err(reqwest_error_to_geo_error)?;
        match response.status() {
            StatusCode::OK => {
                let bytes = response.bytes().await.map_err(reqwest_error_to_geo_error)?;
                let result = parse_response(bytes);
                if let Err(e) = &result {
                    debug!("Geocoding of '{}' failed: {}", address, e);
                }
                result
            }
            _ => Err(http_response_to_geo_error(response).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    pub fn test_googlegeocoderoptions_from_env_all_present() {
        temp_env::with_var("GOOGLE_GEOCODING_KEY", Some("the-key"), || {
            let opts = GoogleGeocoderOptions::from_env("GOOGLE_GEOCODING").unwrap();
            assert_eq!(GoogleGeocoderOptions { key: "the-key".to_owned() }, opts);
        });
    }

    #[test]
    pub fn test_googlegeocoderoptions_from_env_missing() {
        temp_env::with_var_unset("GOOGLE_GEOCODING_KEY", || {
            let err = GoogleGeocoderOptions::from_env("GOOGLE_GEOCODING").unwrap_err();
            assert!(err.contains("GOOGLE_GEOCODING_KEY not present"));
        });
    }

    #[test]
    pub fn test_googlegeocoderoptions_debug_hides_key() {
        let opts = GoogleGeocoderOptions { key: "super-secret".to_owned() };
        assert!(!format!("{:?}", opts).contains("super-secret"));
    }

    #[test]
    fn test_parse_response_ok() {
        let body = r#"{
            "results": [
                {
                    "formatted_address": "20 W 34th St, New York, NY 10001, USA",
                    "geometry": { "location": { "lat": 40.7484405, "lng": -73.9856644 } }
                },
                {
                    "geometry": { "location": { "lat": 1.0, "lng": 2.0 } }
                }
            ],
            "status": "OK"
        }"#;
        assert_eq!(
            Coordinates { lat: 40.7484405, lng: -73.9856644 },
            parse_response(Bytes::from_static(body.as_bytes())).unwrap()
        );
    }

    #[test]
    fn test_parse_response_zero_results() {
        let body = r#"{"results": [], "status": "ZERO_RESULTS"}"#;
        assert_eq!(
            GeoError::AddressNotFound,
            parse_response(Bytes::from_static(body.as_bytes())).unwrap_err()
        );
    }

    #[test]
    fn test_parse_response_ok_without_results() {
        let body = r#"{"status": "OK"}"#;
        assert_eq!(
            GeoError::AddressNotFound,
            parse_response(Bytes::from_static(body.as_bytes())).unwrap_err()
        );
    }

    #[test]
    fn test_parse_response_denied() {
        let body = r#"{
            "error_message": "The provided API key is invalid.",
            "results": [],
            "status": "REQUEST_DENIED"
        }"#;
        match parse_response(Bytes::from_static(body.as_bytes())) {
            Err(GeoError::Upstream(msg)) => {
                assert!(msg.contains("REQUEST_DENIED"));
                assert!(msg.contains("API key is invalid"));
            }
            e => panic!("{:?}", e),
        }
    }

    #[test]
    fn test_parse_response_garbage() {
        match parse_response(Bytes::from_static(b"<html>")) {
            Err(GeoError::Upstream(msg)) => assert!(msg.contains("Invalid geocoding response")),
            e => panic!("{:?}", e),
        }
    }

    fn setup() -> GoogleGeocoder {
        GoogleGeocoder::new(GoogleGeocoderOptions::from_env("GOOGLE_GEOCODING").unwrap())
    }

    #[tokio::test]
    #[ignore = "Requires environment configuration and is expensive"]
    async fn test_ok() {
        let geocoder = setup();
        let coordinates = geocoder.resolve("Empire State Building, New York").await.unwrap();
        assert!((coordinates.lat - 40.748).abs() < 0.01);
        assert!((coordinates.lng - -73.985).abs() < 0.01);
    }

    #[tokio::test]
    #[ignore = "Requires environment configuration and is expensive"]
    async fn test_missing() {
        let geocoder = setup();
        assert_eq!(
            GeoError::AddressNotFound,
            geocoder.resolve("zzzzzzzzzzzzzzzz qqqqqqqqqqqq 00000000").await.unwrap_err()
        );
    }

    #[tokio::test]
    #[ignore = "Requires environment configuration and is expensive"]
    async fn test_bad_key() {
        let geocoder = GoogleGeocoder::new(GoogleGeocoderOptions { key: "bad-key".to_owned() });
        match geocoder.resolve("Empire State Building, New York").await {
            Err(GeoError::Upstream(_)) => (),
            e => panic!("{:?}", e),
        }
    }
}
