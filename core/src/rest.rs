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

//! Generic code for REST handlers.
//!
//! All services should implement an `app` function in this module that returns the `Router` for the
//! application.
//!
//! Every API should be put in its own `.rs` file, using a name like `<entity>_<method>.rs`.  This
//! may seem overkill, but putting every API in its own file makes it easy to ensure all the
//! integration tests for the given API truly belong to that API.
//!
//! More specifically, the `tests` module within an API should define a `route` method that
//! returns the HTTP method and the API path under test.  All integration tests within the module
//! then rely on `route` to obtain this information, ensuring that they all test the desired API.
//!
//! It is also useful for the tests in this layer to define a `TestContext` in a `testutils` module
//! that allows interacting with the database layer directly, using simplified types.
//!
//! Errors returned to clients never carry internal details: each `RestError` kind has a fixed
//! human-readable message, and backend failures are logged and replaced by the failure message
//! of the operation that triggered them.

use crate::driver::DriverError;
use crate::model::ModelError;
use async_trait::async_trait;
use axum::Json;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::AsHeaderName;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use bytes::Bytes;
use log::{debug, error};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Failure message for errors that are not attributed to any specific operation.
const UNKNOWN_FAILURE: &str = "An unknown error occurred.";

/// Frontend errors.  These are the errors that are visible to the user on failed requests.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum RestError {
    /// Indicates that the address of a trip could not be resolved to coordinates.
    #[error("Could not find coordinates for specified address.")]
    AddressNotFound,

    /// Indicates that the email address of a new account is already registered.
    #[error("Email address is already in use.")]
    EmailInUse,

    /// Catch-all error type for all unexpected errors.  The message must not leak internal
    /// details.
    #[error("{0}")]
    InternalError(String),

    /// Indicates that sign in failed, without revealing whether the email address exists.
    #[error("Invalid credentials.")]
    InvalidCredentials,

    /// Indicates that the request payload is missing fields or has invalid contents.
    #[error("Malformed payload body.")]
    MalformedPayload,

    /// Indicates that a requested entity does not exist or is not visible to the caller.
    #[error("{0}")]
    NotFound(String),

    /// Indicates that the request lacks valid credentials.
    #[error("Unauthorized.")]
    Unauthorized,
}

impl RestError {
    /// Converts a driver error raised while executing an operation into a frontend error.
    ///
    /// `failure` is the message to return to the client if the error comes from a backend
    /// problem, in which case the details are logged and hidden from the client.
    pub fn from_driver(e: DriverError, failure: &str) -> Self {
        match e {
            DriverError::AddressNotFound => RestError::AddressNotFound,
            DriverError::BackendError(details) => {
                error!("{} Cause: {}", failure, details);
                RestError::InternalError(failure.to_owned())
            }
            DriverError::EmailInUse => RestError::EmailInUse,
            DriverError::InvalidCredentials => RestError::InvalidCredentials,
            DriverError::InvalidInput(details) => {
                debug!("Rejecting invalid input: {}", details);
                RestError::MalformedPayload
            }
            DriverError::NotFound(message) => RestError::NotFound(message),
            DriverError::Unauthorized(details) => {
                debug!("Rejecting credentials: {}", details);
                RestError::Unauthorized
            }
        }
    }

    /// Returns the HTTP status code that corresponds to this error.
    pub fn status(&self) -> StatusCode {
        match self {
            RestError::AddressNotFound => StatusCode::NOT_FOUND,
            RestError::EmailInUse => StatusCode::BAD_REQUEST,
            RestError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RestError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            RestError::MalformedPayload => StatusCode::BAD_REQUEST,
            RestError::NotFound(_) => StatusCode::NOT_FOUND,
            RestError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }
}

impl From<DriverError> for RestError {
    fn from(e: DriverError) -> Self {
        RestError::from_driver(e, UNKNOWN_FAILURE)
    }
}

impl From<ModelError> for RestError {
    fn from(e: ModelError) -> Self {
        debug!("Rejecting invalid input: {}", e);
        RestError::MalformedPayload
    }
}

impl From<validator::ValidationErrors> for RestError {
    fn from(e: validator::ValidationErrors) -> Self {
        debug!("Rejecting payload: {}", e.to_string().replace('\n', "; "));
        RestError::MalformedPayload
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let mut headers = HeaderMap::new();
        if self == RestError::Unauthorized {
            headers.insert("WWW-Authenticate", HeaderValue::from_static("Bearer"));
        }

        let response = ErrorResponse { message: self.to_string() };

        (status, headers, Json(response)).into_response()
    }
}

/// Result type for this module.
pub type RestResult<T> = Result<T, RestError>;

/// Representation of the details of an error response.
#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct ErrorResponse {
    /// Textual representation of the error message.
    pub(crate) message: String,
}

/// Handler for requests that do not match any route.
pub async fn route_not_found() -> RestError {
    RestError::NotFound("Route not found.".to_owned())
}

/// A request body extractor for JSON payloads.
///
/// Unlike `axum::Json`, any problem with the payload (missing content type, syntax errors or
/// missing fields) is reported as a `RestError::MalformedPayload`.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = RestError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(e) => {
                debug!("Rejecting JSON payload: {}", e.body_text());
                Err(RestError::MalformedPayload)
            }
        }
    }
}

/// A file attached to a multipart request.
#[derive(Debug)]
pub struct FilePart {
    /// Content type declared by the client for this part.
    content_type: String,

    /// Raw contents of the file.
    bytes: Bytes,
}

impl FilePart {
    /// Returns the content type declared by the client.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Consumes the part and returns its contents.
    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

/// A request body extractor for `multipart/form-data` payloads.
///
/// Text fields and files are collected in memory.  A part is considered to be a file if it carries
/// a file name.  Later parts with the same name replace earlier ones.
#[derive(Debug, Default)]
pub struct MultipartBody {
    /// Text fields keyed by name.
    fields: HashMap<String, String>,

    /// Files keyed by field name.
    files: HashMap<String, FilePart>,
}

impl MultipartBody {
    /// Extracts the value of the text field `name`, if present.
    pub fn take_field(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name)
    }

    /// Extracts the file attached as field `name`, if present.
    pub fn take_file(&mut self, name: &str) -> Option<FilePart> {
        self.files.remove(name)
    }
}

/// Logs the reason why a multipart payload was rejected.
fn reject_multipart<E: std::fmt::Display>(e: E) -> RestError {
    debug!("Rejecting multipart payload: {}", e);
    RestError::MalformedPayload
}

#[async_trait]
impl<S> FromRequest<S> for MultipartBody
where
    S: Send + Sync,
{
    type Rejection = RestError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut multipart = Multipart::from_request(req, state).await.map_err(reject_multipart)?;

        let mut body = MultipartBody::default();
        while let Some(field) = multipart.next_field().await.map_err(reject_multipart)? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            if field.file_name().is_some() {
                let content_type =
                    field.content_type().unwrap_or("application/octet-stream").to_owned();
                let bytes = field.bytes().await.map_err(reject_multipart)?;
                body.files.insert(name, FilePart { content_type, bytes });
            } else {
                let value = field.text().await.map_err(reject_multipart)?;
                body.fields.insert(name, value);
            }
        }
        Ok(body)
    }
}

/// Extracts the header `name` from `headers` and ensures it has at most one value.
pub fn get_unique_header<K: AsHeaderName + Copy>(
    headers: &HeaderMap,
    name: K,
) -> RestResult<Option<&HeaderValue>> {
    let mut iter = headers.get_all(name).iter();
    let value = iter.next();
    if iter.next().is_some() {
        debug!("Header {} cannot have more than one value", name.as_str());
        return Err(RestError::MalformedPayload);
    }
    Ok(value)
}

/// Common test code for the REST server.
#[cfg(any(test, feature = "testutils"))]
pub mod testutils {
    use super::*;
    use axum::Router;
    use axum::http::{self, HeaderName};
    use serde::Serialize;
    use std::fmt;
    use tower::util::ServiceExt;

    /// Maximum body size for testing purposes.
    const MAX_BODY_SIZE: usize = 64 * 1024;

    /// Boundary used to separate the parts of multipart payloads.
    const BOUNDARY: &str = "tripshare-test-boundary-3f1c";

    /// Builder for a `multipart/form-data` payload.
    #[derive(Default)]
    #[must_use]
    pub struct MultipartForm {
        /// Encoded parts so far, without the closing delimiter.
        body: Vec<u8>,
    }

    impl MultipartForm {
        /// Creates an empty form.
        pub fn new() -> Self {
            Self::default()
        }

        /// Adds a text field.
        pub fn text<N: AsRef<str>, V: AsRef<str>>(mut self, name: N, value: V) -> Self {
            self.body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                    BOUNDARY,
                    name.as_ref(),
                    value.as_ref()
                )
                .as_bytes(),
            );
            self
        }

        /// Adds a file field.
        pub fn file<N: AsRef<str>, F: AsRef<str>>(
            mut self,
            name: N,
            file_name: F,
            content_type: &str,
            bytes: &[u8],
        ) -> Self {
            self.body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                    Content-Type: {}\r\n\r\n",
                    BOUNDARY,
                    name.as_ref(),
                    file_name.as_ref(),
                    content_type
                )
                .as_bytes(),
            );
            self.body.extend_from_slice(bytes);
            self.body.extend_from_slice(b"\r\n");
            self
        }

        /// Terminates the form and returns its encoded representation.
        fn finish(mut self) -> Vec<u8> {
            self.body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
            self.body
        }
    }

    /// Builder for a single request to the API server.
    #[must_use]
    pub struct OneShotBuilder {
        /// The router for the app being tested.
        app: Router,

        /// Builder for the request that will be sent to the app.
        builder: axum::http::request::Builder,
    }

    impl OneShotBuilder {
        /// Creates a new request against a given `method`/`uri` pair served by an `app` router.
        pub fn new<U: AsRef<str>>(app: Router, (method, uri): (http::Method, U)) -> Self {
            let builder = http::Request::builder().method(method).uri(uri.as_ref());
            Self { app, builder }
        }

        /// Adds bearer authentication to the request.
        pub fn with_bearer_auth<T>(mut self, token: T) -> Self
        where
            T: fmt::Display,
        {
            let value = format!("Bearer {}", token);
            self.builder = self.builder.header(http::header::AUTHORIZATION, value);
            self
        }

        /// Sets the header `name` to `value` in the outgoing request.
        pub fn with_header<K, V>(mut self, name: K, value: V) -> Self
        where
            HeaderName: TryFrom<K>,
            <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
            HeaderValue: TryFrom<V>,
            <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
        {
            self.builder = self.builder.header(name, value);
            self
        }

        /// Finishes building the request and sends it with an empty payload.
        pub async fn send_empty(self) -> ResponseChecker {
            let request = self.builder.body(axum::body::Body::empty()).unwrap();
            ResponseChecker::from(self.app.oneshot(request).await.unwrap())
        }

        /// Finishes building the request and sends it with a text payload.
        pub async fn send_text<T: Into<String>>(self, text: T) -> ResponseChecker {
            let request = self
                .builder
                .header(http::header::CONTENT_TYPE, mime::TEXT_PLAIN.as_ref())
                .body(axum::body::Body::from(text.into()))
                .unwrap();
            ResponseChecker::from(self.app.oneshot(request).await.unwrap())
        }

        /// Finishes building the request and sends it with a JSON payload.
        pub async fn send_json<T: Serialize>(self, request: T) -> ResponseChecker {
            let request = self
                .builder
                .header(http::header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
                .body(axum::body::Body::from(serde_json::to_vec(&request).unwrap()))
                .unwrap();
            ResponseChecker::from(self.app.oneshot(request).await.unwrap())
        }

        /// Finishes building the request and sends it with a multipart `form` as the payload.
        pub async fn send_multipart(self, form: MultipartForm) -> ResponseChecker {
            let request = self
                .builder
                .header(
                    http::header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", BOUNDARY),
                )
                .body(axum::body::Body::from(form.finish()))
                .unwrap();
            ResponseChecker::from(self.app.oneshot(request).await.unwrap())
        }
    }

    /// Type alias for the complex type returned by the `oneshot` function.
    type HttpResponse = hyper::Response<axum::body::Body>;

    /// Validator for the outcome of a request sent by a `OneShotBuilder`.
    #[must_use]
    pub struct ResponseChecker {
        /// Actual response that we received from the app.
        response: HttpResponse,

        /// Expected HTTP status code in the response above.
        exp_status: http::StatusCode,
    }

    impl From<HttpResponse> for ResponseChecker {
        fn from(response: HttpResponse) -> Self {
            Self { response, exp_status: http::StatusCode::OK }
        }
    }

    impl ResponseChecker {
        /// Sets the expected exit HTTP status to `status`.
        pub fn expect_status(mut self, status: http::StatusCode) -> Self {
            self.exp_status = status;
            self
        }

        /// Performs common validation operations on the response.
        pub fn verify(&self) {
            assert_eq!(self.exp_status, self.response.status());
        }

        /// Finishes checking the response and expects its body to be an `ErrorResponse` that
        /// matches `exp_re`.
        pub async fn expect_error(self, exp_re: &str) {
            self.verify();

            let body =
                axum::body::to_bytes(self.response.into_body(), MAX_BODY_SIZE).await.unwrap();
            let response: ErrorResponse = match serde_json::from_slice(&body) {
                Ok(response) => response,
                Err(e) => {
                    let body = String::from_utf8(body.to_vec()).unwrap();
                    panic!("Invalid error response due to {}; content was {}", e, body);
                }
            };
            let re = regex::Regex::new(exp_re).unwrap();
            assert!(
                re.is_match(&response.message),
                "Response content '{:?}' does not match re '{}'",
                response,
                exp_re
            );
        }

        /// Finishes checking the response and expects it to contain a valid JSON object of
        /// type `T`.
        pub async fn expect_json<T: DeserializeOwned>(self) -> T {
            self.verify();

            let body =
                axum::body::to_bytes(self.response.into_body(), MAX_BODY_SIZE).await.unwrap();
            match serde_json::from_slice::<T>(&body) {
                Ok(value) => value,
                Err(e) => {
                    let body = String::from_utf8_lossy(&body);
                    panic!("Invalid JSON response due to {}; content was {}", e, body);
                }
            }
        }

        /// Finishes checking the response and returns the body of the response as raw bytes.
        pub async fn take_body(self) -> Bytes {
            self.verify();

            axum::body::to_bytes(self.response.into_body(), MAX_BODY_SIZE).await.unwrap()
        }

        /// Finishes checking the response and returns the response itself for out of band
        /// validation of properties not supported by the `ResponseChecker`.
        pub async fn take_response(self) -> HttpResponse {
            self.verify();

            self.response
        }
    }

    /// Generates a test to verify that an API that expects JSON fails when it gets something else.
    ///
    /// The optional `token` is sent as bearer authentication for APIs behind the auth gate.
    #[macro_export]
    macro_rules! test_payload_must_be_json {
        ( $app:expr, $route:expr $(, $token:expr)? ) => {
            #[tokio::test]
            async fn test_payload_must_be_json() {
                $crate::rest::testutils::OneShotBuilder::new($app, $route)
                    $( .with_bearer_auth($token) )?
                    .send_text("this is not json")
                    .await
                    .expect_status(axum::http::StatusCode::BAD_REQUEST)
                    .expect_error("Malformed payload body")
                    .await;

                $crate::rest::testutils::OneShotBuilder::new($app, $route)
                    $( .with_bearer_auth($token) )?
                    .with_header(axum::http::header::CONTENT_TYPE, "application/json")
                    .send_text("this is not json")
                    .await
                    .expect_status(axum::http::StatusCode::BAD_REQUEST)
                    .expect_error("Malformed payload body")
                    .await;
            }
        };
    }

    pub use test_payload_must_be_json;

    /// Generates a test to verify that an API that expects a multipart form fails when it gets
    /// something else.
    ///
    /// The optional `token` is sent as bearer authentication for APIs behind the auth gate.
    #[macro_export]
    macro_rules! test_payload_must_be_multipart {
        ( $app:expr, $route:expr $(, $token:expr)? ) => {
            #[tokio::test]
            async fn test_payload_must_be_multipart() {
                $crate::rest::testutils::OneShotBuilder::new($app, $route)
                    $( .with_bearer_auth($token) )?
                    .send_json(serde_json::json!({"title": "not multipart"}))
                    .await
                    .expect_status(axum::http::StatusCode::BAD_REQUEST)
                    .expect_error("Malformed payload body")
                    .await;
            }
        };
    }

    pub use test_payload_must_be_multipart;
}
