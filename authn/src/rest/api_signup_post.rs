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

//! API to create a new user account.

use crate::driver::AuthnDriver;
use crate::model::Password;
use crate::rest::AuthResponse;
use axum::Json;
use axum::extract::State;
use http::StatusCode;
use tripshare_core::driver::DriverError;
use tripshare_core::model::EmailAddress;
use tripshare_core::rest::{MultipartBody, RestError, RestResult};
use tripshare_storage::Upload;
use validator::Validate;

/// Message returned to the client when sign up fails for reasons outside of its control.
const FAILURE: &str = "Sign up failed, please try again.";

/// Text fields of the sign up form.
#[derive(Validate)]
struct SignupForm {
    /// Given name of the user.
    #[validate(required, length(min = 1))]
    first_name: Option<String>,

    /// Family name of the user.
    #[validate(required, length(min = 1))]
    last_name: Option<String>,

    /// Email address of the new account.
    #[validate(required, email)]
    email: Option<String>,

    /// Plaintext password of the new account.
    #[validate(required, length(min = 8))]
    password: Option<String>,
}

impl From<&mut MultipartBody> for SignupForm {
    fn from(body: &mut MultipartBody) -> Self {
        Self {
            first_name: body.take_field("firstName"),
            last_name: body.take_field("lastName"),
            email: body.take_field("email"),
            password: body.take_field("password"),
        }
    }
}

/// POST handler for this API.
pub(crate) async fn handler(
    State(driver): State<AuthnDriver>,
    mut body: MultipartBody,
) -> RestResult<(StatusCode, Json<AuthResponse>)> {
    let form = SignupForm::from(&mut body);
    form.validate()?;
    let Some(image) = body.take_file("image") else {
        return Err(RestError::MalformedPayload);
    };

    let first_name = form.first_name.unwrap_or_default();
    let last_name = form.last_name.unwrap_or_default();
    let email = EmailAddress::new(form.email.unwrap_or_default())?;
    let password = Password::new(form.password.unwrap_or_default())?;
    let content_type = image.content_type().to_owned();
    let image = Upload::new(image.into_bytes(), &content_type)
        .map_err(|e| RestError::from_driver(DriverError::from(e), FAILURE))?;

    let session = driver
        .signup(first_name, last_name, email, password, image)
        .await
        .map_err(|e| RestError::from_driver(e, FAILURE))?;

    let response =
        AuthResponse { user_id: session.user_id(), token: session.take_access_token() };
    Ok((StatusCode::CREATED, Json(response)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::rest::testutils::*;
    use tripshare_core::rest::testutils::{MultipartForm, OneShotBuilder};
    use tripshare_core::test_payload_must_be_multipart;
    use tripshare_storage::MAX_UPLOAD_BYTES;

    fn route() -> (http::Method, String) {
        (http::Method::POST, "/api/users/signup".to_owned())
    }

    /// Creates a valid sign up form for `email`.
    fn form(email: &str) -> MultipartForm {
        MultipartForm::new()
            .text("firstName", "A")
            .text("lastName", "B")
            .text("email", email)
            .text("password", "password1")
            .file("image", "me.png", "image/png", b"\x89PNG fake")
    }

    #[tokio::test]
    async fn test_ok() {
        let context = TestContext::setup().await;

        let response = OneShotBuilder::new(context.app(), route())
            .send_multipart(form("a@b.com"))
            .await
            .expect_status(StatusCode::CREATED)
            .expect_json::<AuthResponse>()
            .await;

        let user = db::get_user_by_id(&mut context.ex().await, response.user_id).await.unwrap();
        assert_eq!("A", user.first_name());
        assert_eq!("B", user.last_name());
        assert_eq!(&EmailAddress::from("a@b.com"), user.email());
        assert!(user.trips().is_empty());
        assert!(context.store().contains(user.image().unwrap()).await);

        let identity = context.verify(&response.token);
        assert_eq!(response.user_id, identity.user_id());
        context.close().await;
    }

    #[tokio::test]
    async fn test_email_in_use() {
        let context = TestContext::setup().await;

        OneShotBuilder::new(context.app(), route())
            .send_multipart(form("a@b.com"))
            .await
            .expect_status(StatusCode::CREATED)
            .verify();

        OneShotBuilder::new(context.app(), route())
            .send_multipart(form("a@b.com"))
            .await
            .expect_status(StatusCode::BAD_REQUEST)
            .expect_error("^Email address is already in use.$")
            .await;

        assert_eq!(1, db::get_users(&mut context.ex().await).await.unwrap().len());
        assert_eq!(1, context.store().object_count().await);
        context.close().await;
    }

    #[tokio::test]
    async fn test_missing_fields() {
        let context = TestContext::setup().await;

        let forms = [
            MultipartForm::new()
                .text("lastName", "B")
                .text("email", "a@b.com")
                .text("password", "password1")
                .file("image", "me.png", "image/png", b"x"),
            MultipartForm::new()
                .text("firstName", "A")
                .text("lastName", "B")
                .text("email", "a@b.com")
                .text("password", "password1"),
            MultipartForm::new()
                .text("firstName", "A")
                .text("lastName", "B")
                .text("password", "password1")
                .file("image", "me.png", "image/png", b"x"),
        ];
        for form in forms {
            OneShotBuilder::new(context.app(), route())
                .send_multipart(form)
                .await
                .expect_status(StatusCode::BAD_REQUEST)
                .expect_error("^Malformed payload body.$")
                .await;
        }

        assert!(db::get_users(&mut context.ex().await).await.unwrap().is_empty());
        assert_eq!(0, context.store().object_count().await);
        context.close().await;
    }

    #[tokio::test]
    async fn test_invalid_fields() {
        let context = TestContext::setup().await;

        let forms = [
            form("not-an-email"),
            form("a@.b.c"),
            form("a@b..c"),
            MultipartForm::new()
                .text("firstName", "")
                .text("lastName", "B")
                .text("email", "a@b.com")
                .text("password", "password1")
                .file("image", "me.png", "image/png", b"x"),
            MultipartForm::new()
                .text("firstName", "A")
                .text("lastName", "B")
                .text("email", "a@b.com")
                .text("password", "short")
                .file("image", "me.png", "image/png", b"x"),
            MultipartForm::new()
                .text("firstName", "A")
                .text("lastName", "B")
                .text("email", "a@b.com")
                .text("password", "x".repeat(100))
                .file("image", "me.png", "image/png", b"x"),
        ];
        for form in forms {
            OneShotBuilder::new(context.app(), route())
                .send_multipart(form)
                .await
                .expect_status(StatusCode::BAD_REQUEST)
                .expect_error("^Malformed payload body.$")
                .await;
        }

        assert!(db::get_users(&mut context.ex().await).await.unwrap().is_empty());
        context.close().await;
    }

    #[tokio::test]
    async fn test_bad_image() {
        let context = TestContext::setup().await;

        let too_large = vec![0u8; MAX_UPLOAD_BYTES + 1];
        let forms = [
            MultipartForm::new()
                .text("firstName", "A")
                .text("lastName", "B")
                .text("email", "a@b.com")
                .text("password", "password1")
                .file("image", "me.gif", "image/gif", b"GIF89a"),
            MultipartForm::new()
                .text("firstName", "A")
                .text("lastName", "B")
                .text("email", "a@b.com")
                .text("password", "password1")
                .file("image", "me.png", "image/png", &too_large),
        ];
        for form in forms {
            OneShotBuilder::new(context.app(), route())
                .send_multipart(form)
                .await
                .expect_status(StatusCode::BAD_REQUEST)
                .expect_error("^Malformed payload body.$")
                .await;
        }

        assert_eq!(0, context.store().object_count().await);
        context.close().await;
    }

    #[tokio::test]
    async fn test_storage_failure() {
        let context = TestContext::setup().await;
        context.store().set_fail_puts(true);

        OneShotBuilder::new(context.app(), route())
            .send_multipart(form("a@b.com"))
            .await
            .expect_status(StatusCode::INTERNAL_SERVER_ERROR)
            .expect_error("^Sign up failed, please try again.$")
            .await;

        assert!(db::get_users(&mut context.ex().await).await.unwrap().is_empty());
        context.close().await;
    }

    test_payload_must_be_multipart!(TestContext::setup().await.app(), route());
}
