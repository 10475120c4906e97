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

//! API to modify the title and description of a trip.

use crate::driver::TripsDriver;
use crate::model::{TripContent, TripView};
use crate::rest::parse_trip_id;
use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use tripshare_authn::model::Identity;
use tripshare_core::rest::{JsonBody, RestError, RestResult};
use validator::Validate;

/// Message returned to the client when the update fails for reasons outside of its control.
const FAILURE: &str = "Failed to update trip(s), please try again.";

/// Message sent to the server to update a trip.
#[derive(Default, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct TripPatchRequest {
    /// New title of the trip.
    #[validate(required, length(min = 1))]
    pub title: Option<String>,

    /// New description of the trip.
    #[validate(required, length(min = 5))]
    pub description: Option<String>,
}

/// PATCH handler for this API.
pub(crate) async fn handler(
    State(driver): State<TripsDriver>,
    Path(trip_id): Path<String>,
    Extension(identity): Extension<Identity>,
    JsonBody(request): JsonBody<TripPatchRequest>,
) -> RestResult<Json<TripView>> {
    request.validate()?;
    let trip_id = parse_trip_id(&trip_id)?;

    let content = TripContent::new(
        request.title.unwrap_or_default(),
        request.description.unwrap_or_default(),
    );
    let view = driver
        .update_trip(identity.user_id(), trip_id, content)
        .await
        .map_err(|e| RestError::from_driver(e, FAILURE))?;

    Ok(Json(view))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::rest::testutils::*;
    use http::StatusCode;
    use tripshare_core::model::{TripId, UserId};
    use tripshare_core::rest::testutils::OneShotBuilder;
    use tripshare_core::test_payload_must_be_json;

    fn route(trip_id: &str) -> (http::Method, String) {
        (http::Method::PATCH, format!("/api/trips/{}", trip_id))
    }

    /// Creates an update request with the given raw values.
    fn request(title: &str, description: &str) -> TripPatchRequest {
        TripPatchRequest {
            title: Some(title.to_owned()),
            description: Some(description.to_owned()),
        }
    }

    #[tokio::test]
    async fn test_ok() {
        let context = TestContext::setup().await;
        let (user_id, token) = context.signup("a@example.com").await;
        let created = context.create_trip(user_id, "Empire").await;

        let view = OneShotBuilder::new(context.app(), route(&created.id.to_string()))
            .with_bearer_auth(token.as_str())
            .send_json(request("Chrysler", "Art deco"))
            .await
            .expect_json::<TripView>()
            .await;
        assert_eq!("Chrysler", view.title);
        assert_eq!("Art deco", view.description);
        assert_eq!(created.address, view.address);
        assert_eq!(created.image, view.image);

        let trip = db::get_trip(&mut context.ex().await, created.id).await.unwrap();
        assert_eq!("Chrysler", trip.content().title().as_str());
        assert_eq!("Art deco", trip.content().description().as_str());
        context.close().await;
    }

    #[tokio::test]
    async fn test_not_owner_same_as_missing() {
        let context = TestContext::setup().await;
        let (owner, _token) = context.signup("a@example.com").await;
        let (_other, other_token) = context.signup("b@example.com").await;
        let created = context.create_trip(owner, "Empire").await;

        for (trip_id, token) in [
            (created.id.to_string(), other_token.clone()),
            (TripId::generate().to_string(), other_token.clone()),
            ("bad-id".to_owned(), other_token),
        ] {
            OneShotBuilder::new(context.app(), route(&trip_id))
                .with_bearer_auth(token.as_str())
                .send_json(request("Chrysler", "Art deco"))
                .await
                .expect_status(StatusCode::NOT_FOUND)
                .expect_error("^Trip\\(s\\) not found.$")
                .await;
        }

        let trip = db::get_trip(&mut context.ex().await, created.id).await.unwrap();
        assert_eq!("Empire", trip.content().title().as_str());
        context.close().await;
    }

    #[tokio::test]
    async fn test_invalid_fields() {
        let context = TestContext::setup().await;
        let (user_id, token) = context.signup("a@example.com").await;
        let created = context.create_trip(user_id, "Empire").await;

        let requests = [
            request("", "Art deco"),
            request("Chrysler", "Art"),
            TripPatchRequest { title: Some("Chrysler".to_owned()), description: None },
            TripPatchRequest::default(),
        ];
        for body in requests {
            OneShotBuilder::new(context.app(), route(&created.id.to_string()))
                .with_bearer_auth(token.as_str())
                .send_json(body)
                .await
                .expect_status(StatusCode::BAD_REQUEST)
                .expect_error("^Malformed payload body.$")
                .await;
        }

        let trip = db::get_trip(&mut context.ex().await, created.id).await.unwrap();
        assert_eq!("Empire", trip.content().title().as_str());
        context.close().await;
    }

    #[tokio::test]
    async fn test_blank_title_is_kept_verbatim() {
        let context = TestContext::setup().await;
        let (user_id, token) = context.signup("a@example.com").await;
        let created = context.create_trip(user_id, "Empire").await;

        let view = OneShotBuilder::new(context.app(), route(&created.id.to_string()))
            .with_bearer_auth(token.as_str())
            .send_json(request("   ", "Art deco"))
            .await
            .expect_json::<TripView>()
            .await;
        assert_eq!("   ", view.title);

        let trip = db::get_trip(&mut context.ex().await, created.id).await.unwrap();
        assert_eq!("   ", trip.content().title().as_str());
        context.close().await;
    }

    #[tokio::test]
    async fn test_expired_token() {
        let context = TestContext::setup().await;
        let (user_id, token) = context.signup("a@example.com").await;
        let created = context.create_trip(user_id, "Empire").await;
        context.advance_clock_past_token_expiry();

        OneShotBuilder::new(context.app(), route(&created.id.to_string()))
            .with_bearer_auth(token.as_str())
            .send_json(request("Chrysler", "Art deco"))
            .await
            .expect_status(StatusCode::UNAUTHORIZED)
            .expect_error("^Unauthorized.$")
            .await;

        context.close().await;
    }

    test_payload_must_be_json!(
        TestContext::setup().await.app(),
        route(&TripId::generate().to_string()),
        TestContext::setup().await.token_for(UserId::generate())
    );
}
