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

//! API to delete a trip.

use crate::driver::TripsDriver;
use crate::rest::{MessageResponse, parse_trip_id};
use axum::extract::{Path, State};
use axum::{Extension, Json};
use tripshare_authn::model::Identity;
use tripshare_core::rest::{RestError, RestResult};

/// Message returned to the client when the deletion fails for reasons outside of its control.
const FAILURE: &str = "Failed to delete trip(s), please try again.";

/// DELETE handler for this API.
pub(crate) async fn handler(
    State(driver): State<TripsDriver>,
    Path(trip_id): Path<String>,
    Extension(identity): Extension<Identity>,
) -> RestResult<Json<MessageResponse>> {
    let trip_id = parse_trip_id(&trip_id)?;

    driver
        .delete_trip(identity.user_id(), trip_id)
        .await
        .map_err(|e| RestError::from_driver(e, FAILURE))?;

    Ok(Json(MessageResponse { message: "Trip deleted.".to_owned() }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::rest::testutils::*;
    use http::StatusCode;
    use tripshare_authn::db as authn_db;
    use tripshare_core::db::DbError;
    use tripshare_core::model::TripId;
    use tripshare_core::rest::testutils::OneShotBuilder;

    fn route(trip_id: &str) -> (http::Method, String) {
        (http::Method::DELETE, format!("/api/trips/{}", trip_id))
    }

    #[tokio::test]
    async fn test_ok() {
        let context = TestContext::setup().await;
        let (user_id, token) = context.signup("a@example.com").await;
        let created = context.create_trip(user_id, "Empire").await;

        let response = OneShotBuilder::new(context.app(), route(&created.id.to_string()))
            .with_bearer_auth(token.as_str())
            .send_empty()
            .await
            .expect_json::<MessageResponse>()
            .await;
        assert_eq!("Trip deleted.", response.message);

        assert_eq!(
            DbError::NotFound,
            db::get_trip(&mut context.ex().await, created.id).await.unwrap_err()
        );
        let user = authn_db::get_user_by_id(&mut context.ex().await, user_id).await.unwrap();
        assert!(user.trips().is_empty());
        assert!(!context.store().contains(created.image.as_ref().unwrap()).await);
        context.close().await;
    }

    #[tokio::test]
    async fn test_image_deletion_failure_is_ignored() {
        let context = TestContext::setup().await;
        let (user_id, token) = context.signup("a@example.com").await;
        let created = context.create_trip(user_id, "Empire").await;
        context.store().set_fail_deletes(true);

        OneShotBuilder::new(context.app(), route(&created.id.to_string()))
            .with_bearer_auth(token.as_str())
            .send_empty()
            .await
            .expect_json::<MessageResponse>()
            .await;

        assert_eq!(
            DbError::NotFound,
            db::get_trip(&mut context.ex().await, created.id).await.unwrap_err()
        );
        context.close().await;
    }

    #[tokio::test]
    async fn test_not_owner_same_as_missing() {
        let context = TestContext::setup().await;
        let (owner, _token) = context.signup("a@example.com").await;
        let (_other, other_token) = context.signup("b@example.com").await;
        let created = context.create_trip(owner, "Empire").await;

        for trip_id in [created.id.to_string(), TripId::generate().to_string()] {
            OneShotBuilder::new(context.app(), route(&trip_id))
                .with_bearer_auth(other_token.as_str())
                .send_empty()
                .await
                .expect_status(StatusCode::NOT_FOUND)
                .expect_error("^Trip\\(s\\) not found.$")
                .await;
        }

        db::get_trip(&mut context.ex().await, created.id).await.unwrap();
        let user = authn_db::get_user_by_id(&mut context.ex().await, owner).await.unwrap();
        assert!(user.trips().contains(&created.id));
        context.close().await;
    }
}
