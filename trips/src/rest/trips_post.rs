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

//! API to create a new trip.

use crate::driver::TripsDriver;
use crate::model::{TripContent, TripView};
use axum::extract::State;
use axum::{Extension, Json};
use http::StatusCode;
use tripshare_authn::model::Identity;
use tripshare_core::driver::DriverError;
use tripshare_core::rest::{MultipartBody, RestError, RestResult};
use tripshare_storage::Upload;
use validator::Validate;

/// Message returned to the client when trip creation fails for reasons outside of its control.
const FAILURE: &str = "Failed to create trip(s), please try again.";

/// Text fields of the new trip form.
#[derive(Validate)]
struct NewTripForm {
    /// Short name of the trip.
    #[validate(required, length(min = 1))]
    title: Option<String>,

    /// Free-form description of the trip.
    #[validate(required, length(min = 5))]
    description: Option<String>,

    /// Free-text address of the destination.
    #[validate(required, length(min = 1))]
    address: Option<String>,
}

impl From<&mut MultipartBody> for NewTripForm {
    fn from(body: &mut MultipartBody) -> Self {
        Self {
            title: body.take_field("title"),
            description: body.take_field("description"),
            address: body.take_field("address"),
        }
    }
}

/// POST handler for this API.
pub(crate) async fn handler(
    State(driver): State<TripsDriver>,
    Extension(identity): Extension<Identity>,
    mut body: MultipartBody,
) -> RestResult<(StatusCode, Json<TripView>)> {
    let form = NewTripForm::from(&mut body);
    form.validate()?;
    let Some(image) = body.take_file("image") else {
        return Err(RestError::MalformedPayload);
    };

    let content =
        TripContent::new(form.title.unwrap_or_default(), form.description.unwrap_or_default());
    let address = form.address.unwrap_or_default();
    let content_type = image.content_type().to_owned();
    let image = Upload::new(image.into_bytes(), &content_type)
        .map_err(|e| RestError::from_driver(DriverError::from(e), FAILURE))?;

    let view = driver
        .create_trip(identity.user_id(), content, address, image)
        .await
        .map_err(|e| RestError::from_driver(e, FAILURE))?;

    Ok((StatusCode::CREATED, Json(view)))
}
