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

//! High-level data types.

use derive_getters::Getters;
use derive_more::Constructor;
use serde::{Deserialize, Serialize};
use tripshare_core::model::{TripId, UserId};
use tripshare_geo::Coordinates;
use tripshare_storage::StorageKey;

/// Fields of a trip that its creator can modify.
#[derive(Clone, Constructor, Debug, Getters, PartialEq)]
pub struct TripContent {
    /// Short name of the trip.
    title: String,

    /// Free-form description of the trip.
    description: String,
}

/// A trip shared by a user.
#[derive(Clone, Constructor, Debug, Getters, PartialEq)]
pub struct Trip {
    /// Unique identifier of the trip.
    id: TripId,

    /// Title and description of the trip.
    content: TripContent,

    /// Picture of the trip, if any.
    image: Option<StorageKey>,

    /// Free-text address of the trip's destination.
    address: String,

    /// Coordinates of `address` as resolved when the trip was created.
    coordinates: Coordinates,

    /// Identifier of the user that created the trip.  Never changes.
    creator_id: UserId,
}

impl Trip {
    /// Replaces the modifiable fields of the trip with `content`.
    pub fn with_content(mut self, content: TripContent) -> Self {
        self.content = content;
        self
    }

    /// Converts the trip into its public representation, attaching the URL to fetch its
    /// picture.
    pub fn into_view(self, image_url: Option<String>) -> TripView {
        TripView {
            id: self.id,
            title: self.content.title,
            description: self.content.description,
            image: self.image,
            image_url,
            address: self.address,
            coordinates: self.coordinates,
            create_user_id: self.creator_id,
        }
    }
}

/// Public representation of a trip, as returned by the REST APIs.
#[derive(Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripView {
    /// Unique identifier of the trip.
    pub id: TripId,

    /// Short name of the trip.
    pub title: String,

    /// Free-form description of the trip.
    pub description: String,

    /// Picture of the trip, if any.
    pub image: Option<StorageKey>,

    /// Time-limited URL to fetch the picture.
    pub image_url: Option<String>,

    /// Free-text address of the trip's destination.
    pub address: String,

    /// Coordinates of the address.
    pub coordinates: Coordinates,

    /// Identifier of the user that created the trip.
    pub create_user_id: UserId,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trip() -> Trip {
        Trip::new(
            TripId::generate(),
            TripContent::new("Empire".to_owned(), "Tall building".to_owned()),
            Some(StorageKey::new("empire.jpg").unwrap()),
            "20 W 34th St, New York".to_owned(),
            Coordinates { lat: 40.7484405, lng: -73.9878531 },
            UserId::generate(),
        )
    }

    #[test]
    fn test_trip_with_content() {
        let trip = sample_trip();
        let id = *trip.id();
        let creator_id = *trip.creator_id();

        let content = TripContent::new("New".to_owned(), "Updated text".to_owned());
        let trip = trip.with_content(content);
        assert_eq!(&id, trip.id());
        assert_eq!(&creator_id, trip.creator_id());
        assert_eq!("New", trip.content().title().as_str());
        assert_eq!("Updated text", trip.content().description().as_str());
        assert_eq!("20 W 34th St, New York", trip.address().as_str());
    }

    #[test]
    fn test_trip_view_json() {
        let trip = sample_trip();
        let id = *trip.id();
        let creator_id = *trip.creator_id();

        let view = trip.into_view(Some("https://img/empire.jpg".to_owned()));
        assert_eq!(
            serde_json::json!({
                "id": id.to_string(),
                "title": "Empire",
                "description": "Tall building",
                "image": "empire.jpg",
                "imageUrl": "https://img/empire.jpg",
                "address": "20 W 34th St, New York",
                "coordinates": {"lat": 40.7484405, "lng": -73.9878531},
                "createUserId": creator_id.to_string(),
            }),
            serde_json::to_value(&view).unwrap()
        );
    }
}
