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

//! Common tests for any database implementation.

use crate::db::*;
use crate::model::{HashedPassword, User};
use std::collections::BTreeSet;
use tripshare_core::db::{Db, DbError};
use tripshare_core::model::{EmailAddress, TripId, UserId};
use tripshare_storage::StorageKey;

/// Syntactic sugar to build a user with default settings given only its email address.
fn simple_user(email: &'static str) -> User {
    User::new(
        UserId::generate(),
        "First".to_owned(),
        "Last".to_owned(),
        EmailAddress::from(email),
        HashedPassword::new("some-hash"),
    )
}

async fn test_users_ok(db: Box<dyn Db + Send + Sync>) {
    init_schema(&mut db.ex().await.unwrap()).await.unwrap();

    let user = simple_user("a@example.com")
        .with_image(Some(StorageKey::new("some-image.png").unwrap()));
    create_user(&mut db.ex().await.unwrap(), &user).await.unwrap();

    assert_eq!(user, get_user_by_id(&mut db.ex().await.unwrap(), user.id()).await.unwrap());
    assert_eq!(
        user,
        get_user_by_email(&mut db.ex().await.unwrap(), &EmailAddress::from("a@example.com"))
            .await
            .unwrap()
    );

    db.close().await;
}

async fn test_users_without_image(db: Box<dyn Db + Send + Sync>) {
    init_schema(&mut db.ex().await.unwrap()).await.unwrap();

    let user = simple_user("a@example.com");
    create_user(&mut db.ex().await.unwrap(), &user).await.unwrap();

    let read = get_user_by_id(&mut db.ex().await.unwrap(), user.id()).await.unwrap();
    assert!(read.image().is_none());

    db.close().await;
}

async fn test_users_not_found(db: Box<dyn Db + Send + Sync>) {
    init_schema(&mut db.ex().await.unwrap()).await.unwrap();

    create_user(&mut db.ex().await.unwrap(), &simple_user("a@example.com")).await.unwrap();

    assert_eq!(
        DbError::NotFound,
        get_user_by_id(&mut db.ex().await.unwrap(), UserId::generate()).await.unwrap_err()
    );
    assert_eq!(
        DbError::NotFound,
        get_user_by_email(&mut db.ex().await.unwrap(), &EmailAddress::from("b@example.com"))
            .await
            .unwrap_err()
    );

    db.close().await;
}

async fn test_users_duplicate_email(db: Box<dyn Db + Send + Sync>) {
    init_schema(&mut db.ex().await.unwrap()).await.unwrap();

    create_user(&mut db.ex().await.unwrap(), &simple_user("a@example.com")).await.unwrap();
    assert_eq!(
        DbError::AlreadyExists,
        create_user(&mut db.ex().await.unwrap(), &simple_user("a@example.com"))
            .await
            .unwrap_err()
    );

    db.close().await;
}

async fn test_users_abort_creation(db: Box<dyn Db + Send + Sync>) {
    init_schema(&mut db.ex().await.unwrap()).await.unwrap();

    let user = simple_user("a@example.com");
    {
        let mut tx = db.begin().await.unwrap();
        create_user(tx.ex(), &user).await.unwrap();
    }

    assert_eq!(
        DbError::NotFound,
        get_user_by_id(&mut db.ex().await.unwrap(), user.id()).await.unwrap_err()
    );

    db.close().await;
}

async fn test_user_corrupted_email(db: Box<dyn Db + Send + Sync>) {
    init_schema(&mut db.ex().await.unwrap()).await.unwrap();

    let user = User::new(
        UserId::generate(),
        "First".to_owned(),
        "Last".to_owned(),
        EmailAddress::new_invalid("this_is_invalid"),
        HashedPassword::new("some-hash"),
    );
    create_user(&mut db.ex().await.unwrap(), &user).await.unwrap();

    match get_user_by_id(&mut db.ex().await.unwrap(), user.id()).await.unwrap_err() {
        DbError::DataIntegrityError(msg) if msg.contains("valid address") => (),
        e => panic!("Unexpected error: {:?}", e),
    }

    db.close().await;
}

async fn test_get_users(db: Box<dyn Db + Send + Sync>) {
    init_schema(&mut db.ex().await.unwrap()).await.unwrap();

    assert!(get_users(&mut db.ex().await.unwrap()).await.unwrap().is_empty());

    let user2 = simple_user("b@example.com");
    create_user(&mut db.ex().await.unwrap(), &user2).await.unwrap();
    let user1 = simple_user("a@example.com");
    create_user(&mut db.ex().await.unwrap(), &user1).await.unwrap();
    let trip = TripId::generate();
    add_user_trip(&mut db.ex().await.unwrap(), user2.id(), trip).await.unwrap();

    let users = get_users(&mut db.ex().await.unwrap()).await.unwrap();
    assert_eq!(vec![user1, user2.with_trips(BTreeSet::from([trip]))], users);

    db.close().await;
}

async fn test_user_trips_add_and_remove(db: Box<dyn Db + Send + Sync>) {
    init_schema(&mut db.ex().await.unwrap()).await.unwrap();

    let user = simple_user("a@example.com");
    create_user(&mut db.ex().await.unwrap(), &user).await.unwrap();
    let other = simple_user("b@example.com");
    create_user(&mut db.ex().await.unwrap(), &other).await.unwrap();

    let trip1 = TripId::generate();
    let trip2 = TripId::generate();
    add_user_trip(&mut db.ex().await.unwrap(), user.id(), trip1).await.unwrap();
    add_user_trip(&mut db.ex().await.unwrap(), user.id(), trip2).await.unwrap();

    let read = get_user_by_id(&mut db.ex().await.unwrap(), user.id()).await.unwrap();
    assert_eq!(&BTreeSet::from([trip1, trip2]), read.trips());
    let read = get_user_by_id(&mut db.ex().await.unwrap(), other.id()).await.unwrap();
    assert!(read.trips().is_empty());

    remove_user_trip(&mut db.ex().await.unwrap(), user.id(), trip1).await.unwrap();
    let read = get_user_by_email(&mut db.ex().await.unwrap(), user.email()).await.unwrap();
    assert_eq!(&BTreeSet::from([trip2]), read.trips());

    db.close().await;
}

async fn test_user_trips_unknown_user(db: Box<dyn Db + Send + Sync>) {
    init_schema(&mut db.ex().await.unwrap()).await.unwrap();

    assert_eq!(
        DbError::NotFound,
        add_user_trip(&mut db.ex().await.unwrap(), UserId::generate(), TripId::generate())
            .await
            .unwrap_err()
    );

    db.close().await;
}

async fn test_user_trips_remove_missing(db: Box<dyn Db + Send + Sync>) {
    init_schema(&mut db.ex().await.unwrap()).await.unwrap();

    let user = simple_user("a@example.com");
    create_user(&mut db.ex().await.unwrap(), &user).await.unwrap();

    assert_eq!(
        DbError::NotFound,
        remove_user_trip(&mut db.ex().await.unwrap(), user.id(), TripId::generate())
            .await
            .unwrap_err()
    );

    db.close().await;
}

async fn test_user_trips_tx_rollback(db: Box<dyn Db + Send + Sync>) {
    init_schema(&mut db.ex().await.unwrap()).await.unwrap();

    let user = simple_user("a@example.com");
    create_user(&mut db.ex().await.unwrap(), &user).await.unwrap();

    {
        let mut tx = db.begin().await.unwrap();
        add_user_trip(tx.ex(), user.id(), TripId::generate()).await.unwrap();
    }

    let read = get_user_by_id(&mut db.ex().await.unwrap(), user.id()).await.unwrap();
    assert!(read.trips().is_empty());

    db.close().await;
}

macro_rules! generate_db_tests [
    ( $setup:expr $(, #[$extra:meta])? ) => {
        tripshare_core::db::testutils::generate_tests!(
            $( #[$extra], )?
            $setup,
            $crate::db::tests,
            test_users_ok,
            test_users_without_image,
            test_users_not_found,
            test_users_duplicate_email,
            test_users_abort_creation,
            test_user_corrupted_email,
            test_get_users,
            test_user_trips_add_and_remove,
            test_user_trips_unknown_user,
            test_user_trips_remove_missing,
            test_user_trips_tx_rollback
        );
    }
];

mod sqlite {
    use tripshare_core::db::sqlite::testutils::setup;

    generate_db_tests!(Box::new(setup().await));
}

#[cfg(feature = "postgres")]
mod postgres {
    use tripshare_core::db::postgres::testutils::setup;

    generate_db_tests!(
        Box::new(setup().await),
        #[ignore = "Requires environment configuration and is expensive"]
    );
}
