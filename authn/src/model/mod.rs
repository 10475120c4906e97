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

//! Data types for user accounts and authentication.

mod accesstoken;
pub use accesstoken::AccessToken;
mod identity;
pub use identity::Identity;
mod passwords;
pub use passwords::{HashedPassword, MAX_PASSWORD_BYTES, Password};
mod session;
pub use session::Session;
mod user;
pub use user::{User, UserProfile};
