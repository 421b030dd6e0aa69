use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{AccountType, Location, MaritalStatus, User};

// -- JWT Claims --

/// Claims carried by the bearer token issued at signup/login. `sub` is the
/// user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub exp: usize,
}

// -- Auth / Users --

/// Body of `POST /api/auth/signup` and `POST /users`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub profile_photo: Option<String>,
    pub header_image: Option<String>,
    #[serde(default)]
    pub account_type: AccountType,
    #[serde(default)]
    pub marital_status: MaritalStatus,
    pub biography: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub location: Option<Location>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Signup/login response: the user record plus the bearer token for later
/// requests.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    #[serde(flatten)]
    pub user: User,
    pub token: String,
}

/// Partial update for `PUT /users/:uid`. Absent fields are left untouched.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub profile_photo: Option<String>,
    pub header_image: Option<String>,
    pub account_type: Option<AccountType>,
    pub marital_status: Option<MaritalStatus>,
    pub biography: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub location: Option<Location>,
}

// -- Tuits --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateTuitRequest {
    pub tuit: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateTuitRequest {
    pub tuit: String,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub message: String,
}

// -- Generic --

/// Returned by delete endpoints.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub deleted_count: usize,
}
