use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use ts_rs::TS;
use utoipa::ToSchema;

// --- Role ---

/// Role
///
/// The closed set of roles a portal account can hold. Stored as TEXT in the
/// `users` table and carried as a plain string inside the session cookie.
///
/// Any value other than `"ADMIN"` or `"PUBLIC"` becomes `Unknown`, so a tampered
/// or legacy role can never be mistaken for a real one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Admin,
    #[default]
    Public,
    Unknown,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Public => "PUBLIC",
            Role::Unknown => "UNKNOWN",
        }
    }

    /// True for the roles the portal actually grants (ADMIN and PUBLIC).
    pub fn is_recognised(&self) -> bool {
        matches!(self, Role::Admin | Role::Public)
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Role::from(value.as_str())
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        match value {
            "ADMIN" => Role::Admin,
            "PUBLIC" => Role::Public,
            _ => Role::Unknown,
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// A portal account as returned to clients. This is the `users` row minus the
/// password hash and the reset-token columns, which never leave the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    #[sqlx(try_from = "String")]
    #[ts(type = "string")]
    #[schema(value_type = String, example = "PUBLIC")]
    pub role: Role,
    pub sector: Option<String>,
    pub must_reset_password: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// UserCredentials
///
/// Internal row used by the login and reset flows. Carries the stored Argon2
/// hash alongside the public profile; never serialized.
#[derive(Debug, Clone, FromRow)]
pub struct UserCredentials {
    #[sqlx(flatten)]
    pub user: User,
    #[sqlx(rename = "password")]
    pub password_hash: String,
}

/// NewUser
///
/// Fully-prepared insert for the `users` table. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
    pub role: Role,
    pub sector: Option<String>,
}

/// UserChanges
///
/// Partial update applied by the admin edit screen. `None` leaves a column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub sector: Option<String>,
    pub password_hash: Option<String>,
    pub must_reset_password: Option<bool>,
}

/// UserFilter
///
/// Search criteria for the admin user table. Text filters are case-insensitive
/// substring matches; `id` is exact.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserFilter {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub sector: Option<String>,
}

// --- Request Payloads (Input Schemas) ---

/// LoginRequest
///
/// Input payload for POST /api/auth/login.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// RequestResetRequest
///
/// Input payload for POST /api/auth/request-reset.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RequestResetRequest {
    #[serde(default)]
    pub email: String,
}

/// ResetPasswordRequest
///
/// Input payload for POST /api/auth/reset-password. The token is the one
/// delivered in the reset link.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub new_password: String,
}

/// CreateUserRequest
///
/// Input payload for POST /api/users. Role defaults to PUBLIC when omitted.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub name: Option<String>,
    #[ts(type = "string | null")]
    #[schema(value_type = Option<String>)]
    pub role: Option<Role>,
    pub sector: Option<String>,
}

/// UpdateUserRequest
///
/// Input payload for PUT /api/admin/users/{id}. Absent fields are left unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    #[ts(type = "string | null")]
    #[schema(value_type = Option<String>)]
    pub role: Option<Role>,
    pub sector: Option<String>,
    pub password: Option<String>,
}

/// AdminPasswordRequest
///
/// Input payload for PUT /api/admin/users/password.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AdminPasswordRequest {
    pub user_id: Option<i64>,
    #[serde(default)]
    pub new_password: String,
}

// --- Response Payloads ---

/// MessageResponse
///
/// Generic `{ "message": ... }` body used by the auth endpoints and by `ApiError`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// UserMessageResponse
///
/// `{ message, user }` body returned by login and by the admin edit endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserMessageResponse {
    pub message: String,
    pub user: User,
}
