use crate::{
    AppState,
    auth::AuthSession,
    error::ApiError,
    models::{
        AdminPasswordRequest, CreateUserRequest, LoginRequest, MessageResponse, NewUser,
        RequestResetRequest, ResetPasswordRequest, Role, UpdateUserRequest, User, UserChanges,
        UserFilter, UserMessageResponse,
    },
    password::{generate_reset_token, hash_password, verify_password},
    repository::RepoError,
    session::{Session, cleared_session_cookie, session_cookie},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::Html,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{Duration, Utc};
use serde::Deserialize;

/// Same answer whether or not the email exists, so the endpoint cannot be used
/// to enumerate accounts.
const RESET_REQUESTED_MESSAGE: &str =
    "If the email is registered, a password reset link will be sent.";

// --- Filter Structs ---

/// UserQuery
///
/// Query parameters for the admin user table (GET /api/users). Empty values are
/// ignored, as is a non-numeric `id`.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct UserQuery {
    /// Case-insensitive substring of the display name.
    pub name: Option<String>,
    /// Case-insensitive substring of the email.
    pub email: Option<String>,
    /// Exact user id.
    pub id: Option<String>,
    /// Case-insensitive substring of the sector.
    pub sector: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl From<UserQuery> for UserFilter {
    fn from(query: UserQuery) -> Self {
        UserFilter {
            id: query.id.and_then(|raw| raw.trim().parse().ok()),
            name: non_empty(query.name),
            email: non_empty(query.email),
            sector: non_empty(query.sector),
        }
    }
}

/// Rejects role values other than ADMIN and PUBLIC.
fn checked_role(role: Option<Role>) -> Result<Option<Role>, ApiError> {
    match role {
        Some(Role::Unknown) => Err(ApiError::BadRequest(
            "Role must be ADMIN or PUBLIC.".to_string(),
        )),
        other => Ok(other),
    }
}

// --- Auth Handlers ---

/// login
///
/// [Auth API] Verifies the credentials and issues the `userSession` cookie.
/// Unknown email and wrong password produce the same 401 so neither can be probed.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in, session cookie set", body = UserMessageResponse),
        (status = 400, description = "Missing email or password", body = MessageResponse),
        (status = 401, description = "Invalid credentials", body = MessageResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<UserMessageResponse>), ApiError> {
    if payload.email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Email and password are required.".to_string(),
        ));
    }

    let invalid = || ApiError::Unauthorized("Invalid credentials.".to_string());

    let Some(creds) = state.repo.find_credentials(&payload.email).await? else {
        tracing::info!("login rejected: unknown email");
        return Err(invalid());
    };

    if !verify_password(&payload.password, &creds.password_hash)? {
        tracing::info!(user_id = creds.user.id, "login rejected: wrong password");
        return Err(invalid());
    }

    let session = Session::from(&creds.user);
    let value = state
        .sessions
        .encode(&session)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    tracing::info!(
        user_id = session.user_id,
        role = %session.role,
        must_reset_password = session.must_reset_password,
        "login succeeded"
    );

    let cookie = session_cookie(
        value,
        state.sessions.ttl_secs(),
        state.config.secure_cookies(),
    );
    Ok((
        jar.add(cookie),
        Json(UserMessageResponse {
            message: "Login successful!".to_string(),
            user: creds.user,
        }),
    ))
}

/// logout
///
/// [Auth API] Expires the session cookie. Always succeeds.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 200, description = "Session cookie cleared", body = MessageResponse))
)]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    (
        jar.add(cleared_session_cookie(state.config.secure_cookies())),
        Json(MessageResponse::new("Logged out successfully!")),
    )
}

/// request_reset
///
/// [Auth API] Starts the self-service reset: stores a fresh token with a short
/// expiry and emits the reset link. There is no mail transport, so the link is
/// delivered through the application log.
#[utoipa::path(
    post,
    path = "/api/auth/request-reset",
    request_body = RequestResetRequest,
    responses(
        (status = 200, description = "Accepted (regardless of whether the email exists)", body = MessageResponse),
        (status = 400, description = "Missing email", body = MessageResponse)
    )
)]
pub async fn request_reset(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RequestResetRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if payload.email.is_empty() {
        return Err(ApiError::BadRequest(
            "Email is required to reset the password.".to_string(),
        ));
    }

    let Some(creds) = state.repo.find_credentials(&payload.email).await? else {
        tracing::info!("password reset requested for unregistered email");
        return Ok(Json(MessageResponse::new(RESET_REQUESTED_MESSAGE)));
    };

    let token = generate_reset_token();
    let expires_at = Utc::now() + Duration::minutes(state.config.reset_token_ttl_minutes);
    state
        .repo
        .store_reset_token(creds.user.id, &token, expires_at)
        .await?;

    let origin = headers
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(&state.config.public_origin);
    let link = format!(
        "{}{}?token={}",
        origin, state.routes.reset_request_path, token
    );
    tracing::info!(user_id = creds.user.id, %link, "password reset link issued");

    Ok(Json(MessageResponse::new(RESET_REQUESTED_MESSAGE)))
}

/// reset_password
///
/// [Auth API] Completes a reset with the emailed token. On success the new
/// password is stored, the forced-reset flag is lifted and the session cookie
/// is cleared so the user logs in again with the new password.
#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password changed, session cleared", body = MessageResponse),
        (status = 400, description = "Missing fields, or invalid/expired token", body = MessageResponse)
    )
)]
pub async fn reset_password(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<(CookieJar, Json<MessageResponse>), ApiError> {
    if payload.email.is_empty() || payload.token.is_empty() || payload.new_password.is_empty() {
        return Err(ApiError::BadRequest(
            "Email, token and new password are required.".to_string(),
        ));
    }

    let hash = hash_password(&payload.new_password)?;
    let user = state
        .repo
        .complete_password_reset(&payload.email, &payload.token, Utc::now(), &hash)
        .await
        .map_err(|e| match e {
            RepoError::NotFound => {
                ApiError::BadRequest("Invalid or expired token, or incorrect email.".to_string())
            }
            other => other.into(),
        })?;

    tracing::info!(user_id = user.id, "password reset completed");

    Ok((
        jar.add(cleared_session_cookie(state.config.secure_cookies())),
        Json(MessageResponse::new(
            "Password reset successfully! You can now log in with your new password.",
        )),
    ))
}

/// get_me
///
/// [Authenticated Route] The caller's session as carried by the cookie. Pages
/// use this for display (name, role) instead of keeping their own copy.
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Current session", body = Session),
        (status = 401, description = "No session", body = MessageResponse)
    )
)]
pub async fn get_me(AuthSession(session): AuthSession) -> Json<Session> {
    Json(session)
}

// --- User Administration ---

/// list_users
///
/// [Admin Route] Lists accounts, optionally filtered by name, email, id or sector.
#[utoipa::path(
    get,
    path = "/api/users",
    params(UserQuery),
    responses(
        (status = 200, description = "Matching users", body = [User]),
        (status = 403, description = "Not an admin", body = MessageResponse)
    )
)]
pub async fn list_users(
    caller: AuthSession,
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<User>>, ApiError> {
    caller.require_admin(state.repo.as_ref()).await?;
    let users = state.repo.list_users(query.into()).await?;
    Ok(Json(users))
}

/// create_user
///
/// [Admin Route] Creates an account. New accounts always start with a pending
/// forced reset, so the initial password only works until first login.
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Created", body = User),
        (status = 400, description = "Missing email or password, or bad role", body = MessageResponse),
        (status = 409, description = "Email already in use", body = MessageResponse)
    )
)]
pub async fn create_user(
    caller: AuthSession,
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    caller.require_admin(state.repo.as_ref()).await?;

    if payload.email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Email and password are required to create a user.".to_string(),
        ));
    }
    let role = checked_role(payload.role)?.unwrap_or_default();

    let new_user = NewUser {
        email: payload.email,
        name: non_empty(payload.name),
        password_hash: hash_password(&payload.password)?,
        role,
        sector: non_empty(payload.sector),
    };

    let user = state.repo.create_user(new_user).await?;
    tracing::info!(user_id = user.id, created_by = caller.0.user_id, "user created");

    Ok((StatusCode::CREATED, Json(user)))
}

/// update_user
///
/// [Admin Route] Partial update of an account. Supplying a password re-arms the
/// forced reset, the same as an administrator password change.
#[utoipa::path(
    put,
    path = "/api/admin/users/{id}",
    params(("id" = i64, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated", body = UserMessageResponse),
        (status = 404, description = "Not Found", body = MessageResponse),
        (status = 409, description = "Email already in use", body = MessageResponse)
    )
)]
pub async fn update_user(
    caller: AuthSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UserMessageResponse>, ApiError> {
    caller.require_admin(state.repo.as_ref()).await?;

    if payload.email.as_deref().is_some_and(str::is_empty) {
        return Err(ApiError::BadRequest("Email cannot be empty.".to_string()));
    }

    let mut changes = UserChanges {
        name: payload.name,
        email: payload.email,
        role: checked_role(payload.role)?,
        sector: payload.sector,
        ..UserChanges::default()
    };
    if let Some(password) = non_empty(payload.password) {
        changes.password_hash = Some(hash_password(&password)?);
        changes.must_reset_password = Some(true);
    }

    let user = state.repo.update_user(id, changes).await?;
    tracing::info!(user_id = id, updated_by = caller.0.user_id, "user updated");

    Ok(Json(UserMessageResponse {
        message: "User updated successfully!".to_string(),
        user,
    }))
}

/// delete_user
///
/// [Admin Route] Removes an account.
#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found", body = MessageResponse)
    )
)]
pub async fn delete_user(
    caller: AuthSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    caller.require_admin(state.repo.as_ref()).await?;
    state.repo.delete_user(id).await?;
    tracing::info!(user_id = id, deleted_by = caller.0.user_id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// change_user_password
///
/// [Admin Route] Sets another user's password. The user must choose their own
/// password at next login.
#[utoipa::path(
    put,
    path = "/api/admin/users/password",
    request_body = AdminPasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Missing user id or password", body = MessageResponse),
        (status = 404, description = "Not Found", body = MessageResponse)
    )
)]
pub async fn change_user_password(
    caller: AuthSession,
    State(state): State<AppState>,
    Json(payload): Json<AdminPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    caller.require_admin(state.repo.as_ref()).await?;

    let Some(user_id) = payload.user_id.filter(|_| !payload.new_password.is_empty()) else {
        return Err(ApiError::BadRequest(
            "User id and new password are required.".to_string(),
        ));
    };

    let changes = UserChanges {
        password_hash: Some(hash_password(&payload.new_password)?),
        must_reset_password: Some(true),
        ..UserChanges::default()
    };
    state.repo.update_user(user_id, changes).await?;

    tracing::info!(user_id, changed_by = caller.0.user_id, "password changed by admin");

    Ok(Json(MessageResponse::new(format!(
        "Password for user {} changed successfully!",
        user_id
    ))))
}

// --- Pages ---

/// page_shell
///
/// Placeholder document for a portal page. The front-end owns the real
/// rendering; the server only has to answer the paths the gate redirects to.
pub fn page_shell(title: &str) -> Html<String> {
    Html(format!(
        "<!doctype html><html><head><title>{title}</title></head><body><main id=\"app\" data-page=\"{title}\"></main></body></html>"
    ))
}
