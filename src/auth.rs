use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    error::ApiError,
    gate::{Decision, RouteTable},
    models::{Role, User},
    repository::Repository,
    session::{SESSION_COOKIE, Session, SessionCodec},
};

/// Reads and decodes the session cookie. Anything unreadable is "no session".
pub fn session_from_jar(jar: &CookieJar, codec: &SessionCodec) -> Option<Session> {
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| codec.decode(cookie.value()))
}

/// GateState
///
/// What the access gate needs from the application state: the route table and
/// the codec to read the cookie with. Both are read-only.
#[derive(Clone)]
pub struct GateState {
    pub routes: Arc<RouteTable>,
    pub sessions: SessionCodec,
}

/// access_gate
///
/// Middleware wrapped around the whole router. It runs once per request before
/// routing, decodes the `userSession` cookie and asks the route table for a
/// decision. On `Allow` the request continues; on `RedirectTo` it answers with
/// `303 See Other` and no handler runs.
///
/// The gate never writes the session and performs no I/O beyond reading the
/// request headers.
pub async fn access_gate(
    State(gate): State<GateState>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    let session = session_from_jar(&jar, &gate.sessions);
    let path = request.uri().path().to_owned();

    match gate.routes.evaluate(&path, session.as_ref()) {
        Decision::Allow => next.run(request).await,
        Decision::RedirectTo(target) => {
            tracing::debug!(
                path = %path,
                target = %target,
                authenticated = session.is_some(),
                "access gate redirect"
            );
            Redirect::to(&target).into_response()
        }
    }
}

/// AuthSession Extractor
///
/// The decoded session of the caller, for handlers that need to know who is
/// asking. The gate has already filtered the request by the time this runs;
/// the extractor re-reads the cookie so that handlers never trust anything
/// else (in particular, never a client-side copy of the session).
///
/// Rejection: `401 Unauthorized` when the cookie is absent or unreadable.
#[derive(Debug, Clone)]
pub struct AuthSession(pub Session);

impl AuthSession {
    /// require_admin
    ///
    /// Re-resolves the caller's account and requires it to still hold ADMIN.
    /// The cookie role is only a snapshot from login, so an account deleted or
    /// demoted since then is refused here even though the gate let it through.
    pub async fn require_admin(&self, repo: &dyn Repository) -> Result<User, ApiError> {
        match repo.get_user(self.0.user_id).await? {
            Some(user) if user.role == Role::Admin => Ok(user),
            Some(user) => {
                tracing::warn!(user_id = user.id, role = %user.role, "admin request from demoted account");
                Err(ApiError::Forbidden)
            }
            None => {
                tracing::warn!(user_id = self.0.user_id, "admin request from deleted account");
                Err(ApiError::Forbidden)
            }
        }
    }
}

impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
    SessionCodec: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let codec = SessionCodec::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);

        session_from_jar(&jar, &codec)
            .map(AuthSession)
            .ok_or_else(|| ApiError::Unauthorized("Not authenticated.".to_string()))
    }
}
