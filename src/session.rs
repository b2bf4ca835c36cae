use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Role, User};

/// Name of the cookie carrying the encoded session.
pub const SESSION_COOKIE: &str = "userSession";

/// Session
///
/// The identity carried by the `userSession` cookie. It is issued at login,
/// read by the access gate on every request, and cleared at logout or once a
/// self-service password reset completes. It is never stored server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: i64,
    pub email: String,
    pub name: Option<String>,
    #[schema(value_type = String, example = "ADMIN")]
    pub role: Role,
    pub must_reset_password: bool,
}

impl From<&User> for Session {
    fn from(user: &User) -> Self {
        Session {
            user_id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            must_reset_password: user.must_reset_password,
        }
    }
}

/// Wire shape of the cookie value: the session fields plus the standard
/// `iat`/`exp` timestamps checked on decode.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionClaims {
    #[serde(flatten)]
    session: Session,
    iat: i64,
    exp: i64,
}

/// SessionCodec
///
/// Turns a `Session` into the opaque cookie value and back. The value is an
/// HS256-signed token, so a client can read its session but cannot forge a
/// different role.
#[derive(Clone)]
pub struct SessionCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_secs: i64,
}

impl SessionCodec {
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
        }
    }

    /// Lifetime of an issued session, in seconds. Also used as the cookie Max-Age.
    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    /// encode
    ///
    /// Produces the cookie value written at login. Fails only if signing fails,
    /// which for HS256 with an in-memory key does not happen in practice.
    pub fn encode(&self, session: &Session) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            session: session.clone(),
            iat: now,
            exp: now + self.ttl_secs,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
    }

    /// decode
    ///
    /// Returns the session carried by a cookie value, or `None` when the value is
    /// not a well-formed, correctly signed, unexpired session. Callers cannot
    /// tell these cases apart, and the gate treats all of them as "no session".
    pub fn decode(&self, cookie_value: &str) -> Option<Session> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        match decode::<SessionClaims>(cookie_value, &self.decoding_key, &validation) {
            Ok(data) => Some(data.claims.session),
            Err(e) => {
                tracing::debug!(kind = ?e.kind(), "discarding unreadable session cookie");
                None
            }
        }
    }
}

/// Builds the `Set-Cookie` value issued at login.
pub fn session_cookie(value: String, ttl_secs: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::seconds(ttl_secs))
        .build()
}

/// Builds the expired cookie that clears the session in the browser.
pub fn cleared_session_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::ZERO)
        .build()
}
