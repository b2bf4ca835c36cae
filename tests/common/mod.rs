#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, Response, header},
};
use chrono::{DateTime, Utc};
use intranet_portal::{
    AppConfig, AppState, Session,
    models::{NewUser, Role, User, UserChanges, UserCredentials, UserFilter},
    password::hash_password,
    repository::{RepoError, Repository},
};
use std::sync::{Arc, Mutex};

// --- In-Memory Repository ---

#[derive(Clone)]
pub struct StoredUser {
    pub user: User,
    pub password_hash: String,
    pub reset_token: Option<String>,
    pub reset_token_expires: Option<DateTime<Utc>>,
}

/// Stand-in for Postgres that keeps the same contract: unique emails,
/// NotFound on missing ids, substring filters.
#[derive(Default)]
pub struct InMemoryRepo {
    pub users: Mutex<Vec<StoredUser>>,
}

fn contains_ci(haystack: Option<&str>, needle: &Option<String>) -> bool {
    match needle {
        None => true,
        Some(n) => haystack
            .map(|h| h.to_lowercase().contains(&n.to_lowercase()))
            .unwrap_or(false),
    }
}

impl InMemoryRepo {
    /// Inserts a user directly, bypassing the handlers.
    pub fn seed(&self, email: &str, password: &str, role: Role, must_reset: bool) -> User {
        let mut users = self.users.lock().unwrap();
        let id = users.iter().map(|u| u.user.id).max().unwrap_or(0) + 1;
        let user = User {
            id,
            email: email.to_string(),
            name: Some(format!("User {}", id)),
            role,
            sector: None,
            must_reset_password: must_reset,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        users.push(StoredUser {
            user: user.clone(),
            password_hash: hash_password(password).unwrap(),
            reset_token: None,
            reset_token_expires: None,
        });
        user
    }

    pub fn stored(&self, id: i64) -> Option<StoredUser> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.user.id == id)
            .cloned()
    }
}

#[async_trait]
impl Repository for InMemoryRepo {
    async fn get_user(&self, id: i64) -> Result<Option<User>, RepoError> {
        Ok(self.stored(id).map(|s| s.user))
    }

    async fn find_credentials(&self, email: &str) -> Result<Option<UserCredentials>, RepoError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.user.email == email)
            .map(|u| UserCredentials {
                user: u.user.clone(),
                password_hash: u.password_hash.clone(),
            }))
    }

    async fn list_users(&self, filter: UserFilter) -> Result<Vec<User>, RepoError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .map(|u| &u.user)
            .filter(|u| filter.id.is_none_or(|id| u.id == id))
            .filter(|u| contains_ci(u.name.as_deref(), &filter.name))
            .filter(|u| contains_ci(Some(&u.email), &filter.email))
            .filter(|u| contains_ci(u.sector.as_deref(), &filter.sector))
            .cloned()
            .collect())
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, RepoError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.user.email == new_user.email) {
            return Err(RepoError::Conflict);
        }
        let id = users.iter().map(|u| u.user.id).max().unwrap_or(0) + 1;
        let user = User {
            id,
            email: new_user.email,
            name: new_user.name,
            role: new_user.role,
            sector: new_user.sector,
            must_reset_password: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        users.push(StoredUser {
            user: user.clone(),
            password_hash: new_user.password_hash,
            reset_token: None,
            reset_token_expires: None,
        });
        Ok(user)
    }

    async fn update_user(&self, id: i64, changes: UserChanges) -> Result<User, RepoError> {
        let mut users = self.users.lock().unwrap();
        if let Some(email) = &changes.email {
            if users.iter().any(|u| u.user.id != id && &u.user.email == email) {
                return Err(RepoError::Conflict);
            }
        }
        let stored = users
            .iter_mut()
            .find(|u| u.user.id == id)
            .ok_or(RepoError::NotFound)?;

        if let Some(name) = changes.name {
            stored.user.name = Some(name);
        }
        if let Some(email) = changes.email {
            stored.user.email = email;
        }
        if let Some(role) = changes.role {
            stored.user.role = role;
        }
        if let Some(sector) = changes.sector {
            stored.user.sector = Some(sector);
        }
        if let Some(hash) = changes.password_hash {
            stored.password_hash = hash;
        }
        if let Some(flag) = changes.must_reset_password {
            stored.user.must_reset_password = flag;
        }
        stored.user.updated_at = Utc::now();
        Ok(stored.user.clone())
    }

    async fn delete_user(&self, id: i64) -> Result<(), RepoError> {
        let mut users = self.users.lock().unwrap();
        let before = users.len();
        users.retain(|u| u.user.id != id);
        if users.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn store_reset_token(
        &self,
        id: i64,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepoError> {
        let mut users = self.users.lock().unwrap();
        if let Some(stored) = users.iter_mut().find(|u| u.user.id == id) {
            stored.reset_token = Some(token.to_string());
            stored.reset_token_expires = Some(expires_at);
        }
        Ok(())
    }

    async fn complete_password_reset(
        &self,
        email: &str,
        token: &str,
        now: DateTime<Utc>,
        password_hash: &str,
    ) -> Result<User, RepoError> {
        // One lock for the match and the write, like the single UPDATE in Postgres.
        let mut users = self.users.lock().unwrap();
        let stored = users
            .iter_mut()
            .find(|u| {
                u.user.email == email
                    && u.reset_token.as_deref() == Some(token)
                    && u.reset_token_expires.is_some_and(|exp| exp > now)
            })
            .ok_or(RepoError::NotFound)?;

        stored.password_hash = password_hash.to_string();
        stored.reset_token = None;
        stored.reset_token_expires = None;
        stored.user.must_reset_password = false;
        stored.user.updated_at = Utc::now();
        Ok(stored.user.clone())
    }
}

// --- State & Request Helpers ---

pub fn app_state(repo: Arc<InMemoryRepo>) -> AppState {
    AppState::new(repo, AppConfig::default())
}

pub fn session_for(user: &User) -> Session {
    Session::from(user)
}

/// `Cookie` header value carrying a freshly encoded session.
pub fn cookie_header(state: &AppState, session: &Session) -> String {
    format!("userSession={}", state.sessions.encode(session).unwrap())
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(c) = cookie {
        builder = builder.header(header::COOKIE, c);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn json_request(
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(c) = cookie {
        builder = builder.header(header::COOKIE, c);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn location(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::LOCATION)
        .map(|v| v.to_str().unwrap().to_string())
}

/// The `userSession` Set-Cookie header of a response, if any.
pub fn session_set_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("userSession="))
        .map(str::to_string)
}
