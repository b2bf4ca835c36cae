use crate::models::{NewUser, User, UserChanges, UserCredentials, UserFilter};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, query_builder::QueryBuilder};
use std::sync::Arc;
use thiserror::Error;

/// Columns selected whenever a `User` is returned. The password and reset-token
/// columns are deliberately absent.
const USER_COLUMNS: &str =
    "id, email, name, role, sector, must_reset_password, created_at, updated_at";

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("record not found")]
    NotFound,
    /// A unique constraint (the user email) rejected the write.
    #[error("unique constraint violated")]
    Conflict,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Maps a failed write, turning unique violations into `RepoError::Conflict`.
fn write_error(err: sqlx::Error) -> RepoError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => RepoError::Conflict,
        _ => RepoError::Database(err),
    }
}

/// ILIKE pattern matching `value` as a literal substring. `%`, `_` and the
/// escape character itself are escaped for use with `ESCAPE '\'`.
pub fn contains_pattern(value: &str) -> String {
    let mut pattern = String::with_capacity(value.len() + 2);
    pattern.push('%');
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Repository Trait
///
/// The persistence contract for portal accounts. Handlers only ever see this
/// trait, so tests swap in an in-memory implementation.
///
/// **Send + Sync + async_trait** are required for `Arc<dyn Repository>` to be
/// shared across Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Lookup ---
    async fn get_user(&self, id: i64) -> Result<Option<User>, RepoError>;
    // Includes the stored hash; used by login only.
    async fn find_credentials(&self, email: &str) -> Result<Option<UserCredentials>, RepoError>;
    async fn list_users(&self, filter: UserFilter) -> Result<Vec<User>, RepoError>;

    // --- Administration ---
    // Conflict if the email is taken.
    async fn create_user(&self, new_user: NewUser) -> Result<User, RepoError>;
    // NotFound if the id is absent, Conflict if the new email is taken.
    async fn update_user(&self, id: i64, changes: UserChanges) -> Result<User, RepoError>;
    async fn delete_user(&self, id: i64) -> Result<(), RepoError>;

    // --- Password reset tokens ---
    async fn store_reset_token(
        &self,
        id: i64,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepoError>;
    /// Redeems an unexpired `token` held by `email`: stores the new hash, clears
    /// the token and lifts the forced-reset flag in one statement, so a token
    /// can be spent once. NotFound if nothing matched.
    async fn complete_password_reset(
        &self,
        email: &str,
        token: &str,
        now: DateTime<Utc>,
        password_hash: &str,
    ) -> Result<User, RepoError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The `Repository` implementation backed by the `users` table in PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: i64) -> Result<Option<User>, RepoError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_credentials(&self, email: &str) -> Result<Option<UserCredentials>, RepoError> {
        let sql = format!("SELECT {USER_COLUMNS}, password FROM users WHERE email = $1");
        let creds = sqlx::query_as::<_, UserCredentials>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(creds)
    }

    /// list_users
    ///
    /// Builds the filter with QueryBuilder so every user-supplied value is bound,
    /// never interpolated. Text filters are case-insensitive substring matches.
    async fn list_users(&self, filter: UserFilter) -> Result<Vec<User>, RepoError> {
        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users WHERE TRUE"));

        if let Some(id) = filter.id {
            builder.push(" AND id = ");
            builder.push_bind(id);
        }
        for (column, value) in [
            ("name", filter.name),
            ("email", filter.email),
            ("sector", filter.sector),
        ] {
            if let Some(v) = value {
                builder.push(format!(" AND {column} ILIKE "));
                builder.push_bind(contains_pattern(&v));
                builder.push(r" ESCAPE '\'");
            }
        }

        builder.push(" ORDER BY id");

        let users = builder
            .build_query_as::<User>()
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, RepoError> {
        let sql = format!(
            r#"
            INSERT INTO users (email, name, password, role, sector, must_reset_password)
            VALUES ($1, $2, $3, $4, $5, TRUE)
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&new_user.email)
            .bind(&new_user.name)
            .bind(&new_user.password_hash)
            .bind(new_user.role.as_str())
            .bind(&new_user.sector)
            .fetch_one(&self.pool)
            .await
            .map_err(write_error)
    }

    /// update_user
    ///
    /// Only the columns present in `changes` are written; `updated_at` is always bumped.
    async fn update_user(&self, id: i64, changes: UserChanges) -> Result<User, RepoError> {
        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new("UPDATE users SET updated_at = NOW()");

        if let Some(name) = changes.name {
            builder.push(", name = ");
            builder.push_bind(name);
        }
        if let Some(email) = changes.email {
            builder.push(", email = ");
            builder.push_bind(email);
        }
        if let Some(role) = changes.role {
            builder.push(", role = ");
            builder.push_bind(role.as_str());
        }
        if let Some(sector) = changes.sector {
            builder.push(", sector = ");
            builder.push_bind(sector);
        }
        if let Some(hash) = changes.password_hash {
            builder.push(", password = ");
            builder.push_bind(hash);
        }
        if let Some(flag) = changes.must_reset_password {
            builder.push(", must_reset_password = ");
            builder.push_bind(flag);
        }

        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(format!(" RETURNING {USER_COLUMNS}"));

        builder
            .build_query_as::<User>()
            .fetch_optional(&self.pool)
            .await
            .map_err(write_error)?
            .ok_or(RepoError::NotFound)
    }

    async fn delete_user(&self, id: i64) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
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
        sqlx::query(
            "UPDATE users SET reset_token = $1, reset_token_expires = $2, updated_at = NOW() WHERE id = $3",
        )
        .bind(token)
        .bind(expires_at)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn complete_password_reset(
        &self,
        email: &str,
        token: &str,
        now: DateTime<Utc>,
        password_hash: &str,
    ) -> Result<User, RepoError> {
        let sql = format!(
            r#"
            UPDATE users
            SET password = $1, reset_token = NULL, reset_token_expires = NULL,
                must_reset_password = FALSE, updated_at = NOW()
            WHERE email = $2 AND reset_token = $3 AND reset_token_expires > $4
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(password_hash)
            .bind(email)
            .bind(token)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepoError::NotFound)
    }
}
