use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, put},
};

/// Admin Router Module
///
/// User administration, restricted to the ADMIN role. The gate sends
/// non-admin sessions back to their own dashboard; each API handler also
/// checks the role and answers 403 on its own.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin-dashboard
        .route(
            "/admin-dashboard",
            get(|| async { handlers::page_shell("Admin dashboard") }),
        )
        // GET /admin-dashboard/users
        // User table with filters, create/edit/delete modals.
        .route(
            "/admin-dashboard/users",
            get(|| async { handlers::page_shell("User administration") }),
        )
        // GET/POST /api/users
        .route(
            "/api/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        // PUT /api/admin/users/password
        // Declared alongside `{id}`; the static segment takes precedence.
        .route(
            "/api/admin/users/password",
            put(handlers::change_user_password),
        )
        // PUT/DELETE /api/admin/users/{id}
        .route(
            "/api/admin/users/{id}",
            put(handlers::update_user).delete(handlers::delete_user),
        )
}
