use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Routes for any signed-in user, ADMIN or PUBLIC. The gate redirects anonymous
/// visitors to the login page and sessions with a pending forced reset to
/// `/set-new-password` before these handlers are reached.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /dashboard
        // Home page for PUBLIC users.
        .route("/dashboard", get(|| async { handlers::page_shell("Dashboard") }))
        // GET /loading
        // Interstitial shown right after login.
        .route("/loading", get(|| async { handlers::page_shell("Loading") }))
        // GET /set-new-password
        // Forced-reset page. Only reachable while the reset is pending.
        .route(
            "/set-new-password",
            get(|| async { handlers::page_shell("Set new password") }),
        )
        // GET /api/me
        // The caller's session, for display purposes.
        .route("/api/me", get(handlers::get_me))
}
