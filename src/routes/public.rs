use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Pages and endpoints the gate lets through without a session. The auth API
/// stays reachable in every session state, since it is how a session is
/// created, ended or repaired.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // GET /
        // Login page. A settled session is bounced to its dashboard by the gate.
        .route("/", get(|| async { handlers::page_shell("Login") }))
        // GET /reset-password
        // Forgotten-password page: request a link, or enter the emailed token.
        .route(
            "/reset-password",
            get(|| async { handlers::page_shell("Reset password") }),
        )
        // --- Auth API ---
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/logout", post(handlers::logout))
        .route("/api/auth/request-reset", post(handlers::request_reset))
        .route("/api/auth/reset-password", post(handlers::reset_password))
}
