use axum::{
    Router,
    extract::FromRef,
    http::{HeaderName, StatusCode},
    middleware,
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod models;
pub mod password;
pub mod repository;
pub mod session;

// Routing split by access tier (public, authenticated, admin).
pub mod routes;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use gate::{Decision, RouteTable};
pub use repository::{PostgresRepository, RepositoryState};
pub use session::{Session, SessionCodec};

/// ApiDoc
///
/// OpenAPI document for the JSON API, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::login, handlers::logout, handlers::request_reset, handlers::reset_password,
        handlers::get_me, handlers::list_users, handlers::create_user, handlers::update_user,
        handlers::delete_user, handlers::change_user_password
    ),
    components(
        schemas(
            models::User, models::LoginRequest, models::RequestResetRequest,
            models::ResetPasswordRequest, models::CreateUserRequest, models::UpdateUserRequest,
            models::AdminPasswordRequest, models::MessageResponse, models::UserMessageResponse,
            session::Session,
        )
    ),
    tags(
        (name = "intranet-portal", description = "Intranet portal API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single shared container for everything handlers need. Cloned per
/// request; every field is either an `Arc` or cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Persistence for portal accounts.
    pub repo: RepositoryState,
    /// The loaded, immutable environment configuration.
    pub config: AppConfig,
    /// Signs and reads the `userSession` cookie.
    pub sessions: SessionCodec,
    /// Path classification used by the access gate.
    pub routes: Arc<RouteTable>,
}

impl AppState {
    /// Assembles the state with the standard route table and a codec keyed by
    /// the configured session secret.
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        let sessions = SessionCodec::new(&config.session_secret, config.session_ttl_secs());
        Self {
            repo,
            config,
            sessions,
            routes: Arc::new(RouteTable::default()),
        }
    }

    fn gate_state(&self) -> auth::GateState {
        auth::GateState {
            routes: self.routes.clone(),
            sessions: self.sessions.clone(),
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for SessionCodec {
    fn from_ref(app_state: &AppState) -> SessionCodec {
        app_state.sessions.clone()
    }
}

/// create_router
///
/// Assembles the routing structure, wraps it in the access gate, and applies
/// the observability layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");
    let gate = state.gate_state();

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(authenticated::authenticated_routes())
        .merge(admin::admin_routes())
        .fallback(|| async { (StatusCode::NOT_FOUND, "Not found") })
        .with_state(state)
        // The gate wraps every route and the fallback, so it decides before any
        // handler is selected.
        .layer(middleware::from_fn_with_state(gate, auth::access_gate));

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the per-request span, tagged with the `x-request-id` so every log
/// line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
