use axum::{Router, extract::FromRef, http::HeaderName, middleware::from_fn_with_state};
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
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;

// Routing segregation (Public, Admin, Pages).
pub mod routes;
use routes::{admin, pages, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{AppError, StoreError};
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// The generated OpenAPI document, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::approve_user, handlers::get_pending_users, handlers::get_all_rules,
        handlers::create_rule, handlers::update_rule, handlers::delete_rule,
        handlers::get_user_status
    ),
    components(
        schemas(
            models::Role, models::RuleStatus, models::Rule, models::PendingUser,
            models::UserSummary, models::ApproveUserRequest, models::UserStatusRequest,
            models::CreateRuleRequest, models::UpdateRuleRequest, models::MessageResponse,
            models::PendingUsersResponse, models::RulesResponse, models::RuleResponse,
            models::UserStatusResponse,
        )
    ),
    tags(
        (name = "traffic-portal", description = "Traffic Rules Portal API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single container handed to every handler. Built once in `main`; the
/// repository handle inside it owns the process-wide connection pool.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: Postgres in production, in-memory in tests.
    pub repo: RepositoryState,
    /// Configuration: loaded once, immutable.
    pub config: AppConfig,
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

/// create_router
///
/// Assembles the routing structure, the route guard and the observability
/// layers, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public Routes: health, rule listing, status lookup. No session needed.
        .merge(public::public_routes())
        // Admin Routes: approval queue and rule authoring. Role checks happen
        // inside the handlers through the `SessionUser` extractor.
        .merge(admin::admin_routes())
        // Pages: landing, sign-in and the two guarded destinations.
        .merge(pages::page_routes())
        // Apply the Unified State to all routes.
        .with_state(state.clone())
        // 3. Route Guard
        // Wraps the whole router (fallback included) so every request is seen
        // once; it only acts on `/admin`, `/admin/*` and `/pending-approval`.
        .layer(from_fn_with_state(state, middleware::route_guard));

    // 4. Observability and Correlation Layers (outermost, run first)
    base_router
        .layer(
            ServiceBuilder::new()
                // 4a. Request ID Generation: a UUID for every incoming request.
                .layer(SetRequestIdLayer::new(
                    x_request_id.clone(),
                    MakeRequestUuid,
                ))
                // 4b. Request Tracing: one span per request, tagged with the id above.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 4c. Request ID Propagation: echo x-request-id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 5. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Opens the per-request span with method, uri and the `x-request-id`
/// assigned by `SetRequestIdLayer`, so every log line of a request correlates.
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
