use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that need no session. The rule listing only ever exposes active
/// rules; the status lookup is what the sign-in page calls before a session exists.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for the supervisor / load balancer.
        .route("/health", get(|| async { "ok" }))
        // GET /api/other/rules/getAllRules
        // Active rules only, newest first. Inactive (retired) rules stay hidden.
        .route("/api/other/rules/getAllRules", get(handlers::get_all_rules))
        // POST /api/user/status
        // Looks an account up by email so the sign-in page can tell a pending
        // reviewer from an active one. 400 when the email is missing.
        .route("/api/user/status", post(handlers::get_user_status))
}
