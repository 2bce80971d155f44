use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post, put},
};

/// Admin Router Module
///
/// The approval queue (approved `admin` accounts) and rule authoring
/// (approved `admin` or `rmvAdmin` accounts). Each handler takes a
/// `SessionUser` and checks the role itself, so a missing session is a 401
/// and an insufficient one a 403.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // POST /api/admin/approve-user
        // Approves (stamps approved_at) or rejects (deletes) a pending account.
        // Accounts that are not pending are left alone and reported as 404.
        .route("/api/admin/approve-user", post(handlers::approve_user))
        // GET /api/admin/pending-users
        // The review queue: accounts with needsApproval set and not yet approved,
        // oldest first, projected without the approval flags.
        .route("/api/admin/pending-users", get(handlers::get_pending_users))
        // POST /api/other/rules/createRule
        // Adds a rule (201). The section is trimmed and must be unique (409 otherwise);
        // the caller is recorded as the author.
        .route("/api/other/rules/createRule", post(handlers::create_rule))
        // PUT /api/other/rules/updateRule/{id}
        // Partial update; status = inactive is the soft delete.
        .route("/api/other/rules/updateRule/{id}", put(handlers::update_rule))
        // DELETE /api/other/rules/deleteRule/{id}
        // Hard delete. Prefer the status flip above when the rule may come back.
        .route("/api/other/rules/deleteRule/{id}", delete(handlers::delete_rule))
}
