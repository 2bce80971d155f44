use crate::{
    AppState, handlers,
    middleware::{ADMIN_PATH, PENDING_APPROVAL_PATH, SIGN_IN_PATH},
};
use axum::{Router, routing::get};

/// Page Router Module
///
/// `/` and `/auth/*` are public; `/admin` and `/pending-approval` are only
/// reached once `middleware::route_guard` has let the request through.
pub fn page_routes() -> Router<AppState> {
    Router::new()
        // GET /
        // Landing page. Public.
        .route("/", get(handlers::landing_page))
        // GET /auth/signin
        // Target of the guard's sign-in redirect; carries `callbackUrl`.
        .route(SIGN_IN_PATH, get(handlers::sign_in_page))
        // GET /pending-approval
        // Where pending accounts land when they try the admin area. Approved
        // sessions are bounced from here to /admin.
        .route(PENDING_APPROVAL_PATH, get(handlers::pending_approval_page))
        // GET /admin
        // Admin dashboard. Reads the session claims the guard placed in the
        // request extensions.
        .route(ADMIN_PATH, get(handlers::admin_page))
}
