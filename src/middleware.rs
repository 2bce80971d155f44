//! Route protection for the browser-facing pages.
//!
//! Runs on every request. Paths outside the guarded set pass straight
//! through; guarded paths are evaluated against the session claims with the
//! policy in [`decide`].

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::{auth, config::AppConfig, models::ApprovalState};

pub const ADMIN_PATH: &str = "/admin";
pub const PENDING_APPROVAL_PATH: &str = "/pending-approval";
pub const SIGN_IN_PATH: &str = "/auth/signin";
const AUTH_PREFIX: &str = "/auth";

/// Where a request stands with respect to its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    PendingApproval,
    Approved,
}

impl SessionState {
    pub fn of(claims: Option<&auth::SessionClaims>) -> Self {
        match claims.map(auth::SessionClaims::approval_state) {
            None => SessionState::Unauthenticated,
            Some(ApprovalState::Pending) => SessionState::PendingApproval,
            Some(ApprovalState::Approved) => SessionState::Approved,
        }
    }
}

/// Outcome of the policy for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    SignIn { callback: String },
    Redirect(&'static str),
}

/// `prefix` itself or anything below it, segment-wise.
fn under(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

pub fn is_public_path(path: &str) -> bool {
    path == "/" || under(path, AUTH_PREFIX)
}

/// The paths the guard is mounted on: `/admin`, `/admin/*`, `/pending-approval`.
pub fn is_guarded_path(path: &str) -> bool {
    under(path, ADMIN_PATH) || path == PENDING_APPROVAL_PATH
}

/// decide
///
/// 1. public paths are always allowed;
/// 2. everything else needs a session, otherwise sign in;
/// 3. a pending session may not enter the admin area;
/// 4. an approved session has no business on the pending page;
/// 5. anything else goes through.
pub fn decide(path: &str, claims: Option<&auth::SessionClaims>) -> Decision {
    if is_public_path(path) {
        return Decision::Allow;
    }

    let Some(claims) = claims else {
        return Decision::SignIn {
            callback: path.to_string(),
        };
    };

    if SessionState::of(Some(claims)) == SessionState::PendingApproval && under(path, ADMIN_PATH) {
        return Decision::Redirect(PENDING_APPROVAL_PATH);
    }

    if claims.is_approved && path == PENDING_APPROVAL_PATH {
        return Decision::Redirect(ADMIN_PATH);
    }

    Decision::Allow
}

/// route_guard
///
/// Axum middleware wrapping the whole router. Valid claims are inserted into
/// the request extensions so downstream extractors do not decode twice.
pub async fn route_guard(
    State(config): State<AppConfig>,
    mut request: Request,
    next: Next,
) -> Response {
    let claims = auth::session_from_headers(request.headers(), &config.session_secret);
    let path = request.uri().path().to_string();

    if is_guarded_path(&path) {
        match decide(&path, claims.as_ref()) {
            Decision::Allow => {}
            Decision::SignIn { callback } => {
                tracing::info!(%path, "no session, redirecting to sign-in");
                let target = format!(
                    "{SIGN_IN_PATH}?callbackUrl={}",
                    urlencoding::encode(&callback)
                );
                return Redirect::temporary(&target).into_response();
            }
            Decision::Redirect(target) => {
                tracing::info!(
                    %path,
                    target,
                    state = ?SessionState::of(claims.as_ref()),
                    "redirecting by approval state"
                );
                return Redirect::temporary(target).into_response();
            }
        }
    }

    if let Some(claims) = claims {
        request.extensions_mut().insert(claims);
    }
    next.run(request).await
}
