#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode, header},
};
use chrono::{Duration, Utc};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use traffic_portal::{
    AppConfig, AppState, MemoryRepository,
    auth::{SessionClaims, issue_session},
    config::Env,
    create_router,
    models::{Role, Rule, RuleStatus, User},
    repository::RepositoryState,
};
use uuid::Uuid;

pub const TEST_SECRET: &str = "test-session-secret-1234567890";

pub fn test_config(env: Env) -> AppConfig {
    let mut config = AppConfig::default();
    config.env = env;
    config.session_secret = TEST_SECRET.to_string();
    config
}

pub fn test_state(repo: &Arc<MemoryRepository>, env: Env) -> AppState {
    AppState {
        repo: repo.clone() as RepositoryState,
        config: test_config(env),
    }
}

pub fn test_app(repo: &Arc<MemoryRepository>) -> Router {
    create_router(test_state(repo, Env::Production))
}

// --- Fixtures ---

pub fn user(email: &str, role: Role, needs_approval: bool, is_approved: bool) -> User {
    User {
        id: Uuid::new_v4(),
        name: "Test User".to_string(),
        email: email.to_string(),
        role,
        district: Some("Colombo".to_string()),
        province: Some("Western".to_string()),
        is_approved,
        needs_approval,
        approved_at: None,
        created_at: Utc::now(),
    }
}

pub fn admin() -> User {
    user("admin@rmv.lk", Role::Admin, false, true)
}

pub fn pending_rmv_admin(email: &str) -> User {
    user(email, Role::RmvAdmin, true, false)
}

pub fn rule(section: &str, status: RuleStatus, minutes_ago: i64) -> Rule {
    let at = Utc::now() - Duration::minutes(minutes_ago);
    Rule {
        id: Uuid::new_v4(),
        section: section.to_string(),
        provision: format!("Provision of section {section}"),
        fine: "Rs. 1000".to_string(),
        points: 2,
        status,
        created_by: None,
        created_at: at,
        updated_at: at,
    }
}

// --- Sessions ---

pub fn claims_for(user: &User, exp_offset_secs: i64) -> SessionClaims {
    let now = Utc::now().timestamp();
    SessionClaims {
        sub: user.id,
        email: user.email.clone(),
        role: user.role,
        needs_approval: user.needs_approval,
        is_approved: user.is_approved,
        exp: (now + exp_offset_secs) as usize,
        iat: now as usize,
    }
}

pub fn token_for(user: &User) -> String {
    issue_session(&claims_for(user, 3600), TEST_SECRET).unwrap()
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

// --- Requests ---

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, bearer(token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, bearer(token));
    }
    builder.body(Body::empty()).unwrap()
}

/// Runs one request through the router; non-JSON bodies come back as `Value::Null`.
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, headers, body)
}
