use crate::{
    AppState,
    auth::{SessionClaims, SessionUser},
    error::{ApiResult, AppError},
    models::{
        ApproveUserRequest, CreateRuleRequest, MessageResponse, PendingUsersResponse,
        RuleResponse, RulesResponse, UpdateRuleRequest, UserStatusRequest, UserStatusResponse,
    },
};
use axum::{
    Extension, Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::Html,
};
use chrono::Utc;
use uuid::Uuid;

// --- Admin: approval workflow ---

/// approve_user
///
/// [Admin Route] Applies a reviewer's decision to a pending account.
///
/// `approved = true` stamps `is_approved` and `approved_at`; `approved = false`
/// deletes the account outright. There is no audit trail for rejections.
/// Only pending accounts can be decided on: an unknown id, or one that is
/// already approved, is reported as 404 and left untouched.
#[utoipa::path(
    post,
    path = "/api/admin/approve-user",
    request_body = ApproveUserRequest,
    responses(
        (status = 200, description = "Decision applied", body = MessageResponse),
        (status = 400, description = "Malformed body", body = MessageResponse),
        (status = 404, description = "No pending user with this id", body = MessageResponse),
        (status = 500, description = "Store failure", body = MessageResponse)
    )
)]
pub async fn approve_user(
    reviewer: SessionUser,
    State(state): State<AppState>,
    payload: Result<Json<ApproveUserRequest>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    reviewer.require_admin()?;
    let Json(payload) = payload?;
    let user_id = payload.parsed_user_id()?;

    if payload.approved {
        if !state.repo.approve_pending_user(user_id, Utc::now()).await? {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        tracing::info!(%user_id, reviewer = %reviewer.id, "user approved");
        Ok(Json(MessageResponse::new("User approved successfully")))
    } else {
        if !state.repo.reject_pending_user(user_id).await? {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        tracing::info!(%user_id, reviewer = %reviewer.id, "user rejected and removed");
        Ok(Json(MessageResponse::new("User rejected and removed")))
    }
}

/// get_pending_users
///
/// [Admin Route] Lists accounts waiting for review, oldest first.
#[utoipa::path(
    get,
    path = "/api/admin/pending-users",
    responses(
        (status = 200, description = "Pending accounts", body = PendingUsersResponse),
        (status = 500, description = "Store failure", body = MessageResponse)
    )
)]
pub async fn get_pending_users(
    reviewer: SessionUser,
    State(state): State<AppState>,
) -> ApiResult<Json<PendingUsersResponse>> {
    reviewer.require_admin()?;
    let pending_users = state.repo.get_pending_users().await?;
    Ok(Json(PendingUsersResponse { pending_users }))
}

// --- Rules ---

/// get_all_rules
///
/// [Public Route] Active rules only, newest first.
#[utoipa::path(
    get,
    path = "/api/other/rules/getAllRules",
    responses(
        (status = 200, description = "Active rules", body = RulesResponse),
        (status = 500, description = "Store failure", body = MessageResponse)
    )
)]
pub async fn get_all_rules(State(state): State<AppState>) -> ApiResult<Json<RulesResponse>> {
    let rules = state.repo.get_active_rules().await?;
    Ok(Json(RulesResponse {
        message: "Rules fetched successfully".to_string(),
        rules,
    }))
}

/// create_rule
///
/// [Rule Editor Route] Adds a rule. The section is trimmed and must be unique;
/// a duplicate surfaces as 409.
#[utoipa::path(
    post,
    path = "/api/other/rules/createRule",
    request_body = CreateRuleRequest,
    responses(
        (status = 201, description = "Created", body = RuleResponse),
        (status = 400, description = "Invalid rule", body = MessageResponse),
        (status = 409, description = "Duplicate section", body = MessageResponse)
    )
)]
pub async fn create_rule(
    editor: SessionUser,
    State(state): State<AppState>,
    payload: Result<Json<CreateRuleRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<RuleResponse>)> {
    editor.require_rule_editor()?;
    let Json(payload) = payload?;
    let new_rule = payload.validate()?;

    let rule = state.repo.create_rule(new_rule, Some(editor.id)).await?;
    tracing::info!(rule_id = %rule.id, section = %rule.section, "rule created");

    Ok((
        StatusCode::CREATED,
        Json(RuleResponse {
            message: "Rule created successfully".to_string(),
            rule,
        }),
    ))
}

/// update_rule
///
/// [Rule Editor Route] Partial update; flipping `status` to `inactive`
/// retires a rule without deleting it.
#[utoipa::path(
    put,
    path = "/api/other/rules/updateRule/{id}",
    params(("id" = Uuid, Path, description = "Rule ID")),
    request_body = UpdateRuleRequest,
    responses(
        (status = 200, description = "Updated", body = RuleResponse),
        (status = 404, description = "Unknown rule", body = MessageResponse)
    )
)]
pub async fn update_rule(
    editor: SessionUser,
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateRuleRequest>, JsonRejection>,
) -> ApiResult<Json<RuleResponse>> {
    editor.require_rule_editor()?;
    let Path(id) = id?;
    let Json(payload) = payload?;
    payload.validate()?;

    match state.repo.update_rule(id, payload).await? {
        Some(rule) => Ok(Json(RuleResponse {
            message: "Rule updated successfully".to_string(),
            rule,
        })),
        None => Err(AppError::NotFound("Rule not found".to_string())),
    }
}

/// delete_rule
///
/// [Rule Editor Route] Hard delete.
#[utoipa::path(
    delete,
    path = "/api/other/rules/deleteRule/{id}",
    params(("id" = Uuid, Path, description = "Rule ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 404, description = "Unknown rule", body = MessageResponse),
        (status = 500, description = "Store failure", body = MessageResponse)
    )
)]
pub async fn delete_rule(
    editor: SessionUser,
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<MessageResponse>> {
    editor.require_rule_editor()?;
    let Path(id) = id?;

    if state.repo.delete_rule(id).await? {
        tracing::info!(rule_id = %id, "rule deleted");
        Ok(Json(MessageResponse::new("Rule deleted successfully")))
    } else {
        Err(AppError::NotFound("Rule not found".to_string()))
    }
}

// --- User status ---

/// get_user_status
///
/// [Public Route] Tells the sign-in page whether an email belongs to an
/// account and where that account stands in the approval workflow.
#[utoipa::path(
    post,
    path = "/api/user/status",
    request_body = UserStatusRequest,
    responses(
        (status = 200, description = "Lookup result", body = UserStatusResponse),
        (status = 400, description = "Email missing", body = MessageResponse)
    )
)]
pub async fn get_user_status(
    State(state): State<AppState>,
    payload: Result<Json<UserStatusRequest>, JsonRejection>,
) -> ApiResult<Json<UserStatusResponse>> {
    let Json(payload) = payload?;
    let email = payload
        .email
        .as_deref()
        .map(str::trim)
        .filter(|email| !email.is_empty())
        .ok_or_else(|| AppError::InvalidRequest("Email is required".to_string()))?;

    let user = state.repo.find_user_by_email(email).await?;
    Ok(Json(UserStatusResponse {
        exists: user.is_some(),
        user: user.map(Into::into),
    }))
}

// --- Pages ---

pub async fn landing_page() -> Html<&'static str> {
    Html(
        "<!doctype html><html><head><title>Traffic Rules Portal</title></head>\
         <body><h1>Traffic Rules Portal</h1>\
         <p><a href=\"/auth/signin\">Sign in</a> to manage traffic rules.</p></body></html>",
    )
}

pub async fn sign_in_page() -> Html<&'static str> {
    Html(
        "<!doctype html><html><head><title>Sign in</title></head>\
         <body><h1>Sign in</h1><p>Sign in with your portal account to continue.</p></body></html>",
    )
}

pub async fn pending_approval_page() -> Html<&'static str> {
    Html(
        "<!doctype html><html><head><title>Pending approval</title></head>\
         <body><h1>Your account is awaiting approval</h1>\
         <p>An administrator will review your registration shortly.</p></body></html>",
    )
}

/// admin_page
///
/// Only reachable through the route guard, which has already placed the
/// validated claims in the request extensions.
pub async fn admin_page(Extension(claims): Extension<SessionClaims>) -> Html<String> {
    Html(format!(
        "<!doctype html><html><head><title>Admin</title></head>\
         <body><h1>Admin dashboard</h1><p>Signed in as {} ({}).</p></body></html>",
        escape_html(&claims.email),
        claims.role.as_str()
    ))
}

fn escape_html(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            '<' => "&lt;".to_string(),
            '>' => "&gt;".to_string(),
            '&' => "&amp;".to_string(),
            '"' => "&quot;".to_string(),
            '\'' => "&#39;".to_string(),
            other => other.to_string(),
        })
        .collect()
}
