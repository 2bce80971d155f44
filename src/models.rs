use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;

/// Lowest and highest penalty points a rule may carry.
pub const MIN_POINTS: i32 = 0;
pub const MAX_POINTS: i32 = 10;

/// Raised when a stored enum column holds a value this build does not know.
#[derive(Debug, Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

// --- Enumerations ---

/// Role
///
/// The RBAC field of a user record. `RmvAdmin` accounts are created pending
/// and must be approved by an `Admin` before they reach the admin area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub enum Role {
    #[default]
    User,
    Admin,
    RmvAdmin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::RmvAdmin => "rmvAdmin",
        }
    }

    /// Whether a newly registered account with this role starts out pending.
    pub fn requires_approval(self) -> bool {
        matches!(self, Role::RmvAdmin)
    }

    /// Roles allowed to author and retire traffic rules.
    pub fn can_edit_rules(self) -> bool {
        matches!(self, Role::Admin | Role::RmvAdmin)
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            "rmvAdmin" => Ok(Role::RmvAdmin),
            _ => Err(UnknownVariant { kind: "role", value }),
        }
    }
}

/// RuleStatus
///
/// Inactive rules are kept in the table but hidden from the public listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum RuleStatus {
    #[default]
    Active,
    Inactive,
}

impl RuleStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RuleStatus::Active => "active",
            RuleStatus::Inactive => "inactive",
        }
    }
}

impl TryFrom<String> for RuleStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "active" => Ok(RuleStatus::Active),
            "inactive" => Ok(RuleStatus::Inactive),
            _ => Err(UnknownVariant { kind: "rule status", value }),
        }
    }
}

/// ApprovalState
///
/// Derived view over the two approval flags. Only `needs_approval && !is_approved`
/// counts as pending; an approved account keeps `needs_approval` set in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalState {
    Pending,
    Approved,
}

impl ApprovalState {
    pub fn from_flags(needs_approval: bool, is_approved: bool) -> Self {
        if needs_approval && !is_approved {
            ApprovalState::Pending
        } else {
            ApprovalState::Approved
        }
    }
}

// --- Core Schemas (Mapped to Database) ---

/// User
///
/// The canonical account record stored in the `users` table.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub district: Option<String>,
    pub province: Option<String>,
    pub is_approved: bool,
    pub needs_approval: bool,
    #[ts(type = "string | null")]
    pub approved_at: Option<DateTime<Utc>>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn approval_state(&self) -> ApprovalState {
        ApprovalState::from_flags(self.needs_approval, self.is_approved)
    }
}

/// PendingUser
///
/// Restricted projection served to reviewers; approval flags and timestamps
/// other than `created_at` stay server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PendingUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub district: Option<String>,
    pub province: Option<String>,
    #[sqlx(try_from = "String")]
    pub role: Role,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl From<User> for PendingUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            district: user.district,
            province: user.province,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// UserSummary
///
/// What the public status lookup reveals about an account: enough for the
/// sign-in page to tell a pending reviewer apart from an active one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub is_approved: bool,
    pub needs_approval: bool,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            is_approved: user.is_approved,
            needs_approval: user.needs_approval,
        }
    }
}

/// Rule
///
/// A traffic regulation reference record from the `rules` table.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Rule {
    pub id: Uuid,
    pub section: String,
    pub provision: String,
    pub fine: String,
    pub points: i32,
    #[sqlx(try_from = "String")]
    pub status: RuleStatus,
    // Weak reference: cleared when the authoring user is deleted.
    pub created_by: Option<Uuid>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// NewRule
///
/// A validated rule ready for insertion. Only obtainable through
/// `CreateRuleRequest::validate`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRule {
    pub section: String,
    pub provision: String,
    pub fine: String,
    pub points: i32,
    pub status: RuleStatus,
}

// --- Request Payloads (Input Schemas) ---

/// ApproveUserRequest
///
/// Body of `POST /api/admin/approve-user`. `approved` must be a JSON boolean;
/// serde rejects strings and numbers.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ApproveUserRequest {
    #[schema(example = "7f1c2f0e-6c1b-4f0e-9a55-0d5c6b1f8e21")]
    pub user_id: String,
    pub approved: bool,
}

impl ApproveUserRequest {
    /// Parses the user identifier, rejecting blanks and malformed ids.
    pub fn parsed_user_id(&self) -> Result<Uuid, AppError> {
        let raw = self.user_id.trim();
        if raw.is_empty() {
            return Err(AppError::InvalidRequest("userId is required".to_string()));
        }
        Uuid::parse_str(raw)
            .map_err(|_| AppError::InvalidRequest("userId is not a valid id".to_string()))
    }
}

/// UserStatusRequest
///
/// Body of `POST /api/user/status`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserStatusRequest {
    #[serde(default)]
    #[schema(example = "a@b.com")]
    pub email: Option<String>,
}

/// CreateRuleRequest
///
/// Body of `POST /api/other/rules/createRule`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateRuleRequest {
    #[schema(example = "123(2)")]
    pub section: String,
    pub provision: String,
    pub fine: String,
    pub points: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RuleStatus>,
}

impl CreateRuleRequest {
    pub fn validate(self) -> Result<NewRule, AppError> {
        let section = self.section.trim().to_string();
        if section.is_empty() {
            return Err(AppError::InvalidRequest("section is required".to_string()));
        }
        if self.provision.trim().is_empty() {
            return Err(AppError::InvalidRequest("provision is required".to_string()));
        }
        if self.fine.trim().is_empty() {
            return Err(AppError::InvalidRequest("fine is required".to_string()));
        }
        check_points(self.points)?;

        Ok(NewRule {
            section,
            provision: self.provision,
            fine: self.fine,
            points: self.points,
            status: self.status.unwrap_or_default(),
        })
    }
}

/// UpdateRuleRequest
///
/// Partial update for `PUT /api/other/rules/updateRule/{id}`. Setting
/// `status` to `inactive` is the soft-delete path.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateRuleRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provision: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fine: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RuleStatus>,
}

impl UpdateRuleRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(points) = self.points {
            check_points(points)?;
        }
        if self.provision.as_deref().is_some_and(|p| p.trim().is_empty()) {
            return Err(AppError::InvalidRequest("provision must not be empty".to_string()));
        }
        if self.fine.as_deref().is_some_and(|f| f.trim().is_empty()) {
            return Err(AppError::InvalidRequest("fine must not be empty".to_string()));
        }
        Ok(())
    }
}

fn check_points(points: i32) -> Result<(), AppError> {
    if (MIN_POINTS..=MAX_POINTS).contains(&points) {
        Ok(())
    } else {
        Err(AppError::InvalidRequest(format!(
            "points must be between {MIN_POINTS} and {MAX_POINTS}"
        )))
    }
}

// --- Response Schemas (Output) ---

/// MessageResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// PendingUsersResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PendingUsersResponse {
    pub pending_users: Vec<PendingUser>,
}

/// RulesResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RulesResponse {
    pub message: String,
    pub rules: Vec<Rule>,
}

/// RuleResponse
///
/// Returned by the authoring endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RuleResponse {
    pub message: String,
    pub rule: Rule,
}

/// UserStatusResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserStatusResponse {
    pub exists: bool,
    pub user: Option<UserSummary>,
}
