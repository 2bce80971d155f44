use crate::error::StoreError;
use crate::models::{NewRule, PendingUser, Rule, UpdateRuleRequest, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

mod memory;
mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;

pub type StoreResult<T> = Result<T, StoreError>;

/// Repository Trait
///
/// The persistence contract shared by the Postgres store and the in-memory
/// store used in tests. Every method performs exactly one store operation;
/// the handlers never compose them transactionally.
///
/// Mutations of a single row rely on the store's per-row atomicity, so two
/// concurrent decisions on the same user resolve last-write-wins.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    // Accounts with needs_approval set and not yet approved, oldest first.
    async fn get_pending_users(&self) -> StoreResult<Vec<PendingUser>>;

    /// Marks a pending user approved at `approved_at`. Returns false when no
    /// pending user with this id exists; approved accounts are left untouched.
    async fn approve_pending_user(
        &self,
        id: Uuid,
        approved_at: DateTime<Utc>,
    ) -> StoreResult<bool>;

    /// Irreversibly removes a pending user. Returns false when no pending user
    /// with this id exists; approved accounts are never deleted here.
    async fn reject_pending_user(&self, id: Uuid) -> StoreResult<bool>;

    // --- Rules ---
    // Active rules only, newest first.
    async fn get_active_rules(&self) -> StoreResult<Vec<Rule>>;
    async fn create_rule(&self, rule: NewRule, created_by: Option<Uuid>) -> StoreResult<Rule>;
    async fn update_rule(&self, id: Uuid, req: UpdateRuleRequest) -> StoreResult<Option<Rule>>;
    async fn delete_rule(&self, id: Uuid) -> StoreResult<bool>;
}

/// RepositoryState
///
/// The handle injected into `AppState`; constructed once in `main`.
pub type RepositoryState = Arc<dyn Repository>;
