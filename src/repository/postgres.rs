use super::{Repository, StoreResult};
use crate::error::StoreError;
use crate::models::{NewRule, PendingUser, Rule, RuleStatus, UpdateRuleRequest, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, name, email, role, district, province, is_approved, \
                            needs_approval, approved_at, created_at";
const RULE_COLUMNS: &str =
    "id, section, provision, fine, points, status, created_by, created_at, updated_at";

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL. Every method maps
/// to a single statement; failures are handed up tagged with the operation name.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Tags the error with the operation; `AppError` logs it once at the boundary.
fn store_failure(op: &'static str) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |source| StoreError::Database { op, source }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_failure("get_user"))
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_failure("find_user_by_email"))
    }

    async fn get_pending_users(&self) -> StoreResult<Vec<PendingUser>> {
        sqlx::query_as::<_, PendingUser>(
            r#"
            SELECT id, name, email, district, province, role, created_at
            FROM users
            WHERE needs_approval = true AND is_approved = false
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(store_failure("get_pending_users"))
    }

    async fn approve_pending_user(
        &self,
        id: Uuid,
        approved_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users SET is_approved = true, approved_at = $2
            WHERE id = $1 AND needs_approval = true AND is_approved = false
            "#,
        )
        .bind(id)
        .bind(approved_at)
        .execute(&self.pool)
        .await
        .map_err(store_failure("approve_pending_user"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn reject_pending_user(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query(
            "DELETE FROM users WHERE id = $1 AND needs_approval = true AND is_approved = false",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(store_failure("reject_pending_user"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_active_rules(&self) -> StoreResult<Vec<Rule>> {
        let sql = format!(
            "SELECT {RULE_COLUMNS} FROM rules WHERE status = 'active' ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, Rule>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(store_failure("get_active_rules"))
    }

    /// create_rule
    ///
    /// Section uniqueness is enforced by the `rules_section_key` index; a
    /// unique violation is reported as `DuplicateSection` rather than a fault.
    async fn create_rule(&self, rule: NewRule, created_by: Option<Uuid>) -> StoreResult<Rule> {
        let sql = format!(
            "INSERT INTO rules (id, section, provision, fine, points, status, created_by, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW()) RETURNING {RULE_COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, Rule>(&sql)
            .bind(Uuid::new_v4())
            .bind(&rule.section)
            .bind(&rule.provision)
            .bind(&rule.fine)
            .bind(rule.points)
            .bind(rule.status.as_str())
            .bind(created_by)
            .fetch_one(&self.pool)
            .await;

        match inserted {
            Ok(rule) => Ok(rule),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::DuplicateSection(rule.section))
            }
            Err(e) => Err(store_failure("create_rule")(e)),
        }
    }

    /// update_rule
    ///
    /// COALESCE keeps every column whose field in `req` is `None`.
    async fn update_rule(&self, id: Uuid, req: UpdateRuleRequest) -> StoreResult<Option<Rule>> {
        let sql = format!(
            r#"
            UPDATE rules
            SET provision = COALESCE($2, provision),
                fine = COALESCE($3, fine),
                points = COALESCE($4, points),
                status = COALESCE($5, status),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {RULE_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Rule>(&sql)
            .bind(id)
            .bind(req.provision)
            .bind(req.fine)
            .bind(req.points)
            .bind(req.status.map(RuleStatus::as_str))
            .fetch_optional(&self.pool)
            .await
            .map_err(store_failure("update_rule"))
    }

    async fn delete_rule(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM rules WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(store_failure("delete_rule"))?;
        Ok(result.rows_affected() > 0)
    }
}
