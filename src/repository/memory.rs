use super::{Repository, StoreResult};
use crate::error::StoreError;
use crate::models::{
    ApprovalState, NewRule, PendingUser, Rule, RuleStatus, UpdateRuleRequest, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

/// MemoryRepository
///
/// A process-local `Repository` with the same observable semantics as the
/// Postgres store: unique sections, `created_by` cleared when the author is
/// deleted, identical orderings. Used by the test suites, which can also flip
/// it into an outage to exercise the 500 path.
#[derive(Default)]
pub struct MemoryRepository {
    users: RwLock<HashMap<Uuid, User>>,
    rules: RwLock<HashMap<Uuid, Rule>>,
    unavailable: AtomicBool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a user record directly; signup lives outside this service.
    pub async fn insert_user(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }

    /// Seeds a rule record directly, bypassing validation.
    pub async fn insert_rule(&self, rule: Rule) {
        self.rules.write().await.insert(rule.id, rule);
    }

    pub async fn rule_count(&self) -> usize {
        self.rules.read().await.len()
    }

    pub async fn get_rule(&self, id: Uuid) -> Option<Rule> {
        self.rules.read().await.get(&id).cloned()
    }

    /// While set, every trait method fails with `StoreError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        self.check_available()?;
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.check_available()?;
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn get_pending_users(&self) -> StoreResult<Vec<PendingUser>> {
        self.check_available()?;
        let mut pending: Vec<User> = self
            .users
            .read()
            .await
            .values()
            .filter(|u| u.needs_approval && !u.is_approved)
            .cloned()
            .collect();
        pending.sort_by_key(|u| u.created_at);
        Ok(pending.into_iter().map(PendingUser::from).collect())
    }

    async fn approve_pending_user(
        &self,
        id: Uuid,
        approved_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        self.check_available()?;
        match self.users.write().await.get_mut(&id) {
            Some(user) if user.approval_state() == ApprovalState::Pending => {
                user.is_approved = true;
                user.approved_at = Some(approved_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn reject_pending_user(&self, id: Uuid) -> StoreResult<bool> {
        self.check_available()?;
        {
            let mut users = self.users.write().await;
            let pending = users
                .get(&id)
                .is_some_and(|u| u.approval_state() == ApprovalState::Pending);
            if !pending {
                return Ok(false);
            }
            users.remove(&id);
        }
        for rule in self.rules.write().await.values_mut() {
            if rule.created_by == Some(id) {
                rule.created_by = None;
            }
        }
        Ok(true)
    }

    async fn get_active_rules(&self) -> StoreResult<Vec<Rule>> {
        self.check_available()?;
        let mut rules: Vec<Rule> = self
            .rules
            .read()
            .await
            .values()
            .filter(|r| r.status == RuleStatus::Active)
            .cloned()
            .collect();
        rules.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rules)
    }

    async fn create_rule(&self, rule: NewRule, created_by: Option<Uuid>) -> StoreResult<Rule> {
        self.check_available()?;
        let mut rules = self.rules.write().await;
        if rules.values().any(|r| r.section == rule.section) {
            return Err(StoreError::DuplicateSection(rule.section));
        }
        let now = Utc::now();
        let created = Rule {
            id: Uuid::new_v4(),
            section: rule.section,
            provision: rule.provision,
            fine: rule.fine,
            points: rule.points,
            status: rule.status,
            created_by,
            created_at: now,
            updated_at: now,
        };
        rules.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_rule(&self, id: Uuid, req: UpdateRuleRequest) -> StoreResult<Option<Rule>> {
        self.check_available()?;
        let mut rules = self.rules.write().await;
        let Some(rule) = rules.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(provision) = req.provision {
            rule.provision = provision;
        }
        if let Some(fine) = req.fine {
            rule.fine = fine;
        }
        if let Some(points) = req.points {
            rule.points = points;
        }
        if let Some(status) = req.status {
            rule.status = status;
        }
        rule.updated_at = Utc::now();
        Ok(Some(rule.clone()))
    }

    async fn delete_rule(&self, id: Uuid) -> StoreResult<bool> {
        self.check_available()?;
        Ok(self.rules.write().await.remove(&id).is_some())
    }
}
