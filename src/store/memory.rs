use super::{Store, StoreResult};
use crate::db::models::{
    Election, ElectionOption, NewElection, NewOption, NewPayment, NewProfile, OptionTally,
    OptionWithElection, PaymentStatus, PixPayment, Profile, Role, Vote,
};
use crate::error::StoreError;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    profiles: Vec<Profile>,
    roles: HashMap<Uuid, Role>,
    elections: Vec<Election>,
    options: Vec<ElectionOption>,
    votes: Vec<Vote>,
    payments: Vec<PixPayment>,
    failure: Option<String>,
    failing_operations: HashMap<&'static str, String>,
}

/// In-process store. Every operation runs under one lock, so the vote
/// uniqueness check and insert are atomic just like the Postgres constraint.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following operation fail with `message`; `None` heals it.
    pub async fn set_failure(&self, message: Option<&str>) {
        self.tables.lock().await.failure = message.map(str::to_string);
    }

    /// Makes only `operation` fail with `message`, leaving the rest healthy.
    pub async fn fail_operation(&self, operation: &'static str, message: &str) {
        self.tables
            .lock()
            .await
            .failing_operations
            .insert(operation, message.to_string());
    }

    async fn tables(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        let tables = self.tables.lock().await;
        match &tables.failure {
            Some(message) => Err(StoreError::Database(message.clone())),
            None => Ok(tables),
        }
    }

    async fn tables_for(&self, operation: &str) -> StoreResult<MutexGuard<'_, Tables>> {
        let tables = self.tables().await?;
        match tables.failing_operations.get(operation) {
            Some(message) => Err(StoreError::Database(message.clone())),
            None => Ok(tables),
        }
    }
}

impl Tables {
    fn check_profile(&self, user_id: Uuid, constraint: &str) -> StoreResult<()> {
        if self.profiles.iter().any(|p| p.id == user_id) {
            Ok(())
        } else {
            Err(StoreError::ForeignKeyViolation(format!(
                "insert or update violates foreign key constraint \"{constraint}\""
            )))
        }
    }

    fn check_election(&self, election_id: Uuid, constraint: &str) -> StoreResult<()> {
        if self.elections.iter().any(|e| e.id == election_id) {
            Ok(())
        } else {
            Err(StoreError::ForeignKeyViolation(format!(
                "insert or update violates foreign key constraint \"{constraint}\""
            )))
        }
    }

    /// Drops the matching votes; payments that referenced them keep a null
    /// vote, as `ON DELETE SET NULL` does.
    fn delete_votes_where(&mut self, matches: impl Fn(&Vote) -> bool) {
        let removed: Vec<Uuid> = self
            .votes
            .iter()
            .filter(|v| matches(v))
            .map(|v| v.id)
            .collect();
        self.votes.retain(|v| !matches(v));
        for payment in &mut self.payments {
            if payment.vote_id.is_some_and(|id| removed.contains(&id)) {
                payment.vote_id = None;
            }
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_profile(&self, profile: &NewProfile) -> StoreResult<Profile> {
        let mut tables = self.tables().await?;
        if tables.profiles.iter().any(|p| p.email == profile.email) {
            return Err(StoreError::UniqueViolation(
                "duplicate key value violates unique constraint \"profiles_email_key\"".to_string(),
            ));
        }
        let created = Profile {
            id: Uuid::new_v4(),
            email: profile.email.clone(),
            full_name: profile.full_name.clone(),
            password_hash: profile.password_hash.clone(),
            created_at: Utc::now(),
        };
        tables.profiles.push(created.clone());
        Ok(created)
    }

    async fn get_profile(&self, user_id: Uuid) -> StoreResult<Option<Profile>> {
        let tables = self.tables().await?;
        Ok(tables.profiles.iter().find(|p| p.id == user_id).cloned())
    }

    async fn get_profile_by_email(&self, email: &str) -> StoreResult<Option<Profile>> {
        let tables = self.tables().await?;
        Ok(tables.profiles.iter().find(|p| p.email == email).cloned())
    }

    async fn list_profiles(&self) -> StoreResult<Vec<Profile>> {
        Ok(self.tables().await?.profiles.clone())
    }

    async fn get_role(&self, user_id: Uuid) -> StoreResult<Option<Role>> {
        Ok(self.tables().await?.roles.get(&user_id).copied())
    }

    async fn list_roles(&self) -> StoreResult<Vec<(Uuid, Role)>> {
        let tables = self.tables_for("list_roles").await?;
        Ok(tables.roles.iter().map(|(id, role)| (*id, *role)).collect())
    }

    async fn upsert_role(&self, user_id: Uuid, role: Role) -> StoreResult<()> {
        let mut tables = self.tables().await?;
        tables.check_profile(user_id, "user_roles_user_id_fkey")?;
        tables.roles.insert(user_id, role);
        Ok(())
    }

    async fn list_elections(&self) -> StoreResult<Vec<Election>> {
        let tables = self.tables().await?;
        Ok(tables.elections.iter().rev().cloned().collect())
    }

    async fn get_election(&self, election_id: Uuid) -> StoreResult<Option<Election>> {
        let tables = self.tables().await?;
        Ok(tables.elections.iter().find(|e| e.id == election_id).cloned())
    }

    async fn create_election(&self, election: &NewElection) -> StoreResult<Election> {
        let mut tables = self.tables().await?;
        let created = Election {
            id: Uuid::new_v4(),
            name: election.name.clone(),
            description: election.description.clone(),
            starts_at: election.starts_at,
            ends_at: election.ends_at,
            created_at: Utc::now(),
        };
        tables.elections.push(created.clone());
        Ok(created)
    }

    async fn update_election(
        &self,
        election_id: Uuid,
        election: &NewElection,
    ) -> StoreResult<Option<Election>> {
        let mut tables = self.tables().await?;
        Ok(tables
            .elections
            .iter_mut()
            .find(|e| e.id == election_id)
            .map(|existing| {
                existing.name = election.name.clone();
                existing.description = election.description.clone();
                existing.starts_at = election.starts_at;
                existing.ends_at = election.ends_at;
                existing.clone()
            }))
    }

    async fn delete_election(&self, election_id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables().await?;
        let before = tables.elections.len();
        tables.elections.retain(|e| e.id != election_id);
        if tables.elections.len() == before {
            return Ok(false);
        }
        tables.options.retain(|o| o.election_id != election_id);
        tables.delete_votes_where(|v| v.election_id == election_id);
        Ok(true)
    }

    async fn count_elections(&self) -> StoreResult<i64> {
        Ok(self.tables().await?.elections.len() as i64)
    }

    async fn options_for_elections(
        &self,
        election_ids: &[Uuid],
    ) -> StoreResult<Vec<ElectionOption>> {
        let tables = self.tables().await?;
        Ok(tables
            .options
            .iter()
            .filter(|o| election_ids.contains(&o.election_id))
            .cloned()
            .collect())
    }

    async fn list_options(&self) -> StoreResult<Vec<OptionWithElection>> {
        let tables = self.tables().await?;
        let mut rows: Vec<OptionWithElection> = tables
            .options
            .iter()
            .filter_map(|o| {
                let election = tables.elections.iter().find(|e| e.id == o.election_id)?;
                Some(OptionWithElection {
                    option: o.clone(),
                    election_name: election.name.clone(),
                })
            })
            .collect();
        // NULLS FIRST, like the Postgres query
        rows.sort_by_key(|r| r.option.display_order);
        Ok(rows)
    }

    async fn get_option(&self, option_id: Uuid) -> StoreResult<Option<ElectionOption>> {
        let tables = self.tables().await?;
        Ok(tables.options.iter().find(|o| o.id == option_id).cloned())
    }

    async fn create_option(&self, option: &NewOption) -> StoreResult<ElectionOption> {
        let mut tables = self.tables().await?;
        tables.check_election(option.election_id, "election_options_election_id_fkey")?;
        let created = ElectionOption {
            id: Uuid::new_v4(),
            election_id: option.election_id,
            label: option.label.clone(),
            value: option.value.clone(),
            display_order: option.display_order,
        };
        tables.options.push(created.clone());
        Ok(created)
    }

    async fn update_option(
        &self,
        option_id: Uuid,
        option: &NewOption,
    ) -> StoreResult<Option<ElectionOption>> {
        let mut tables = self.tables().await?;
        tables.check_election(option.election_id, "election_options_election_id_fkey")?;
        Ok(tables
            .options
            .iter_mut()
            .find(|o| o.id == option_id)
            .map(|existing| {
                existing.election_id = option.election_id;
                existing.label = option.label.clone();
                existing.value = option.value.clone();
                existing.display_order = option.display_order;
                existing.clone()
            }))
    }

    async fn delete_option(&self, option_id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables().await?;
        let before = tables.options.len();
        tables.options.retain(|o| o.id != option_id);
        if tables.options.len() == before {
            return Ok(false);
        }
        tables.delete_votes_where(|v| v.option_id == option_id);
        Ok(true)
    }

    async fn insert_vote(
        &self,
        user_id: Uuid,
        election_id: Uuid,
        option_id: Uuid,
    ) -> StoreResult<Vote> {
        let mut tables = self.tables().await?;
        tables.check_profile(user_id, "votes_user_id_fkey")?;
        tables.check_election(election_id, "votes_election_id_fkey")?;
        if !tables.options.iter().any(|o| o.id == option_id) {
            return Err(StoreError::ForeignKeyViolation(
                "insert or update violates foreign key constraint \"votes_option_id_fkey\""
                    .to_string(),
            ));
        }
        if tables
            .votes
            .iter()
            .any(|v| v.user_id == user_id && v.election_id == election_id)
        {
            return Err(StoreError::UniqueViolation(
                "duplicate key value violates unique constraint \"votes_user_id_election_id_key\""
                    .to_string(),
            ));
        }
        let vote = Vote {
            id: Uuid::new_v4(),
            user_id,
            election_id,
            option_id,
            created_at: Utc::now(),
        };
        tables.votes.push(vote.clone());
        Ok(vote)
    }

    async fn votes_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Vote>> {
        let tables = self.tables().await?;
        Ok(tables
            .votes
            .iter()
            .filter(|v| v.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn count_votes_for_user(&self, user_id: Uuid) -> StoreResult<i64> {
        let tables = self.tables().await?;
        Ok(tables.votes.iter().filter(|v| v.user_id == user_id).count() as i64)
    }

    async fn tally_election(&self, election_id: Uuid) -> StoreResult<Vec<OptionTally>> {
        let tables = self.tables().await?;
        let mut options: Vec<&ElectionOption> = tables
            .options
            .iter()
            .filter(|o| o.election_id == election_id)
            .collect();
        options.sort_by_key(|o| o.display_order);
        Ok(options
            .into_iter()
            .map(|o| OptionTally {
                option_id: o.id,
                votes: tables.votes.iter().filter(|v| v.option_id == o.id).count() as i64,
            })
            .collect())
    }

    async fn create_payment(&self, payment: &NewPayment) -> StoreResult<PixPayment> {
        let mut tables = self.tables_for("create_payment").await?;
        tables.check_profile(payment.user_id, "pix_payments_user_id_fkey")?;
        let created = PixPayment {
            id: Uuid::new_v4(),
            amount_cents: payment.amount_cents,
            status: PaymentStatus::Pending,
            qr_code: payment.qr_code.clone(),
            user_id: payment.user_id,
            vote_id: payment.vote_id,
            created_at: Utc::now(),
        };
        tables.payments.push(created.clone());
        Ok(created)
    }

    async fn get_payment(&self, payment_id: Uuid) -> StoreResult<Option<PixPayment>> {
        let tables = self.tables().await?;
        Ok(tables.payments.iter().find(|p| p.id == payment_id).cloned())
    }

    async fn list_payments(&self) -> StoreResult<Vec<PixPayment>> {
        let tables = self.tables().await?;
        Ok(tables.payments.iter().rev().cloned().collect())
    }

    async fn settle_payment(
        &self,
        payment_id: Uuid,
        status: PaymentStatus,
    ) -> StoreResult<Option<PixPayment>> {
        let mut tables = self.tables().await?;
        Ok(tables
            .payments
            .iter_mut()
            .find(|p| p.id == payment_id && p.status == PaymentStatus::Pending)
            .map(|p| {
                p.status = status;
                p.clone()
            }))
    }
}
