use super::{Store, StoreResult};
use crate::db::connection::{DbPool, get_pool_stats, init_db};
use crate::db::models::{
    Election, ElectionOption, NewElection, NewOption, NewPayment, NewProfile, OptionTally,
    OptionWithElection, PaymentStatus, PixPayment, Profile, Role, Vote,
};
use crate::db::repositories as repo;
use async_trait::async_trait;
use tokio::time::{Duration, interval};
use uuid::Uuid;

#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    /// Connects, creates the schema and starts the periodic health check.
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = init_db(database_url).await?;

        let pool_clone = pool.clone();
        tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                match pool_clone.acquire().await {
                    Ok(conn) => {
                        drop(conn);
                        debug!("{}", get_pool_stats(&pool_clone).await);
                    }
                    Err(e) => {
                        error!("Database connection health check failed: {}", e);
                    }
                }
            }
        });

        Ok(PgStore { pool })
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_profile(&self, profile: &NewProfile) -> StoreResult<Profile> {
        Ok(repo::create_profile(&self.pool, profile).await?)
    }

    async fn get_profile(&self, user_id: Uuid) -> StoreResult<Option<Profile>> {
        Ok(repo::get_profile(&self.pool, user_id).await?)
    }

    async fn get_profile_by_email(&self, email: &str) -> StoreResult<Option<Profile>> {
        Ok(repo::get_profile_by_email(&self.pool, email).await?)
    }

    async fn list_profiles(&self) -> StoreResult<Vec<Profile>> {
        Ok(repo::get_all_profiles(&self.pool).await?)
    }

    async fn get_role(&self, user_id: Uuid) -> StoreResult<Option<Role>> {
        Ok(repo::get_role(&self.pool, user_id).await?)
    }

    async fn list_roles(&self) -> StoreResult<Vec<(Uuid, Role)>> {
        Ok(repo::get_all_roles(&self.pool).await?)
    }

    async fn upsert_role(&self, user_id: Uuid, role: Role) -> StoreResult<()> {
        Ok(repo::upsert_role(&self.pool, user_id, role).await?)
    }

    async fn list_elections(&self) -> StoreResult<Vec<Election>> {
        Ok(repo::get_all_elections(&self.pool).await?)
    }

    async fn get_election(&self, election_id: Uuid) -> StoreResult<Option<Election>> {
        Ok(repo::get_election(&self.pool, election_id).await?)
    }

    async fn create_election(&self, election: &NewElection) -> StoreResult<Election> {
        Ok(repo::create_election(&self.pool, election).await?)
    }

    async fn update_election(
        &self,
        election_id: Uuid,
        election: &NewElection,
    ) -> StoreResult<Option<Election>> {
        Ok(repo::update_election(&self.pool, election_id, election).await?)
    }

    async fn delete_election(&self, election_id: Uuid) -> StoreResult<bool> {
        Ok(repo::delete_election(&self.pool, election_id).await?)
    }

    async fn count_elections(&self) -> StoreResult<i64> {
        Ok(repo::count_elections(&self.pool).await?)
    }

    async fn options_for_elections(
        &self,
        election_ids: &[Uuid],
    ) -> StoreResult<Vec<ElectionOption>> {
        Ok(repo::get_options_for_elections(&self.pool, election_ids).await?)
    }

    async fn list_options(&self) -> StoreResult<Vec<OptionWithElection>> {
        Ok(repo::get_all_options(&self.pool).await?)
    }

    async fn get_option(&self, option_id: Uuid) -> StoreResult<Option<ElectionOption>> {
        Ok(repo::get_option(&self.pool, option_id).await?)
    }

    async fn create_option(&self, option: &NewOption) -> StoreResult<ElectionOption> {
        Ok(repo::add_option(&self.pool, option).await?)
    }

    async fn update_option(
        &self,
        option_id: Uuid,
        option: &NewOption,
    ) -> StoreResult<Option<ElectionOption>> {
        Ok(repo::update_option(&self.pool, option_id, option).await?)
    }

    async fn delete_option(&self, option_id: Uuid) -> StoreResult<bool> {
        Ok(repo::delete_option(&self.pool, option_id).await?)
    }

    async fn insert_vote(
        &self,
        user_id: Uuid,
        election_id: Uuid,
        option_id: Uuid,
    ) -> StoreResult<Vote> {
        Ok(repo::cast_vote(&self.pool, user_id, election_id, option_id).await?)
    }

    async fn votes_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Vote>> {
        Ok(repo::get_user_votes(&self.pool, user_id).await?)
    }

    async fn count_votes_for_user(&self, user_id: Uuid) -> StoreResult<i64> {
        Ok(repo::count_user_votes(&self.pool, user_id).await?)
    }

    async fn tally_election(&self, election_id: Uuid) -> StoreResult<Vec<OptionTally>> {
        Ok(repo::tally_election(&self.pool, election_id).await?)
    }

    async fn create_payment(&self, payment: &NewPayment) -> StoreResult<PixPayment> {
        Ok(repo::create_payment(&self.pool, payment).await?)
    }

    async fn get_payment(&self, payment_id: Uuid) -> StoreResult<Option<PixPayment>> {
        Ok(repo::get_payment(&self.pool, payment_id).await?)
    }

    async fn list_payments(&self) -> StoreResult<Vec<PixPayment>> {
        Ok(repo::get_all_payments(&self.pool).await?)
    }

    async fn settle_payment(
        &self,
        payment_id: Uuid,
        status: PaymentStatus,
    ) -> StoreResult<Option<PixPayment>> {
        Ok(repo::settle_payment(&self.pool, payment_id, status).await?)
    }
}
