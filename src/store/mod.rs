//! Persistence seam. Handlers talk to `dyn Store`; `PgStore` backs it with
//! Postgres and `MemoryStore` with in-process tables carrying the same
//! uniqueness and reference rules.

use crate::db::models::{
    Election, ElectionOption, NewElection, NewOption, NewPayment, NewProfile, OptionTally,
    OptionWithElection, PaymentStatus, PixPayment, Profile, Role, Vote,
};
use crate::error::StoreError;
use async_trait::async_trait;
use uuid::Uuid;

mod memory;
mod pg;

pub use memory::MemoryStore;
pub use pg::PgStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync + 'static {
    // profiles and roles
    async fn create_profile(&self, profile: &NewProfile) -> StoreResult<Profile>;
    async fn get_profile(&self, user_id: Uuid) -> StoreResult<Option<Profile>>;
    async fn get_profile_by_email(&self, email: &str) -> StoreResult<Option<Profile>>;
    async fn list_profiles(&self) -> StoreResult<Vec<Profile>>;
    async fn get_role(&self, user_id: Uuid) -> StoreResult<Option<Role>>;
    async fn list_roles(&self) -> StoreResult<Vec<(Uuid, Role)>>;
    async fn upsert_role(&self, user_id: Uuid, role: Role) -> StoreResult<()>;

    // elections
    async fn list_elections(&self) -> StoreResult<Vec<Election>>;
    async fn get_election(&self, election_id: Uuid) -> StoreResult<Option<Election>>;
    async fn create_election(&self, election: &NewElection) -> StoreResult<Election>;
    async fn update_election(
        &self,
        election_id: Uuid,
        election: &NewElection,
    ) -> StoreResult<Option<Election>>;
    async fn delete_election(&self, election_id: Uuid) -> StoreResult<bool>;
    async fn count_elections(&self) -> StoreResult<i64>;

    // options
    async fn options_for_elections(&self, election_ids: &[Uuid])
    -> StoreResult<Vec<ElectionOption>>;
    async fn list_options(&self) -> StoreResult<Vec<OptionWithElection>>;
    async fn get_option(&self, option_id: Uuid) -> StoreResult<Option<ElectionOption>>;
    async fn create_option(&self, option: &NewOption) -> StoreResult<ElectionOption>;
    async fn update_option(
        &self,
        option_id: Uuid,
        option: &NewOption,
    ) -> StoreResult<Option<ElectionOption>>;
    async fn delete_option(&self, option_id: Uuid) -> StoreResult<bool>;

    // votes
    async fn insert_vote(
        &self,
        user_id: Uuid,
        election_id: Uuid,
        option_id: Uuid,
    ) -> StoreResult<Vote>;
    async fn votes_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Vote>>;
    async fn count_votes_for_user(&self, user_id: Uuid) -> StoreResult<i64>;
    async fn tally_election(&self, election_id: Uuid) -> StoreResult<Vec<OptionTally>>;

    // payments
    async fn create_payment(&self, payment: &NewPayment) -> StoreResult<PixPayment>;
    async fn get_payment(&self, payment_id: Uuid) -> StoreResult<Option<PixPayment>>;
    async fn list_payments(&self) -> StoreResult<Vec<PixPayment>>;
    async fn settle_payment(
        &self,
        payment_id: Uuid,
        status: PaymentStatus,
    ) -> StoreResult<Option<PixPayment>>;
}
