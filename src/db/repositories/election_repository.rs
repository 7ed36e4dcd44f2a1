use crate::db::connection::DbPool;
use crate::db::models::{Election, NewElection};
use sqlx::Error;
use uuid::Uuid;

pub async fn create_election(pool: &DbPool, election: &NewElection) -> Result<Election, Error> {
    let election_id = Uuid::new_v4();

    sqlx::query_as::<_, Election>(
        "INSERT INTO elections (id, name, description, starts_at, ends_at) \
         VALUES ($1, $2, $3, $4, $5) RETURNING id, name, description, starts_at, ends_at, created_at",
    )
    .bind(election_id)
    .bind(&election.name)
    .bind(election.description.as_deref())
    .bind(election.starts_at)
    .bind(election.ends_at)
    .fetch_one(pool)
    .await
}

pub async fn update_election(
    pool: &DbPool,
    election_id: Uuid,
    election: &NewElection,
) -> Result<Option<Election>, Error> {
    sqlx::query_as::<_, Election>(
        "UPDATE elections SET name = $2, description = $3, starts_at = $4, ends_at = $5 \
         WHERE id = $1 RETURNING id, name, description, starts_at, ends_at, created_at",
    )
    .bind(election_id)
    .bind(&election.name)
    .bind(election.description.as_deref())
    .bind(election.starts_at)
    .bind(election.ends_at)
    .fetch_optional(pool)
    .await
}

pub async fn delete_election(pool: &DbPool, election_id: Uuid) -> Result<bool, Error> {
    let result = sqlx::query("DELETE FROM elections WHERE id = $1")
        .bind(election_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn get_election(pool: &DbPool, election_id: Uuid) -> Result<Option<Election>, Error> {
    sqlx::query_as::<_, Election>(
        "SELECT id, name, description, starts_at, ends_at, created_at FROM elections WHERE id = $1",
    )
    .bind(election_id)
    .fetch_optional(pool)
    .await
}

pub async fn get_all_elections(pool: &DbPool) -> Result<Vec<Election>, Error> {
    sqlx::query_as::<_, Election>(
        "SELECT id, name, description, starts_at, ends_at, created_at FROM elections \
         ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await
}

pub async fn count_elections(pool: &DbPool) -> Result<i64, Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM elections")
        .fetch_one(pool)
        .await
}
