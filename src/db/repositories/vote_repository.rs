use crate::db::connection::DbPool;
use crate::db::models::{OptionTally, Vote};
use sqlx::{Error, Row};
use uuid::Uuid;

/// Inserts one vote row. A second vote by the same user in the same election
/// fails on the `UNIQUE(user_id, election_id)` constraint; nothing is
/// overwritten.
pub async fn cast_vote(
    pool: &DbPool,
    user_id: Uuid,
    election_id: Uuid,
    option_id: Uuid,
) -> Result<Vote, Error> {
    let vote_id = Uuid::new_v4();

    sqlx::query_as::<_, Vote>(
        "INSERT INTO votes (id, user_id, election_id, option_id) VALUES ($1, $2, $3, $4) \
         RETURNING id, user_id, election_id, option_id, created_at",
    )
    .bind(vote_id)
    .bind(user_id)
    .bind(election_id)
    .bind(option_id)
    .fetch_one(pool)
    .await
}

pub async fn get_user_votes(pool: &DbPool, user_id: Uuid) -> Result<Vec<Vote>, Error> {
    sqlx::query_as::<_, Vote>(
        "SELECT id, user_id, election_id, option_id, created_at FROM votes \
         WHERE user_id = $1 ORDER BY created_at",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn count_user_votes(pool: &DbPool, user_id: Uuid) -> Result<i64, Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM votes WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
}

pub async fn tally_election(pool: &DbPool, election_id: Uuid) -> Result<Vec<OptionTally>, Error> {
    let rows = sqlx::query(
        "SELECT o.id AS option_id, COUNT(v.id) AS votes \
         FROM election_options o \
         LEFT JOIN votes v ON v.option_id = o.id \
         WHERE o.election_id = $1 \
         GROUP BY o.id, o.display_order \
         ORDER BY o.display_order NULLS FIRST",
    )
    .bind(election_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| OptionTally {
            option_id: r.get("option_id"),
            votes: r.get("votes"),
        })
        .collect())
}
