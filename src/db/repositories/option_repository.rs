use crate::db::connection::DbPool;
use crate::db::models::{ElectionOption, NewOption, OptionWithElection};
use sqlx::{Error, Row};
use uuid::Uuid;

pub async fn add_option(pool: &DbPool, option: &NewOption) -> Result<ElectionOption, Error> {
    let option_id = Uuid::new_v4();

    sqlx::query_as::<_, ElectionOption>(
        "INSERT INTO election_options (id, election_id, label, value, display_order) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING id, election_id, label, value, display_order",
    )
    .bind(option_id)
    .bind(option.election_id)
    .bind(&option.label)
    .bind(&option.value)
    .bind(option.display_order)
    .fetch_one(pool)
    .await
}

pub async fn update_option(
    pool: &DbPool,
    option_id: Uuid,
    option: &NewOption,
) -> Result<Option<ElectionOption>, Error> {
    sqlx::query_as::<_, ElectionOption>(
        "UPDATE election_options SET election_id = $2, label = $3, value = $4, display_order = $5 \
         WHERE id = $1 \
         RETURNING id, election_id, label, value, display_order",
    )
    .bind(option_id)
    .bind(option.election_id)
    .bind(&option.label)
    .bind(&option.value)
    .bind(option.display_order)
    .fetch_optional(pool)
    .await
}

pub async fn delete_option(pool: &DbPool, option_id: Uuid) -> Result<bool, Error> {
    let result = sqlx::query("DELETE FROM election_options WHERE id = $1")
        .bind(option_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn get_option(pool: &DbPool, option_id: Uuid) -> Result<Option<ElectionOption>, Error> {
    sqlx::query_as::<_, ElectionOption>(
        "SELECT id, election_id, label, value, display_order FROM election_options WHERE id = $1",
    )
    .bind(option_id)
    .fetch_optional(pool)
    .await
}

pub async fn get_options_for_elections(
    pool: &DbPool,
    election_ids: &[Uuid],
) -> Result<Vec<ElectionOption>, Error> {
    sqlx::query_as::<_, ElectionOption>(
        "SELECT id, election_id, label, value, display_order FROM election_options \
         WHERE election_id = ANY($1)",
    )
    .bind(election_ids)
    .fetch_all(pool)
    .await
}

pub async fn get_all_options(pool: &DbPool) -> Result<Vec<OptionWithElection>, Error> {
    let rows = sqlx::query(
        "SELECT o.id, o.election_id, o.label, o.value, o.display_order, e.name AS election_name \
         FROM election_options o \
         INNER JOIN elections e ON e.id = o.election_id \
         ORDER BY o.display_order NULLS FIRST",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| OptionWithElection {
            option: ElectionOption {
                id: r.get("id"),
                election_id: r.get("election_id"),
                label: r.get("label"),
                value: r.get("value"),
                display_order: r.get("display_order"),
            },
            election_name: r.get("election_name"),
        })
        .collect())
}
