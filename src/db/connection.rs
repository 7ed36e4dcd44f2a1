use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;

pub type DbPool = Pool<Postgres>;

pub async fn init_db(database_url: &str) -> Result<DbPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .max_lifetime(Duration::from_secs(30 * 60))
        .idle_timeout(Duration::from_secs(10 * 60))
        .connect(database_url)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS profiles (
            id UUID PRIMARY KEY,
            email VARCHAR(255) NOT NULL UNIQUE,
            full_name TEXT,
            password_hash TEXT NOT NULL,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_roles (
            user_id UUID PRIMARY KEY REFERENCES profiles(id) ON DELETE CASCADE,
            role VARCHAR(16) NOT NULL CHECK (role IN ('admin', 'user'))
        )
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS elections (
            id UUID PRIMARY KEY,
            name VARCHAR(255) NOT NULL,
            description TEXT,
            starts_at TIMESTAMP WITH TIME ZONE NOT NULL,
            ends_at TIMESTAMP WITH TIME ZONE NOT NULL,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS election_options (
            id UUID PRIMARY KEY,
            election_id UUID NOT NULL REFERENCES elections(id) ON DELETE CASCADE,
            label VARCHAR(255) NOT NULL,
            value VARCHAR(255) NOT NULL,
            display_order INT
        )
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS votes (
            id UUID PRIMARY KEY,
            user_id UUID NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            election_id UUID NOT NULL REFERENCES elections(id) ON DELETE CASCADE,
            option_id UUID NOT NULL REFERENCES election_options(id) ON DELETE CASCADE,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(user_id, election_id)
        )
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pix_payments (
            id UUID PRIMARY KEY,
            amount_cents BIGINT NOT NULL,
            status VARCHAR(16) NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'completed', 'failed')),
            qr_code TEXT NOT NULL,
            user_id UUID NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            vote_id UUID REFERENCES votes(id) ON DELETE SET NULL,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_election_options_election_id ON election_options(election_id)
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_votes_user_id ON votes(user_id)
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_pix_payments_user_id ON pix_payments(user_id)
        "#,
    )
    .execute(&pool)
    .await?;

    Ok(pool)
}

pub async fn get_pool_stats(pool: &DbPool) -> String {
    let size = pool.size() as usize;
    let num_idle = pool.num_idle();
    format!(
        "Pool stats: size={}, idle={}, in_use={}",
        size,
        num_idle,
        size.saturating_sub(num_idle)
    )
}
