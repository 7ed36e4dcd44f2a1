use crate::db::connection::DbPool;
use crate::db::models::{NewProfile, Profile, Role};
use sqlx::postgres::PgRow;
use sqlx::{Error, Row};
use uuid::Uuid;

fn profile_from_row(r: &PgRow) -> Profile {
    Profile {
        id: r.get("id"),
        email: r.get("email"),
        full_name: r.get("full_name"),
        password_hash: r.get("password_hash"),
        created_at: r.get("created_at"),
    }
}

pub async fn create_profile(pool: &DbPool, profile: &NewProfile) -> Result<Profile, Error> {
    let user_id = Uuid::new_v4();

    let row = sqlx::query(
        "INSERT INTO profiles (id, email, full_name, password_hash) VALUES ($1, $2, $3, $4) \
         RETURNING id, email, full_name, password_hash, created_at",
    )
    .bind(user_id)
    .bind(&profile.email)
    .bind(profile.full_name.as_deref())
    .bind(&profile.password_hash)
    .fetch_one(pool)
    .await?;

    Ok(profile_from_row(&row))
}

pub async fn get_profile(pool: &DbPool, user_id: Uuid) -> Result<Option<Profile>, Error> {
    let row = sqlx::query(
        "SELECT id, email, full_name, password_hash, created_at FROM profiles WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(profile_from_row))
}

pub async fn get_profile_by_email(pool: &DbPool, email: &str) -> Result<Option<Profile>, Error> {
    let row = sqlx::query(
        "SELECT id, email, full_name, password_hash, created_at FROM profiles WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(profile_from_row))
}

pub async fn get_all_profiles(pool: &DbPool) -> Result<Vec<Profile>, Error> {
    let rows = sqlx::query(
        "SELECT id, email, full_name, password_hash, created_at FROM profiles ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(profile_from_row).collect())
}

pub async fn get_role(pool: &DbPool, user_id: Uuid) -> Result<Option<Role>, Error> {
    let row = sqlx::query("SELECT role FROM user_roles WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    row.map(|r| {
        let role: String = r.get("role");
        role.parse::<Role>().map_err(|e| Error::Decode(e.into()))
    })
    .transpose()
}

pub async fn get_all_roles(pool: &DbPool) -> Result<Vec<(Uuid, Role)>, Error> {
    let rows = sqlx::query("SELECT user_id, role FROM user_roles")
        .fetch_all(pool)
        .await?;

    rows.into_iter()
        .map(|r| {
            let role: String = r.get("role");
            let role = role.parse::<Role>().map_err(|e| Error::Decode(e.into()))?;
            let user_id: Uuid = r.get("user_id");
            Ok((user_id, role))
        })
        .collect()
}

/// Insert-or-update in one statement, so concurrent role changes cannot both
/// take the insert path.
pub async fn upsert_role(pool: &DbPool, user_id: Uuid, role: Role) -> Result<(), Error> {
    sqlx::query(
        "INSERT INTO user_roles (user_id, role) VALUES ($1, $2) \
         ON CONFLICT (user_id) DO UPDATE SET role = EXCLUDED.role",
    )
    .bind(user_id)
    .bind(role.as_str())
    .execute(pool)
    .await?;

    Ok(())
}
