use crate::db::models::Role;
use crate::error::ApiError;
use crate::session::AdminUser;
use crate::startup::AppState;
use axum::{
    Json,
    extract::{Extension, Path},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub role: Role,
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub total: usize,
    pub admins: usize,
    pub users: usize,
}

impl UserSummary {
    pub fn of(rows: &[UserRow]) -> Self {
        let admins = rows.iter().filter(|r| r.role == Role::Admin).count();
        UserSummary {
            total: rows.len(),
            admins,
            users: rows.len() - admins,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: Role,
}

/// Profiles joined with their role; users without a role row are `user`.
pub async fn list(
    Extension(app_state): Extension<AppState>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, ApiError> {
    let store = app_state.store.as_ref();
    let profiles = store.list_profiles().await?;
    let roles: HashMap<Uuid, Role> = store.list_roles().await?.into_iter().collect();

    let rows: Vec<UserRow> = profiles
        .into_iter()
        .map(|p| UserRow {
            role: roles.get(&p.id).copied().unwrap_or_default(),
            id: p.id,
            email: p.email,
            full_name: p.full_name,
            created_at: p.created_at,
        })
        .collect();
    let summary = UserSummary::of(&rows);

    Ok(Json(serde_json::json!({
        "users": rows,
        "summary": summary,
    })))
}

pub async fn set_role(
    Extension(app_state): Extension<AppState>,
    admin: AdminUser,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<SetRoleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let store = app_state.store.as_ref();
    store
        .get_profile(user_id)
        .await?
        .ok_or(ApiError::NotFound("User"))?;
    store.upsert_role(user_id, payload.role).await?;
    info!("role of {} set to {} by {}", user_id, payload.role, admin.id);

    Ok(Json(serde_json::json!({
        "user_id": user_id,
        "role": payload.role,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(role: Role) -> UserRow {
        UserRow {
            id: Uuid::new_v4(),
            email: "x@example.com".to_string(),
            full_name: None,
            created_at: Utc::now(),
            role,
        }
    }

    #[test]
    fn summary_counts_roles() {
        let rows = vec![row(Role::Admin), row(Role::User), row(Role::User)];
        assert_eq!(
            UserSummary::of(&rows),
            UserSummary {
                total: 3,
                admins: 1,
                users: 2
            }
        );
        assert_eq!(UserSummary::of(&[]), UserSummary::default());
    }
}
