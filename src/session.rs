//! Who is calling. The session moves through anonymous -> established (login
//! or signup, id cycled, data cleared) -> invalidated (logout, flushed);
//! everything else reads it through `current_user` or the extractors below.

use crate::db::models::Role;
use crate::error::ApiError;
use crate::startup::AppState;
use crate::store::Store;
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;
use uuid::Uuid;

const USER_ID_KEY: &str = "user_id";

pub async fn current_user(session: &Session) -> Result<Option<Uuid>, ApiError> {
    Ok(session.get::<Uuid>(USER_ID_KEY).await?)
}

/// Starts a fresh identity on this session: new id, and nothing left over
/// from whoever was logged in before (ballot, prompt flag).
pub async fn establish(session: &Session, user_id: Uuid) -> Result<(), ApiError> {
    session.cycle_id().await?;
    session.clear().await;
    session.insert(USER_ID_KEY, user_id).await?;
    Ok(())
}

pub async fn invalidate(session: &Session) -> Result<(), ApiError> {
    session.flush().await?;
    Ok(())
}

/// Role of `user_id`; a missing row and a failed lookup both mean `user`.
pub async fn role_of(store: &dyn Store, user_id: Uuid) -> Role {
    match store.get_role(user_id).await {
        Ok(Some(role)) => role,
        Ok(None) => Role::User,
        Err(e) => {
            warn!("role lookup for {} failed, defaulting to user: {}", user_id, e);
            Role::User
        }
    }
}

pub async fn display_name(store: &dyn Store, user_id: Uuid) -> Option<String> {
    match store.get_profile(user_id).await {
        Ok(profile) => profile.and_then(|p| p.full_name),
        Err(e) => {
            warn!("profile lookup for {} failed: {}", user_id, e);
            None
        }
    }
}

async fn session_from_parts<S: Send + Sync>(
    parts: &mut Parts,
    state: &S,
) -> Result<Session, ApiError> {
    Session::from_request_parts(parts, state)
        .await
        .map_err(|(_, msg)| ApiError::Session(msg.to_string()))
}

/// An authenticated caller. Rejects with 401 otherwise.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: Uuid,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = session_from_parts(parts, state).await?;
        let id = current_user(&session)
            .await?
            .ok_or(ApiError::LoginRequired)?;
        Ok(AuthUser { id })
    }
}

/// An authenticated caller holding the admin role. 401 without a session,
/// 403 for everyone else.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser {
    pub id: Uuid,
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser { id } = AuthUser::from_request_parts(parts, state).await?;
        let app_state = parts
            .extensions
            .get::<AppState>()
            .cloned()
            .ok_or_else(|| ApiError::Session("application state missing".to_string()))?;

        if role_of(app_state.store.as_ref(), id).await != Role::Admin {
            warn!("non-admin {} denied admin access", id);
            return Err(ApiError::AdminOnly);
        }
        Ok(AdminUser { id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::NewProfile;
    use crate::store::MemoryStore;

    async fn profile(store: &MemoryStore, name: Option<&str>) -> Uuid {
        store
            .create_profile(&NewProfile {
                email: format!("{}@example.com", Uuid::new_v4()),
                full_name: name.map(str::to_string),
                password_hash: "x".to_string(),
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn role_defaults_to_user_without_a_row() {
        let store = MemoryStore::new();
        let user = profile(&store, None).await;
        assert_eq!(role_of(&store, user).await, Role::User);

        store.upsert_role(user, Role::Admin).await.unwrap();
        assert_eq!(role_of(&store, user).await, Role::Admin);
    }

    #[tokio::test]
    async fn role_defaults_to_user_when_lookup_fails() {
        let store = MemoryStore::new();
        let user = profile(&store, None).await;
        store.upsert_role(user, Role::Admin).await.unwrap();
        store.set_failure(Some("timeout")).await;
        assert_eq!(role_of(&store, user).await, Role::User);
    }

    #[tokio::test]
    async fn display_name_reads_the_profile() {
        let store = MemoryStore::new();
        let named = profile(&store, Some("Maria")).await;
        let unnamed = profile(&store, None).await;
        assert_eq!(display_name(&store, named).await.as_deref(), Some("Maria"));
        assert_eq!(display_name(&store, unnamed).await, None);
        assert_eq!(display_name(&store, Uuid::new_v4()).await, None);
    }
}
