use crate::db::models::{NewProfile, Role};
use crate::error::{ApiError, StoreError};
use crate::session::{self, display_name, role_of};
use crate::startup::AppState;
use axum::{
    extract::{Extension, Json},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_sessions::Session;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub authenticated: bool,
    pub user_id: Option<Uuid>,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<Role>,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_signup(payload: &SignupRequest) -> Result<(), ApiError> {
    let email = normalize_email(&payload.email);
    if email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::Validation(
            "Email and password are required".to_string(),
        ));
    }
    if !email.contains('@') {
        return Err(ApiError::Validation("Invalid email address".to_string()));
    }
    if payload.password.len() < 6 {
        return Err(ApiError::Validation(
            "Password must be at least 6 characters".to_string(),
        ));
    }
    Ok(())
}

async fn hash_password(password: String, cost: u32) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| ApiError::Session(e.to_string()))?
        .map_err(|e| ApiError::Session(e.to_string()))
}

async fn verify_password(password: String, hash: String) -> bool {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
        .await
        .unwrap_or(false)
}

pub async fn signup(
    Extension(app_state): Extension<AppState>,
    session: Session,
    Json(payload): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_signup(&payload)?;

    let password_hash = hash_password(payload.password, app_state.config.bcrypt_cost).await?;
    let full_name = payload
        .full_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    let profile = app_state
        .store
        .create_profile(&NewProfile {
            email: normalize_email(&payload.email),
            full_name,
            password_hash,
        })
        .await
        .map_err(|e| match e {
            StoreError::UniqueViolation(_) => {
                ApiError::Conflict("Email already registered".to_string())
            }
            other => other.into(),
        })?;

    session::establish(&session, profile.id).await?;
    info!("Registration successful for {}", profile.id);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "message": "Registration successful",
            "user_id": profile.id,
        })),
    ))
}

pub async fn login(
    Extension(app_state): Extension<AppState>,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = normalize_email(&payload.email);
    if email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::Validation(
            "Email and password are required".to_string(),
        ));
    }

    let profile = app_state
        .store
        .get_profile_by_email(&email)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    if !verify_password(payload.password, profile.password_hash.clone()).await {
        warn!("failed login for {}", profile.id);
        return Err(ApiError::InvalidCredentials);
    }

    session::establish(&session, profile.id).await?;
    info!("Authentication successful for {}", profile.id);

    Ok((
        StatusCode::OK,
        Json(json!({
            "status": "success",
            "message": "Authentication successful",
            "user_id": profile.id,
        })),
    ))
}

pub async fn logout(session: Session) -> Result<impl IntoResponse, ApiError> {
    session::invalidate(&session).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Identity, display name and role of the caller in one response.
pub async fn session_info(
    Extension(app_state): Extension<AppState>,
    session: Session,
) -> Result<impl IntoResponse, ApiError> {
    let Some(user_id) = session::current_user(&session).await? else {
        return Ok(Json(SessionInfo {
            authenticated: false,
            user_id: None,
            email: None,
            full_name: None,
            role: None,
        }));
    };

    let store = app_state.store.as_ref();
    let email = store.get_profile(user_id).await.ok().flatten().map(|p| p.email);

    Ok(Json(SessionInfo {
        authenticated: true,
        user_id: Some(user_id),
        email,
        full_name: display_name(store, user_id).await,
        role: Some(role_of(store, user_id).await),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup_request(email: &str, password: &str) -> SignupRequest {
        SignupRequest {
            email: email.to_string(),
            password: password.to_string(),
            full_name: None,
        }
    }

    #[test]
    fn signup_requires_email_and_password() {
        assert!(validate_signup(&signup_request("", "secret1")).is_err());
        assert!(validate_signup(&signup_request("a@b.com", "")).is_err());
        assert!(validate_signup(&signup_request("not-an-email", "secret1")).is_err());
        assert!(validate_signup(&signup_request("a@b.com", "123")).is_err());
        assert!(validate_signup(&signup_request(" A@B.com ", "secret1")).is_ok());
    }

    #[test]
    fn emails_are_compared_case_insensitively() {
        assert_eq!(normalize_email("  Ana@Example.COM "), "ana@example.com");
    }

    #[tokio::test]
    async fn password_hash_round_trip() {
        let hash = hash_password("segredo".to_string(), 4).await.unwrap();
        assert!(verify_password("segredo".to_string(), hash.clone()).await);
        assert!(!verify_password("errado".to_string(), hash).await);
    }
}
