use super::{DeleteParams, required};
use crate::db::models::NewElection;
use crate::error::ApiError;
use crate::session::AdminUser;
use crate::startup::AppState;
use axum::{
    Json,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct ElectionForm {
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub starts_at: String,
    #[serde(default)]
    pub ends_at: String,
}

/// Accepts RFC 3339 or a bare `YYYY-MM-DDTHH:MM[:SS]` taken as UTC.
fn parse_timestamp(value: &str, field: &str) -> Result<DateTime<Utc>, ApiError> {
    let value = required(value, field)?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(&value) {
        return Ok(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&value, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ApiError::Validation(format!("{field} is not a valid date and time")))
}

impl ElectionForm {
    pub fn validate(self) -> Result<NewElection, ApiError> {
        let name = required(&self.name, "name")?;
        let starts_at = parse_timestamp(&self.starts_at, "starts_at")?;
        let ends_at = parse_timestamp(&self.ends_at, "ends_at")?;
        if ends_at < starts_at {
            return Err(ApiError::Validation(
                "ends_at must not be before starts_at".to_string(),
            ));
        }
        Ok(NewElection {
            name,
            description: self
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            starts_at,
            ends_at,
        })
    }
}

pub async fn list(
    Extension(app_state): Extension<AppState>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, ApiError> {
    let elections = app_state.store.list_elections().await?;
    Ok(Json(elections))
}

pub async fn create(
    Extension(app_state): Extension<AppState>,
    admin: AdminUser,
    Json(form): Json<ElectionForm>,
) -> Result<impl IntoResponse, ApiError> {
    let election = app_state.store.create_election(&form.validate()?).await?;
    info!("election {} created by {}", election.id, admin.id);
    Ok((StatusCode::CREATED, Json(election)))
}

pub async fn update(
    Extension(app_state): Extension<AppState>,
    admin: AdminUser,
    Path(election_id): Path<Uuid>,
    Json(form): Json<ElectionForm>,
) -> Result<impl IntoResponse, ApiError> {
    let election = app_state
        .store
        .update_election(election_id, &form.validate()?)
        .await?
        .ok_or(ApiError::NotFound("Election"))?;
    info!("election {} updated by {}", election.id, admin.id);
    Ok(Json(election))
}

pub async fn delete(
    Extension(app_state): Extension<AppState>,
    admin: AdminUser,
    Path(election_id): Path<Uuid>,
    Query(params): Query<DeleteParams>,
) -> Result<impl IntoResponse, ApiError> {
    params.require_confirmation()?;
    if !app_state.store.delete_election(election_id).await? {
        return Err(ApiError::NotFound("Election"));
    }
    info!("election {} deleted by {}", election_id, admin.id);
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct OptionResult {
    pub option_id: Uuid,
    pub label: String,
    pub votes: i64,
}

/// Per-option vote counts for one election.
pub async fn results(
    Extension(app_state): Extension<AppState>,
    _admin: AdminUser,
    Path(election_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let store = app_state.store.as_ref();
    let election = store
        .get_election(election_id)
        .await?
        .ok_or(ApiError::NotFound("Election"))?;
    let options = store.options_for_elections(&[election_id]).await?;
    let tally = store.tally_election(election_id).await?;

    let results: Vec<OptionResult> = tally
        .into_iter()
        .map(|t| OptionResult {
            option_id: t.option_id,
            label: options
                .iter()
                .find(|o| o.id == t.option_id)
                .map(|o| o.label.clone())
                .unwrap_or_default(),
            votes: t.votes,
        })
        .collect();
    let total_votes: i64 = results.iter().map(|r| r.votes).sum();

    Ok(Json(serde_json::json!({
        "election": election,
        "options": results,
        "total_votes": total_votes,
    })))
}
