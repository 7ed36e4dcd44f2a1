use super::{DeleteParams, required};
use crate::db::models::NewOption;
use crate::error::{ApiError, StoreError};
use crate::session::AdminUser;
use crate::startup::AppState;
use axum::{
    Json,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct OptionForm {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub value: String,
    pub election_id: Option<Uuid>,
    pub display_order: Option<i32>,
}

impl OptionForm {
    pub fn validate(self) -> Result<NewOption, ApiError> {
        let label = required(&self.label, "label")?;
        let value = required(&self.value, "value")?;
        let election_id = self
            .election_id
            .ok_or_else(|| ApiError::Validation("election_id is required".to_string()))?;
        Ok(NewOption {
            election_id,
            label,
            value,
            display_order: self.display_order,
        })
    }
}

fn unknown_election(e: StoreError) -> ApiError {
    match e {
        StoreError::ForeignKeyViolation(_) => ApiError::NotFound("Election"),
        other => other.into(),
    }
}

pub async fn list(
    Extension(app_state): Extension<AppState>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(app_state.store.list_options().await?))
}

pub async fn create(
    Extension(app_state): Extension<AppState>,
    admin: AdminUser,
    Json(form): Json<OptionForm>,
) -> Result<impl IntoResponse, ApiError> {
    let option = app_state
        .store
        .create_option(&form.validate()?)
        .await
        .map_err(unknown_election)?;
    info!("option {} created by {}", option.id, admin.id);
    Ok((StatusCode::CREATED, Json(option)))
}

pub async fn update(
    Extension(app_state): Extension<AppState>,
    admin: AdminUser,
    Path(option_id): Path<Uuid>,
    Json(form): Json<OptionForm>,
) -> Result<impl IntoResponse, ApiError> {
    let option = app_state
        .store
        .update_option(option_id, &form.validate()?)
        .await
        .map_err(unknown_election)?
        .ok_or(ApiError::NotFound("Option"))?;
    info!("option {} updated by {}", option.id, admin.id);
    Ok(Json(option))
}

pub async fn delete(
    Extension(app_state): Extension<AppState>,
    admin: AdminUser,
    Path(option_id): Path<Uuid>,
    Query(params): Query<DeleteParams>,
) -> Result<impl IntoResponse, ApiError> {
    params.require_confirmation()?;
    if !app_state.store.delete_option(option_id).await? {
        return Err(ApiError::NotFound("Option"));
    }
    info!("option {} deleted by {}", option_id, admin.id);
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_value_and_election_are_required() {
        let election_id = Some(Uuid::new_v4());
        let ok = OptionForm {
            label: " Condenar ".to_string(),
            value: "condenar".to_string(),
            election_id,
            display_order: None,
        };
        let option = ok.validate().unwrap();
        assert_eq!(option.label, "Condenar");
        assert_eq!(option.display_order, None);

        assert!(
            OptionForm {
                label: String::new(),
                value: "x".to_string(),
                election_id,
                display_order: Some(1),
            }
            .validate()
            .is_err()
        );
        assert!(
            OptionForm {
                label: "x".to_string(),
                value: "x".to_string(),
                election_id: None,
                display_order: Some(1),
            }
            .validate()
            .is_err()
        );
    }

    #[test]
    fn missing_election_reads_as_not_found() {
        let err = unknown_election(StoreError::ForeignKeyViolation("fk".to_string()));
        assert!(matches!(err, ApiError::NotFound("Election")));
    }
}
