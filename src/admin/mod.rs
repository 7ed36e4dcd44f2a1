//! Management endpoints. Every handler takes an `AdminUser`, so non-admins
//! are turned away before any store access.

pub mod elections;
pub mod options;
pub mod payments;
pub mod users;

use crate::error::ApiError;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct DeleteParams {
    #[serde(default)]
    pub confirm: bool,
}

impl DeleteParams {
    pub fn require_confirmation(&self) -> Result<(), ApiError> {
        if self.confirm {
            Ok(())
        } else {
            Err(ApiError::Validation(
                "Confirm the deletion with confirm=true".to_string(),
            ))
        }
    }
}

fn required(value: &str, field: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}
