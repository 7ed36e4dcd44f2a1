use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

const PG_UNIQUE_VIOLATION: &str = "23505";
const PG_FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0}")]
    UniqueViolation(String),
    #[error("{0}")]
    ForeignKeyViolation(String),
    #[error("row not found")]
    NotFound,
    #[error("{0}")]
    Database(String),
}

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Mercado Pago access token not configured")]
    NotConfigured,
    #[error("Mercado Pago API error: {0}")]
    Api(u16),
    #[error("Mercado Pago request failed: {0}")]
    Transport(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Everything a request can fail with. The client treats the message as an
/// opaque string to display.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Log in to continue")]
    LoginRequired,
    #[error("Log in to vote")]
    LoginToVote,
    #[error("Invalid login credentials")]
    InvalidCredentials,
    #[error("Access denied. Administrators only.")]
    AdminOnly,
    #[error("{0}")]
    Validation(String),
    #[error("Select an option to vote")]
    NoOptionSelected,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    AlreadyVoted(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Store(String),
    #[error("{0}")]
    Payment(String),
    #[error("session error: {0}")]
    Session(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::LoginRequired | ApiError::LoginToVote | ApiError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::AdminOnly => StatusCode::FORBIDDEN,
            ApiError::Validation(_) | ApiError::NoOptionSelected => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::AlreadyVoted(_) | ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Store(_) | ApiError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Payment(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match &self {
            ApiError::LoginRequired | ApiError::LoginToVote => "Login required",
            ApiError::InvalidCredentials => "Unauthorized",
            ApiError::AdminOnly => "Forbidden",
            ApiError::Validation(_) | ApiError::NoOptionSelected => "Invalid request",
            ApiError::NotFound(_) => "Not found",
            ApiError::AlreadyVoted(_) => "Already voted",
            ApiError::Conflict(_) => "Conflict",
            ApiError::Store(_) => "Database error",
            ApiError::Payment(_) => "Payment error",
            ApiError::Session(_) => "Session error",
        };

        let body = Json(json!({
            "error": error_message,
            "details": self.to_string()
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db) => match db.code().as_deref() {
                Some(PG_UNIQUE_VIOLATION) => StoreError::UniqueViolation(db.message().to_string()),
                Some(PG_FOREIGN_KEY_VIOLATION) => {
                    StoreError::ForeignKeyViolation(db.message().to_string())
                }
                _ => StoreError::Database(db.message().to_string()),
            },
            _ => StoreError::Database(error.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound => ApiError::NotFound("record"),
            StoreError::UniqueViolation(msg) => ApiError::Conflict(msg),
            other => ApiError::Store(other.to_string()),
        }
    }
}

impl From<PaymentError> for ApiError {
    fn from(error: PaymentError) -> Self {
        ApiError::Payment(error.to_string())
    }
}

impl From<tower_sessions::session::Error> for ApiError {
    fn from(error: tower_sessions::session::Error) -> Self {
        ApiError::Session(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_vote_is_a_conflict_carrying_the_store_message() {
        let err = ApiError::AlreadyVoted("duplicate key value".to_string());
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.to_string(), "duplicate key value");
    }

    #[test]
    fn unique_violation_from_store_maps_to_conflict() {
        let err: ApiError = StoreError::UniqueViolation("dup".to_string()).into();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        let err: ApiError = StoreError::Database("boom".to_string()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn auth_errors_have_distinct_statuses() {
        assert_eq!(ApiError::LoginRequired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::LoginToVote.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::LoginToVote.to_string(), "Log in to vote");
        assert_eq!(ApiError::AdminOnly.status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::NoOptionSelected.status(), StatusCode::BAD_REQUEST);
    }
}
