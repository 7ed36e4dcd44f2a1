use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Election {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Election {
    /// Open iff `now` falls inside `[starts_at, ends_at]`.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.starts_at <= now && now <= self.ends_at
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ElectionOption {
    pub id: Uuid,
    pub election_id: Uuid,
    pub label: String,
    pub value: String,
    pub display_order: Option<i32>,
}

/// Option row joined with the name of its election, for the admin table.
#[derive(Debug, Clone, Serialize)]
pub struct OptionWithElection {
    #[serde(flatten)]
    pub option: ElectionOption,
    pub election_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Vote {
    pub id: Uuid,
    pub user_id: Uuid,
    pub election_id: Uuid,
    pub option_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
        }
    }

    /// Only a pending payment may settle, and only once.
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        matches!(
            (self, next),
            (PaymentStatus::Pending, PaymentStatus::Completed)
                | (PaymentStatus::Pending, PaymentStatus::Failed)
        )
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "completed" => Ok(PaymentStatus::Completed),
            "failed" => Ok(PaymentStatus::Failed),
            other => Err(format!("unknown payment status: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PixPayment {
    pub id: Uuid,
    pub amount_cents: i64,
    pub status: PaymentStatus,
    pub qr_code: String,
    pub user_id: Uuid,
    pub vote_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

// Write-side inputs.

#[derive(Debug, Clone)]
pub struct NewElection {
    pub name: String,
    pub description: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOption {
    pub election_id: Uuid,
    pub label: String,
    pub value: String,
    pub display_order: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct NewProfile {
    pub email: String,
    pub full_name: Option<String>,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub amount_cents: i64,
    pub qr_code: String,
    pub user_id: Uuid,
    pub vote_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OptionTally {
    pub option_id: Uuid,
    pub votes: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn election_window_is_inclusive() {
        let now = Utc::now();
        let election = Election {
            id: Uuid::new_v4(),
            name: "Caso 1".to_string(),
            description: None,
            starts_at: now,
            ends_at: now + Duration::hours(1),
            created_at: now,
        };
        assert!(election.is_open(now));
        assert!(election.is_open(now + Duration::hours(1)));
        assert!(!election.is_open(now - Duration::seconds(1)));
        assert!(!election.is_open(now + Duration::hours(2)));
    }

    #[test]
    fn payment_settles_only_from_pending() {
        assert!(PaymentStatus::Pending.can_transition_to(PaymentStatus::Completed));
        assert!(PaymentStatus::Pending.can_transition_to(PaymentStatus::Failed));
        assert!(!PaymentStatus::Completed.can_transition_to(PaymentStatus::Failed));
        assert!(!PaymentStatus::Failed.can_transition_to(PaymentStatus::Pending));
        assert!(!PaymentStatus::Pending.can_transition_to(PaymentStatus::Pending));
    }

    #[test]
    fn role_parses_and_defaults_to_user() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert!("root".parse::<Role>().is_err());
        assert_eq!(Role::default(), Role::User);
    }
}
