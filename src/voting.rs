use crate::db::models::Vote;
use crate::error::{ApiError, StoreError};
use crate::notify::{VoteInserted, VoteNotifier};
use crate::session;
use crate::startup::AppState;
use crate::store::Store;
use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tower_sessions::Session;
use uuid::Uuid;

const BALLOT_KEY: &str = "ballot";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VoteStatus {
    #[default]
    NotVoted,
    Submitting,
    Voted,
    Error,
}

/// Per-session voting state: current selections, per-election status and
/// the votes this session knows about. Advisory only; the store's
/// uniqueness constraint decides what is accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ballot {
    selected: HashMap<Uuid, Uuid>,
    status: HashMap<Uuid, VoteStatus>,
    my_votes: HashMap<Uuid, Uuid>,
}

impl Ballot {
    pub async fn load(session: &Session) -> Result<Self, ApiError> {
        Ok(session.get::<Ballot>(BALLOT_KEY).await?.unwrap_or_default())
    }

    pub async fn save(&self, session: &Session) -> Result<(), ApiError> {
        session.insert(BALLOT_KEY, self).await?;
        Ok(())
    }

    pub fn select(&mut self, election_id: Uuid, option_id: Uuid) {
        self.selected.insert(election_id, option_id);
    }

    pub fn selection(&self, election_id: Uuid) -> Option<Uuid> {
        self.selected.get(&election_id).copied()
    }

    pub fn status(&self, election_id: Uuid) -> VoteStatus {
        if self.my_votes.contains_key(&election_id) {
            return VoteStatus::Voted;
        }
        self.status.get(&election_id).copied().unwrap_or_default()
    }

    pub fn my_vote(&self, election_id: Uuid) -> Option<Uuid> {
        self.my_votes.get(&election_id).copied()
    }

    /// Moves to `submitting` and hands back the option to submit.
    pub fn begin_submit(&mut self, election_id: Uuid) -> Result<Uuid, ApiError> {
        let option_id = self
            .selection(election_id)
            .ok_or(ApiError::NoOptionSelected)?;
        self.status.insert(election_id, VoteStatus::Submitting);
        Ok(option_id)
    }

    pub fn record_success(&mut self, vote: &Vote) {
        self.status.insert(vote.election_id, VoteStatus::Voted);
        self.my_votes.insert(vote.election_id, vote.option_id);
    }

    /// A failed submit needs a fresh selection before it may be retried.
    pub fn record_failure(&mut self, election_id: Uuid) {
        self.status.insert(election_id, VoteStatus::Error);
        self.selected.remove(&election_id);
    }

    /// Replaces "my votes" with what the store holds.
    pub fn sync_votes(&mut self, votes: &[Vote]) {
        self.my_votes = votes
            .iter()
            .map(|v| (v.election_id, v.option_id))
            .collect();
    }
}

/// Records one vote. The option must belong to the election; a second vote
/// for the same election is refused by the store and reported verbatim.
pub async fn cast_vote(
    store: &dyn Store,
    notifier: &VoteNotifier,
    user_id: Uuid,
    election_id: Uuid,
    option_id: Uuid,
) -> Result<Vote, ApiError> {
    store
        .get_option(option_id)
        .await?
        .filter(|o| o.election_id == election_id)
        .ok_or(ApiError::NotFound("Option"))?;

    match store.insert_vote(user_id, election_id, option_id).await {
        Ok(vote) => {
            notifier.publish(VoteInserted {
                user_id,
                election_id,
                option_id,
            });
            Ok(vote)
        }
        Err(StoreError::UniqueViolation(msg)) => Err(ApiError::AlreadyVoted(msg)),
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug, Deserialize)]
pub struct SelectOptionRequest {
    pub option_id: Uuid,
}

#[derive(Debug, Default, Deserialize)]
pub struct CastVoteRequest {
    pub option_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub success: bool,
    pub message: String,
    pub vote: Vote,
}

pub async fn select_option(
    session: Session,
    Path(election_id): Path<Uuid>,
    Json(payload): Json<SelectOptionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut ballot = Ballot::load(&session).await?;
    ballot.select(election_id, payload.option_id);
    ballot.save(&session).await?;

    Ok(Json(serde_json::json!({
        "election_id": election_id,
        "option_id": payload.option_id,
        "status": ballot.status(election_id),
    })))
}

/// Submits the caller's vote for one election.
pub async fn vote(
    Extension(app_state): Extension<AppState>,
    session: Session,
    Path(election_id): Path<Uuid>,
    payload: Option<Json<CastVoteRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    // Checked before anything touches the ballot.
    let user_id = session::current_user(&session)
        .await?
        .ok_or(ApiError::LoginToVote)?;

    let mut ballot = Ballot::load(&session).await?;
    if let Some(option_id) = payload.and_then(|Json(p)| p.option_id) {
        ballot.select(election_id, option_id);
    }
    let option_id = match ballot.begin_submit(election_id) {
        Ok(option_id) => option_id,
        Err(e) => {
            ballot.save(&session).await?;
            return Err(e);
        }
    };
    ballot.save(&session).await?;

    let result = cast_vote(
        app_state.store.as_ref(),
        &app_state.notifier,
        user_id,
        election_id,
        option_id,
    )
    .await;

    match result {
        Ok(vote) => {
            ballot.record_success(&vote);
            ballot.save(&session).await?;
            info!("vote recorded: user={} election={}", user_id, election_id);
            Ok((
                StatusCode::OK,
                Json(VoteResponse {
                    success: true,
                    message: "Vote recorded successfully".to_string(),
                    vote,
                }),
            ))
        }
        Err(e) => {
            warn!("vote by {} in {} failed: {}", user_id, election_id, e);
            ballot.record_failure(election_id);
            ballot.save(&session).await?;
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{NewElection, NewOption, NewProfile};
    use crate::store::MemoryStore;
    use chrono::Utc;

    struct Fixture {
        store: MemoryStore,
        notifier: VoteNotifier,
        user: Uuid,
        election: Uuid,
        option: Uuid,
        other_election_option: Uuid,
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let user = store
            .create_profile(&NewProfile {
                email: "joao@example.com".to_string(),
                full_name: Some("João".to_string()),
                password_hash: "x".to_string(),
            })
            .await
            .unwrap()
            .id;
        let now = Utc::now();
        let mut ids = Vec::new();
        for name in ["Caso A", "Caso B"] {
            let election = store
                .create_election(&NewElection {
                    name: name.to_string(),
                    description: None,
                    starts_at: now,
                    ends_at: now + chrono::Duration::days(1),
                })
                .await
                .unwrap();
            let option = store
                .create_option(&NewOption {
                    election_id: election.id,
                    label: "Condenar".to_string(),
                    value: "condenar".to_string(),
                    display_order: Some(1),
                })
                .await
                .unwrap();
            ids.push((election.id, option.id));
        }
        Fixture {
            store,
            notifier: VoteNotifier::default(),
            user,
            election: ids[0].0,
            option: ids[0].1,
            other_election_option: ids[1].1,
        }
    }

    #[test]
    fn submit_requires_a_selection() {
        let mut ballot = Ballot::default();
        let election = Uuid::new_v4();
        assert!(matches!(
            ballot.begin_submit(election),
            Err(ApiError::NoOptionSelected)
        ));
        assert_eq!(ballot.status(election), VoteStatus::NotVoted);
    }

    #[test]
    fn ballot_walks_submitting_then_voted() {
        let mut ballot = Ballot::default();
        let election = Uuid::new_v4();
        let option = Uuid::new_v4();
        ballot.select(election, option);

        assert_eq!(ballot.begin_submit(election).unwrap(), option);
        assert_eq!(ballot.status(election), VoteStatus::Submitting);

        ballot.record_success(&Vote {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            election_id: election,
            option_id: option,
            created_at: Utc::now(),
        });
        assert_eq!(ballot.status(election), VoteStatus::Voted);
        assert_eq!(ballot.my_vote(election), Some(option));
    }

    #[test]
    fn failure_requires_reselection_before_retry() {
        let mut ballot = Ballot::default();
        let election = Uuid::new_v4();
        let option = Uuid::new_v4();
        ballot.select(election, option);
        ballot.begin_submit(election).unwrap();
        ballot.record_failure(election);

        assert_eq!(ballot.status(election), VoteStatus::Error);
        assert!(matches!(
            ballot.begin_submit(election),
            Err(ApiError::NoOptionSelected)
        ));

        ballot.select(election, option);
        assert_eq!(ballot.begin_submit(election).unwrap(), option);
    }

    #[test]
    fn ballot_survives_session_serialization() {
        let mut ballot = Ballot::default();
        let election = Uuid::new_v4();
        ballot.select(election, Uuid::new_v4());
        ballot.record_failure(Uuid::new_v4());

        let value = serde_json::to_value(&ballot).unwrap();
        let back: Ballot = serde_json::from_value(value).unwrap();
        assert_eq!(back.selection(election), ballot.selection(election));
    }

    #[tokio::test]
    async fn cast_vote_publishes_and_refuses_a_second_vote() {
        let f = fixture().await;
        let mut sub = f.notifier.subscribe(f.user);

        cast_vote(&f.store, &f.notifier, f.user, f.election, f.option)
            .await
            .unwrap();
        assert!(sub.next().await.is_some());

        let err = cast_vote(&f.store, &f.notifier, f.user, f.election, f.option)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::AlreadyVoted(ref msg) if msg.contains("duplicate key")));
        assert_eq!(f.store.count_votes_for_user(f.user).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn option_from_another_election_is_rejected() {
        let f = fixture().await;
        let err = cast_vote(
            &f.store,
            &f.notifier,
            f.user,
            f.election,
            f.other_election_option,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert_eq!(f.store.count_votes_for_user(f.user).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn store_failure_is_surfaced_verbatim() {
        let f = fixture().await;
        f.store.set_failure(Some("network unreachable")).await;
        let err = cast_vote(&f.store, &f.notifier, f.user, f.election, f.option)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "network unreachable");
    }
}
