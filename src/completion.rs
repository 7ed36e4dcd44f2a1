use crate::error::ApiError;
use crate::payments::{PROMPTED_KEY, PaymentPrompt};
use crate::session::AuthUser;
use crate::startup::AppState;
use crate::store::{Store, StoreResult};
use axum::{
    Json,
    extract::Extension,
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::stream::Stream;
use serde::Serialize;
use serde_json::json;
use std::{convert::Infallible, time::Duration};
use tower_sessions::Session;
use uuid::Uuid;

/// How far one identity is through the full set of elections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Completion {
    pub total_elections: i64,
    pub user_votes_count: i64,
    /// Whole percent, 0 when there are no elections.
    pub progress: u32,
    pub has_completed_all_votes: bool,
}

impl Completion {
    pub fn compute(total_elections: i64, user_votes_count: i64) -> Self {
        let progress = if total_elections > 0 {
            (user_votes_count as f64 / total_elections as f64 * 100.0).round() as u32
        } else {
            0
        };

        Completion {
            total_elections,
            user_votes_count,
            progress,
            has_completed_all_votes: total_elections > 0 && user_votes_count == total_elections,
        }
    }
}

/// Counts every election, open or not, against the identity's votes.
pub async fn check(store: &dyn Store, user_id: Uuid) -> StoreResult<Completion> {
    let total = store.count_elections().await?;
    let votes = store.count_votes_for_user(user_id).await?;
    Ok(Completion::compute(total, votes))
}

pub async fn completion_snapshot(
    Extension(app_state): Extension<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let completion = check(app_state.store.as_ref(), user.id)
        .await
        .map_err(|e| {
            error!("completion check for {} failed: {}", user.id, e);
            ApiError::from(e)
        })?;
    Ok(Json(completion))
}

async fn mark_prompted(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.insert(PROMPTED_KEY, true).await?;
    session.save().await
}

/// Live completion for the caller: one `completion` event now and one after
/// each of the caller's vote inserts, plus a single `payment_prompt` when
/// completion first turns true. The prompt is recorded in the session, so a
/// reconnecting stream does not repeat it. The vote subscription lives as
/// long as the connection.
pub async fn completion_events(
    Extension(app_state): Extension<AppState>,
    session: Session,
    user: AuthUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let already_prompted = session
        .get::<bool>(PROMPTED_KEY)
        .await
        .ok()
        .flatten()
        .unwrap_or(false);
    let mut subscription = app_state.notifier.subscribe(user.id);
    let store = app_state.store.clone();

    let stream = async_stream::stream! {
        let mut prompt = PaymentPrompt::new(already_prompted);
        loop {
            match check(store.as_ref(), user.id).await {
                Ok(completion) => {
                    yield Ok(Event::default()
                        .event("completion")
                        .data(json!(completion).to_string()));
                    if prompt.observe(&completion) {
                        // The response is already streaming, so the session
                        // layer will not persist this for us.
                        if let Err(e) = mark_prompted(&session).await {
                            error!("failed to persist payment prompt for {}: {}", user.id, e);
                        }
                        yield Ok(Event::default()
                            .event("payment_prompt")
                            .data(json!({"user_id": user.id}).to_string()));
                    }
                }
                Err(e) => {
                    error!("completion check for {} failed: {}", user.id, e);
                    yield Ok(Event::default()
                        .event("error")
                        .data(json!({"error": e.to_string()}).to_string()));
                }
            }

            if subscription.next().await.is_none() {
                break;
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("keep-alive"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{NewElection, NewOption, NewProfile};
    use crate::store::MemoryStore;
    use chrono::Utc;

    #[test]
    fn progress_is_zero_without_elections() {
        let c = Completion::compute(0, 0);
        assert_eq!(c.progress, 0);
        assert!(!c.has_completed_all_votes);
    }

    #[test]
    fn progress_rounds_to_whole_percent() {
        for total in 1..=12i64 {
            for votes in 0..=total {
                let expected = (votes as f64 / total as f64 * 100.0).round() as u32;
                assert_eq!(Completion::compute(total, votes).progress, expected);
            }
        }
        assert_eq!(Completion::compute(3, 1).progress, 33);
        assert_eq!(Completion::compute(3, 2).progress, 67);
    }

    #[test]
    fn completion_follows_the_dynamic_total() {
        assert!(Completion::compute(5, 5).has_completed_all_votes);
        assert!(Completion::compute(7, 7).has_completed_all_votes);
        assert!(!Completion::compute(7, 5).has_completed_all_votes);
        assert!(!Completion::compute(0, 0).has_completed_all_votes);
    }

    #[tokio::test]
    async fn check_counts_all_elections_including_closed_ones() {
        let store = MemoryStore::new();
        let user = store
            .create_profile(&NewProfile {
                email: "a@example.com".to_string(),
                full_name: None,
                password_hash: "x".to_string(),
            })
            .await
            .unwrap()
            .id;
        let now = Utc::now();
        let open = store
            .create_election(&NewElection {
                name: "aberta".to_string(),
                description: None,
                starts_at: now - chrono::Duration::hours(1),
                ends_at: now + chrono::Duration::hours(1),
            })
            .await
            .unwrap();
        store
            .create_election(&NewElection {
                name: "encerrada".to_string(),
                description: None,
                starts_at: now - chrono::Duration::days(3),
                ends_at: now - chrono::Duration::days(2),
            })
            .await
            .unwrap();
        let option = store
            .create_option(&NewOption {
                election_id: open.id,
                label: "Absolver".to_string(),
                value: "absolver".to_string(),
                display_order: None,
            })
            .await
            .unwrap();
        store.insert_vote(user, open.id, option.id).await.unwrap();

        let c = check(&store, user).await.unwrap();
        assert_eq!(c.total_elections, 2);
        assert_eq!(c.user_votes_count, 1);
        assert_eq!(c.progress, 50);
        assert!(!c.has_completed_all_votes);
    }
}
