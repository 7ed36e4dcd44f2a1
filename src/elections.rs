use crate::db::models::{Election, ElectionOption};
use crate::error::ApiError;
use crate::session;
use crate::startup::AppState;
use crate::store::{Store, StoreResult};
use crate::voting::{Ballot, VoteStatus};
use axum::{
    Json,
    extract::{Extension, Query},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tower_sessions::Session;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ListingFilter {
    #[serde(default)]
    pub open: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ElectionListing {
    pub elections: Vec<Election>,
    pub options: HashMap<Uuid, Vec<ElectionOption>>,
}

/// Groups options by election, each group ordered by display order with
/// unset orders counted as 0. Ties keep their fetch order.
pub fn group_options(options: Vec<ElectionOption>) -> HashMap<Uuid, Vec<ElectionOption>> {
    let mut grouped: HashMap<Uuid, Vec<ElectionOption>> = HashMap::new();
    for option in options {
        grouped.entry(option.election_id).or_default().push(option);
    }
    for group in grouped.values_mut() {
        group.sort_by_key(|o| o.display_order.unwrap_or(0));
    }
    grouped
}

pub async fn load_listing(
    store: &dyn Store,
    open_only: bool,
    now: DateTime<Utc>,
) -> StoreResult<ElectionListing> {
    let mut elections = store.list_elections().await?;
    if open_only {
        elections.retain(|e| e.is_open(now));
    }
    if elections.is_empty() {
        return Ok(ElectionListing::default());
    }

    let ids: Vec<Uuid> = elections.iter().map(|e| e.id).collect();
    let options = store.options_for_elections(&ids).await?;

    Ok(ElectionListing {
        elections,
        options: group_options(options),
    })
}

#[derive(Debug, Serialize)]
pub struct ElectionView {
    #[serde(flatten)]
    pub election: Election,
    pub is_open: bool,
    pub options: Vec<ElectionOption>,
    pub selected_option: Option<Uuid>,
    pub my_vote: Option<Uuid>,
    pub status: VoteStatus,
}

pub async fn list_elections(
    Extension(app_state): Extension<AppState>,
    session: Session,
    Query(filter): Query<ListingFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let ElectionListing {
        elections,
        mut options,
    } = load_listing(app_state.store.as_ref(), filter.open, now)
        .await
        .map_err(|e| {
            error!("failed to load elections: {}", e);
            ApiError::from(e)
        })?;

    let mut ballot = Ballot::load(&session).await?;
    if let Some(user_id) = session::current_user(&session).await? {
        let votes = app_state.store.votes_for_user(user_id).await?;
        ballot.sync_votes(&votes);
        ballot.save(&session).await?;
    }

    let views: Vec<ElectionView> = elections
        .into_iter()
        .map(|election| ElectionView {
            is_open: election.is_open(now),
            options: options.remove(&election.id).unwrap_or_default(),
            selected_option: ballot.selection(election.id),
            my_vote: ballot.my_vote(election.id),
            status: ballot.status(election.id),
            election,
        })
        .collect();

    Ok(Json(views))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{NewElection, NewOption};
    use crate::store::MemoryStore;
    use chrono::Duration;

    fn option(id: u128, election_id: Uuid, display_order: Option<i32>) -> ElectionOption {
        ElectionOption {
            id: Uuid::from_u128(id),
            election_id,
            label: format!("opt-{id}"),
            value: format!("opt-{id}"),
            display_order,
        }
    }

    #[test]
    fn groups_by_election_and_orders_by_display_order() {
        let e1 = Uuid::from_u128(1);
        let e2 = Uuid::from_u128(2);
        let a = option(0xa, e1, Some(2));
        let b = option(0xb, e1, Some(1));
        let c = option(0xc, e2, None);

        let grouped = group_options(vec![a.clone(), b.clone(), c.clone()]);

        assert_eq!(grouped[&e1], vec![b, a]);
        assert_eq!(grouped[&e2], vec![c]);
    }

    #[test]
    fn unset_display_order_sorts_as_zero() {
        let e = Uuid::from_u128(1);
        let grouped = group_options(vec![
            option(1, e, Some(1)),
            option(2, e, None),
            option(3, e, Some(-1)),
        ]);
        let ids: Vec<u128> = grouped[&e].iter().map(|o| o.id.as_u128()).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn empty_store_yields_empty_listing() {
        let store = MemoryStore::new();
        let listing = load_listing(&store, false, Utc::now()).await.unwrap();
        assert!(listing.elections.is_empty());
        assert!(listing.options.is_empty());
    }

    #[tokio::test]
    async fn open_filter_uses_the_voting_window() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let open = store
            .create_election(&NewElection {
                name: "aberta".to_string(),
                description: None,
                starts_at: now - Duration::hours(1),
                ends_at: now + Duration::hours(1),
            })
            .await
            .unwrap();
        let future = store
            .create_election(&NewElection {
                name: "futura".to_string(),
                description: None,
                starts_at: now + Duration::days(1),
                ends_at: now + Duration::days(2),
            })
            .await
            .unwrap();
        for election_id in [open.id, future.id] {
            store
                .create_option(&NewOption {
                    election_id,
                    label: "x".to_string(),
                    value: "x".to_string(),
                    display_order: None,
                })
                .await
                .unwrap();
        }

        let all = load_listing(&store, false, now).await.unwrap();
        assert_eq!(all.elections.len(), 2);

        let listing = load_listing(&store, true, now).await.unwrap();
        assert_eq!(listing.elections, vec![open.clone()]);
        assert_eq!(listing.options.len(), 1);
        assert_eq!(listing.options[&open.id].len(), 1);
    }

    #[tokio::test]
    async fn fetch_failure_is_returned_not_swallowed() {
        let store = MemoryStore::new();
        store.set_failure(Some("permission denied")).await;
        let err = load_listing(&store, false, Utc::now()).await.unwrap_err();
        assert_eq!(err.to_string(), "permission denied");
    }
}
