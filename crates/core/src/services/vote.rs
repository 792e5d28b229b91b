//! Vote service.

use std::sync::Arc;

use serde::Deserialize;
use tally_common::{AppError, AppResult};
use tally_db::entities::vote::Direction;
use tally_db::entities::{item, vote};
use validator::Validate;

use crate::services::recommender::{PreferenceSignal, PreferenceSinkRef};
use crate::services::vote_lock::{VoteKey, VoteLocks};
use crate::services::vote_state::{Transition, VoteState, next_vote_state};
use crate::services::vote_store::{VoteStore, VoteWrite};

/// Default page size for a user's votes.
pub const DEFAULT_VOTE_LIST_LIMIT: u64 = 50;
/// Largest page size for a user's votes.
pub const MAX_VOTE_LIST_LIMIT: u64 = 100;

/// Input for a directional button press.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ApplyDirectionInput {
    // Upper bounds match `tally_db::migrations::ID_MAX_LEN`.
    #[validate(length(min = 1, max = 32))]
    pub item_id: String,

    #[validate(length(min = 1, max = 32))]
    pub user_id: String,

    /// `"upvote"` or `"downvote"`.
    pub direction: String,
}

/// Result of one press.
#[derive(Debug, Clone)]
pub struct VoteOutcome {
    /// The vote as stored.
    pub vote: vote::Model,
    /// The item with its new score.
    pub item: item::Model,
    /// What the state machine decided.
    pub transition: Transition,
}

/// Stored score compared with the score recomputed from votes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreAudit {
    pub stored: i64,
    pub computed: i64,
}

impl ScoreAudit {
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        self.stored == self.computed
    }
}

/// Vote service for business logic.
#[derive(Clone)]
pub struct VoteService {
    store: Arc<dyn VoteStore>,
    locks: Arc<VoteLocks>,
    signals: PreferenceSinkRef,
}

impl VoteService {
    /// Create a new vote service.
    #[must_use]
    pub fn new(store: Arc<dyn VoteStore>, signals: PreferenceSinkRef) -> Self {
        Self {
            store,
            locks: Arc::new(VoteLocks::new()),
            signals,
        }
    }

    /// Press the upvote button.
    pub async fn upvote(&self, item_id: &str, user_id: &str) -> AppResult<VoteOutcome> {
        self.apply_direction(item_id, user_id, Direction::Up).await
    }

    /// Press the downvote button.
    pub async fn downvote(&self, item_id: &str, user_id: &str) -> AppResult<VoteOutcome> {
        self.apply_direction(item_id, user_id, Direction::Down).await
    }

    /// Press a direction button.
    pub async fn apply_direction(
        &self,
        item_id: &str,
        user_id: &str,
        requested: Direction,
    ) -> AppResult<VoteOutcome> {
        self.apply(ApplyDirectionInput {
            item_id: item_id.to_string(),
            user_id: user_id.to_string(),
            direction: requested.as_str().to_string(),
        })
        .await
    }

    /// Press a direction button given raw input.
    ///
    /// Reads the current vote, stores the next state together with the score
    /// delta, then hands the preference signal to the recommender sink. Presses
    /// on the same (user, item) pair are applied one at a time.
    pub async fn apply(&self, input: ApplyDirectionInput) -> AppResult<VoteOutcome> {
        input
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        let requested: Direction = input.direction.parse()?;
        let ApplyDirectionInput {
            item_id, user_id, ..
        } = input;

        let key = VoteKey::new(user_id.as_str(), item_id.as_str());
        let _guard = self.locks.acquire(&key).await;

        if self.store.find_item(&item_id).await?.is_none() {
            return Err(AppError::ItemNotFound(item_id));
        }

        let current = self.store.find_vote(&user_id, &item_id).await?;
        let transition = next_vote_state(current.as_ref().map(VoteState::from), requested);

        let write = match current {
            None => VoteWrite::Create {
                user_id: user_id.clone(),
                item_id: item_id.clone(),
                direction: transition.direction,
                active: transition.active,
            },
            Some(current) => VoteWrite::Save {
                current,
                direction: transition.direction,
                active: transition.active,
            },
        };

        let (vote, item) = self.store.commit(write, transition.score_delta).await?;

        tracing::debug!(
            user_id = %user_id,
            item_id = %item_id,
            direction = %vote.direction,
            active = vote.active,
            delta = transition.score_delta,
            score = item.score,
            "Applied vote"
        );

        self.signals
            .send(PreferenceSignal::new(user_id, item_id, transition.signal));

        Ok(VoteOutcome {
            vote,
            item,
            transition,
        })
    }

    /// Get a user's vote on an item.
    pub async fn get_vote(&self, user_id: &str, item_id: &str) -> AppResult<vote::Model> {
        self.store
            .find_vote(user_id, item_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Vote by {user_id} on {item_id}")))
    }

    /// List a user's votes, newest first.
    pub async fn list_user_votes(
        &self,
        user_id: &str,
        limit: Option<u64>,
        until_id: Option<&str>,
    ) -> AppResult<Vec<vote::Model>> {
        let limit = limit
            .unwrap_or(DEFAULT_VOTE_LIST_LIMIT)
            .clamp(1, MAX_VOTE_LIST_LIMIT);
        self.store.list_user_votes(user_id, limit, until_id).await
    }

    /// Recompute an item's score from its votes and compare with the stored one.
    pub async fn recount_score(&self, item_id: &str) -> AppResult<ScoreAudit> {
        let item = self
            .store
            .find_item(item_id)
            .await?
            .ok_or_else(|| AppError::ItemNotFound(item_id.to_string()))?;
        let computed = self.store.sum_contributions(item_id).await?;

        let audit = ScoreAudit {
            stored: item.score,
            computed,
        };
        if !audit.is_consistent() {
            tracing::warn!(
                item_id = %item_id,
                stored = audit.stored,
                computed = audit.computed,
                "Item score does not match its votes"
            );
        }
        Ok(audit)
    }
}
