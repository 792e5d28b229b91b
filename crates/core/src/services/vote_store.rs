//! Vote ledger and score aggregate storage.
//!
//! [`VoteStore`] is everything the vote state machine needs from storage.
//! The write side is a single [`VoteStore::commit`] so that the vote write and
//! the score delta always land together.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{Set, TransactionTrait};
use tally_common::{AppError, AppResult, IdGenerator};
use tally_db::entities::vote::Direction;
use tally_db::entities::{item, vote};
use tally_db::repositories::{ItemRepository, VoteRepository};
use tokio::sync::Mutex;

/// Vote write performed together with a score delta.
#[derive(Debug, Clone)]
pub enum VoteWrite {
    /// Insert the first vote for a (user, item) pair.
    Create {
        user_id: String,
        item_id: String,
        direction: Direction,
        active: bool,
    },
    /// Update an existing vote read at `current.version`.
    Save {
        current: vote::Model,
        direction: Direction,
        active: bool,
    },
}

impl VoteWrite {
    /// Item the write belongs to.
    #[must_use]
    pub fn item_id(&self) -> &str {
        match self {
            Self::Create { item_id, .. } => item_id,
            Self::Save { current, .. } => &current.item_id,
        }
    }
}

/// Storage for votes and item scores.
#[async_trait]
pub trait VoteStore: Send + Sync {
    /// Find an item by ID.
    async fn find_item(&self, item_id: &str) -> AppResult<Option<item::Model>>;

    /// Find the vote of a user on an item.
    async fn find_vote(&self, user_id: &str, item_id: &str) -> AppResult<Option<vote::Model>>;

    /// Apply `write` and add `score_delta` to the item's score as one unit.
    ///
    /// Either both changes are stored or neither is. Returns the stored vote
    /// and the item with its new score.
    async fn commit(
        &self,
        write: VoteWrite,
        score_delta: i64,
    ) -> AppResult<(vote::Model, item::Model)>;

    /// Find items by IDs, in any order.
    async fn find_items(&self, ids: &[String]) -> AppResult<Vec<item::Model>>;

    /// Votes cast by a user, newest first.
    async fn list_user_votes(
        &self,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<vote::Model>>;

    /// Score of an item recomputed from its votes.
    async fn sum_contributions(&self, item_id: &str) -> AppResult<i64>;
}

/// [`VoteStore`] backed by the database.
#[derive(Clone)]
pub struct DbVoteStore {
    item_repo: ItemRepository,
    vote_repo: VoteRepository,
    id_gen: IdGenerator,
}

impl DbVoteStore {
    /// Create a new database-backed store.
    #[must_use]
    pub const fn new(item_repo: ItemRepository, vote_repo: VoteRepository) -> Self {
        Self {
            item_repo,
            vote_repo,
            id_gen: IdGenerator::new(),
        }
    }
}

#[async_trait]
impl VoteStore for DbVoteStore {
    async fn find_item(&self, item_id: &str) -> AppResult<Option<item::Model>> {
        self.item_repo.find_by_id(item_id).await
    }

    async fn find_vote(&self, user_id: &str, item_id: &str) -> AppResult<Option<vote::Model>> {
        self.vote_repo.find_by_user_and_item(user_id, item_id).await
    }

    async fn commit(
        &self,
        write: VoteWrite,
        score_delta: i64,
    ) -> AppResult<(vote::Model, item::Model)> {
        let txn = self
            .item_repo
            .connection()
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        // Dropping `txn` on any early return rolls everything back.
        let vote = match write {
            VoteWrite::Create {
                user_id,
                item_id,
                direction,
                active,
            } => {
                let model = vote::ActiveModel {
                    id: Set(self.id_gen.generate()?),
                    user_id: Set(user_id),
                    item_id: Set(item_id),
                    direction: Set(direction),
                    active: Set(active),
                    version: Set(0),
                    created_at: Set(Utc::now().fixed_offset()),
                    updated_at: Set(None),
                };
                VoteRepository::create_in(&txn, model).await?
            }
            VoteWrite::Save {
                current,
                direction,
                active,
            } => VoteRepository::save_in(&txn, &current, direction, active).await?,
        };

        ItemRepository::apply_score_delta_in(&txn, &vote.item_id, score_delta).await?;
        let item = ItemRepository::find_by_id_in(&txn, &vote.item_id)
            .await?
            .ok_or_else(|| AppError::ItemNotFound(vote.item_id.clone()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok((vote, item))
    }

    async fn find_items(&self, ids: &[String]) -> AppResult<Vec<item::Model>> {
        self.item_repo.find_by_ids(ids).await
    }

    async fn list_user_votes(
        &self,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<vote::Model>> {
        self.vote_repo.find_by_user(user_id, limit, until_id).await
    }

    async fn sum_contributions(&self, item_id: &str) -> AppResult<i64> {
        self.vote_repo.sum_contributions(item_id).await
    }
}

#[derive(Default)]
struct MemoryState {
    items: HashMap<String, item::Model>,
    votes: HashMap<(String, String), vote::Model>,
}

/// In-process [`VoteStore`].
///
/// Enforces the same rules as the database: one vote per (user, item),
/// version-checked saves, and all-or-nothing commits.
#[derive(Default)]
pub struct InMemoryVoteStore {
    state: Mutex<MemoryState>,
    id_gen: IdGenerator,
}

impl InMemoryVoteStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item with a zero score.
    pub async fn insert_item(&self, id: &str, user_id: &str) -> item::Model {
        let model = item::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            score: 0,
            created_at: Utc::now().fixed_offset(),
        };
        self.state
            .lock()
            .await
            .items
            .insert(id.to_string(), model.clone());
        model
    }
}

#[async_trait]
impl VoteStore for InMemoryVoteStore {
    async fn find_item(&self, item_id: &str) -> AppResult<Option<item::Model>> {
        Ok(self.state.lock().await.items.get(item_id).cloned())
    }

    async fn find_vote(&self, user_id: &str, item_id: &str) -> AppResult<Option<vote::Model>> {
        let key = (user_id.to_string(), item_id.to_string());
        Ok(self.state.lock().await.votes.get(&key).cloned())
    }

    async fn commit(
        &self,
        write: VoteWrite,
        score_delta: i64,
    ) -> AppResult<(vote::Model, item::Model)> {
        let mut state = self.state.lock().await;

        if !state.items.contains_key(write.item_id()) {
            return Err(AppError::ItemNotFound(write.item_id().to_string()));
        }

        let vote = match write {
            VoteWrite::Create {
                user_id,
                item_id,
                direction,
                active,
            } => {
                let key = (user_id.clone(), item_id.clone());
                if state.votes.contains_key(&key) {
                    return Err(AppError::Conflict(format!(
                        "Vote already exists: ({user_id}, {item_id})"
                    )));
                }
                vote::Model {
                    id: self.id_gen.generate()?,
                    user_id,
                    item_id,
                    direction,
                    active,
                    version: 0,
                    created_at: Utc::now().fixed_offset(),
                    updated_at: None,
                }
            }
            VoteWrite::Save {
                current,
                direction,
                active,
            } => {
                let key = (current.user_id.clone(), current.item_id.clone());
                let stored_version = state.votes.get(&key).map(|v| v.version);
                if stored_version != Some(current.version) {
                    return Err(AppError::Conflict(format!(
                        "Vote {} was modified concurrently",
                        current.id
                    )));
                }
                vote::Model {
                    direction,
                    active,
                    version: current.version + 1,
                    updated_at: Some(Utc::now().fixed_offset()),
                    ..current
                }
            }
        };

        let item = match state.items.get_mut(&vote.item_id) {
            Some(item) => {
                item.score += score_delta;
                item.clone()
            }
            None => return Err(AppError::ItemNotFound(vote.item_id.clone())),
        };
        state.votes.insert(
            (vote.user_id.clone(), vote.item_id.clone()),
            vote.clone(),
        );

        Ok((vote, item))
    }

    async fn find_items(&self, ids: &[String]) -> AppResult<Vec<item::Model>> {
        let state = self.state.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.items.get(id).cloned())
            .collect())
    }

    async fn list_user_votes(
        &self,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<vote::Model>> {
        let state = self.state.lock().await;
        let mut votes: Vec<vote::Model> = state
            .votes
            .values()
            .filter(|v| v.user_id == user_id)
            .filter(|v| until_id.is_none_or(|until| v.id.as_str() < until))
            .cloned()
            .collect();
        votes.sort_by(|a, b| b.id.cmp(&a.id));
        votes.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(votes)
    }

    async fn sum_contributions(&self, item_id: &str) -> AppResult<i64> {
        let state = self.state.lock().await;
        Ok(state
            .votes
            .values()
            .filter(|v| v.item_id == item_id)
            .map(vote::Model::contribution)
            .sum())
    }
}
