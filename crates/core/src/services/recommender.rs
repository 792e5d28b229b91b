//! Recommender feed.
//!
//! Provides an abstraction for the external collaborative-filtering engine.
//! Concrete implementations (Redis engine, queued delivery worker) live in
//! the queue crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tally_common::AppResult;
use tally_db::entities::vote::Direction;

/// Preference change reported to the recommender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreferenceKind {
    /// The user now upvotes the item.
    Liked,
    /// The user withdrew an upvote.
    Unliked,
    /// The user now downvotes the item.
    Disliked,
    /// The user withdrew a downvote.
    Undisliked,
}

impl PreferenceKind {
    /// Signal for a vote that became active in `direction`.
    #[must_use]
    pub const fn activated(direction: Direction) -> Self {
        match direction {
            Direction::Up => Self::Liked,
            Direction::Down => Self::Disliked,
        }
    }

    /// Signal for a vote in `direction` that stopped counting.
    #[must_use]
    pub const fn withdrawn(direction: Direction) -> Self {
        match direction {
            Direction::Up => Self::Unliked,
            Direction::Down => Self::Undisliked,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Liked => "liked",
            Self::Unliked => "unliked",
            Self::Disliked => "disliked",
            Self::Undisliked => "undisliked",
        }
    }
}

impl fmt::Display for PreferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A preference change keyed by (user, item).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceSignal {
    pub user_id: String,
    pub item_id: String,
    pub kind: PreferenceKind,
}

impl PreferenceSignal {
    #[must_use]
    pub fn new(user_id: impl Into<String>, item_id: impl Into<String>, kind: PreferenceKind) -> Self {
        Self {
            user_id: user_id.into(),
            item_id: item_id.into(),
            kind,
        }
    }
}

/// The external recommendation engine.
#[async_trait]
pub trait Recommender: Send + Sync {
    /// Record a preference change.
    async fn record_preference(
        &self,
        user_id: &str,
        item_id: &str,
        kind: PreferenceKind,
    ) -> AppResult<()>;

    /// Ranked item IDs recommended for a user, best first.
    async fn recommend_for(&self, user_id: &str, count: usize) -> AppResult<Vec<String>>;
}

/// Where the vote state machine sends preference signals.
///
/// `send` must not block and must not fail the caller: delivery happens
/// later, best effort, outside the vote transaction.
pub trait PreferenceSink: Send + Sync {
    /// Hand a signal off for delivery.
    fn send(&self, signal: PreferenceSignal);
}

/// Shared recommender handle.
pub type RecommenderRef = Arc<dyn Recommender>;

/// Shared preference sink handle.
pub type PreferenceSinkRef = Arc<dyn PreferenceSink>;

/// A recommender that records nothing and recommends nothing.
#[derive(Clone, Default)]
pub struct NoOpRecommender;

#[async_trait]
impl Recommender for NoOpRecommender {
    async fn record_preference(
        &self,
        _user_id: &str,
        _item_id: &str,
        _kind: PreferenceKind,
    ) -> AppResult<()> {
        Ok(())
    }

    async fn recommend_for(&self, _user_id: &str, _count: usize) -> AppResult<Vec<String>> {
        Ok(vec![])
    }
}

/// A sink that drops every signal, for deployments without a recommender.
#[derive(Clone, Default)]
pub struct NoOpPreferenceSink;

impl PreferenceSink for NoOpPreferenceSink {
    fn send(&self, signal: PreferenceSignal) {
        tracing::trace!(
            user_id = %signal.user_id,
            item_id = %signal.item_id,
            kind = %signal.kind,
            "Recommender disabled, dropping preference signal"
        );
    }
}
