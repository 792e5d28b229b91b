//! Redis-backed recommender.
//!
//! Preferences are mirrored into plain Redis sets that an external
//! collaborative-filtering job reads:
//!
//! - `{prefix}:user:{user_id}:liked` / `{prefix}:user:{user_id}:disliked`
//!   hold item IDs.
//! - `{prefix}:item:{item_id}:liked` / `{prefix}:item:{item_id}:disliked`
//!   hold user IDs.
//!
//! The job writes its results to the sorted set
//! `{prefix}:user:{user_id}:recommendations` (higher score ranks first), which
//! [`RedisRecommender::recommend_for`] reads.

use async_trait::async_trait;
use fred::clients::Client;
use fred::error::Error as RedisError;
use fred::interfaces::{ClientLike, SetsInterface, SortedSetsInterface};
use fred::types::config::Config as RedisConfig;
use tally_common::{AppError, AppResult};
use tally_core::{PreferenceKind, Recommender};
use tracing::{debug, info};

/// Key layout for one prefix.
#[derive(Debug, Clone)]
pub struct RecommenderKeys {
    prefix: String,
}

impl RecommenderKeys {
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    #[must_use]
    pub fn user_liked(&self, user_id: &str) -> String {
        format!("{}:user:{user_id}:liked", self.prefix)
    }

    #[must_use]
    pub fn user_disliked(&self, user_id: &str) -> String {
        format!("{}:user:{user_id}:disliked", self.prefix)
    }

    #[must_use]
    pub fn item_liked(&self, item_id: &str) -> String {
        format!("{}:item:{item_id}:liked", self.prefix)
    }

    #[must_use]
    pub fn item_disliked(&self, item_id: &str) -> String {
        format!("{}:item:{item_id}:disliked", self.prefix)
    }

    #[must_use]
    pub fn recommendations(&self, user_id: &str) -> String {
        format!("{}:user:{user_id}:recommendations", self.prefix)
    }
}

/// Set membership changes for one preference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetChanges {
    /// (key, member) pairs to add.
    pub add: Vec<(String, String)>,
    /// (key, member) pairs to remove.
    pub remove: Vec<(String, String)>,
}

impl RecommenderKeys {
    /// Set changes that record `kind` for (user, item).
    ///
    /// Liking an item also clears a dislike of it and vice versa, so a user is
    /// never in both sets for one item.
    #[must_use]
    pub fn changes(&self, user_id: &str, item_id: &str, kind: PreferenceKind) -> SetChanges {
        let liked = [
            (self.user_liked(user_id), item_id.to_string()),
            (self.item_liked(item_id), user_id.to_string()),
        ];
        let disliked = [
            (self.user_disliked(user_id), item_id.to_string()),
            (self.item_disliked(item_id), user_id.to_string()),
        ];

        match kind {
            PreferenceKind::Liked => SetChanges {
                add: liked.to_vec(),
                remove: disliked.to_vec(),
            },
            PreferenceKind::Disliked => SetChanges {
                add: disliked.to_vec(),
                remove: liked.to_vec(),
            },
            PreferenceKind::Unliked => SetChanges {
                add: vec![],
                remove: liked.to_vec(),
            },
            PreferenceKind::Undisliked => SetChanges {
                add: vec![],
                remove: disliked.to_vec(),
            },
        }
    }
}

/// Recommender backed by Redis sets.
#[derive(Clone)]
pub struct RedisRecommender {
    client: Client,
    keys: RecommenderKeys,
}

impl RedisRecommender {
    /// Create a recommender on a connected client.
    #[must_use]
    pub fn new(client: Client, prefix: impl Into<String>) -> Self {
        Self {
            client,
            keys: RecommenderKeys::new(prefix),
        }
    }

    /// Connect to Redis and create a recommender.
    pub async fn connect(redis_url: &str, prefix: impl Into<String>) -> AppResult<Self> {
        let config = RedisConfig::from_url(redis_url).map_err(|e| redis_error(&e))?;
        let client = Client::new(config, None, None, None);
        client.init().await.map_err(|e| redis_error(&e))?;

        info!("Connected to Redis recommender");
        Ok(Self::new(client, prefix))
    }

    /// The underlying client.
    #[must_use]
    pub const fn client(&self) -> &Client {
        &self.client
    }

    /// The key layout in use.
    #[must_use]
    pub const fn keys(&self) -> &RecommenderKeys {
        &self.keys
    }

    /// Close the connection.
    pub async fn quit(&self) -> AppResult<()> {
        self.client.quit().await.map_err(|e| redis_error(&e))
    }
}

fn redis_error(e: &RedisError) -> AppError {
    AppError::Redis(e.to_string())
}

#[async_trait]
impl Recommender for RedisRecommender {
    async fn record_preference(
        &self,
        user_id: &str,
        item_id: &str,
        kind: PreferenceKind,
    ) -> AppResult<()> {
        // Each command is idempotent, so a partially applied change is fixed
        // by the worker's retry.
        let changes = self.keys.changes(user_id, item_id, kind);
        for (key, member) in changes.add {
            self.client
                .sadd::<(), _, _>(key, member)
                .await
                .map_err(|e| redis_error(&e))?;
        }
        for (key, member) in changes.remove {
            self.client
                .srem::<(), _, _>(key, member)
                .await
                .map_err(|e| redis_error(&e))?;
        }

        debug!(user_id, item_id, kind = %kind, "Recorded preference");
        Ok(())
    }

    async fn recommend_for(&self, user_id: &str, count: usize) -> AppResult<Vec<String>> {
        if count == 0 {
            return Ok(vec![]);
        }

        let stop = i64::try_from(count)
            .map_err(|_| AppError::BadRequest(format!("Invalid count: {count}")))?
            - 1;
        self.client
            .zrevrange::<Vec<String>, _>(self.keys.recommendations(user_id), 0, stop, false)
            .await
            .map_err(|e| redis_error(&e))
    }
}
