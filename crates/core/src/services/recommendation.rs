//! Recommendation service.

use std::collections::HashMap;
use std::sync::Arc;

use tally_common::{AppError, AppResult};
use tally_db::entities::item;

use crate::services::recommender::RecommenderRef;
use crate::services::vote_store::VoteStore;

/// Maximum number of recommendations per request.
pub const MAX_RECOMMENDATIONS: usize = 100;

/// Loads the items the recommender ranks highest for a user.
#[derive(Clone)]
pub struct RecommendationService {
    recommender: RecommenderRef,
    store: Arc<dyn VoteStore>,
    default_count: usize,
}

impl RecommendationService {
    /// Create a new recommendation service.
    #[must_use]
    pub fn new(recommender: RecommenderRef, store: Arc<dyn VoteStore>, default_count: usize) -> Self {
        Self {
            recommender,
            store,
            default_count,
        }
    }

    /// Recommended items for a user, best first.
    ///
    /// IDs the recommender returns for items that no longer exist are skipped.
    pub async fn recommend_for(
        &self,
        user_id: &str,
        count: Option<usize>,
    ) -> AppResult<Vec<item::Model>> {
        if user_id.is_empty() {
            return Err(AppError::Validation("user_id must not be empty".to_string()));
        }
        let count = count
            .unwrap_or(self.default_count)
            .clamp(1, MAX_RECOMMENDATIONS);

        let mut ids = self.recommender.recommend_for(user_id, count).await?;
        ids.truncate(count);

        let mut found: HashMap<String, item::Model> = self
            .store
            .find_items(&ids)
            .await?
            .into_iter()
            .map(|item| (item.id.clone(), item))
            .collect();

        let items: Vec<_> = ids.iter().filter_map(|id| found.remove(id)).collect();

        tracing::debug!(
            user_id = %user_id,
            ranked = ids.len(),
            returned = items.len(),
            "Loaded recommendations"
        );
        Ok(items)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::recommender::{PreferenceKind, Recommender};
    use crate::services::vote_store::InMemoryVoteStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FixedRecommender {
        ranked: Vec<String>,
        requested: Mutex<Vec<usize>>,
    }

    impl FixedRecommender {
        fn new(ranked: &[&str]) -> Self {
            Self {
                ranked: ranked.iter().map(ToString::to_string).collect(),
                requested: Mutex::new(vec![]),
            }
        }
    }

    #[async_trait]
    impl Recommender for FixedRecommender {
        async fn record_preference(
            &self,
            _user_id: &str,
            _item_id: &str,
            _kind: PreferenceKind,
        ) -> AppResult<()> {
            Ok(())
        }

        async fn recommend_for(&self, _user_id: &str, count: usize) -> AppResult<Vec<String>> {
            self.requested.lock().unwrap().push(count);
            Ok(self.ranked.clone())
        }
    }

    async fn store_with(ids: &[&str]) -> Arc<InMemoryVoteStore> {
        let store = Arc::new(InMemoryVoteStore::new());
        for id in ids {
            store.insert_item(id, "author1").await;
        }
        store
    }

    #[tokio::test]
    async fn test_preserves_rank_order() {
        let store = store_with(&["a", "b", "c"]).await;
        let recommender = Arc::new(FixedRecommender::new(&["c", "a", "b"]));
        let service = RecommendationService::new(recommender, store, 10);

        let items = service.recommend_for("user1", None).await.unwrap();
        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();

        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_skips_missing_items() {
        let store = store_with(&["a", "c"]).await;
        let recommender = Arc::new(FixedRecommender::new(&["gone", "c", "a"]));
        let service = RecommendationService::new(recommender, store, 10);

        let items = service.recommend_for("user1", None).await.unwrap();
        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();

        assert_eq!(ids, vec!["c", "a"]);
    }

    #[tokio::test]
    async fn test_uses_default_count_and_truncates() {
        let store = store_with(&["a", "b", "c"]).await;
        let recommender = Arc::new(FixedRecommender::new(&["a", "b", "c"]));
        let service = RecommendationService::new(recommender.clone(), store, 2);

        let items = service.recommend_for("user1", None).await.unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(*recommender.requested.lock().unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn test_empty_user_is_rejected() {
        let store = store_with(&[]).await;
        let recommender = Arc::new(FixedRecommender::new(&[]));
        let service = RecommendationService::new(recommender, store, 10);

        let result = service.recommend_for("", None).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
