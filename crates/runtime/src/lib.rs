//! Composition root for tally.
//!
//! [`App`] wires the database, the vote store, the recommender and its
//! apalis preference worker into ready-to-use services.

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use tally_common::{AppResult, Config};
use tally_core::{
    DbVoteStore, NoOpPreferenceSink, NoOpRecommender, PreferenceSinkRef, RecommendationService,
    RecommenderRef, VoteService, VoteStore,
};
use tally_db::repositories::{ItemRepository, VoteRepository};
use tally_queue::{
    PreferenceContext, PreferenceWorker, RedisPreferenceSink, RedisRecommender, connect_storage,
};
use tracing::{info, warn};

/// A running tally instance.
pub struct App {
    /// Directional voting.
    pub votes: VoteService,
    /// Recommended items per user.
    pub recommendations: RecommendationService,
    db: Arc<DatabaseConnection>,
    sink: Option<Arc<RedisPreferenceSink>>,
    worker: Option<PreferenceWorker>,
    redis: Option<RedisRecommender>,
}

impl App {
    /// Load [`Config`] from files and the environment, install the tracing
    /// subscriber and bootstrap.
    pub async fn from_env() -> AppResult<Self> {
        let config = Config::load()?;
        tally_common::init_tracing(&config.logging)?;
        Self::bootstrap(&config).await
    }

    /// Connect to the database, run migrations and build the services.
    pub async fn bootstrap(config: &Config) -> AppResult<Self> {
        info!("Starting tally...");

        let db = tally_db::init(config).await?;
        info!("Connected to database");

        info!("Running database migrations...");
        tally_db::migrate(&db).await?;
        info!("Migrations completed");

        Self::with_connection(config, Arc::new(db)).await
    }

    /// Build the services on an existing, migrated connection.
    pub async fn with_connection(config: &Config, db: Arc<DatabaseConnection>) -> AppResult<Self> {
        let store: Arc<dyn VoteStore> = Arc::new(DbVoteStore::new(
            ItemRepository::new(Arc::clone(&db)),
            VoteRepository::new(Arc::clone(&db)),
        ));

        let redis = if !config.recommender.enabled {
            info!("Recommender disabled");
            None
        } else if let Some(redis_config) = &config.redis {
            Some(RedisRecommender::connect(&redis_config.url, redis_config.prefix.clone()).await?)
        } else {
            warn!("Recommender enabled but Redis is not configured, preference signals will be dropped");
            None
        };

        let recommender: RecommenderRef = match &redis {
            Some(redis) => Arc::new(redis.clone()),
            None => Arc::new(NoOpRecommender),
        };

        let (sink, worker) = match (&redis, &config.redis) {
            (Some(_), Some(redis_config)) => {
                let storage = connect_storage(&redis_config.url).await?;
                let worker = PreferenceWorker::start(
                    storage.clone(),
                    PreferenceContext::new(Arc::clone(&recommender)),
                    &config.recommender,
                );
                (Some(Arc::new(RedisPreferenceSink::new(storage))), Some(worker))
            }
            _ => (None, None),
        };
        let signals: PreferenceSinkRef = match &sink {
            Some(sink) => sink.clone(),
            None => Arc::new(NoOpPreferenceSink),
        };

        let votes = VoteService::new(Arc::clone(&store), signals);
        let recommendations =
            RecommendationService::new(recommender, store, config.recommender.default_count);

        Ok(Self {
            votes,
            recommendations,
            db,
            sink,
            worker,
            redis,
        })
    }

    /// The database connection.
    #[must_use]
    pub const fn database(&self) -> &Arc<DatabaseConnection> {
        &self.db
    }

    /// Whether preference signals are queued for an apalis worker.
    #[must_use]
    pub const fn has_preference_worker(&self) -> bool {
        self.worker.is_some()
    }

    /// Finish pending preference pushes, stop the worker and close connections.
    pub async fn shutdown(self) {
        if let Some(sink) = &self.sink {
            sink.flush().await;
        }
        if let Some(worker) = self.worker {
            worker.shutdown().await;
        }

        if let Some(redis) = &self.redis {
            if let Err(e) = redis.quit().await {
                warn!(error = %e, "Failed to close Redis connection");
            }
        }

        info!("tally stopped");
    }
}
