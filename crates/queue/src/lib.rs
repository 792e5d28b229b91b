//! Background delivery for tally.
//!
//! This crate connects the vote service to the recommender:
//!
//! - **Preference sink**: queues signals as apalis jobs in Redis
//! - **Workers**: apalis worker that forwards jobs to the recommender
//! - **Redis recommender**: preference sets and ranked recommendations in Redis

pub mod preference_sink;
pub mod redis_recommender;
pub mod workers;

pub use preference_sink::{PreferenceStorage, RedisPreferenceSink, connect_storage};
pub use redis_recommender::{RecommenderKeys, RedisRecommender, SetChanges};
pub use workers::{PreferenceContext, PreferenceWorker, preference_worker};
