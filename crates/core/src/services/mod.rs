//! Business logic services.

#![allow(missing_docs)]

pub mod recommendation;
pub mod recommender;
pub mod vote;
pub mod vote_lock;
pub mod vote_state;
pub mod vote_store;

pub use recommendation::RecommendationService;
pub use recommender::{
    NoOpPreferenceSink, NoOpRecommender, PreferenceKind, PreferenceSignal, PreferenceSink,
    PreferenceSinkRef, Recommender, RecommenderRef,
};
pub use vote::{ApplyDirectionInput, ScoreAudit, VoteOutcome, VoteService};
pub use vote_lock::{VoteGuard, VoteKey, VoteLocks};
pub use vote_state::{Transition, VotePhase, VoteState, next_vote_state};
pub use vote_store::{DbVoteStore, InMemoryVoteStore, VoteStore, VoteWrite};
