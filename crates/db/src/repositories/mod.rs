//! Repositories wrapping SeaORM queries.

pub mod item;
pub mod vote;

pub use item::ItemRepository;
pub use vote::VoteRepository;
