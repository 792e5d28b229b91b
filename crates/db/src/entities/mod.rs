//! SeaORM entities.

pub mod item;
pub mod vote;

pub use item::Entity as Item;
pub use vote::Entity as Vote;
