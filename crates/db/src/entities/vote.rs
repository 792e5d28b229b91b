//! Vote entity (one user's directional preference on one item).

use std::fmt;
use std::str::FromStr;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use tally_common::AppError;

/// Vote direction. Stored as the last button the user pressed, whether or not
/// the vote is currently counted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum Direction {
    #[sea_orm(string_value = "upvote")]
    #[serde(rename = "upvote")]
    Up,
    #[sea_orm(string_value = "downvote")]
    #[serde(rename = "downvote")]
    Down,
}

impl Direction {
    /// `+1` for [`Direction::Up`], `-1` for [`Direction::Down`].
    #[must_use]
    pub const fn sign(self) -> i64 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
        }
    }

    /// Wire name (`"upvote"` / `"downvote"`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Up => "upvote",
            Self::Down => "downvote",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upvote" | "up" => Ok(Self::Up),
            "downvote" | "down" => Ok(Self::Down),
            other => Err(AppError::Validation(format!(
                "Invalid vote direction: {other:?} (expected \"upvote\" or \"downvote\")"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vote")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The user who voted
    #[sea_orm(indexed)]
    pub user_id: String,

    /// The item being voted on
    #[sea_orm(indexed)]
    pub item_id: String,

    /// Last direction pressed
    pub direction: Direction,

    /// Whether the vote currently counts toward the item's score
    pub active: bool,

    /// Optimistic concurrency guard, bumped on every save
    #[sea_orm(default_value = 0)]
    pub version: i32,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// This vote's current share of the item's score: the direction's sign
    /// when active, zero otherwise.
    #[must_use]
    pub const fn contribution(&self) -> i64 {
        if self.active { self.direction.sign() } else { 0 }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::item::Entity",
        from = "Column::ItemId",
        to = "super::item::Column::Id",
        on_delete = "Cascade"
    )]
    Item,
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
