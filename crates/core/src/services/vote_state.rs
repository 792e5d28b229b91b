//! Vote state machine.
//!
//! A (user, item) pair is in one of five states: no vote yet, or a stored
//! direction combined with an active flag. [`next_vote_state`] is the only
//! place that decides how a button press moves between them, how much the
//! item's score changes, and which preference signal the recommender gets.

use tally_db::entities::vote::{self, Direction};

use crate::services::recommender::PreferenceKind;

/// Stored part of a vote that the state machine looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteState {
    /// Last direction pressed.
    pub direction: Direction,
    /// Whether the vote currently counts.
    pub active: bool,
}

impl VoteState {
    /// Score contribution of a vote in this state.
    #[must_use]
    pub const fn contribution(self) -> i64 {
        if self.active { self.direction.sign() } else { 0 }
    }
}

impl From<&vote::Model> for VoteState {
    fn from(vote: &vote::Model) -> Self {
        Self {
            direction: vote.direction,
            active: vote.active,
        }
    }
}

/// Named states of a (user, item) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VotePhase {
    NoVote,
    ActiveUp,
    InactiveUp,
    ActiveDown,
    InactiveDown,
}

impl VotePhase {
    /// Classify an optional stored vote.
    #[must_use]
    pub const fn of(state: Option<VoteState>) -> Self {
        match state {
            None => Self::NoVote,
            Some(VoteState {
                direction: Direction::Up,
                active: true,
            }) => Self::ActiveUp,
            Some(VoteState {
                direction: Direction::Up,
                active: false,
            }) => Self::InactiveUp,
            Some(VoteState {
                direction: Direction::Down,
                active: true,
            }) => Self::ActiveDown,
            Some(VoteState {
                direction: Direction::Down,
                active: false,
            }) => Self::InactiveDown,
        }
    }
}

/// Outcome of one button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Direction to store.
    pub direction: Direction,
    /// Active flag to store.
    pub active: bool,
    /// Signed change to apply to the item's score.
    pub score_delta: i64,
    /// Signal for the recommender.
    pub signal: PreferenceKind,
}

impl Transition {
    /// The stored state after this transition.
    #[must_use]
    pub const fn state(&self) -> VoteState {
        VoteState {
            direction: self.direction,
            active: self.active,
        }
    }
}

/// Compute the next vote state for a press of `requested`.
///
/// - No vote: create an active vote in `requested`.
/// - Same direction: toggle `active`.
/// - Other direction: always end active in `requested`. If the old vote was
///   active its contribution is removed in the same step, so the score moves
///   by two.
#[must_use]
pub const fn next_vote_state(current: Option<VoteState>, requested: Direction) -> Transition {
    let Some(current) = current else {
        return Transition {
            direction: requested,
            active: true,
            score_delta: requested.sign(),
            signal: PreferenceKind::activated(requested),
        };
    };

    let switching = !matches!(
        (current.direction, requested),
        (Direction::Up, Direction::Up) | (Direction::Down, Direction::Down)
    );
    let magnitude = if switching && current.active { 2 } else { 1 };

    let mut active = !current.active;
    let mut direction = current.direction;
    if switching {
        direction = requested;
        active = true;
    }

    if active {
        Transition {
            direction,
            active,
            score_delta: magnitude * direction.sign(),
            signal: PreferenceKind::activated(direction),
        }
    } else {
        // Only reachable by pressing the stored direction on an active vote.
        Transition {
            direction,
            active,
            score_delta: -magnitude * direction.sign(),
            signal: PreferenceKind::withdrawn(direction),
        }
    }
}
