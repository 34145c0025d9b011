//! Match data model shared by every format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Competitor name as entered by the organiser
pub type PlayerName = String;

/// Remote scoring device identifier
pub type DeviceId = String;

/// Match identifier, unique within a tournament
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(pub u32);

impl MatchId {
    /// The id following this one
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Match lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Waiting for players or for a device
    Pending,
    /// Handed to a scoring device
    Assigned,
    /// Device reported the match started
    InProgress,
    /// Result submitted, waiting for the organiser
    AwaitingApproval,
    /// Result is authoritative
    Complete,
    /// Losers-bracket match that can never receive a player
    Skipped,
}

impl MatchStatus {
    /// Whether the match needs no further play
    #[must_use]
    pub const fn is_resolved(self) -> bool {
        matches!(self, Self::Complete | Self::Skipped)
    }

    /// Legal edges of the match state machine.
    ///
    /// Automatic bye resolution bypasses this and writes `Complete` or
    /// `Skipped` directly on freshly generated matches.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Assigned)
                | (Self::Assigned, Self::Pending)
                | (Self::Assigned, Self::InProgress)
                | (Self::InProgress, Self::Pending)
                | (Self::Assigned, Self::AwaitingApproval)
                | (Self::InProgress, Self::AwaitingApproval)
                | (Self::AwaitingApproval, Self::AwaitingApproval)
                | (Self::AwaitingApproval, Self::Assigned)
                | (Self::AwaitingApproval, Self::Complete)
                | (Self::Pending, Self::Complete)
                | (Self::Assigned, Self::Complete)
                | (Self::InProgress, Self::Complete)
        )
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchStatus::Pending => write!(f, "pending"),
            MatchStatus::Assigned => write!(f, "assigned"),
            MatchStatus::InProgress => write!(f, "in progress"),
            MatchStatus::AwaitingApproval => write!(f, "awaiting approval"),
            MatchStatus::Complete => write!(f, "complete"),
            MatchStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// One of the two player seats of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Player1,
    Player2,
}

impl Slot {
    /// Slot a bracket position feeds in the following round
    #[must_use]
    pub const fn for_position(position: u32) -> Self {
        if position % 2 == 0 {
            Self::Player1
        } else {
            Self::Player2
        }
    }

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Player1 => 0,
            Self::Player2 => 1,
        }
    }
}

/// Pointer to a seat in another match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotRef {
    pub match_id: MatchId,
    pub slot: Slot,
}

impl SlotRef {
    #[must_use]
    pub const fn new(match_id: MatchId, slot: Slot) -> Self {
        Self { match_id, slot }
    }
}

/// Partition of a tournament's matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Main,
    GroupA,
    GroupB,
    Finals,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Main => write!(f, "main"),
            Stage::GroupA => write!(f, "group A"),
            Stage::GroupB => write!(f, "group B"),
            Stage::Finals => write!(f, "finals"),
        }
    }
}

/// Double-elimination bracket side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BracketType {
    Winners,
    Losers,
    GrandFinal,
}

/// A single scoring event reported by the match scorer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEvent {
    pub player: PlayerName,
    pub points: u32,
    pub description: String,
    pub recorded_at: DateTime<Utc>,
}

/// Final result of a match as produced by the external scorer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub winner: PlayerName,
    pub score1: u32,
    pub score2: u32,
    pub sets1: u32,
    pub sets2: u32,
    pub history: Vec<ScoreEvent>,
}

impl MatchOutcome {
    /// Outcome with a bare score line and no history
    pub fn new(winner: impl Into<PlayerName>, score1: u32, score2: u32) -> Self {
        Self {
            winner: winner.into(),
            score1,
            score2,
            sets1: 0,
            sets2: 0,
            history: Vec::new(),
        }
    }

    /// Set the set-win counters
    #[must_use]
    pub fn with_sets(mut self, sets1: u32, sets2: u32) -> Self {
        self.sets1 = sets1;
        self.sets2 = sets2;
        self
    }
}

/// The atomic unit of play
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    /// Round number (1-indexed)
    pub round: u32,
    /// Index within the round (0-indexed)
    pub position: u32,
    pub player1: Option<PlayerName>,
    pub player2: Option<PlayerName>,
    pub score1: u32,
    pub score2: u32,
    pub sets1: u32,
    pub sets2: u32,
    pub status: MatchStatus,
    pub device: Option<DeviceId>,
    pub winner: Option<PlayerName>,
    pub history: Vec<ScoreEvent>,
    /// Where the winner advances
    pub next_match: Option<SlotRef>,
    pub stage: Stage,
    pub bracket: Option<BracketType>,
    pub is_grand_final: bool,
    pub is_grand_final_reset: bool,
    /// Where the loser drops (double elimination)
    pub loser_next: Option<SlotRef>,
    /// Seats that will never be filled
    pub vacant: [bool; 2],
}

impl Match {
    /// Create an empty match
    pub fn new(id: MatchId, round: u32, position: u32, stage: Stage) -> Self {
        Self {
            id,
            round,
            position,
            player1: None,
            player2: None,
            score1: 0,
            score2: 0,
            sets1: 0,
            sets2: 0,
            status: MatchStatus::Pending,
            device: None,
            winner: None,
            history: Vec::new(),
            next_match: None,
            stage,
            bracket: None,
            is_grand_final: false,
            is_grand_final_reset: false,
            loser_next: None,
            vacant: [false; 2],
        }
    }

    /// Create a match with both seats already known
    pub fn with_players(
        id: MatchId,
        round: u32,
        position: u32,
        stage: Stage,
        player1: Option<PlayerName>,
        player2: Option<PlayerName>,
    ) -> Self {
        let mut m = Self::new(id, round, position, stage);
        m.vacant = [player1.is_none(), player2.is_none()];
        m.player1 = player1;
        m.player2 = player2;
        m
    }

    #[must_use]
    pub fn player(&self, slot: Slot) -> Option<&PlayerName> {
        match slot {
            Slot::Player1 => self.player1.as_ref(),
            Slot::Player2 => self.player2.as_ref(),
        }
    }

    pub(crate) fn set_player(&mut self, slot: Slot, player: Option<PlayerName>) {
        match slot {
            Slot::Player1 => self.player1 = player,
            Slot::Player2 => self.player2 = player,
        }
    }

    /// Both seats are occupied
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.player1.is_some() && self.player2.is_some()
    }

    /// Whether `name` plays in this match
    #[must_use]
    pub fn has_player(&self, name: &str) -> bool {
        self.player1.as_deref() == Some(name) || self.player2.as_deref() == Some(name)
    }

    /// Exactly one real participant and the other seat can never fill
    #[must_use]
    pub fn is_bye(&self) -> bool {
        match (&self.player1, &self.player2) {
            (Some(_), None) => self.vacant[1],
            (None, Some(_)) => self.vacant[0],
            _ => false,
        }
    }

    /// Slot holding the winner, once decided
    #[must_use]
    pub fn winner_slot(&self) -> Option<Slot> {
        let winner = self.winner.as_deref()?;
        if self.player1.as_deref() == Some(winner) {
            Some(Slot::Player1)
        } else if self.player2.as_deref() == Some(winner) {
            Some(Slot::Player2)
        } else {
            None
        }
    }

    /// The player who lost, when both seats were occupied
    #[must_use]
    pub fn loser(&self) -> Option<&PlayerName> {
        match self.winner_slot()? {
            Slot::Player1 => self.player2.as_ref(),
            Slot::Player2 => self.player1.as_ref(),
        }
    }

    pub(crate) fn apply_outcome(&mut self, outcome: MatchOutcome) {
        self.score1 = outcome.score1;
        self.score2 = outcome.score2;
        self.sets1 = outcome.sets1;
        self.sets2 = outcome.sets2;
        self.history = outcome.history;
        self.winner = Some(outcome.winner);
        self.status = MatchStatus::Complete;
        self.device = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready_match() -> Match {
        Match::with_players(
            MatchId(1),
            1,
            0,
            Stage::Main,
            Some("alice".to_string()),
            Some("bob".to_string()),
        )
    }

    #[test]
    fn test_bye_requires_vacant_seat() {
        let mut m = Match::new(MatchId(1), 2, 0, Stage::Main);
        m.player1 = Some("alice".to_string());
        assert!(!m.is_bye(), "seat may still be filled by propagation");

        m.vacant[1] = true;
        assert!(m.is_bye());
    }

    #[test]
    fn test_with_players_marks_empty_seat_vacant() {
        let m = Match::with_players(MatchId(1), 1, 0, Stage::Main, Some("a".into()), None);
        assert_eq!(m.vacant, [false, true]);
        assert!(m.is_bye());
    }

    #[test]
    fn test_winner_and_loser() {
        let mut m = ready_match();
        m.apply_outcome(MatchOutcome::new("bob", 3, 11));
        assert_eq!(m.status, MatchStatus::Complete);
        assert_eq!(m.winner_slot(), Some(Slot::Player2));
        assert_eq!(m.loser().map(String::as_str), Some("alice"));
    }

    #[test]
    fn test_slot_for_position() {
        assert_eq!(Slot::for_position(0), Slot::Player1);
        assert_eq!(Slot::for_position(1), Slot::Player2);
        assert_eq!(Slot::for_position(6), Slot::Player1);
    }

    #[test]
    fn test_status_transitions() {
        use MatchStatus::*;
        assert!(Pending.can_transition_to(Assigned));
        assert!(Assigned.can_transition_to(Pending));
        assert!(AwaitingApproval.can_transition_to(Assigned));
        assert!(AwaitingApproval.can_transition_to(Complete));
        assert!(!Pending.can_transition_to(AwaitingApproval));
        assert!(!Complete.can_transition_to(Pending));
        assert!(!Skipped.can_transition_to(Assigned));
        assert!(Complete.is_resolved());
        assert!(Skipped.is_resolved());
        assert!(!AwaitingApproval.is_resolved());
    }

    #[test]
    fn test_match_id_serializes_as_number() {
        let json = serde_json::to_string(&MatchId(42)).unwrap();
        assert_eq!(json, "42");
        assert_eq!(MatchId(41).next(), MatchId(42));
    }
}
