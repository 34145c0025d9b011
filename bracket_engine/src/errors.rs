//! Error types for bracket generation and tournament orchestration.

use crate::bracket::models::{DeviceId, MatchId, MatchStatus};
use thiserror::Error;

/// Broad category of a [`TournamentError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected at construction time, nothing was applied
    InvalidInput,
    /// Operation not allowed in the current state; no-op
    IllegalTransition,
    /// Unknown identifier; no-op
    NotFound,
    /// Snapshot could not be encoded or decoded
    Snapshot,
}

/// Tournament errors
#[derive(Debug, Error)]
pub enum TournamentError {
    #[error("Not enough players: need {needed}, have {actual}")]
    NotEnoughPlayers { needed: usize, actual: usize },

    #[error("Player entered twice: {0}")]
    DuplicatePlayer(String),

    #[error("Player names must not be blank")]
    EmptyPlayerName,

    #[error("Finals size {finals_size} is invalid for {player_count} players")]
    InvalidFinalsSize {
        finals_size: usize,
        player_count: usize,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Bracket size must be a power of two >= 2, got {0}")]
    InvalidBracketSize(usize),

    #[error("{winner} is not playing in match {match_id}")]
    WinnerNotInMatch { match_id: MatchId, winner: String },

    #[error("Match {match_id} cannot move from {from} to {to}")]
    IllegalTransition {
        match_id: MatchId,
        from: MatchStatus,
        to: MatchStatus,
    },

    #[error("Match {0} does not have both players yet")]
    MatchNotReady(MatchId),

    #[error("No pending submission for match {0}")]
    NoPendingSubmission(MatchId),

    #[error("Device {device} is already scoring match {match_id}")]
    DeviceBusy { device: DeviceId, match_id: MatchId },

    #[error("Device {device} is not assigned to match {match_id}")]
    DeviceMismatch { device: DeviceId, match_id: MatchId },

    #[error("Tournament has already been generated")]
    AlreadyStarted,

    #[error("Device already registered: {0}")]
    DeviceAlreadyRegistered(DeviceId),

    #[error("Match not found: {0}")]
    MatchNotFound(MatchId),

    #[error("Device not found: {0}")]
    DeviceNotFound(DeviceId),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),
}

impl TournamentError {
    /// Category used by callers to decide how to surface the failure
    pub fn kind(&self) -> ErrorKind {
        match self {
            TournamentError::NotEnoughPlayers { .. }
            | TournamentError::DuplicatePlayer(_)
            | TournamentError::EmptyPlayerName
            | TournamentError::InvalidFinalsSize { .. }
            | TournamentError::InvalidConfig(_)
            | TournamentError::InvalidBracketSize(_)
            | TournamentError::WinnerNotInMatch { .. } => ErrorKind::InvalidInput,
            TournamentError::IllegalTransition { .. }
            | TournamentError::MatchNotReady(_)
            | TournamentError::NoPendingSubmission(_)
            | TournamentError::DeviceBusy { .. }
            | TournamentError::DeviceMismatch { .. }
            | TournamentError::DeviceAlreadyRegistered(_)
            | TournamentError::AlreadyStarted => ErrorKind::IllegalTransition,
            TournamentError::MatchNotFound(_) | TournamentError::DeviceNotFound(_) => {
                ErrorKind::NotFound
            }
            TournamentError::Snapshot(_) => ErrorKind::Snapshot,
        }
    }
}

/// Result type for tournament operations
pub type TournamentResult<T> = Result<T, TournamentError>;
