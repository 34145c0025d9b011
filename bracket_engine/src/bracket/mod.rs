//! Elimination brackets: seeding, single and double elimination, and the
//! propagation of results through a bracket's match graph.

pub mod double_elimination;
pub mod models;
pub mod progression;
pub mod seeding;
pub mod single_elimination;

pub use models::{
    BracketType, DeviceId, Match, MatchId, MatchOutcome, MatchStatus, PlayerName, ScoreEvent,
    Slot, SlotRef, Stage,
};
pub use seeding::{bracket_size, distribute_byes, seed_order};

use crate::errors::{TournamentError, TournamentResult};
use std::collections::HashSet;

/// Check a roster before generating anything from it
///
/// # Errors
///
/// * `NotEnoughPlayers` - fewer than `min` entries
/// * `EmptyPlayerName` - a blank name
/// * `DuplicatePlayer` - the same name twice
pub fn validate_players(players: &[PlayerName], min: usize) -> TournamentResult<()> {
    if players.len() < min {
        return Err(TournamentError::NotEnoughPlayers {
            needed: min,
            actual: players.len(),
        });
    }

    let mut seen = HashSet::with_capacity(players.len());
    for player in players {
        if player.trim().is_empty() {
            return Err(TournamentError::EmptyPlayerName);
        }
        if !seen.insert(player.as_str()) {
            return Err(TournamentError::DuplicatePlayer(player.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_players() {
        let ok: Vec<PlayerName> = vec!["ann".into(), "ben".into()];
        assert!(validate_players(&ok, 2).is_ok());

        let short: Vec<PlayerName> = vec!["ann".into()];
        assert!(matches!(
            validate_players(&short, 2),
            Err(TournamentError::NotEnoughPlayers {
                needed: 2,
                actual: 1
            })
        ));

        let blank: Vec<PlayerName> = vec!["ann".into(), "  ".into()];
        assert!(matches!(
            validate_players(&blank, 2),
            Err(TournamentError::EmptyPlayerName)
        ));

        let dup: Vec<PlayerName> = vec!["ann".into(), "ann".into()];
        assert!(matches!(
            validate_players(&dup, 2),
            Err(TournamentError::DuplicatePlayer(name)) if name == "ann"
        ));
    }
}
