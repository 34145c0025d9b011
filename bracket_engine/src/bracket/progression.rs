//! Result application and propagation through a match arena.
//!
//! Matches reference each other by [`MatchId`]; every lookup goes through the
//! flat slice so no match ever holds a reference to another.

use super::models::{Match, MatchId, MatchOutcome, MatchStatus, PlayerName, Slot, SlotRef};
use crate::errors::{TournamentError, TournamentResult};
use log::debug;

/// Find a match by id
pub fn find(matches: &[Match], id: MatchId) -> TournamentResult<&Match> {
    matches
        .iter()
        .find(|m| m.id == id)
        .ok_or(TournamentError::MatchNotFound(id))
}

/// Find a match by id for mutation
pub fn find_mut(matches: &mut [Match], id: MatchId) -> TournamentResult<&mut Match> {
    matches
        .iter_mut()
        .find(|m| m.id == id)
        .ok_or(TournamentError::MatchNotFound(id))
}

/// Check that `outcome` may be applied to the match without touching it
pub fn validate_outcome(m: &Match, outcome: &MatchOutcome) -> TournamentResult<()> {
    if !m.status.can_transition_to(MatchStatus::Complete) {
        return Err(TournamentError::IllegalTransition {
            match_id: m.id,
            from: m.status,
            to: MatchStatus::Complete,
        });
    }
    if !m.is_ready() {
        return Err(TournamentError::MatchNotReady(m.id));
    }
    if !m.has_player(&outcome.winner) {
        return Err(TournamentError::WinnerNotInMatch {
            match_id: m.id,
            winner: outcome.winner.clone(),
        });
    }
    Ok(())
}

/// Record a final result and push the winner (and loser) downstream
pub fn complete_match(
    matches: &mut [Match],
    id: MatchId,
    outcome: MatchOutcome,
) -> TournamentResult<()> {
    let m = find_mut(matches, id)?;
    validate_outcome(m, &outcome)?;
    m.apply_outcome(outcome);
    advance(matches, id)
}

/// Resolve the generated byes among `ids`, propagating their winners
pub fn resolve_byes(matches: &mut [Match], ids: &[MatchId]) -> TournamentResult<()> {
    for &id in ids {
        resolve_automatic(matches, id)?;
    }
    Ok(())
}

/// Seat a player in `target`, or mark the seat vacant when `player` is `None`
pub fn fill_slot(
    matches: &mut [Match],
    target: SlotRef,
    player: Option<PlayerName>,
) -> TournamentResult<()> {
    let m = find_mut(matches, target.match_id)?;
    debug!(
        "Match {} {:?} <- {}",
        target.match_id,
        target.slot,
        player.as_deref().unwrap_or("(vacant)")
    );
    m.vacant[target.slot.index()] = player.is_none();
    m.set_player(target.slot, player);
    resolve_automatic(matches, target.match_id)
}

/// Complete a pending match that can never be played: a bye, or a match
/// whose seats are both vacant.
fn resolve_automatic(matches: &mut [Match], id: MatchId) -> TournamentResult<()> {
    let m = find_mut(matches, id)?;
    if m.status != MatchStatus::Pending {
        return Ok(());
    }

    if m.vacant == [true, true] {
        m.status = MatchStatus::Skipped;
        let targets = [m.next_match, m.loser_next];
        debug!("Match {id} skipped, no players can reach it");
        for target in targets.into_iter().flatten() {
            fill_slot(matches, target, None)?;
        }
        return Ok(());
    }

    if m.is_bye() {
        m.winner = m.player1.clone().or_else(|| m.player2.clone());
        m.status = MatchStatus::Complete;
        debug!(
            "Match {id} is a bye for {}",
            m.winner.as_deref().unwrap_or_default()
        );
        advance(matches, id)?;
    }
    Ok(())
}

/// Propagate a completed match's winner and loser along its pointers
fn advance(matches: &mut [Match], id: MatchId) -> TournamentResult<()> {
    let m = find(matches, id)?;
    let winner = m.winner.clone();
    let loser = m.loser().cloned();
    let won_from_upper = m.winner_slot() == Some(Slot::Player1);
    let (next, loser_next, is_grand_final) = (m.next_match, m.loser_next, m.is_grand_final);

    if is_grand_final {
        if let Some(reset) = next {
            seat_reset(matches, reset.match_id, winner, loser, won_from_upper)?;
        }
        return Ok(());
    }

    if let Some(target) = next {
        fill_slot(matches, target, winner)?;
    }
    if let Some(target) = loser_next {
        fill_slot(matches, target, loser)?;
    }
    Ok(())
}

/// Seat the grand-final reset. When the winners-bracket champion took the
/// grand final the reset is settled without play and the loser is not seated.
fn seat_reset(
    matches: &mut [Match],
    reset_id: MatchId,
    winner: Option<PlayerName>,
    loser: Option<PlayerName>,
    won_from_upper: bool,
) -> TournamentResult<()> {
    let reset = find_mut(matches, reset_id)?;
    if won_from_upper || loser.is_none() {
        reset.player1 = winner.clone();
        reset.player2 = None;
        reset.vacant = [false, true];
        reset.winner = winner;
        reset.status = MatchStatus::Complete;
        debug!("Grand final reset {reset_id} not needed");
    } else {
        reset.player1 = winner;
        reset.player2 = loser;
        reset.vacant = [false, false];
        debug!("Grand final reset {reset_id} will be played");
    }
    Ok(())
}
