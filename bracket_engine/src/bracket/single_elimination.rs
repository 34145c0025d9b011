//! Single-elimination bracket generation.

use super::{
    models::{Match, MatchId, PlayerName, Slot, SlotRef, Stage},
    progression,
    seeding::{bracket_size, distribute_byes, seed_order},
    validate_players,
};
use crate::errors::TournamentResult;
use log::info;
use rand::seq::SliceRandom;

/// Generate a complete single-elimination bracket.
///
/// `players` are taken in seed order unless `shuffle` is set. Match ids are
/// allocated sequentially from `first_id`, round by round. Round-1 byes are
/// resolved before returning, so their winners already sit in round 2.
///
/// # Errors
///
/// Fails with an invalid-input error for fewer than two players, blank
/// names, or duplicate names.
pub fn generate(
    players: &[PlayerName],
    shuffle: bool,
    first_id: MatchId,
    stage: Stage,
) -> TournamentResult<Vec<Match>> {
    let (mut matches, rounds) = build_rounds(players, shuffle, first_id, stage)?;
    progression::resolve_byes(&mut matches, &rounds[0])?;

    info!(
        "Generated single-elimination bracket: {} players, {} matches",
        players.len(),
        matches.len()
    );
    Ok(matches)
}

/// Build and link every round without resolving byes.
///
/// Returns the matches together with their ids grouped by round, so other
/// generators can wire additional edges before byes propagate.
pub(crate) fn build_rounds(
    players: &[PlayerName],
    shuffle: bool,
    first_id: MatchId,
    stage: Stage,
) -> TournamentResult<(Vec<Match>, Vec<Vec<MatchId>>)> {
    validate_players(players, 2)?;

    let mut seeded = players.to_vec();
    if shuffle {
        seeded.shuffle(&mut rand::rng());
    }

    let size = bracket_size(seeded.len());
    let order = seed_order(size)?;
    let slots = distribute_byes(&seeded, size, &order);
    let rounds = size.trailing_zeros();

    let mut matches = Vec::with_capacity(size - 1);
    let mut rounds_ids: Vec<Vec<MatchId>> = Vec::with_capacity(rounds as usize);
    let mut next_id = first_id;

    for round in 1..=rounds {
        let count = (size >> round) as u32;
        let mut ids = Vec::with_capacity(count as usize);
        for position in 0..count {
            let m = if round == 1 {
                let left = position as usize * 2;
                Match::with_players(
                    next_id,
                    round,
                    position,
                    stage,
                    slots[left].clone(),
                    slots[left + 1].clone(),
                )
            } else {
                Match::new(next_id, round, position, stage)
            };
            ids.push(m.id);
            matches.push(m);
            next_id = next_id.next();
        }
        rounds_ids.push(ids);
    }

    // Every match feeds the match at half its position one round later
    for m in &mut matches {
        if let Some(next_round) = rounds_ids.get(m.round as usize) {
            let target = next_round[(m.position / 2) as usize];
            m.next_match = Some(SlotRef::new(target, Slot::for_position(m.position)));
        }
    }

    Ok((matches, rounds_ids))
}
