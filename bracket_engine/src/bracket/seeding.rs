//! Bracket sizing and standard seed placement.

use super::models::PlayerName;
use crate::errors::{TournamentError, TournamentResult};

/// Smallest power of two that fits `n` players (minimum 2)
pub fn bracket_size(n: usize) -> usize {
    n.max(2).next_power_of_two()
}

/// Map each seed (0 = top seed) to its slot in round 1.
///
/// Slots `2k` and `2k + 1` form round-1 match `k`. Seed `s` always shares a
/// match with seed `size - 1 - s`, and each half of the bracket holds one of
/// the top two seeds.
pub fn seed_order(size: usize) -> TournamentResult<Vec<usize>> {
    if size < 2 || !size.is_power_of_two() {
        return Err(TournamentError::InvalidBracketSize(size));
    }

    // Slot -> seed, doubled one level at a time: every seed is followed by
    // its mirror in the next larger bracket.
    let mut seeds_by_slot = vec![0usize];
    while seeds_by_slot.len() < size {
        let mirror = seeds_by_slot.len() * 2 - 1;
        seeds_by_slot = seeds_by_slot
            .iter()
            .flat_map(|&seed| [seed, mirror - seed])
            .collect();
    }

    let mut order = vec![0usize; size];
    for (slot, &seed) in seeds_by_slot.iter().enumerate() {
        order[seed] = slot;
    }
    Ok(order)
}

/// Place `players` (in seed order) into bracket slots; unfilled slots are byes
pub fn distribute_byes(
    players: &[PlayerName],
    size: usize,
    order: &[usize],
) -> Vec<Option<PlayerName>> {
    let mut slots = vec![None; size];
    for (seed, player) in players.iter().enumerate().take(order.len()) {
        slots[order[seed]] = Some(player.clone());
    }
    slots
}
