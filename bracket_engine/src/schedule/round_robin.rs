//! Round-robin scheduling with the circle method.

use crate::bracket::{
    models::{Match, MatchId, PlayerName, Stage},
    validate_players,
};
use crate::errors::TournamentResult;
use log::info;
use rand::seq::SliceRandom;

/// Index pairs for every round of an `n`-player round robin.
///
/// An odd field gets a phantom seat; pairs against it are dropped, so the
/// player drawn against it sits that round out.
pub fn pairings(n: usize) -> Vec<Vec<(usize, usize)>> {
    if n < 2 {
        return Vec::new();
    }

    // `None` is the phantom seat
    let mut seats: Vec<Option<usize>> = (0..n).map(Some).collect();
    if n % 2 == 1 {
        seats.push(None);
    }
    let size = seats.len();

    (0..size - 1)
        .map(|_| {
            let round = (0..size / 2)
                .filter_map(|i| match (seats[i], seats[size - 1 - i]) {
                    (Some(a), Some(b)) => Some((a, b)),
                    _ => None,
                })
                .collect();
            // First seat stays put, everyone else moves one place
            seats[1..].rotate_right(1);
            round
        })
        .collect()
}

/// Generate every match of a round robin.
///
/// # Errors
///
/// Fails for fewer than two players, blank names, or duplicate names.
pub fn generate(
    players: &[PlayerName],
    shuffle: bool,
    first_id: MatchId,
    stage: Stage,
) -> TournamentResult<Vec<Match>> {
    validate_players(players, 2)?;

    let mut order = players.to_vec();
    if shuffle {
        order.shuffle(&mut rand::rng());
    }

    let mut next_id = first_id;
    let mut matches = Vec::with_capacity(order.len() * (order.len() - 1) / 2);
    for (round, pairs) in pairings(order.len()).into_iter().enumerate() {
        for (position, (a, b)) in pairs.into_iter().enumerate() {
            matches.push(Match::with_players(
                next_id,
                round as u32 + 1,
                position as u32,
                stage,
                Some(order[a].clone()),
                Some(order[b].clone()),
            ));
            next_id = next_id.next();
        }
    }

    info!(
        "Generated round robin ({stage}): {} players, {} matches",
        order.len(),
        matches.len()
    );
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn players(n: usize) -> Vec<PlayerName> {
        (1..=n).map(|i| format!("P{i}")).collect()
    }

    #[test]
    fn test_match_count() {
        for n in 2..=17 {
            let matches = generate(&players(n), false, MatchId(1), Stage::Main).unwrap();
            assert_eq!(matches.len(), n * (n - 1) / 2, "{n} players");
        }
    }

    #[test]
    fn test_every_pair_once_and_no_double_booking() {
        for n in 2..=12 {
            let matches = generate(&players(n), false, MatchId(1), Stage::Main).unwrap();

            let mut pairs = HashSet::new();
            for m in &matches {
                let a = m.player1.clone().unwrap();
                let b = m.player2.clone().unwrap();
                assert_ne!(a, b);
                let key = if a < b { (a, b) } else { (b, a) };
                assert!(pairs.insert(key), "{n} players: pair repeated");
            }

            let rounds = matches.iter().map(|m| m.round).max().unwrap();
            for round in 1..=rounds {
                let mut seen = HashSet::new();
                for m in matches.iter().filter(|m| m.round == round) {
                    assert!(seen.insert(m.player1.clone()));
                    assert!(seen.insert(m.player2.clone()));
                }
            }
        }
    }

    #[test]
    fn test_round_counts() {
        // Even field: n - 1 rounds; odd field: n rounds, one player sitting out
        assert_eq!(pairings(6).len(), 5);
        assert!(pairings(6).iter().all(|r| r.len() == 3));
        assert_eq!(pairings(5).len(), 5);
        assert!(pairings(5).iter().all(|r| r.len() == 2));
        assert!(pairings(1).is_empty());
    }

    #[test]
    fn test_matches_ready_to_play() {
        let matches = generate(&players(4), false, MatchId(5), Stage::GroupA).unwrap();
        assert!(matches.iter().all(|m| m.is_ready()));
        assert!(matches.iter().all(|m| m.next_match.is_none()));
        assert!(matches.iter().all(|m| m.stage == Stage::GroupA));
        assert_eq!(matches[0].id, MatchId(5));
    }

    #[test]
    fn test_rejects_duplicates() {
        let roster: Vec<PlayerName> = vec!["a".into(), "b".into(), "a".into()];
        assert!(generate(&roster, false, MatchId(1), Stage::Main).is_err());
    }
}
