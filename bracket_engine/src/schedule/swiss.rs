//! Swiss system: fixed first round, then rounds paired from the standings.
//!
//! Later rounds rank the field by points and Buchholz, then pair from the
//! top down. The pairing search backtracks out of dead ends so players who
//! already met are never paired again while any rematch-free pairing of the
//! field exists. With an odd field the lowest-ranked player without a bye
//! sits out and is credited with a win.

use super::standings::SwissStanding;
use crate::bracket::{
    models::{Match, MatchId, MatchStatus, PlayerName, Stage},
    progression, validate_players,
};
use crate::errors::TournamentResult;
use log::{debug, info, warn};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Nodes the pairing search may visit for one bye candidate
const SEARCH_BUDGET: u32 = 200_000;

/// Pairings for one Swiss round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwissPairing {
    /// Pairs in board order, higher-ranked player first
    pub pairs: Vec<(PlayerName, PlayerName)>,
    pub bye: Option<PlayerName>,
    /// At least one pair repeats an earlier match
    pub has_rematch: bool,
}

/// Number of rounds for `players` entrants: `ceil(log2(n))`, at least one
pub fn round_count(players: usize) -> u32 {
    players.max(2).next_power_of_two().trailing_zeros()
}

pub fn initial_standings(players: &[PlayerName]) -> Vec<SwissStanding> {
    players.iter().cloned().map(SwissStanding::new).collect()
}

/// Generate round 1 by pairing consecutive entries.
///
/// An odd last entry receives a bye that is completed immediately.
///
/// # Errors
///
/// Fails for fewer than two players, blank names, or duplicate names.
pub fn generate_first_round(
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

    let pairs = order
        .chunks(2)
        .map(|chunk| (chunk[0].clone(), chunk.get(1).cloned()))
        .collect::<Vec<_>>();
    let matches = build_round(pairs, 1, first_id, stage)?;

    info!(
        "Generated Swiss round 1 of {}: {} players, {} matches",
        round_count(order.len()),
        order.len(),
        matches.len()
    );
    Ok(matches)
}

/// Generate matches for a later round from the current standings.
///
/// # Errors
///
/// Only fails if the generated arena is inconsistent.
pub fn generate_round(
    standings: &[SwissStanding],
    round: u32,
    first_id: MatchId,
    stage: Stage,
) -> TournamentResult<Vec<Match>> {
    let pairing = pair_next_round(standings);
    if pairing.has_rematch {
        warn!("Swiss round {round}: no rematch-free pairing exists, repeating opponents");
    }

    let mut pairs: Vec<(PlayerName, Option<PlayerName>)> = pairing
        .pairs
        .into_iter()
        .map(|(a, b)| (a, Some(b)))
        .collect();
    if let Some(bye) = pairing.bye {
        pairs.push((bye, None));
    }

    let matches = build_round(pairs, round, first_id, stage)?;
    info!("Generated Swiss round {round}: {} matches", matches.len());
    Ok(matches)
}

fn build_round(
    pairs: Vec<(PlayerName, Option<PlayerName>)>,
    round: u32,
    first_id: MatchId,
    stage: Stage,
) -> TournamentResult<Vec<Match>> {
    let mut next_id = first_id;
    let mut matches: Vec<Match> = pairs
        .into_iter()
        .enumerate()
        .map(|(position, (a, b))| {
            let m = Match::with_players(next_id, round, position as u32, stage, Some(a), b);
            next_id = next_id.next();
            m
        })
        .collect();

    let ids: Vec<MatchId> = matches.iter().map(|m| m.id).collect();
    progression::resolve_byes(&mut matches, &ids)?;
    Ok(matches)
}

/// Fold one resolved match (a result or a bye) into the standings and
/// refresh every Buchholz score
pub fn record_match(standings: &mut [SwissStanding], m: &Match) {
    if m.status != MatchStatus::Complete {
        return;
    }
    let Some(winner) = m.winner.as_deref() else {
        return;
    };

    match m.loser() {
        Some(loser) => {
            for standing in standings.iter_mut() {
                if standing.player == winner {
                    standing.wins += 1;
                    standing.opponents.push(loser.clone());
                } else if &standing.player == loser {
                    standing.losses += 1;
                    standing.opponents.push(winner.to_string());
                }
            }
        }
        None => {
            if let Some(standing) = standings.iter_mut().find(|s| s.player == winner) {
                standing.wins += 1;
                standing.byes += 1;
            }
        }
    }

    recompute_buchholz(standings);
}

/// Sum of opponents' points, plus half the field's average per bye
pub fn recompute_buchholz(standings: &mut [SwissStanding]) {
    if standings.is_empty() {
        return;
    }
    let points: HashMap<&str, f64> = standings
        .iter()
        .map(|s| (s.player.as_str(), s.points()))
        .collect();
    let average = points.values().sum::<f64>() / standings.len() as f64;

    let scores: Vec<f64> = standings
        .iter()
        .map(|s| {
            let faced: f64 = s
                .opponents
                .iter()
                .filter_map(|o| points.get(o.as_str()))
                .sum();
            faced + f64::from(s.byes) * 0.5 * average
        })
        .collect();

    for (standing, score) in standings.iter_mut().zip(scores) {
        standing.buchholz = score;
    }
}

/// Indices of `standings` in ranking order; ties keep entry order
pub fn ranking(standings: &[SwissStanding]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..standings.len()).collect();
    order.sort_by(|&a, &b| standings[a].compare(&standings[b]));
    order
}

/// Pair the next round.
///
/// Each bye candidate is tried from the bottom of the table up; the first
/// one that leaves a rematch-free pairing wins. If none does, the field is
/// paired greedily and rematches are allowed.
pub fn pair_next_round(standings: &[SwissStanding]) -> SwissPairing {
    let ranked = ranking(standings);

    let candidates: Vec<Option<usize>> = if ranked.len() % 2 == 0 {
        vec![None]
    } else {
        bye_candidates(standings, &ranked)
    };

    for &bye in &candidates {
        let field: Vec<usize> = ranked.iter().copied().filter(|&i| Some(i) != bye).collect();
        let mut used = vec![false; field.len()];
        let mut pairs = Vec::with_capacity(field.len() / 2);
        let mut budget = SEARCH_BUDGET;

        if search(standings, &field, &mut used, &mut pairs, &mut budget) {
            return to_pairing(standings, &pairs, bye, false);
        }
        if budget == 0 {
            debug!("Swiss pairing search budget exhausted");
        }
    }

    let bye = candidates.first().copied().flatten();
    let field: Vec<usize> = ranked.iter().copied().filter(|&i| Some(i) != bye).collect();
    let pairs = greedy(standings, &field);
    let has_rematch = pairs
        .iter()
        .any(|&(a, b)| standings[a].has_played(&standings[b].player));
    to_pairing(standings, &pairs, bye, has_rematch)
}

/// Players eligible for the bye, lowest-ranked first
fn bye_candidates(standings: &[SwissStanding], ranked: &[usize]) -> Vec<Option<usize>> {
    let fewest = ranked.iter().map(|&i| standings[i].byes).min().unwrap_or(0);
    ranked
        .iter()
        .rev()
        .copied()
        .filter(|&i| standings[i].byes == fewest)
        .map(Some)
        .collect()
}

/// Depth-first pairing over `field` (ranking order) avoiding rematches
fn search(
    standings: &[SwissStanding],
    field: &[usize],
    used: &mut [bool],
    pairs: &mut Vec<(usize, usize)>,
    budget: &mut u32,
) -> bool {
    let Some(top) = used.iter().position(|&u| !u) else {
        return true;
    };
    used[top] = true;

    for next in top + 1..field.len() {
        if used[next] {
            continue;
        }
        if *budget == 0 {
            break;
        }
        *budget -= 1;

        let (a, b) = (field[top], field[next]);
        if standings[a].has_played(&standings[b].player) {
            continue;
        }

        used[next] = true;
        pairs.push((a, b));
        if search(standings, field, used, pairs, budget) {
            return true;
        }
        pairs.pop();
        used[next] = false;
    }

    used[top] = false;
    false
}

/// Top-down pairing that prefers new opponents but never backtracks
fn greedy(standings: &[SwissStanding], field: &[usize]) -> Vec<(usize, usize)> {
    let mut used = vec![false; field.len()];
    let mut pairs = Vec::with_capacity(field.len() / 2);

    while let Some(top) = used.iter().position(|&u| !u) {
        used[top] = true;
        let open: Vec<usize> = (top + 1..field.len()).filter(|&j| !used[j]).collect();
        let fresh = open
            .iter()
            .copied()
            .find(|&j| !standings[field[top]].has_played(&standings[field[j]].player));
        let Some(next) = fresh.or_else(|| open.first().copied()) else {
            break;
        };
        used[next] = true;
        pairs.push((field[top], field[next]));
    }
    pairs
}

fn to_pairing(
    standings: &[SwissStanding],
    pairs: &[(usize, usize)],
    bye: Option<usize>,
    has_rematch: bool,
) -> SwissPairing {
    SwissPairing {
        pairs: pairs
            .iter()
            .map(|&(a, b)| (standings[a].player.clone(), standings[b].player.clone()))
            .collect(),
        bye: bye.map(|i| standings[i].player.clone()),
        has_rematch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::models::MatchOutcome;
    use std::collections::HashSet;

    fn players(n: usize) -> Vec<PlayerName> {
        (1..=n).map(|i| format!("P{i}")).collect()
    }

    fn standing(name: &str, wins: u32, opponents: &[&str]) -> SwissStanding {
        let mut s = SwissStanding::new(name.to_string());
        s.wins = wins;
        s.opponents = opponents.iter().map(|o| o.to_string()).collect();
        s
    }

    /// Play a whole Swiss event, first seat always winning
    fn play_event(n: usize) -> (Vec<SwissStanding>, Vec<Match>) {
        let roster = players(n);
        let mut standings = initial_standings(&roster);
        let mut all = generate_first_round(&roster, false, MatchId(1), Stage::Main).unwrap();

        for round in 1..=round_count(n) {
            if round > 1 {
                let next_id = MatchId(all.len() as u32 + 1);
                all.extend(generate_round(&standings, round, next_id, Stage::Main).unwrap());
            }
            for m in all.iter_mut().filter(|m| m.round == round) {
                if m.status == MatchStatus::Pending {
                    let winner = m.player1.clone().unwrap();
                    m.apply_outcome(MatchOutcome::new(winner, 3, 1));
                }
                record_match(&mut standings, m);
            }
        }
        (standings, all)
    }

    #[test]
    fn test_round_count() {
        assert_eq!(round_count(2), 1);
        assert_eq!(round_count(3), 2);
        assert_eq!(round_count(8), 3);
        assert_eq!(round_count(9), 4);
        assert_eq!(round_count(1), 1);
    }

    #[test]
    fn test_first_round_odd_field_gets_bye() {
        let matches = generate_first_round(&players(5), false, MatchId(1), Stage::Main).unwrap();
        assert_eq!(matches.len(), 3);
        assert_eq!(matches[0].player1.as_deref(), Some("P1"));
        assert_eq!(matches[0].player2.as_deref(), Some("P2"));

        let bye = &matches[2];
        assert_eq!(bye.status, MatchStatus::Complete);
        assert_eq!(bye.winner.as_deref(), Some("P5"));
    }

    #[test]
    fn test_record_result_and_bye() {
        let mut standings = initial_standings(&players(3));
        let mut m = Match::with_players(
            MatchId(1),
            1,
            0,
            Stage::Main,
            Some("P1".into()),
            Some("P2".into()),
        );
        m.apply_outcome(MatchOutcome::new("P2", 1, 3));
        record_match(&mut standings, &m);

        let mut bye = Match::with_players(MatchId(2), 1, 1, Stage::Main, Some("P3".into()), None);
        bye.status = MatchStatus::Complete;
        bye.winner = Some("P3".into());
        record_match(&mut standings, &bye);

        assert_eq!(standings[0].losses, 1);
        assert_eq!(standings[0].opponents, vec!["P2".to_string()]);
        assert_eq!(standings[1].wins, 1);
        assert_eq!(standings[2].wins, 1);
        assert_eq!(standings[2].byes, 1);
        assert!(standings[2].opponents.is_empty());

        // P1 faced P2 (1 point); P3's bye is worth half the average (2/3)
        assert_eq!(standings[0].buchholz, 1.0);
        assert_eq!(standings[1].buchholz, 0.0);
        assert!((standings[2].buchholz - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_pairing_backtracks_to_avoid_rematch() {
        // Greedy would pair A-C then leave B-D, who already met
        let standings = vec![
            standing("A", 2, &["B"]),
            standing("B", 1, &["A", "D"]),
            standing("C", 1, &[]),
            standing("D", 0, &["B"]),
        ];
        let pairing = pair_next_round(&standings);
        assert!(!pairing.has_rematch);
        assert_eq!(
            pairing.pairs,
            vec![
                ("A".to_string(), "D".to_string()),
                ("B".to_string(), "C".to_string())
            ]
        );
    }

    #[test]
    fn test_bye_skips_players_who_had_one() {
        let mut standings = vec![
            standing("A", 1, &[]),
            standing("B", 1, &[]),
            standing("C", 0, &[]),
        ];
        standings[2].byes = 1;
        let pairing = pair_next_round(&standings);
        assert_eq!(pairing.bye.as_deref(), Some("B"));
    }

    #[test]
    fn test_forced_rematch_is_flagged() {
        let standings = vec![standing("A", 1, &["B"]), standing("B", 0, &["A"])];
        let pairing = pair_next_round(&standings);
        assert!(pairing.has_rematch);
        assert_eq!(pairing.pairs.len(), 1);
    }

    #[test]
    fn test_full_event_has_no_rematches_and_single_byes() {
        for n in 2..=17 {
            let (standings, matches) = play_event(n);

            let mut seen = HashSet::new();
            for m in matches.iter().filter(|m| !m.is_bye()) {
                let (a, b) = (m.player1.clone().unwrap(), m.player2.clone().unwrap());
                let key = if a < b { (a, b) } else { (b, a) };
                assert!(seen.insert(key), "{n} players: rematch");
            }

            assert!(standings.iter().all(|s| s.byes <= 1), "{n} players");

            // Every played match counts twice, every bye once
            let results: u32 = standings.iter().map(|s| s.wins + s.losses).sum();
            let byes: u32 = standings.iter().map(|s| s.byes).sum();
            assert_eq!(results + byes, matches.len() as u32 * 2);
        }
    }

    #[test]
    fn test_ranking_ties_keep_entry_order() {
        let standings = initial_standings(&players(4));
        assert_eq!(ranking(&standings), vec![0, 1, 2, 3]);
    }
}
