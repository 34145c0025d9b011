//! Double-elimination bracket generation.
//!
//! The winners bracket is a regular single-elimination tree. The losers
//! bracket alternates two kinds of rounds:
//!
//! - **minor** rounds, where losers-bracket survivors play each other and the
//!   match count halves;
//! - **major** rounds, where each survivor (first seat) meets a player who just
//!   dropped from the next winners round (second seat).
//!
//! The winners champion takes the first seat of the grand final and the
//! losers champion the second. The reset behind the grand final is only
//! played when the second seat wins.

use super::{
    models::{BracketType, Match, MatchId, PlayerName, Slot, SlotRef, Stage},
    progression::{self, find_mut},
    single_elimination,
};
use crate::errors::{TournamentError, TournamentResult};
use log::info;

/// Generate a complete double-elimination bracket.
///
/// # Errors
///
/// Same input validation as [`single_elimination::generate`].
pub fn generate(
    players: &[PlayerName],
    shuffle: bool,
    first_id: MatchId,
    stage: Stage,
) -> TournamentResult<Vec<Match>> {
    let (mut matches, winners) =
        single_elimination::build_rounds(players, shuffle, first_id, stage)?;
    for m in &mut matches {
        m.bracket = Some(BracketType::Winners);
    }

    let mut next_id = MatchId(first_id.0 + matches.len() as u32);
    let mut last_losers_round: Option<Vec<MatchId>> = None;
    let mut losers_round = 0u32;

    for drop_round in winners.iter().skip(1) {
        let count = drop_round.len() as u32;

        losers_round += 1;
        let minor = push_losers_round(&mut matches, &mut next_id, losers_round, count, stage);
        match &last_losers_round {
            // First minor round takes the winners round-1 losers pairwise
            None => {
                for (j, &feeder) in winners[0].iter().enumerate() {
                    let target = SlotRef::new(minor[j / 2], Slot::for_position(j as u32));
                    find_mut(&mut matches, feeder)?.loser_next = Some(target);
                }
            }
            Some(previous) => {
                for (j, &feeder) in previous.iter().enumerate() {
                    let target = SlotRef::new(minor[j / 2], Slot::for_position(j as u32));
                    find_mut(&mut matches, feeder)?.next_match = Some(target);
                }
            }
        }

        losers_round += 1;
        let major = push_losers_round(&mut matches, &mut next_id, losers_round, count, stage);
        for (j, (&survivor, &dropped)) in minor.iter().zip(drop_round.iter()).enumerate() {
            find_mut(&mut matches, survivor)?.next_match =
                Some(SlotRef::new(major[j], Slot::Player1));
            find_mut(&mut matches, dropped)?.loser_next =
                Some(SlotRef::new(major[j], Slot::Player2));
        }

        last_losers_round = Some(major);
    }

    let winners_rounds = winners.len() as u32;
    let grand_final_id = next_id;
    let reset_id = next_id.next();

    let mut grand_final = Match::new(grand_final_id, winners_rounds + 1, 0, stage);
    grand_final.bracket = Some(BracketType::GrandFinal);
    grand_final.is_grand_final = true;
    grand_final.next_match = Some(SlotRef::new(reset_id, Slot::Player1));
    grand_final.loser_next = Some(SlotRef::new(reset_id, Slot::Player2));

    let mut reset = Match::new(reset_id, winners_rounds + 2, 0, stage);
    reset.bracket = Some(BracketType::GrandFinal);
    reset.is_grand_final_reset = true;

    let Some(&winners_final) = winners.last().and_then(|round| round.first()) else {
        return Err(TournamentError::NotEnoughPlayers {
            needed: 2,
            actual: players.len(),
        });
    };
    find_mut(&mut matches, winners_final)?.next_match =
        Some(SlotRef::new(grand_final_id, Slot::Player1));

    let losers_champion_seat = SlotRef::new(grand_final_id, Slot::Player2);
    match last_losers_round.as_ref().and_then(|round| round.first()) {
        Some(&losers_final) => {
            find_mut(&mut matches, losers_final)?.next_match = Some(losers_champion_seat);
        }
        // Two-player bracket: the only loser goes straight to the grand final
        None => {
            find_mut(&mut matches, winners_final)?.loser_next = Some(losers_champion_seat);
        }
    }

    matches.push(grand_final);
    matches.push(reset);

    progression::resolve_byes(&mut matches, &winners[0])?;

    info!(
        "Generated double-elimination bracket: {} players, {} matches ({} losers rounds)",
        players.len(),
        matches.len(),
        losers_round
    );
    Ok(matches)
}

fn push_losers_round(
    matches: &mut Vec<Match>,
    next_id: &mut MatchId,
    round: u32,
    count: u32,
    stage: Stage,
) -> Vec<MatchId> {
    (0..count)
        .map(|position| {
            let mut m = Match::new(*next_id, round, position, stage);
            m.bracket = Some(BracketType::Losers);
            *next_id = next_id.next();
            let id = m.id;
            matches.push(m);
            id
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::models::{MatchOutcome, MatchStatus};
    use std::collections::HashMap;

    fn players(n: usize) -> Vec<PlayerName> {
        (1..=n).map(|i| format!("P{i}")).collect()
    }

    /// Play every ready match, letting `pick` choose the winner's seat
    fn play_out(matches: &mut Vec<Match>, pick: impl Fn(&Match) -> Slot) {
        loop {
            let Some(m) = matches
                .iter()
                .find(|m| m.status == MatchStatus::Pending && m.is_ready())
            else {
                break;
            };
            let id = m.id;
            let winner = m.player(pick(m)).cloned().unwrap();
            progression::complete_match(matches, id, MatchOutcome::new(winner, 2, 1)).unwrap();
        }
    }

    fn find_flag(matches: &[Match], f: impl Fn(&Match) -> bool) -> &Match {
        matches.iter().find(|m| f(m)).unwrap()
    }

    #[test]
    fn test_match_counts_for_power_of_two() {
        for size in [2usize, 4, 8, 16, 32] {
            let matches = generate(&players(size), false, MatchId(1), Stage::Main).unwrap();
            let count = |t: BracketType| matches.iter().filter(|m| m.bracket == Some(t)).count();
            assert_eq!(count(BracketType::Winners), size - 1, "size {size}");
            assert_eq!(count(BracketType::Losers), size - 2, "size {size}");
            assert_eq!(count(BracketType::GrandFinal), 2, "size {size}");
        }
    }

    #[test]
    fn test_losers_rounds_alternate() {
        let matches = generate(&players(8), false, MatchId(1), Stage::Main).unwrap();
        let per_round = |r: u32| {
            matches
                .iter()
                .filter(|m| m.bracket == Some(BracketType::Losers) && m.round == r)
                .count()
        };
        assert_eq!(
            (1..=4).map(per_round).collect::<Vec<_>>(),
            vec![2, 2, 1, 1]
        );
    }

    #[test]
    fn test_pointers_never_self_loop() {
        let matches = generate(&players(13), false, MatchId(1), Stage::Main).unwrap();
        for m in &matches {
            for target in [m.next_match, m.loser_next].into_iter().flatten() {
                assert_ne!(target.match_id, m.id);
                assert!(target.match_id > m.id, "pointers only move forward");
            }
        }
    }

    #[test]
    fn test_reset_skipped_when_winners_champion_wins() {
        let mut matches = generate(&players(4), false, MatchId(1), Stage::Main).unwrap();
        play_out(&mut matches, |_| Slot::Player1);

        let grand_final = find_flag(&matches, |m| m.is_grand_final);
        let reset = find_flag(&matches, |m| m.is_grand_final_reset);
        assert_eq!(grand_final.winner.as_deref(), Some("P1"));
        assert_eq!(reset.status, MatchStatus::Complete);
        assert_eq!(reset.winner.as_deref(), Some("P1"));
        assert!(matches.iter().all(|m| m.status.is_resolved()));
    }

    #[test]
    fn test_reset_played_when_losers_champion_wins() {
        let mut matches = generate(&players(4), false, MatchId(1), Stage::Main).unwrap();
        play_out(&mut matches, |m| {
            if m.is_grand_final {
                Slot::Player2
            } else {
                Slot::Player1
            }
        });

        let grand_final = find_flag(&matches, |m| m.is_grand_final).clone();
        let reset = find_flag(&matches, |m| m.is_grand_final_reset);
        assert_eq!(grand_final.winner_slot(), Some(Slot::Player2));
        assert_eq!(reset.status, MatchStatus::Complete);
        assert!(reset.is_ready());
        assert_eq!(reset.player1, grand_final.winner);
    }

    #[test]
    fn test_two_player_bracket() {
        let mut matches = generate(&players(2), false, MatchId(1), Stage::Main).unwrap();
        assert_eq!(matches.len(), 3);
        play_out(&mut matches, |m| {
            if m.is_grand_final {
                Slot::Player2
            } else {
                Slot::Player1
            }
        });
        let reset = find_flag(&matches, |m| m.is_grand_final_reset);
        assert_eq!(reset.status, MatchStatus::Complete);
    }

    #[test]
    fn test_byes_flow_into_losers_bracket() {
        // 5 players in an 8 bracket: three winners round-1 byes
        let matches = generate(&players(5), false, MatchId(1), Stage::Main).unwrap();
        let skipped = matches
            .iter()
            .filter(|m| m.status == MatchStatus::Skipped)
            .count();
        assert_eq!(skipped, 1, "one losers match receives two vacancies");
        assert!(
            matches
                .iter()
                .filter(|m| m.status == MatchStatus::Skipped)
                .all(|m| m.bracket == Some(BracketType::Losers))
        );
    }

    #[test]
    fn test_everyone_but_champion_loses_twice() {
        for n in 2..=20 {
            let mut matches = generate(&players(n), false, MatchId(1), Stage::Main).unwrap();
            play_out(&mut matches, |m| Slot::for_position(m.id.0 % 3));

            assert!(
                matches.iter().all(|m| m.status.is_resolved()),
                "{n} players left unresolved matches"
            );

            let mut losses: HashMap<&str, usize> = HashMap::new();
            for m in &matches {
                if let Some(loser) = m.loser() {
                    *losses.entry(loser.as_str()).or_default() += 1;
                }
            }
            let champion = find_flag(&matches, |m| m.is_grand_final_reset)
                .winner
                .clone()
                .unwrap();
            for p in players(n) {
                let expected = if p == champion { 0..=1 } else { 2..=2 };
                let got = losses.get(p.as_str()).copied().unwrap_or(0);
                assert!(expected.contains(&got), "{n} players: {p} lost {got} times");
            }
        }
    }
}
