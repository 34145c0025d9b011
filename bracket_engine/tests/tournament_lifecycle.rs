//! End-to-end tournament lifecycle tests.
//!
//! Each format is generated from a configuration and played to completion
//! with randomly chosen winners, checking the match graph along the way.

use bracket_engine::{
    BracketType, Match, MatchId, MatchOutcome, MatchStatus, MultiStageConfig, PlayerName, Stage,
    Tournament, TournamentConfig, TournamentFormat, TournamentStatus,
    schedule::FinalsFormat,
};
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::collections::{HashMap, HashSet};

fn roster(n: usize) -> Vec<PlayerName> {
    (1..=n).map(|i| format!("Player {i}")).collect()
}

/// Play every ready match with a coin flip for the winner
fn play_randomly(tournament: &mut Tournament, rng: &mut StdRng) {
    let mut guard = 0;
    loop {
        let next = tournament.ready_matches().next().map(|m| m.id);
        let Some(id) = next else { break };
        let m = tournament.match_by_id(id).unwrap();
        let (p1, p2) = (m.player1.clone().unwrap(), m.player2.clone().unwrap());
        let outcome = if rng.random_bool(0.5) {
            MatchOutcome::new(p1, 7, rng.random_range(0..7))
        } else {
            MatchOutcome::new(p2, rng.random_range(0..7), 7)
        };
        tournament.record_result(id, outcome).unwrap();

        guard += 1;
        assert!(guard < 10_000, "tournament never finished");
    }
}

fn assert_graph_is_forward(matches: &[Match]) {
    let ids: HashSet<MatchId> = matches.iter().map(|m| m.id).collect();
    for m in matches {
        for target in [m.next_match, m.loser_next].into_iter().flatten() {
            assert!(ids.contains(&target.match_id), "dangling pointer from {}", m.id);
            assert!(target.match_id > m.id, "pointer from {} goes backwards", m.id);
        }
    }
}

fn assert_results_consistent(matches: &[Match]) {
    for m in matches {
        match m.status {
            MatchStatus::Complete => {
                let winner = m.winner.as_deref().expect("complete match without winner");
                assert!(m.has_player(winner), "match {} winner not seated", m.id);
            }
            MatchStatus::Skipped => assert!(m.winner.is_none()),
            other => panic!("match {} left {other}", m.id),
        }
    }
}

#[test]
fn test_single_elimination_random_play() {
    let mut rng = StdRng::seed_from_u64(7);
    for n in 2..=33 {
        let config = TournamentConfig::new("SE", TournamentFormat::SingleElimination, roster(n));
        let mut t = Tournament::create(config).unwrap();
        let size = n.next_power_of_two().max(2);

        assert_eq!(t.matches.len(), size - 1);
        let byes = t.matches.iter().filter(|m| m.is_bye()).count();
        assert_eq!(byes, size - n);
        assert!(t.matches.iter().filter(|m| m.is_bye()).all(|m| m.round == 1));
        assert_graph_is_forward(&t.matches);

        play_randomly(&mut t, &mut rng);
        assert_eq!(t.status, TournamentStatus::Complete);
        assert_results_consistent(&t.matches);

        // The champion won every match they played
        let champion = t.champion().cloned().unwrap();
        assert!(
            t.matches
                .iter()
                .filter(|m| m.has_player(&champion))
                .all(|m| m.winner.as_ref() == Some(&champion))
        );
    }
}

#[test]
fn test_double_elimination_random_play() {
    let mut rng = StdRng::seed_from_u64(11);
    for n in 2..=24 {
        let config = TournamentConfig::new("DE", TournamentFormat::DoubleElimination, roster(n));
        let mut t = Tournament::create(config).unwrap();
        assert_graph_is_forward(&t.matches);

        play_randomly(&mut t, &mut rng);
        assert!(t.is_complete(), "{n} players did not finish");
        assert_results_consistent(&t.matches);

        let reset = t.matches.iter().find(|m| m.is_grand_final_reset).unwrap();
        assert_eq!(reset.status, MatchStatus::Complete);
        assert_eq!(t.champion(), reset.winner.as_ref());

        let mut losses: HashMap<&str, usize> = HashMap::new();
        for m in &t.matches {
            if let Some(loser) = m.loser() {
                *losses.entry(loser.as_str()).or_default() += 1;
            }
        }
        let champion = t.champion().unwrap();
        for player in &t.players {
            let lost = losses.get(player.as_str()).copied().unwrap_or(0);
            if player == champion {
                assert!(lost <= 1);
            } else {
                assert_eq!(lost, 2, "{n} players: {player} lost {lost} times");
            }
        }
    }
}

#[test]
fn test_double_elimination_power_of_two_sizes() {
    for size in [4usize, 8, 16, 32] {
        let config = TournamentConfig::new("DE", TournamentFormat::DoubleElimination, roster(size));
        let t = Tournament::create(config).unwrap();
        assert_eq!(t.matches.len(), (size - 1) + (size - 2) + 2);
        let losers = t
            .matches
            .iter()
            .filter(|m| m.bracket == Some(BracketType::Losers))
            .count();
        assert_eq!(losers, size - 2);
    }
}

#[test]
fn test_round_robin_random_play() {
    let mut rng = StdRng::seed_from_u64(3);
    for n in 2..=11 {
        let config =
            TournamentConfig::new("RR", TournamentFormat::RoundRobin, roster(n)).shuffled();
        let mut t = Tournament::create(config).unwrap();
        assert_eq!(t.matches.len(), n * (n - 1) / 2);

        play_randomly(&mut t, &mut rng);
        assert!(t.is_complete());

        let table = t.round_robin_standings();
        let wins: u32 = table.iter().map(|s| s.wins).sum();
        let losses: u32 = table.iter().map(|s| s.losses).sum();
        assert_eq!(wins as usize, t.matches.len());
        assert_eq!(losses as usize, t.matches.len());
        let differential: i64 = table.iter().map(|s| s.point_differential()).sum();
        assert_eq!(differential, 0);
    }
}

#[test]
fn test_swiss_random_play() {
    let mut rng = StdRng::seed_from_u64(19);
    for n in 2..=20 {
        let config = TournamentConfig::new("Swiss", TournamentFormat::Swiss, roster(n));
        let mut t = Tournament::create(config).unwrap();

        play_randomly(&mut t, &mut rng);
        assert!(t.is_complete());

        let state = t.swiss.as_ref().unwrap();
        assert_eq!(state.current_round, state.total_rounds);
        assert!(state.standings.iter().all(|s| s.byes <= 1));
        for s in &state.standings {
            assert_eq!(s.wins + s.losses, state.total_rounds, "{}", s.player);
        }

        let ranked = t.swiss_standings();
        assert!(
            ranked
                .windows(2)
                .all(|w| w[0].points() >= w[1].points())
        );
    }
}

#[test]
fn test_group_round_robin_random_play() {
    let mut rng = StdRng::seed_from_u64(23);
    for (n, finals_size, finals_format) in [
        (8, 4, FinalsFormat::SingleElimination),
        (9, 4, FinalsFormat::DoubleElimination),
        (12, 6, FinalsFormat::SingleElimination),
        (4, 2, FinalsFormat::DoubleElimination),
    ] {
        let format = TournamentFormat::GroupRoundRobin(MultiStageConfig {
            finals_size,
            finals_format,
        });
        let mut t =
            Tournament::create(TournamentConfig::new("Groups", format, roster(n)).shuffled())
                .unwrap();

        play_randomly(&mut t, &mut rng);
        assert!(t.is_complete(), "{n} players");

        let (a, b) = t.group_standings().unwrap();
        let qualifiers: HashSet<&PlayerName> = a
            .iter()
            .take(finals_size / 2)
            .chain(b.iter().take(finals_size / 2))
            .map(|s| &s.player)
            .collect();

        let finalists: HashSet<&PlayerName> = t
            .matches
            .iter()
            .filter(|m| m.stage == Stage::Finals)
            .flat_map(|m| [m.player1.as_ref(), m.player2.as_ref()])
            .flatten()
            .collect();
        assert_eq!(finalists, qualifiers);
        assert!(qualifiers.contains(t.champion().unwrap()));
    }
}

#[test]
fn test_invalid_configurations_rejected() {
    let too_few = TournamentConfig::new("x", TournamentFormat::SingleElimination, roster(1));
    assert!(Tournament::create(too_few).is_err());

    let mut dup = roster(3);
    dup.push("Player 1".to_string());
    let dup = TournamentConfig::new("x", TournamentFormat::Swiss, dup);
    assert!(Tournament::create(dup).is_err());

    let format = TournamentFormat::GroupRoundRobin(MultiStageConfig {
        finals_size: 8,
        finals_format: FinalsFormat::SingleElimination,
    });
    let oversized = TournamentConfig::new("x", format, roster(6));
    assert!(Tournament::create(oversized).is_err());
}
