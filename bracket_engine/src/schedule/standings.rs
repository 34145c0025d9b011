//! Per-player standings for Swiss and round-robin play.

use crate::bracket::models::{Match, MatchStatus, PlayerName};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Swiss standing for one player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwissStanding {
    pub player: PlayerName,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    /// Opponents already faced, in play order
    pub opponents: Vec<PlayerName>,
    /// Byes received
    pub byes: u32,
    /// Buchholz tiebreak, refreshed after every result
    pub buchholz: f64,
}

impl SwissStanding {
    pub fn new(player: PlayerName) -> Self {
        Self {
            player,
            wins: 0,
            losses: 0,
            draws: 0,
            opponents: Vec::new(),
            byes: 0,
            buchholz: 0.0,
        }
    }

    /// Match points: one per win, half per draw
    pub fn points(&self) -> f64 {
        f64::from(self.wins) + 0.5 * f64::from(self.draws)
    }

    pub fn has_played(&self, opponent: &str) -> bool {
        self.opponents.iter().any(|o| o == opponent)
    }

    /// Ranking order: points, then Buchholz, both descending
    pub fn compare(&self, other: &Self) -> Ordering {
        other
            .points()
            .total_cmp(&self.points())
            .then_with(|| other.buchholz.total_cmp(&self.buchholz))
    }
}

/// Round-robin standing for one player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRobinStanding {
    pub player: PlayerName,
    pub wins: u32,
    pub losses: u32,
    pub points_for: u32,
    pub points_against: u32,
}

impl RoundRobinStanding {
    pub fn new(player: PlayerName) -> Self {
        Self {
            player,
            wins: 0,
            losses: 0,
            points_for: 0,
            points_against: 0,
        }
    }

    pub fn point_differential(&self) -> i64 {
        i64::from(self.points_for) - i64::from(self.points_against)
    }

    /// Ranking order: wins, point differential, points scored
    pub fn compare(&self, other: &Self) -> Ordering {
        other
            .wins
            .cmp(&self.wins)
            .then_with(|| other.point_differential().cmp(&self.point_differential()))
            .then_with(|| other.points_for.cmp(&self.points_for))
    }
}

/// Fold one completed round-robin match into the table
pub fn record_round_robin(standings: &mut [RoundRobinStanding], m: &Match) {
    if m.status != MatchStatus::Complete {
        return;
    }
    let (Some(p1), Some(p2)) = (&m.player1, &m.player2) else {
        return;
    };
    let p1_won = m.winner.as_ref() == Some(p1);

    for standing in standings.iter_mut() {
        if &standing.player == p1 {
            standing.points_for += m.score1;
            standing.points_against += m.score2;
            if p1_won {
                standing.wins += 1;
            } else {
                standing.losses += 1;
            }
        } else if &standing.player == p2 {
            standing.points_for += m.score2;
            standing.points_against += m.score1;
            if p1_won {
                standing.losses += 1;
            } else {
                standing.wins += 1;
            }
        }
    }
}

/// Sort a round-robin table best first; ties keep entry order
pub fn rank_round_robin(standings: &mut [RoundRobinStanding]) {
    standings.sort_by(RoundRobinStanding::compare);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::models::{MatchId, MatchOutcome, Stage};

    fn played(p1: &str, p2: &str, winner: &str, s1: u32, s2: u32) -> Match {
        let mut m = Match::with_players(
            MatchId(1),
            1,
            0,
            Stage::Main,
            Some(p1.to_string()),
            Some(p2.to_string()),
        );
        m.apply_outcome(MatchOutcome::new(winner, s1, s2));
        m
    }

    #[test]
    fn test_round_robin_record_and_rank() {
        let mut table: Vec<RoundRobinStanding> = ["a", "b", "c"]
            .iter()
            .map(|p| RoundRobinStanding::new(p.to_string()))
            .collect();

        record_round_robin(&mut table, &played("a", "b", "b", 5, 11));
        record_round_robin(&mut table, &played("a", "c", "a", 11, 9));
        record_round_robin(&mut table, &played("b", "c", "c", 10, 12));

        // One win each, so point differential decides
        rank_round_robin(&mut table);
        let order: Vec<&str> = table.iter().map(|s| s.player.as_str()).collect();
        assert_eq!(order, vec!["b", "c", "a"]);
        assert_eq!(table[0].point_differential(), 4);
        assert_eq!(table[1].point_differential(), 0);
        assert_eq!(table[2].point_differential(), -4);
    }

    #[test]
    fn test_unfinished_match_ignored() {
        let mut table = vec![RoundRobinStanding::new("a".into())];
        let m = Match::with_players(
            MatchId(1),
            1,
            0,
            Stage::Main,
            Some("a".into()),
            Some("b".into()),
        );
        record_round_robin(&mut table, &m);
        assert_eq!(table[0].wins + table[0].losses, 0);
    }

    #[test]
    fn test_swiss_compare() {
        let mut leader = SwissStanding::new("a".into());
        leader.wins = 2;
        let mut chaser = SwissStanding::new("b".into());
        chaser.wins = 1;
        chaser.draws = 1;
        chaser.buchholz = 9.0;

        assert_eq!(chaser.points(), 1.5);
        assert_eq!(leader.compare(&chaser), Ordering::Less);

        chaser.draws = 2;
        leader.buchholz = 3.0;
        chaser.wins = 1;
        // 2.0 points each, higher Buchholz first
        assert_eq!(chaser.compare(&leader), Ordering::Less);
    }
}
