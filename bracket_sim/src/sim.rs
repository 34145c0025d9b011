//! Plays a tournament to completion through simulated scoring devices.

use bracket_engine::{
    ManagerEvent, MatchId, MatchOutcome, PendingScoreSubmission, TournamentError,
    TournamentManager, TournamentResult,
};
use rand::{Rng, rngs::StdRng};
use std::collections::HashSet;
use tracing::{debug, info};

/// Loops without progress before the run is abandoned
const STALL_LIMIT: usize = 10_000;

/// Totals gathered over one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimReport {
    pub approved: usize,
    pub rejected: usize,
    pub rounds_generated: usize,
    pub champion: Option<String>,
}

pub struct Simulation {
    manager: TournamentManager,
    devices: Vec<String>,
    rng: StdRng,
    reject_rate: f64,
    /// Matches whose first submission was already judged
    judged: HashSet<MatchId>,
}

impl Simulation {
    pub fn new(
        manager: TournamentManager,
        device_count: usize,
        rng: StdRng,
        reject_rate: f64,
    ) -> TournamentResult<Self> {
        let mut sim = Self {
            manager,
            devices: (1..=device_count).map(|d| format!("device-{d}")).collect(),
            rng,
            reject_rate,
            judged: HashSet::new(),
        };
        for device in sim.devices.clone() {
            sim.manager.register_device(device)?;
        }
        Ok(sim)
    }

    pub fn manager(&self) -> &TournamentManager {
        &self.manager
    }

    pub fn into_manager(self) -> TournamentManager {
        self.manager
    }

    /// Run until the tournament completes
    ///
    /// # Errors
    ///
    /// Any manager error, or `anyhow` if no match can be played while the
    /// tournament is still open.
    pub fn run(&mut self) -> anyhow::Result<SimReport> {
        let mut report = SimReport::default();

        for _ in 0..STALL_LIMIT {
            if self.manager.tournament().is_complete() {
                report.champion = self.manager.tournament().champion().cloned();
                return Ok(report);
            }

            self.dispatch()?;
            let played = self.score_busy_devices()?;
            if played == 0 {
                anyhow::bail!("no playable match while the tournament is incomplete");
            }
            self.judge_submissions(&mut report)?;

            for event in self.manager.drain_events() {
                if let ManagerEvent::RoundGenerated { .. } = event {
                    report.rounds_generated += 1;
                }
                info!("{event}");
            }
        }

        anyhow::bail!("tournament did not finish within {STALL_LIMIT} steps")
    }

    /// Hand ready matches to idle devices and start them
    fn dispatch(&mut self) -> TournamentResult<()> {
        let ready: Vec<MatchId> = self.manager.ready_matches().iter().map(|m| m.id).collect();
        let idle: Vec<String> = self.manager.idle_devices().into_iter().cloned().collect();

        for (match_id, device) in ready.into_iter().zip(idle) {
            self.manager.assign_match(match_id, &device)?;
            self.manager.start_match(match_id)?;
        }
        Ok(())
    }

    /// Every device holding a match reports a result; returns how many did
    fn score_busy_devices(&mut self) -> TournamentResult<usize> {
        let busy: Vec<(String, MatchId)> = self
            .devices
            .iter()
            .filter_map(|d| self.manager.device_match(d).map(|m| (d.clone(), m)))
            .collect();

        for (device, match_id) in &busy {
            let outcome = self.play(*match_id)?;
            debug!("{device} reports {} for match {match_id}", outcome.winner);
            self.manager.receive_submission(PendingScoreSubmission::new(
                *match_id,
                device.as_str(),
                outcome,
            ))?;
        }
        Ok(busy.len())
    }

    fn judge_submissions(&mut self, report: &mut SimReport) -> TournamentResult<()> {
        let mut queued: Vec<MatchId> = self
            .manager
            .pending_submissions()
            .iter()
            .map(|s| s.match_id)
            .collect();
        // Submission clocks can tie; keep the rng draws reproducible
        queued.sort();

        for match_id in queued {
            let first = self.judged.insert(match_id);
            if first && self.rng.random_bool(self.reject_rate) {
                self.manager.reject(match_id, "score sheet does not match")?;
                report.rejected += 1;
            } else {
                self.manager.approve(match_id)?;
                report.approved += 1;
            }
        }
        Ok(())
    }

    /// Random result for a seated match, respecting the scoring mode
    fn play(&mut self, match_id: MatchId) -> TournamentResult<MatchOutcome> {
        let m = self
            .manager
            .tournament()
            .match_by_id(match_id)
            .ok_or(TournamentError::MatchNotFound(match_id))?;
        let (Some(p1), Some(p2)) = (m.player1.clone(), m.player2.clone()) else {
            return Err(TournamentError::MatchNotReady(match_id));
        };

        let first_wins = self.rng.random_bool(0.5);
        let winning = 21;
        let losing = self.rng.random_range(0..winning - 1);
        let (winner, score1, score2) = if first_wins {
            (p1, winning, losing)
        } else {
            (p2, losing, winning)
        };

        let mut outcome = MatchOutcome::new(winner, score1, score2);
        let sets = self.manager.tournament().scoring.best_of.sets_to_win();
        if sets > 1 {
            let lost_sets = self.rng.random_range(0..sets);
            outcome = if first_wins {
                outcome.with_sets(sets, lost_sets)
            } else {
                outcome.with_sets(lost_sets, sets)
            };
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bracket_engine::{Tournament, TournamentConfig, TournamentFormat};
    use rand::SeedableRng;

    fn simulation(
        format: TournamentFormat,
        players: usize,
        devices: usize,
        reject: f64,
    ) -> Simulation {
        let roster = (1..=players).map(|i| format!("P{i}")).collect();
        let tournament = Tournament::create(TournamentConfig::new("Sim", format, roster)).unwrap();
        Simulation::new(
            TournamentManager::new(tournament),
            devices,
            StdRng::seed_from_u64(4),
            reject,
        )
        .unwrap()
    }

    #[test]
    fn test_every_format_completes() {
        for format in [
            TournamentFormat::SingleElimination,
            TournamentFormat::DoubleElimination,
            TournamentFormat::Swiss,
            TournamentFormat::RoundRobin,
            TournamentFormat::GroupRoundRobin(Default::default()),
        ] {
            let mut sim = simulation(format, 10, 3, 0.25);
            let report = sim.run().unwrap();
            assert!(sim.manager().tournament().is_complete(), "{format}");
            assert_eq!(report.champion.as_ref(), sim.manager().tournament().champion());
            assert!(sim.manager().pending_submissions().is_empty());
        }
    }

    #[test]
    fn test_rejections_are_replayed() {
        let mut sim = simulation(TournamentFormat::RoundRobin, 6, 2, 0.9);
        let report = sim.run().unwrap();
        assert!(report.rejected > 0);
        // Only first submissions are ever rejected
        assert!(report.rejected <= report.approved);
        assert_eq!(report.approved, 15);
    }

    #[test]
    fn test_same_seed_same_champion() {
        let a = simulation(TournamentFormat::DoubleElimination, 9, 2, 0.1).run().unwrap();
        let b = simulation(TournamentFormat::DoubleElimination, 9, 2, 0.1).run().unwrap();
        assert_eq!(a, b);
    }
}
