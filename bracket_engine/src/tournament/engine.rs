//! Tournament lifecycle: generation, result application, stage advancement,
//! queries, and snapshots.

use super::models::{
    GroupStage, SwissState, Tournament, TournamentConfig, TournamentFormat, TournamentStatus,
    generate_room_code,
};
use crate::bracket::{
    double_elimination,
    models::{Match, MatchId, MatchOutcome, MatchStatus, PlayerName, Stage},
    progression, single_elimination,
};
use crate::errors::{TournamentError, TournamentResult};
use crate::schedule::{
    groups, round_robin,
    standings::{RoundRobinStanding, SwissStanding, rank_round_robin, record_round_robin},
    swiss,
};
use chrono::Utc;
use log::{debug, info};
use uuid::Uuid;

const FIRST_MATCH_ID: MatchId = MatchId(1);

/// What applying a result set in motion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultEffects {
    /// Rounds generated because a stage or round finished
    pub generated: Vec<(Stage, u32)>,
    /// The result completed the tournament
    pub completed: bool,
}

impl Tournament {
    /// Create a tournament from a validated configuration.
    ///
    /// No matches exist until [`Tournament::start`] is called.
    ///
    /// # Errors
    ///
    /// Returns the configuration's validation error.
    pub fn new(config: TournamentConfig) -> TournamentResult<Self> {
        config.validate()?;

        let room_code = config.room_code.unwrap_or_else(generate_room_code);
        let tournament = Self {
            id: Uuid::new_v4(),
            name: config.name,
            room_code,
            format: config.format,
            scoring: config.scoring,
            players: config.players,
            matches: Vec::new(),
            status: TournamentStatus::NotStarted,
            created_at: Utc::now(),
            next_match_id: FIRST_MATCH_ID,
            shuffle: config.shuffle,
            swiss: None,
            round_robin: Vec::new(),
            groups: None,
        };

        info!(
            "Created tournament '{}' ({}), room {}, {} players",
            tournament.name,
            tournament.format,
            tournament.room_code,
            tournament.players.len()
        );
        Ok(tournament)
    }

    /// Create and immediately generate a tournament
    ///
    /// # Errors
    ///
    /// Fails on an invalid configuration.
    pub fn create(config: TournamentConfig) -> TournamentResult<Self> {
        let mut tournament = Self::new(config)?;
        tournament.start()?;
        Ok(tournament)
    }

    /// Generate the first stage.
    ///
    /// # Errors
    ///
    /// `AlreadyStarted` if matches were generated before. Generation
    /// failures leave the tournament untouched.
    pub fn start(&mut self) -> TournamentResult<()> {
        if self.status != TournamentStatus::NotStarted {
            return Err(TournamentError::AlreadyStarted);
        }

        let first_id = self.next_match_id;
        let players = &self.players;
        let shuffle = self.shuffle;

        let matches = match self.format {
            TournamentFormat::SingleElimination => {
                single_elimination::generate(players, shuffle, first_id, Stage::Main)?
            }
            TournamentFormat::DoubleElimination => {
                double_elimination::generate(players, shuffle, first_id, Stage::Main)?
            }
            TournamentFormat::Swiss => {
                let matches = swiss::generate_first_round(players, shuffle, first_id, Stage::Main)?;
                let mut standings = swiss::initial_standings(players);
                for m in &matches {
                    swiss::record_match(&mut standings, m);
                }
                self.swiss = Some(SwissState {
                    standings,
                    current_round: 1,
                    total_rounds: swiss::round_count(players.len()),
                });
                matches
            }
            TournamentFormat::RoundRobin => {
                let matches = round_robin::generate(players, shuffle, first_id, Stage::Main)?;
                self.round_robin = players.iter().cloned().map(RoundRobinStanding::new).collect();
                matches
            }
            TournamentFormat::GroupRoundRobin(config) => {
                let draw = groups::generate_groups(players, &config, shuffle, first_id)?;
                let table = |roster: &[PlayerName]| {
                    roster
                        .iter()
                        .cloned()
                        .map(RoundRobinStanding::new)
                        .collect::<Vec<_>>()
                };
                self.groups = Some(GroupStage {
                    standings_a: table(&draw.group_a),
                    standings_b: table(&draw.group_b),
                    group_a: draw.group_a,
                    group_b: draw.group_b,
                    finals_generated: false,
                });
                draw.matches
            }
        };

        self.push_matches(matches);
        self.status = TournamentStatus::InProgress;
        info!(
            "Tournament '{}' started with {} matches",
            self.name,
            self.matches.len()
        );

        self.advance()?;
        Ok(())
    }

    /// Apply a final result, then advance whatever the result unlocks.
    ///
    /// # Errors
    ///
    /// * `MatchNotFound` - unknown match
    /// * `IllegalTransition` - the match is already resolved
    /// * `MatchNotReady` - a seat is still empty
    /// * `WinnerNotInMatch` - the winner is not one of the two players
    pub fn record_result(
        &mut self,
        match_id: MatchId,
        outcome: MatchOutcome,
    ) -> TournamentResult<ResultEffects> {
        progression::complete_match(&mut self.matches, match_id, outcome)?;

        let m = progression::find(&self.matches, match_id)?;
        debug!(
            "Match {match_id} won by {}",
            m.winner.as_deref().unwrap_or_default()
        );

        match (&self.format, m.stage) {
            (TournamentFormat::Swiss, _) => {
                if let Some(state) = self.swiss.as_mut() {
                    swiss::record_match(&mut state.standings, m);
                }
            }
            (TournamentFormat::RoundRobin, _) => {
                record_round_robin(&mut self.round_robin, m);
                rank_round_robin(&mut self.round_robin);
            }
            (TournamentFormat::GroupRoundRobin(_), stage @ (Stage::GroupA | Stage::GroupB)) => {
                if let Some(groups) = self.groups.as_mut() {
                    let table = if stage == Stage::GroupA {
                        &mut groups.standings_a
                    } else {
                        &mut groups.standings_b
                    };
                    record_round_robin(table, m);
                    rank_round_robin(table);
                }
            }
            _ => {}
        }

        self.advance()
    }

    /// Generate whatever the current state unlocks and settle the status
    fn advance(&mut self) -> TournamentResult<ResultEffects> {
        let mut effects = ResultEffects::default();

        if let Some(round) = self.advance_swiss()? {
            effects.generated.push((Stage::Main, round));
        }
        if self.advance_groups()? {
            effects.generated.push((Stage::Finals, 1));
        }

        if self.status == TournamentStatus::InProgress && self.all_stages_done() {
            self.status = TournamentStatus::Complete;
            effects.completed = true;
            info!(
                "Tournament '{}' complete, champion: {}",
                self.name,
                self.champion().map_or("none", String::as_str)
            );
        }
        Ok(effects)
    }

    /// Pair the next Swiss round once the current one is resolved
    fn advance_swiss(&mut self) -> TournamentResult<Option<u32>> {
        let Some(state) = self.swiss.as_ref() else {
            return Ok(None);
        };
        let round = state.current_round;
        if round >= state.total_rounds || !self.round_resolved(Stage::Main, round) {
            return Ok(None);
        }

        let next_round = round + 1;
        let matches =
            swiss::generate_round(&state.standings, next_round, self.next_match_id, Stage::Main)?;

        if let Some(state) = self.swiss.as_mut() {
            for m in matches.iter().filter(|m| m.status == MatchStatus::Complete) {
                swiss::record_match(&mut state.standings, m);
            }
            state.current_round = next_round;
        }
        self.push_matches(matches);
        Ok(Some(next_round))
    }

    /// Generate the finals once both groups are resolved
    fn advance_groups(&mut self) -> TournamentResult<bool> {
        let TournamentFormat::GroupRoundRobin(config) = self.format else {
            return Ok(false);
        };
        let Some(stage) = self.groups.as_ref() else {
            return Ok(false);
        };
        if stage.finals_generated
            || !self.stage_resolved(Stage::GroupA)
            || !self.stage_resolved(Stage::GroupB)
        {
            return Ok(false);
        }

        let matches = groups::generate_finals(
            &stage.standings_a,
            &stage.standings_b,
            &config,
            self.next_match_id,
        )?;
        if let Some(stage) = self.groups.as_mut() {
            stage.finals_generated = true;
        }
        self.push_matches(matches);
        Ok(true)
    }

    fn push_matches(&mut self, matches: Vec<Match>) {
        if let Some(last) = matches.last() {
            self.next_match_id = last.id.next();
        }
        self.matches.extend(matches);
    }

    fn round_resolved(&self, stage: Stage, round: u32) -> bool {
        self.matches
            .iter()
            .filter(|m| m.stage == stage && m.round == round)
            .all(|m| m.status.is_resolved())
    }

    fn stage_resolved(&self, stage: Stage) -> bool {
        self.matches
            .iter()
            .filter(|m| m.stage == stage)
            .all(|m| m.status.is_resolved())
    }

    fn all_stages_done(&self) -> bool {
        let swiss_done = self
            .swiss
            .as_ref()
            .is_none_or(|s| s.current_round >= s.total_rounds);
        let groups_done = self.groups.as_ref().is_none_or(|g| g.finals_generated);
        swiss_done
            && groups_done
            && !self.matches.is_empty()
            && self.matches.iter().all(|m| m.status.is_resolved())
    }

    /// Look up a match
    pub fn match_by_id(&self, id: MatchId) -> Option<&Match> {
        self.matches.iter().find(|m| m.id == id)
    }

    /// Matches of one round of a stage, in position order
    pub fn matches_in_round(&self, stage: Stage, round: u32) -> Vec<&Match> {
        let mut matches: Vec<&Match> = self
            .matches
            .iter()
            .filter(|m| m.stage == stage && m.round == round)
            .collect();
        matches.sort_by_key(|m| (m.bracket.map(|b| b as u8), m.position));
        matches
    }

    /// Pending matches with both players seated
    pub fn ready_matches(&self) -> impl Iterator<Item = &Match> {
        self.matches
            .iter()
            .filter(|m| m.status == MatchStatus::Pending && m.is_ready())
    }

    /// Earliest round of the active stage that still has unresolved matches;
    /// the last round once everything is resolved, 0 before generation
    pub fn current_round(&self) -> u32 {
        if let Some(state) = &self.swiss {
            return state.current_round;
        }
        let active = self.active_stage();
        let mut latest = 0;
        let mut open: Option<u32> = None;
        for m in self.matches.iter().filter(|m| stage_group(m.stage) == active) {
            latest = latest.max(m.round);
            if !m.status.is_resolved() {
                open = Some(open.map_or(m.round, |r| r.min(m.round)));
            }
        }
        open.unwrap_or(latest)
    }

    /// Stage currently being played; both groups report as `GroupA`
    pub fn active_stage(&self) -> Stage {
        match &self.groups {
            Some(groups) if groups.finals_generated => Stage::Finals,
            Some(_) => Stage::GroupA,
            None => Stage::Main,
        }
    }

    /// `(resolved, total)` over every generated match
    pub fn progress(&self) -> (usize, usize) {
        let resolved = self
            .matches
            .iter()
            .filter(|m| m.status.is_resolved())
            .count();
        (resolved, self.matches.len())
    }

    /// Tournament winner, once complete
    pub fn champion(&self) -> Option<&PlayerName> {
        if self.status != TournamentStatus::Complete {
            return None;
        }
        match self.format {
            TournamentFormat::SingleElimination | TournamentFormat::DoubleElimination => {
                self.bracket_winner(Stage::Main)
            }
            TournamentFormat::GroupRoundRobin(_) => self.bracket_winner(Stage::Finals),
            TournamentFormat::Swiss => self.swiss_standings().into_iter().next().map(|s| &s.player),
            TournamentFormat::RoundRobin => self.round_robin.first().map(|s| &s.player),
        }
    }

    /// Winner of the one match in `stage` that feeds nothing
    fn bracket_winner(&self, stage: Stage) -> Option<&PlayerName> {
        self.matches
            .iter()
            .find(|m| m.stage == stage && m.next_match.is_none())
            .and_then(|m| m.winner.as_ref())
    }

    /// Swiss standings in ranking order; empty for other formats
    pub fn swiss_standings(&self) -> Vec<&SwissStanding> {
        self.swiss
            .as_ref()
            .map(|state| {
                swiss::ranking(&state.standings)
                    .into_iter()
                    .map(|i| &state.standings[i])
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Ranked round-robin table; empty for other formats
    pub fn round_robin_standings(&self) -> &[RoundRobinStanding] {
        &self.round_robin
    }

    /// Ranked group A and group B tables
    pub fn group_standings(&self) -> Option<(&[RoundRobinStanding], &[RoundRobinStanding])> {
        self.groups
            .as_ref()
            .map(|g| (g.standings_a.as_slice(), g.standings_b.as_slice()))
    }

    pub fn is_complete(&self) -> bool {
        self.status == TournamentStatus::Complete
    }

    /// Serialize the whole tournament to JSON
    ///
    /// # Errors
    ///
    /// Returns `Snapshot` if encoding fails.
    pub fn to_snapshot(&self) -> TournamentResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Restore a tournament from [`Tournament::to_snapshot`] output
    ///
    /// # Errors
    ///
    /// Returns `Snapshot` on malformed input.
    pub fn from_snapshot(json: &str) -> TournamentResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Groups are played side by side and count as one stage
fn stage_group(stage: Stage) -> Stage {
    match stage {
        Stage::GroupB => Stage::GroupA,
        other => other,
    }
}
