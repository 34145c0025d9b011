//! Tournament data models: format, scoring rules, configuration, and the
//! aggregate that owns the match arena.

use crate::bracket::models::{Match, MatchId, PlayerName};
use crate::bracket::validate_players;
use crate::errors::{TournamentError, TournamentResult};
use crate::schedule::{MultiStageConfig, RoundRobinStanding, SwissStanding};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Length of a room code
pub const ROOM_CODE_LEN: usize = 6;

const ROOM_CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Tournament format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentFormat {
    /// Knockout, one loss eliminates
    SingleElimination,
    /// Winners and losers brackets, two losses eliminate
    DoubleElimination,
    /// Fixed number of rounds paired by standings
    Swiss,
    /// Everyone plays everyone once
    RoundRobin,
    /// Two round-robin groups feeding a finals bracket
    GroupRoundRobin(MultiStageConfig),
}

impl TournamentFormat {
    /// Smallest roster the format accepts
    pub fn min_players(&self) -> usize {
        match self {
            TournamentFormat::GroupRoundRobin(_) => 4,
            _ => 2,
        }
    }
}

impl fmt::Display for TournamentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TournamentFormat::SingleElimination => write!(f, "single elimination"),
            TournamentFormat::DoubleElimination => write!(f, "double elimination"),
            TournamentFormat::Swiss => write!(f, "swiss"),
            TournamentFormat::RoundRobin => write!(f, "round robin"),
            TournamentFormat::GroupRoundRobin(config) => write!(
                f,
                "group round robin (top {} to {})",
                config.finals_size, config.finals_format
            ),
        }
    }
}

/// Rule-set generation used by the match scorer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Generation {
    First,
    Second,
    #[default]
    Third,
}

/// How a single match is decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// First to the point target wins
    #[default]
    Points,
    /// Sets are played to the point target; best-of policy decides
    Sets,
}

/// Best-of policy for set play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BestOf {
    #[default]
    One,
    Three,
    Five,
}

impl BestOf {
    /// Sets needed to take the match
    pub const fn sets_to_win(self) -> u32 {
        match self {
            BestOf::One => 1,
            BestOf::Three => 2,
            BestOf::Five => 3,
        }
    }
}

/// Point-scoring configuration handed to the match scorer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Rule-set generation
    pub generation: Generation,
    /// Points or sets
    pub match_type: MatchType,
    /// Best-of policy, only meaningful for set play
    pub best_of: BestOf,
    /// Whether a player can score for the opponent by finishing themselves
    pub own_finish: bool,
}

impl ScoringConfig {
    /// Oldest generation whose rules include own finishes
    pub const OWN_FINISH_SINCE: Generation = Generation::Third;

    /// Check the rule combination
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if own finishes are enabled for a generation
    /// that does not have them, or a best-of policy is set for points play.
    pub fn validate(&self) -> TournamentResult<()> {
        if self.own_finish && self.generation < Self::OWN_FINISH_SINCE {
            return Err(TournamentError::InvalidConfig(format!(
                "own finish requires generation {:?} or later",
                Self::OWN_FINISH_SINCE
            )));
        }
        if self.match_type == MatchType::Points && self.best_of != BestOf::One {
            return Err(TournamentError::InvalidConfig(
                "best-of policy only applies to set play".to_string(),
            ));
        }
        Ok(())
    }
}

/// Tournament configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentConfig {
    /// Tournament name
    pub name: String,
    /// Room code; generated when absent
    pub room_code: Option<String>,
    /// Tournament format
    pub format: TournamentFormat,
    /// Scoring rules
    pub scoring: ScoringConfig,
    /// Players in seed order
    pub players: Vec<PlayerName>,
    /// Randomize the draw instead of using seed order
    pub shuffle: bool,
}

impl TournamentConfig {
    /// Configuration with default scoring and seeded draw
    pub fn new(
        name: impl Into<String>,
        format: TournamentFormat,
        players: Vec<PlayerName>,
    ) -> Self {
        Self {
            name: name.into(),
            room_code: None,
            format,
            scoring: ScoringConfig::default(),
            players,
            shuffle: false,
        }
    }

    /// Use a fixed room code
    #[must_use]
    pub fn with_room_code(mut self, code: impl Into<String>) -> Self {
        self.room_code = Some(code.into());
        self
    }

    #[must_use]
    pub fn with_scoring(mut self, scoring: ScoringConfig) -> Self {
        self.scoring = scoring;
        self
    }

    #[must_use]
    pub fn shuffled(mut self) -> Self {
        self.shuffle = true;
        self
    }

    /// Validate everything needed to generate the tournament
    ///
    /// # Errors
    ///
    /// Returns the first problem found; see [`TournamentError`] for the
    /// input variants.
    pub fn validate(&self) -> TournamentResult<()> {
        if self.name.trim().is_empty() {
            return Err(TournamentError::InvalidConfig(
                "tournament name must not be blank".to_string(),
            ));
        }
        if let Some(code) = &self.room_code {
            if !is_valid_room_code(code) {
                return Err(TournamentError::InvalidConfig(format!(
                    "room code must be {ROOM_CODE_LEN} uppercase letters or digits, got {code:?}"
                )));
            }
        }
        self.scoring.validate()?;
        validate_players(&self.players, self.format.min_players())?;
        if let TournamentFormat::GroupRoundRobin(stages) = &self.format {
            stages.validate(self.players.len())?;
        }
        Ok(())
    }
}

/// Whether `code` is a well-formed room code
pub fn is_valid_room_code(code: &str) -> bool {
    code.len() == ROOM_CODE_LEN
        && code
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

/// Random room code of uppercase letters and digits
pub fn generate_room_code() -> String {
    let mut rng = rand::rng();
    (0..ROOM_CODE_LEN)
        .map(|_| ROOM_CODE_CHARSET[rng.random_range(0..ROOM_CODE_CHARSET.len())] as char)
        .collect()
}

/// Overall tournament status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    /// Created, matches not generated yet
    NotStarted,
    /// Matches generated, results coming in
    InProgress,
    /// Every match resolved
    Complete,
}

impl fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TournamentStatus::NotStarted => write!(f, "not started"),
            TournamentStatus::InProgress => write!(f, "in progress"),
            TournamentStatus::Complete => write!(f, "complete"),
        }
    }
}

/// Swiss progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwissState {
    /// Standings in entry order
    pub standings: Vec<SwissStanding>,
    /// Latest generated round
    pub current_round: u32,
    /// Rounds the event will run
    pub total_rounds: u32,
}

/// Group-stage progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupStage {
    pub group_a: Vec<PlayerName>,
    pub group_b: Vec<PlayerName>,
    /// Ranked group A table
    pub standings_a: Vec<RoundRobinStanding>,
    /// Ranked group B table
    pub standings_b: Vec<RoundRobinStanding>,
    pub finals_generated: bool,
}

/// A tournament: configuration, match arena, and format state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tournament {
    /// Tournament ID
    pub id: Uuid,
    pub name: String,
    /// Code scoring devices use to join
    pub room_code: String,
    pub format: TournamentFormat,
    pub scoring: ScoringConfig,
    /// Players in seed order
    pub players: Vec<PlayerName>,
    /// Every match ever generated, in id order
    pub matches: Vec<Match>,
    pub status: TournamentStatus,
    pub created_at: DateTime<Utc>,
    /// Id the next generated match receives
    pub next_match_id: MatchId,
    /// Randomize the draw at generation
    pub shuffle: bool,
    /// Swiss only
    pub swiss: Option<SwissState>,
    /// Round robin only, ranked
    pub round_robin: Vec<RoundRobinStanding>,
    /// Group round robin only
    pub groups: Option<GroupStage>,
}
