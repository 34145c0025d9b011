//! # Bracket Engine
//!
//! Tournament bracket generation and match orchestration.
//!
//! Given a roster and a format, the engine builds the graph of matches that
//! decides who plays whom, then evolves it as results arrive. Matches live in
//! a flat arena and point at each other by [`MatchId`]; a completed match
//! pushes its winner (and, in double elimination, its loser) into the seats
//! it feeds.
//!
//! ## Formats
//!
//! - **Single elimination**: seeded knockout with byes for non-power-of-two
//!   fields
//! - **Double elimination**: winners and losers brackets, grand final, and a
//!   reset that is only played when the losers-bracket champion wins
//! - **Swiss**: a fixed number of rounds, each paired from the standings
//!   without rematches
//! - **Round robin**: every pair meets once
//! - **Group round robin**: two groups whose leaders play an elimination
//!   finals bracket
//!
//! ## Core Modules
//!
//! - [`bracket`]: match model, seeding, elimination generators, propagation
//! - [`schedule`]: round robin, Swiss, groups, standings
//! - [`tournament`]: the tournament aggregate and [`TournamentManager`]
//!
//! ## Example
//!
//! ```
//! use bracket_engine::{MatchOutcome, Tournament, TournamentConfig, TournamentFormat};
//!
//! let players = (1..=4).map(|i| format!("P{i}")).collect();
//! let config = TournamentConfig::new("Spring Open", TournamentFormat::SingleElimination, players);
//! let mut tournament = Tournament::create(config)?;
//!
//! loop {
//!     let next = tournament.ready_matches().next().map(|m| m.id);
//!     let Some(id) = next else { break };
//!     let winner = tournament.match_by_id(id).and_then(|m| m.player1.clone()).unwrap();
//!     tournament.record_result(id, MatchOutcome::new(winner, 7, 5))?;
//! }
//! assert_eq!(tournament.champion().map(String::as_str), Some("P1"));
//! # Ok::<(), bracket_engine::TournamentError>(())
//! ```

/// Error types shared by every module.
pub mod errors;
pub use errors::{ErrorKind, TournamentError, TournamentResult};

/// Elimination brackets and the match model.
pub mod bracket;
pub use bracket::{
    BracketType, DeviceId, Match, MatchId, MatchOutcome, MatchStatus, PlayerName, ScoreEvent,
    Slot, SlotRef, Stage,
};

/// Round robin, Swiss, and group scheduling.
pub mod schedule;
pub use schedule::{FinalsFormat, MultiStageConfig, RoundRobinStanding, SwissStanding};

/// Tournament aggregate and manager.
pub mod tournament;
pub use tournament::{
    ManagerEvent, PendingScoreSubmission, ResultEffects, ScoringConfig, Tournament,
    TournamentConfig, TournamentFormat, TournamentManager, TournamentStatus,
};
