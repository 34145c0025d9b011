//! Tournament aggregate and session orchestration.
//!
//! This module provides:
//! - Tournament configuration and validation
//! - Stage generation and advancement for every format
//! - Standings, progress, and champion queries
//! - JSON snapshots
//! - The device and approval workflow in [`TournamentManager`]
//!
//! ## Example
//!
//! ```
//! use bracket_engine::tournament::{
//!     PendingScoreSubmission, Tournament, TournamentConfig, TournamentFormat, TournamentManager,
//! };
//! use bracket_engine::MatchOutcome;
//!
//! let players = vec!["ann".to_string(), "ben".to_string()];
//! let config = TournamentConfig::new("Club night", TournamentFormat::SingleElimination, players);
//! let mut manager = TournamentManager::new(Tournament::create(config)?);
//!
//! manager.register_device("table-1")?;
//! let final_id = manager.ready_matches()[0].id;
//! manager.assign_match(final_id, "table-1")?;
//! manager.receive_submission(PendingScoreSubmission::new(
//!     final_id,
//!     "table-1",
//!     MatchOutcome::new("ben", 4, 7),
//! ))?;
//! manager.approve(final_id)?;
//!
//! assert_eq!(manager.tournament().champion().map(String::as_str), Some("ben"));
//! # Ok::<(), bracket_engine::TournamentError>(())
//! ```

pub mod engine;
pub mod manager;
pub mod models;

pub use engine::ResultEffects;
pub use manager::{ManagerEvent, PendingScoreSubmission, TournamentManager};
pub use models::{
    BestOf, Generation, GroupStage, MatchType, ScoringConfig, SwissState, Tournament,
    TournamentConfig, TournamentFormat, TournamentStatus,
};
