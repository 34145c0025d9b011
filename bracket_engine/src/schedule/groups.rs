//! Two round-robin groups feeding an elimination finals bracket.

use super::{round_robin, standings::RoundRobinStanding};
use crate::bracket::{
    double_elimination,
    models::{Match, MatchId, PlayerName, Stage},
    single_elimination, validate_players,
};
use crate::errors::{TournamentError, TournamentResult};
use log::info;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bracket used for the finals stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalsFormat {
    #[default]
    SingleElimination,
    DoubleElimination,
}

impl fmt::Display for FinalsFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FinalsFormat::SingleElimination => write!(f, "single elimination"),
            FinalsFormat::DoubleElimination => write!(f, "double elimination"),
        }
    }
}

/// Group stage followed by a finals bracket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiStageConfig {
    /// Players advancing to the finals, half from each group
    pub finals_size: usize,
    pub finals_format: FinalsFormat,
}

impl Default for MultiStageConfig {
    fn default() -> Self {
        Self {
            finals_size: 4,
            finals_format: FinalsFormat::SingleElimination,
        }
    }
}

impl MultiStageConfig {
    /// Check the configuration against a roster size
    ///
    /// # Errors
    ///
    /// * `NotEnoughPlayers` - fewer than two players per group
    /// * `InvalidFinalsSize` - odd, below two, or more qualifiers than the
    ///   smaller group holds
    pub fn validate(&self, player_count: usize) -> TournamentResult<()> {
        if player_count < 4 {
            return Err(TournamentError::NotEnoughPlayers {
                needed: 4,
                actual: player_count,
            });
        }

        let smaller_group = player_count / 2;
        if self.finals_size < 2 || self.finals_size % 2 != 0 || self.finals_size / 2 > smaller_group
        {
            return Err(TournamentError::InvalidFinalsSize {
                finals_size: self.finals_size,
                player_count,
            });
        }
        Ok(())
    }
}

/// Rosters and matches of a freshly drawn group stage
#[derive(Debug, Clone)]
pub struct GroupDraw {
    pub group_a: Vec<PlayerName>,
    pub group_b: Vec<PlayerName>,
    pub matches: Vec<Match>,
}

/// Bisect the roster; group A takes the extra player of an odd field
pub fn split_groups(
    players: &[PlayerName],
    shuffle: bool,
) -> (Vec<PlayerName>, Vec<PlayerName>) {
    let mut order = players.to_vec();
    if shuffle {
        order.shuffle(&mut rand::rng());
    }
    let group_b = order.split_off(order.len().div_ceil(2));
    (order, group_b)
}

/// Draw both groups and generate their round robins back to back.
///
/// # Errors
///
/// Fails on an invalid roster or configuration; nothing is generated then.
pub fn generate_groups(
    players: &[PlayerName],
    config: &MultiStageConfig,
    shuffle: bool,
    first_id: MatchId,
) -> TournamentResult<GroupDraw> {
    validate_players(players, 4)?;
    config.validate(players.len())?;

    let (group_a, group_b) = split_groups(players, shuffle);
    let mut matches = round_robin::generate(&group_a, false, first_id, Stage::GroupA)?;
    let next_id = MatchId(first_id.0 + matches.len() as u32);
    matches.extend(round_robin::generate(
        &group_b,
        false,
        next_id,
        Stage::GroupB,
    )?);

    info!(
        "Drew groups: A {} players, B {} players, {} matches; top {} advance to {}",
        group_a.len(),
        group_b.len(),
        matches.len(),
        config.finals_size,
        config.finals_format
    );
    Ok(GroupDraw {
        group_a,
        group_b,
        matches,
    })
}

/// Qualifiers in finals seed order: A1, B1, A2, B2, ...
///
/// Both tables must already be ranked.
pub fn finals_seeding(
    group_a: &[RoundRobinStanding],
    group_b: &[RoundRobinStanding],
    finals_size: usize,
) -> Vec<PlayerName> {
    let per_group = finals_size / 2;
    group_a
        .iter()
        .zip(group_b)
        .take(per_group)
        .flat_map(|(a, b)| [a.player.clone(), b.player.clone()])
        .collect()
}

/// Generate the finals bracket from the final group tables
///
/// # Errors
///
/// Fails if the tables hold fewer qualifiers than the configuration asks for.
pub fn generate_finals(
    group_a: &[RoundRobinStanding],
    group_b: &[RoundRobinStanding],
    config: &MultiStageConfig,
    first_id: MatchId,
) -> TournamentResult<Vec<Match>> {
    let seeds = finals_seeding(group_a, group_b, config.finals_size);
    if seeds.len() != config.finals_size {
        return Err(TournamentError::InvalidFinalsSize {
            finals_size: config.finals_size,
            player_count: group_a.len() + group_b.len(),
        });
    }

    info!("Finals seeding: {}", seeds.join(", "));
    match config.finals_format {
        FinalsFormat::SingleElimination => {
            single_elimination::generate(&seeds, false, first_id, Stage::Finals)
        }
        FinalsFormat::DoubleElimination => {
            double_elimination::generate(&seeds, false, first_id, Stage::Finals)
        }
    }
}
