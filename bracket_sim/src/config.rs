//! Simulation configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use bracket_engine::{
    FinalsFormat, MultiStageConfig, ScoringConfig, TournamentFormat,
    tournament::{BestOf, MatchType},
};
use std::path::PathBuf;

/// Values given on the command line; each one wins over its environment variable
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub format: Option<String>,
    pub players: Option<usize>,
    pub devices: Option<usize>,
    pub seed: Option<u64>,
    pub reject_rate: Option<f64>,
    pub out: Option<PathBuf>,
}

/// Complete simulation configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub format: TournamentFormat,
    pub scoring: ScoringConfig,
    /// Number of generated entrants
    pub players: usize,
    /// Number of simulated scoring devices
    pub devices: usize,
    /// Seed for match outcomes; random when absent
    pub seed: Option<u64>,
    /// Chance that a first submission for a match is rejected
    pub reject_rate: f64,
    /// Where to write the final snapshot
    pub out: Option<PathBuf>,
}

impl SimConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns error if a variable cannot be parsed or the result fails validation
    pub fn from_env(overrides: Overrides) -> Result<Self, ConfigError> {
        Self::from_lookup(overrides, |key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(overrides: Overrides, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let format_name = overrides
            .format
            .or_else(|| lookup("BRACKET_FORMAT"))
            .unwrap_or_else(|| "single".to_string());

        let finals_size = parse_var(&lookup, "BRACKET_FINALS_SIZE", 4)?;
        let finals_format = match lookup("BRACKET_FINALS_FORMAT") {
            Some(name) => parse_finals_format(&name)?,
            None => FinalsFormat::SingleElimination,
        };
        let format = parse_format(
            &format_name,
            MultiStageConfig {
                finals_size,
                finals_format,
            },
        )?;

        let scoring = match lookup("BRACKET_BEST_OF") {
            Some(v) => scoring_for(&v)?,
            None => ScoringConfig::default(),
        };

        let players = match overrides.players {
            Some(players) => players,
            None => parse_var(&lookup, "BRACKET_PLAYERS", 8)?,
        };
        let devices = match overrides.devices {
            Some(devices) => devices,
            None => parse_var(&lookup, "BRACKET_DEVICES", 2)?,
        };
        let seed = match overrides.seed {
            Some(seed) => Some(seed),
            None => lookup("BRACKET_SEED")
                .map(|v| {
                    v.parse().map_err(|_| ConfigError::Invalid {
                        var: "BRACKET_SEED".to_string(),
                        reason: format!("'{v}' is not an unsigned integer"),
                    })
                })
                .transpose()?,
        };
        let reject_rate = match overrides.reject_rate {
            Some(rate) => rate,
            None => parse_var(&lookup, "BRACKET_REJECT_RATE", 0.1)?,
        };
        let out = overrides
            .out
            .or_else(|| lookup("BRACKET_OUT").map(PathBuf::from));

        let config = Self {
            format,
            scoring,
            players,
            devices,
            seed,
            reject_rate,
            out,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.players < self.format.min_players() {
            return Err(ConfigError::Invalid {
                var: "BRACKET_PLAYERS".to_string(),
                reason: format!(
                    "{} needs at least {} players",
                    self.format,
                    self.format.min_players()
                ),
            });
        }

        if let TournamentFormat::GroupRoundRobin(stage) = self.format {
            stage
                .validate(self.players)
                .map_err(|e| ConfigError::Invalid {
                    var: "BRACKET_FINALS_SIZE".to_string(),
                    reason: e.to_string(),
                })?;
        }

        if self.devices == 0 {
            return Err(ConfigError::Invalid {
                var: "BRACKET_DEVICES".to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }

        // A rate of 1.0 would reject forever
        if !(0.0..1.0).contains(&self.reject_rate) {
            return Err(ConfigError::Invalid {
                var: "BRACKET_REJECT_RATE".to_string(),
                reason: "Must be in [0, 1)".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown value for {var}: '{value}'\nHint: {hint}")]
    Unknown {
        var: String,
        value: String,
        hint: String,
    },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Parse a tournament format name
pub fn parse_format(name: &str, stage: MultiStageConfig) -> Result<TournamentFormat, ConfigError> {
    match name.to_lowercase().replace(['-', '_'], " ").trim() {
        "single" | "single elimination" | "se" => Ok(TournamentFormat::SingleElimination),
        "double" | "double elimination" | "de" => Ok(TournamentFormat::DoubleElimination),
        "swiss" => Ok(TournamentFormat::Swiss),
        "round robin" | "rr" => Ok(TournamentFormat::RoundRobin),
        "groups" | "group round robin" => Ok(TournamentFormat::GroupRoundRobin(stage)),
        _ => Err(ConfigError::Unknown {
            var: "BRACKET_FORMAT".to_string(),
            value: name.to_string(),
            hint: "One of: single, double, swiss, round-robin, groups".to_string(),
        }),
    }
}

/// Set play for best-of three or five, points play for best-of one
fn scoring_for(best_of: &str) -> Result<ScoringConfig, ConfigError> {
    let (match_type, best_of) = match best_of.trim() {
        "1" => (MatchType::Points, BestOf::One),
        "3" => (MatchType::Sets, BestOf::Three),
        "5" => (MatchType::Sets, BestOf::Five),
        other => {
            return Err(ConfigError::Unknown {
                var: "BRACKET_BEST_OF".to_string(),
                value: other.to_string(),
                hint: "One of: 1, 3, 5".to_string(),
            });
        }
    };
    Ok(ScoringConfig {
        match_type,
        best_of,
        ..ScoringConfig::default()
    })
}

fn parse_finals_format(name: &str) -> Result<FinalsFormat, ConfigError> {
    match name.to_lowercase().as_str() {
        "single" => Ok(FinalsFormat::SingleElimination),
        "double" => Ok(FinalsFormat::DoubleElimination),
        _ => Err(ConfigError::Unknown {
            var: "BRACKET_FINALS_FORMAT".to_string(),
            value: name.to_string(),
            hint: "One of: single, double".to_string(),
        }),
    }
}

/// Helper to parse a variable with default fallback when it is unset
fn parse_var<T, F>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid {
            var: key.to_string(),
            reason: format!("Cannot parse '{v}'"),
        }),
        None => Ok(default),
    }
}
