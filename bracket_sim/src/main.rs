//! Tournament simulator.
//!
//! Builds a tournament from the environment and command line, then plays it
//! through simulated scoring devices, approving and rejecting submissions the
//! way an organiser would.

mod config;
mod logging;
mod sim;

use std::path::PathBuf;

use anyhow::Error;
use bracket_engine::{
    RoundRobinStanding, Tournament, TournamentConfig, TournamentFormat, TournamentManager,
};
use config::{Overrides, SimConfig};
use ctrlc::set_handler;
use pico_args::Arguments;
use rand::{SeedableRng, rngs::StdRng};
use sim::Simulation;
use tracing::info;

const HELP: &str = "\
Play a tournament through simulated scoring devices

USAGE:
  bracket_sim [OPTIONS]

OPTIONS:
  --format     NAME        single, double, swiss, round-robin or groups  [default: env BRACKET_FORMAT or single]
  --players    N           Number of entrants                            [default: env BRACKET_PLAYERS or 8]
  --devices    N           Number of scoring devices                     [default: env BRACKET_DEVICES or 2]
  --seed       N           Seed for match results                        [default: env BRACKET_SEED or random]
  --reject     RATE        Share of first submissions rejected           [default: env BRACKET_REJECT_RATE or 0.1]
  --out        PATH        Write the final snapshot to PATH              [default: env BRACKET_OUT]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  BRACKET_FINALS_SIZE      Finalists for the groups format (even)
  BRACKET_FINALS_FORMAT    single or double
  BRACKET_BEST_OF          1, 3 or 5
  RUST_LOG                 Log filter (e.g., debug,bracket_engine=info)
";

fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let overrides = Overrides {
        format: pargs.opt_value_from_str("--format")?,
        players: pargs.opt_value_from_str("--players")?,
        devices: pargs.opt_value_from_str("--devices")?,
        seed: pargs.opt_value_from_str("--seed")?,
        reject_rate: pargs.opt_value_from_str("--reject")?,
        out: pargs.opt_value_from_str::<_, PathBuf>("--out")?,
    };

    let remaining = pargs.finish();
    if !remaining.is_empty() {
        anyhow::bail!("unexpected arguments: {remaining:?}");
    }

    // Catching signals for exit.
    set_handler(|| std::process::exit(0))?;

    logging::init();
    let config = SimConfig::from_env(overrides)?;

    let seed = config.seed.unwrap_or_else(rand::random);
    info!(
        "Simulating {} with {} players on {} device(s), seed {seed}",
        config.format, config.players, config.devices
    );

    let players = (1..=config.players).map(|i| format!("Player {i}")).collect();
    let tournament_config = TournamentConfig::new("Simulated Cup", config.format, players)
        .with_scoring(config.scoring)
        .shuffled();
    let tournament = Tournament::create(tournament_config)?;
    info!(
        "Room {} open with {} match(es)",
        tournament.room_code,
        tournament.matches.len()
    );

    let mut simulation = Simulation::new(
        TournamentManager::new(tournament),
        config.devices,
        StdRng::seed_from_u64(seed),
        config.reject_rate,
    )?;
    let report = simulation.run()?;
    info!(
        "{} result(s) approved, {} rejected, {} round(s) generated",
        report.approved, report.rejected, report.rounds_generated
    );

    let tournament = simulation.into_manager().into_tournament();
    print_summary(&tournament);

    if let Some(path) = &config.out {
        std::fs::write(path, tournament.to_snapshot()?)?;
        info!("Snapshot written to {}", path.display());
    }

    Ok(())
}

fn print_summary(tournament: &Tournament) {
    match tournament.champion() {
        Some(champion) => println!("Champion: {champion}"),
        None => println!("No champion"),
    }

    match tournament.format {
        TournamentFormat::Swiss => {
            println!("{:<4} {:<12} {:>6} {:>9}", "#", "Player", "Points", "Buchholz");
            for (rank, s) in tournament.swiss_standings().iter().enumerate() {
                println!(
                    "{:<4} {:<12} {:>6.1} {:>9.2}",
                    rank + 1,
                    s.player,
                    s.points(),
                    s.buchholz
                );
            }
        }
        TournamentFormat::RoundRobin => {
            print_table("Standings", tournament.round_robin_standings());
        }
        TournamentFormat::GroupRoundRobin(_) => {
            if let Some((a, b)) = tournament.group_standings() {
                print_table("Group A", a);
                print_table("Group B", b);
            }
        }
        TournamentFormat::SingleElimination | TournamentFormat::DoubleElimination => {}
    }
}

fn print_table(title: &str, table: &[RoundRobinStanding]) {
    println!("{title}");
    println!("{:<4} {:<12} {:>3} {:>3} {:>6}", "#", "Player", "W", "L", "Diff");
    for (rank, s) in table.iter().enumerate() {
        println!(
            "{:<4} {:<12} {:>3} {:>3} {:>+6}",
            rank + 1,
            s.player,
            s.wins,
            s.losses,
            s.point_differential()
        );
    }
}
