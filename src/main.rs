use vox_planner::common::{Budget, Plan};
use vox_planner::config::{Cli, Config};
use vox_planner::protocol;
use vox_planner::scenario::Scenario;
use vox_planner::solver::{build_solver, Solver, Strategy};
use vox_planner::stat::Stats;

use anyhow::{anyhow, Context};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Serialize)]
struct PlanReport<'a> {
    solver: Strategy,
    budget: Budget,
    plan: &'a Plan,
    cleared: bool,
    stats: &'a Stats,
}

fn main() -> anyhow::Result<()> {
    // Stdout carries protocol answers, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();
    let cli = Cli::parse();

    let config = if let Some(config_file) = cli.config.as_ref() {
        let config_str = std::fs::read_to_string(config_file)?;
        Config::from_yaml_str(&config_str)
            .with_context(|| format!("error with config file: {config_file}"))?
    } else {
        info!("No config file specified, using default config");
        Config::default()
    }
    .override_from_command_line(&cli)?;

    let mut solver = build_solver(&config);

    if config.is_offline() {
        plan_offline(&config, solver.as_mut())
    } else {
        protocol::play(io::stdin().lock(), io::stdout().lock(), solver.as_mut())
    }
}

fn plan_offline(config: &Config, solver: &mut dyn Solver) -> anyhow::Result<()> {
    let scenario = match &config.board_path {
        Some(path) => Scenario::load_from_file(path)?,
        None => {
            let mut rng = StdRng::seed_from_u64(config.seed);
            let budget = Budget::new(config.rounds.unwrap_or(15), config.bombs.unwrap_or(3));
            Scenario::generate_random(
                config.width,
                config.height,
                config.nodes,
                config.passives,
                budget,
                &mut rng,
            )?
        }
    };

    let grid = scenario.to_grid()?;
    let budget = Budget::new(
        config.rounds.unwrap_or(scenario.rounds),
        config.bombs.unwrap_or(scenario.bombs),
    );
    info!("{} planning {}x{} board, {budget:?}", config.solver, grid.width, grid.height);

    let plan = solver.solve(&grid, budget);
    for (round, action) in plan.actions.iter().enumerate() {
        info!("round {round}: {action}");
    }

    let cleared = plan.verify(&grid, budget);
    if cleared {
        info!("plan clears every node");
    } else {
        error!("plan leaves nodes standing");
    }

    if let Some(path) = &config.output_path {
        let file = File::create(path).map_err(|err| anyhow!("cannot create {path}: {err}"))?;
        let report = PlanReport {
            solver: config.solver,
            budget,
            plan: &plan,
            cleared,
            stats: solver.stats(),
        };
        serde_json::to_writer_pretty(BufWriter::new(file), &report)?;
        info!("plan written to {path}");
    }

    Ok(())
}
