use anyhow::{anyhow, bail};
use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::solver::Strategy;

#[derive(Parser, Debug, Default)]
#[command(
    name = "Vox Planner",
    about = "Plans timed device placements that clear every node on a grid.",
    version = "1.0"
)]
pub struct Cli {
    #[arg(long, help = "Path to a YAML config file")]
    pub config: Option<String>,

    #[arg(long, value_enum, help = "Planner to use")]
    pub solver: Option<Strategy>,

    #[arg(
        long,
        help = "Path to a YAML board scenario; without it (and without --random) boards are read from stdin"
    )]
    pub board: Option<String>,

    #[arg(long, help = "Override the scenario's round budget")]
    pub rounds: Option<usize>,

    #[arg(long, help = "Override the scenario's device budget")]
    pub bombs: Option<usize>,

    #[arg(long, help = "Plan on a randomly generated board", default_value_t = false)]
    pub random: bool,

    #[arg(long, help = "Random board width")]
    pub width: Option<usize>,

    #[arg(long, help = "Random board height")]
    pub height: Option<usize>,

    #[arg(long, help = "Number of nodes on a random board")]
    pub nodes: Option<usize>,

    #[arg(long, help = "Number of passive cells on a random board")]
    pub passives: Option<usize>,

    #[arg(long, help = "Seed for the random number generator")]
    pub seed: Option<u64>,

    #[arg(long, help = "Maximum number of search expansions")]
    pub search_limit: Option<usize>,

    #[arg(long, help = "Write the plan as JSON to this path")]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub solver: Strategy,
    pub board_path: Option<String>,
    pub rounds: Option<usize>,
    pub bombs: Option<usize>,
    pub random: bool,
    pub width: usize,
    pub height: usize,
    pub nodes: usize,
    pub passives: usize,
    pub seed: u64,
    pub search_limit: Option<usize>,
    pub output_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            solver: Strategy::Greedy,
            board_path: None,
            rounds: None,
            bombs: None,
            random: false,
            width: 12,
            height: 9,
            nodes: 10,
            passives: 6,
            seed: 0,
            search_limit: None,
            output_path: None,
        }
    }
}

impl Config {
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn override_from_command_line(mut self, cli: &Cli) -> anyhow::Result<Self> {
        if let Some(solver) = cli.solver {
            self.solver = solver;
        }
        if let Some(board) = &cli.board {
            self.board_path = Some(board.clone());
        }
        if cli.rounds.is_some() {
            self.rounds = cli.rounds;
        }
        if cli.bombs.is_some() {
            self.bombs = cli.bombs;
        }
        if cli.random {
            self.random = true;
        }
        if let Some(width) = cli.width {
            self.width = width;
        }
        if let Some(height) = cli.height {
            self.height = height;
        }
        if let Some(nodes) = cli.nodes {
            self.nodes = nodes;
        }
        if let Some(passives) = cli.passives {
            self.passives = passives;
        }
        if let Some(seed) = cli.seed {
            self.seed = seed;
        }
        if cli.search_limit.is_some() {
            self.search_limit = cli.search_limit;
        }
        if let Some(output) = &cli.output {
            self.output_path = Some(output.clone());
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.random && self.board_path.is_some() {
            bail!("--random and --board are mutually exclusive");
        }

        if self.random {
            if self.width == 0 || self.height == 0 {
                return Err(anyhow!(
                    "Random board must have a positive size, got {}x{}",
                    self.width,
                    self.height
                ));
            }
            if self.nodes + self.passives > self.width * self.height {
                return Err(anyhow!(
                    "{} nodes and {} passives do not fit on a {}x{} board",
                    self.nodes,
                    self.passives,
                    self.width,
                    self.height
                ));
            }
        }

        if self.search_limit == Some(0) {
            bail!("Search limit must be greater than 0");
        }
        Ok(())
    }

    /// Offline planning over a scenario rather than the stdin protocol.
    pub fn is_offline(&self) -> bool {
        self.random || self.board_path.is_some()
    }
}
