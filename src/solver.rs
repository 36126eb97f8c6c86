mod candidate;
mod cover;
mod greedy;
mod search;

pub use candidate::{deduplicate, potential_bombs, PotentialBomb};
pub use cover::CoverPlanner;
pub use greedy::GreedyPlanner;
pub use search::SearchPlanner;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::common::{Budget, Plan};
use crate::config::Config;
use crate::map::Grid;
use crate::stat::Stats;

pub trait Solver {
    /// Exactly `budget.rounds` decisions. Never fails: an unsolvable board
    /// yields waits.
    fn solve(&mut self, grid: &Grid, budget: Budget) -> Plan;

    fn stats(&self) -> &Stats;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    #[default]
    Greedy,
    Search,
    Cover,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Greedy => "greedy",
            Strategy::Search => "search",
            Strategy::Cover => "cover",
        };
        write!(f, "{name}")
    }
}

pub fn build_solver(config: &Config) -> Box<dyn Solver> {
    match config.solver {
        Strategy::Greedy => Box::new(GreedyPlanner::new()),
        Strategy::Search => Box::new(SearchPlanner::new(config.search_limit)),
        Strategy::Cover => Box::new(CoverPlanner::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Action;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("debug")
            .try_init();
    }

    fn all_solvers() -> Vec<Box<dyn Solver>> {
        [Strategy::Greedy, Strategy::Search, Strategy::Cover]
            .into_iter()
            .map(|solver| {
                build_solver(&Config {
                    solver,
                    ..Config::default()
                })
            })
            .collect()
    }

    // One blast from the centre takes out the whole ring.
    #[test]
    fn test_single_blast_ring() {
        init_tracing();
        let grid = Grid::from_rows(&[".@.", "@.@", ".@."]).unwrap();
        let budget = Budget::new(5, 1);
        for mut solver in all_solvers() {
            let plan = solver.solve(&grid, budget);
            assert_eq!(plan.len(), 5);
            assert_eq!(plan.get(0), Action::Place((1, 1)));
            assert!(plan.actions[1..].iter().all(|&action| action == Action::Wait));
            assert!(plan.verify(&grid, budget));
            assert_eq!(solver.stats().placements, 1);
        }
    }

    #[test]
    fn test_zero_budgets() {
        init_tracing();
        let grid = Grid::from_rows(&[".@.", "...", "..."]).unwrap();
        for mut solver in all_solvers() {
            assert!(solver.solve(&grid, Budget::new(0, 3)).is_empty());
            assert_eq!(solver.solve(&grid, Budget::new(4, 0)), Plan::waiting(4));
        }
    }

    #[test]
    fn test_empty_board_waits() {
        init_tracing();
        let grid = Grid::from_rows(&["...", ".#.", "..."]).unwrap();
        for mut solver in all_solvers() {
            assert_eq!(solver.solve(&grid, Budget::new(3, 2)), Plan::waiting(3));
        }
    }

    #[test]
    fn test_strategy_names() {
        assert_eq!(Strategy::Cover.to_string(), "cover");
        assert_eq!(
            serde_yaml::from_str::<Strategy>("search").unwrap(),
            Strategy::Search
        );
    }
}
