use super::Solver;
use crate::common::{Action, Budget, Coord, Plan};
use crate::map::{Cell, Grid};
use crate::stat::Stats;

use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, instrument};

/// Round-by-round local maximum. Nodes already inside a chosen blast are
/// claimed and no longer count towards later placements.
pub struct GreedyPlanner {
    stats: Stats,
}

impl GreedyPlanner {
    pub fn new() -> Self {
        GreedyPlanner {
            stats: Stats::default(),
        }
    }
}

impl Default for GreedyPlanner {
    fn default() -> Self {
        Self::new()
    }
}

// First empty cell in row-major order with the most unclaimed nodes in reach.
fn best_placement(grid: &Grid, claimed: &HashSet<Coord>) -> Option<(Coord, Vec<Coord>)> {
    let mut best: Option<(Coord, Vec<Coord>)> = None;

    for coord in grid.coords().filter(|&coord| grid.is_empty(coord)) {
        let targets: Vec<Coord> = grid
            .blast(coord)
            .into_iter()
            .filter(|(target, cell)| *cell == Cell::Node && !claimed.contains(target))
            .map(|(target, _)| target)
            .collect();

        if targets.len() > best.as_ref().map_or(0, |(_, best)| best.len()) {
            best = Some((coord, targets));
        }
    }

    best
}

impl Solver for GreedyPlanner {
    #[instrument(skip_all, name = "greedy", fields(rounds = budget.rounds, devices = budget.devices))]
    fn solve(&mut self, grid: &Grid, budget: Budget) -> Plan {
        let start = Instant::now();
        self.stats = Stats::default();

        let mut working = grid.clone();
        let mut claimed = HashSet::new();
        let mut devices_left = budget.devices;
        let mut actions = Vec::with_capacity(budget.rounds);

        for round in 0..budget.rounds {
            working.tick();
            if devices_left == 0 {
                actions.push(Action::Wait);
                continue;
            }

            let action = match best_placement(&working, &claimed) {
                Some((coord, targets)) if working.place(coord).is_ok() => {
                    debug!("round {round}: place {coord:?} for {targets:?}");
                    claimed.extend(targets);
                    devices_left -= 1;
                    Action::Place(coord)
                }
                _ => Action::Wait,
            };
            actions.push(action);
        }

        let plan = Plan::padded(actions, budget.rounds);
        self.stats.record_plan(&plan, start);
        self.stats.print("greedy");
        plan
    }

    fn stats(&self) -> &Stats {
        &self.stats
    }
}
