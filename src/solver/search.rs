use super::candidate::{deduplicate, potential_bombs, PotentialBomb};
use super::Solver;
use crate::common::{Action, Budget, Plan};
use crate::map::Grid;
use crate::stat::Stats;

use std::time::Instant;
use tracing::{debug, info, instrument, trace};

/// Depth-first backtracking over placements and waits.
///
/// Each branch owns two grids: `simulation` carries armed devices and real
/// timers and decides which cells are placeable, `result` clears a blast as
/// soon as its device is placed and tracks which nodes are still uncovered.
pub struct SearchPlanner {
    limit: Option<usize>,
    stats: Stats,
}

impl SearchPlanner {
    /// `limit` caps the number of expanded search nodes; hitting it counts as
    /// failure.
    pub fn new(limit: Option<usize>) -> Self {
        SearchPlanner {
            limit,
            stats: Stats::default(),
        }
    }
}

struct Search<'a> {
    pool: &'a [PotentialBomb],
    limit: Option<usize>,
    expanded: usize,
}

impl<'a> Search<'a> {
    fn exhausted(&self) -> bool {
        self.limit.is_some_and(|limit| self.expanded >= limit)
    }

    // Returns the remaining actions in reverse order.
    fn explore(
        &mut self,
        mut simulation: Grid,
        result: Grid,
        rounds: usize,
        devices: usize,
        after_wait: bool,
    ) -> Option<Vec<Action>> {
        if self.exhausted() {
            return None;
        }
        self.expanded += 1;

        let vacated = simulation.tick();

        if result.node_count() == 0 {
            return Some(Vec::new());
        }
        if rounds == 0 || devices == 0 {
            return None;
        }

        // After a wait only cells freed by this round are worth trying: any
        // other cell could have been taken one round earlier.
        let pool = self.pool;
        let mut options: Vec<(usize, &'a PotentialBomb)> = pool
            .iter()
            .filter(|bomb| simulation.is_empty(bomb.position))
            .filter(|bomb| !after_wait || vacated.contains(&bomb.position))
            .map(|bomb| (bomb.score(&result), bomb))
            .filter(|&(score, _)| score > 0)
            .collect();
        options.sort_by(|a, b| b.0.cmp(&a.0));
        trace!("rounds {rounds} devices {devices}: {} options", options.len());

        for (score, bomb) in options {
            let mut next_simulation = simulation.clone();
            if next_simulation.place(bomb.position).is_err() {
                continue;
            }
            let mut next_result = result.clone();
            next_result.clear_blast(bomb.position);

            trace!("try {:?} with score {score}", bomb.position);
            if let Some(mut actions) =
                self.explore(next_simulation, next_result, rounds - 1, devices - 1, false)
            {
                actions.push(Action::Place(bomb.position));
                return Some(actions);
            }
        }

        if simulation.has_devices() {
            if let Some(mut actions) = self.explore(simulation, result, rounds - 1, devices, true) {
                actions.push(Action::Wait);
                return Some(actions);
            }
        }

        None
    }
}

impl Solver for SearchPlanner {
    #[instrument(skip_all, name = "search", fields(rounds = budget.rounds, devices = budget.devices))]
    fn solve(&mut self, grid: &Grid, budget: Budget) -> Plan {
        let start = Instant::now();
        self.stats = Stats::default();

        let pool = deduplicate(potential_bombs(grid));
        debug!("{} candidate placements", pool.len());

        let mut search = Search {
            pool: &pool,
            limit: self.limit,
            expanded: 0,
        };
        let found = search.explore(grid.clone(), grid.clone(), budget.rounds, budget.devices, false);
        self.stats.expanded_nodes = search.expanded;

        let plan = match found {
            Some(mut actions) => {
                actions.reverse();
                Plan::padded(actions, budget.rounds)
            }
            None => {
                if search.exhausted() {
                    info!("search limit of {:?} expansions reached", self.limit);
                }
                info!("no full clear within budget, waiting out the rounds");
                Plan::waiting(budget.rounds)
            }
        };

        self.stats.record_plan(&plan, start);
        self.stats.print("search");
        plan
    }

    fn stats(&self) -> &Stats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Coord;

    fn board_with_nodes(width: usize, height: usize, nodes: &[Coord]) -> Grid {
        let rows: Vec<String> = (0..height)
            .map(|y| {
                (0..width)
                    .map(|x| if nodes.contains(&(x, y)) { '@' } else { '.' })
                    .collect()
            })
            .collect();
        Grid::from_rows(&rows).unwrap()
    }

    #[test]
    fn test_small_boards_are_cleared() {
        let budget = Budget::new(10, 2);
        let cells: Vec<Coord> = (0..5).flat_map(|y| (0..5).map(move |x| (x, y))).collect();

        for (i, &first) in cells.iter().enumerate() {
            let mut boards = vec![vec![first]];
            boards.extend(cells[i + 1..].iter().map(|&second| vec![first, second]));

            for nodes in boards {
                let grid = board_with_nodes(5, 5, &nodes);
                let plan = SearchPlanner::new(None).solve(&grid, budget);
                assert!(plan.verify(&grid, budget), "nodes {nodes:?}: {plan:?}");
            }
        }
    }

    #[test]
    fn test_waits_for_a_node_cell() {
        // (0,0) is only reachable from the node at (1,0), which in turn only
        // (1,1) can clear.
        let grid = Grid::from_rows(&["@@#", "#.#"]).unwrap();
        let budget = Budget::new(12, 2);
        let plan = SearchPlanner::new(None).solve(&grid, budget);
        assert!(plan.verify(&grid, budget), "{plan:?}");
        assert_eq!(plan.get(0), Action::Place((1, 1)));
        assert_eq!(plan.get(4), Action::Place((1, 0)));
        assert!(plan.actions[1..4].iter().all(|&action| action == Action::Wait));
    }

    #[test]
    fn test_too_few_rounds_fails() {
        let grid = Grid::from_rows(&["@@#", "#.#"]).unwrap();
        let budget = Budget::new(4, 2);
        assert_eq!(SearchPlanner::new(None).solve(&grid, budget), Plan::waiting(4));
    }

    #[test]
    fn test_unsolvable_budget_waits() {
        let grid = board_with_nodes(9, 9, &[(0, 0), (8, 8), (0, 8), (8, 0)]);
        let budget = Budget::new(10, 1);
        assert_eq!(SearchPlanner::new(None).solve(&grid, budget), Plan::waiting(10));
    }

    #[test]
    fn test_expansion_limit() {
        let grid = board_with_nodes(9, 9, &[(0, 0), (8, 8), (0, 8), (8, 0)]);
        let budget = Budget::new(10, 2);
        let mut planner = SearchPlanner::new(Some(5));
        assert_eq!(planner.solve(&grid, budget), Plan::waiting(10));
        assert!(planner.stats().expanded_nodes <= 5);
    }
}
