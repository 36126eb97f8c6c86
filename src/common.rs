use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::map::Grid;

/// (column, row), 0-indexed. Tuple ordering gives the (column, row) key order.
pub type Coord = (usize, usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Budget {
    pub rounds: usize,
    pub devices: usize,
}

impl Budget {
    pub fn new(rounds: usize, devices: usize) -> Self {
        Budget { rounds, devices }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Place(Coord),
    Wait,
}

impl Action {
    pub fn target(&self) -> Option<Coord> {
        match self {
            Action::Place(coord) => Some(*coord),
            Action::Wait => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Place((x, y)) => write!(f, "{x} {y}"),
            Action::Wait => write!(f, "WAIT"),
        }
    }
}

/// One decision per remaining round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub actions: Vec<Action>,
}

impl Plan {
    pub fn waiting(rounds: usize) -> Self {
        Plan {
            actions: vec![Action::Wait; rounds],
        }
    }

    /// Pads `prefix` with waits up to `rounds`. A prefix longer than the round
    /// budget is truncated.
    pub fn padded(mut prefix: Vec<Action>, rounds: usize) -> Self {
        prefix.resize(rounds, Action::Wait);
        Plan { actions: prefix }
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn get(&self, round: usize) -> Action {
        self.actions.get(round).copied().unwrap_or(Action::Wait)
    }

    pub fn placements(&self) -> impl Iterator<Item = Coord> + '_ {
        self.actions.iter().filter_map(Action::target)
    }

    /// Tick-then-place for every round, then let armed devices run out.
    pub fn replay(&self, grid: &Grid) -> Result<Grid> {
        let mut grid = grid.clone();
        for (round, action) in self.actions.iter().enumerate() {
            grid.tick();
            if let Action::Place(coord) = action {
                grid.place(*coord)
                    .with_context(|| format!("round {round}: cannot place at {coord:?}"))?;
            }
        }
        grid.settle();
        Ok(grid)
    }

    pub fn verify(&self, grid: &Grid, budget: Budget) -> bool {
        if self.len() != budget.rounds {
            debug!("plan has {} decisions for {} rounds", self.len(), budget.rounds);
            return false;
        }
        if self.placements().count() > budget.devices {
            debug!("plan exceeds device budget {}", budget.devices);
            return false;
        }
        match self.replay(grid) {
            Ok(result) => result.node_count() == 0,
            Err(err) => {
                debug!("replay failed: {err:#}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_plan() {
        let plan = Plan::padded(vec![Action::Place((1, 2))], 3);
        assert_eq!(
            plan.actions,
            vec![Action::Place((1, 2)), Action::Wait, Action::Wait]
        );
        assert_eq!(plan.get(7), Action::Wait);
        assert_eq!(Plan::padded(vec![Action::Wait; 5], 2).len(), 2);
    }

    #[test]
    fn test_action_display() {
        assert_eq!(Action::Place((3, 4)).to_string(), "3 4");
        assert_eq!(Action::Wait.to_string(), "WAIT");
    }

    #[test]
    fn test_replay_rejects_occupied_cell() {
        let grid = Grid::from_rows(&["...", ".@.", "..."]).unwrap();
        let plan = Plan::padded(vec![Action::Place((1, 1))], 3);
        assert!(plan.replay(&grid).is_err());
        assert!(!plan.verify(&grid, Budget::new(3, 1)));
    }

    #[test]
    fn test_verify_clears_board() {
        let grid = Grid::from_rows(&["...", ".@.", "..."]).unwrap();
        let plan = Plan::padded(vec![Action::Place((0, 1))], 2);
        assert!(plan.verify(&grid, Budget::new(2, 1)));
        assert!(!plan.verify(&grid, Budget::new(2, 0)));
        assert!(!plan.verify(&grid, Budget::new(3, 1)));
    }
}
