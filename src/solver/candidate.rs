use std::collections::{BTreeSet, HashSet};

use crate::common::Coord;
use crate::map::{Cell, Grid};

/// A cell a device could occupy, with the nodes its blast reaches on the
/// grid it was computed against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PotentialBomb {
    pub position: Coord,
    pub on_node: bool,
    pub footprint: Vec<Coord>,
}

impl PotentialBomb {
    /// Footprint nodes still present on `grid`.
    pub fn score(&self, grid: &Grid) -> usize {
        self.footprint
            .iter()
            .filter(|&&coord| grid.cell(coord) == Cell::Node)
            .count()
    }
}

/// Every non-passive cell in row-major order.
pub fn potential_bombs(grid: &Grid) -> Vec<PotentialBomb> {
    grid.coords()
        .filter(|&coord| grid.cell(coord) != Cell::Passive)
        .map(|coord| PotentialBomb {
            position: coord,
            on_node: grid.cell(coord) == Cell::Node,
            footprint: grid
                .blast(coord)
                .into_iter()
                .filter(|(_, cell)| *cell == Cell::Node)
                .map(|(coord, _)| coord)
                .collect(),
        })
        .collect()
}

/// Drops candidates that reach nothing and keeps one empty-cell candidate per
/// distinct footprint. Candidates sitting on a node are always kept.
pub fn deduplicate(pool: Vec<PotentialBomb>) -> Vec<PotentialBomb> {
    let mut seen: HashSet<BTreeSet<Coord>> = HashSet::new();
    pool.into_iter()
        .filter(|bomb| !bomb.footprint.is_empty())
        .filter(|bomb| bomb.on_node || seen.insert(bomb.footprint.iter().copied().collect()))
        .collect()
}
