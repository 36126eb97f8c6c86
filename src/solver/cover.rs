use super::candidate::{potential_bombs, PotentialBomb};
use super::Solver;
use crate::common::{Action, Budget, Coord, Plan};
use crate::map::Grid;
use crate::stat::Stats;

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use tracing::{debug, instrument, warn};

/// Approximate minimum set cover over node-destroying placements, followed by
/// a schedule that respects which placements must wait for others to clear
/// their cell.
pub struct CoverPlanner {
    stats: Stats,
}

impl CoverPlanner {
    pub fn new() -> Self {
        CoverPlanner {
            stats: Stats::default(),
        }
    }
}

impl Default for CoverPlanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Greedy cover of `targets`, returned as indices into `pool`. After every
/// pick, chosen candidates whose nodes are all covered twice are dropped.
pub(crate) fn select_cover(pool: &[PotentialBomb], targets: &HashSet<Coord>) -> Vec<usize> {
    let mut coverage: HashMap<Coord, usize> = targets.iter().map(|&node| (node, 0)).collect();
    let mut chosen: Vec<usize> = Vec::new();

    while coverage.values().any(|&count| count == 0) {
        let uncovered = |bomb: &PotentialBomb| {
            bomb.footprint
                .iter()
                .filter(|&node| coverage.get(node) == Some(&0))
                .count()
        };

        // Ties go to the larger footprint, then to the earlier cell.
        let best = pool
            .iter()
            .enumerate()
            .filter(|(index, _)| !chosen.contains(index))
            .map(|(index, bomb)| (index, uncovered(bomb), bomb.footprint.len()))
            .filter(|&(_, gain, _)| gain > 0)
            .max_by(|a, b| (a.1, a.2).cmp(&(b.1, b.2)).then(b.0.cmp(&a.0)));

        let Some((index, gain, _)) = best else {
            break;
        };
        debug!("cover {:?} gains {gain}", pool[index].position);

        chosen.push(index);
        for node in &pool[index].footprint {
            if let Some(count) = coverage.get_mut(node) {
                *count += 1;
            }
        }
        simplify(pool, &mut chosen, &mut coverage);
    }

    chosen
}

fn simplify(pool: &[PotentialBomb], chosen: &mut Vec<usize>, coverage: &mut HashMap<Coord, usize>) {
    let mut position = 0;
    while position < chosen.len() {
        let bomb = &pool[chosen[position]];
        let redundant = bomb
            .footprint
            .iter()
            .all(|node| coverage.get(node).map_or(true, |&count| count > 1));

        if redundant {
            debug!("drop redundant {:?}", bomb.position);
            for node in &bomb.footprint {
                if let Some(count) = coverage.get_mut(node) {
                    *count -= 1;
                }
            }
            chosen.remove(position);
        } else {
            position += 1;
        }
    }
}

/// Orders `chosen` so that every placement comes after the placement that
/// clears its cell, deepest dependency chains first. Placements that nothing
/// chosen can unlock get an extra empty-cell placement from `pool` that does.
pub(crate) fn schedule(grid: &Grid, pool: &[PotentialBomb], chosen: &[Coord]) -> Vec<Coord> {
    let mut scratch = grid.clone();
    let mut remaining: Vec<Coord> = chosen.to_vec();
    let mut level: HashMap<Coord, usize> = HashMap::new();
    let mut clearer: HashMap<Coord, Coord> = HashMap::new();
    let mut resolved: Vec<Coord> = Vec::new();

    while !remaining.is_empty() {
        let mut placeable: Vec<Coord> = remaining
            .iter()
            .copied()
            .filter(|&coord| scratch.is_empty(coord))
            .collect();

        if placeable.is_empty() {
            match unlocker(&scratch, pool, &remaining, &resolved) {
                Some(extra) => {
                    debug!("add {extra:?} to unlock {remaining:?}");
                    placeable.push(extra);
                }
                None => {
                    warn!("placements {remaining:?} can never be reached");
                    break;
                }
            }
        }
        remaining.retain(|coord| !placeable.contains(coord));

        for coord in placeable {
            let own_level = *level.entry(coord).or_insert(0);
            for cleared in scratch.clear_blast(coord) {
                if remaining.contains(&cleared) && !clearer.contains_key(&cleared) {
                    clearer.insert(cleared, coord);
                    level.insert(cleared, own_level + 1);
                }
            }
            resolved.push(coord);
        }
    }

    // Dependents have a strictly higher level than their clearer, so walking
    // by descending level settles a placement's depth before its clearer's.
    let mut depth: HashMap<Coord, usize> = resolved.iter().map(|&coord| (coord, 0)).collect();
    let mut by_level = resolved.clone();
    by_level.sort_by_key(|coord| Reverse(level[coord]));
    for coord in &by_level {
        if let Some(parent) = clearer.get(coord) {
            let child_depth = depth[coord] + 1;
            let parent_depth = depth.entry(*parent).or_insert(0);
            *parent_depth = (*parent_depth).max(child_depth);
        }
    }

    let mut order = resolved;
    order.sort_by_key(|coord| Reverse(depth[coord]));
    order
}

// The empty cell whose blast clears the most stuck placements.
fn unlocker(
    scratch: &Grid,
    pool: &[PotentialBomb],
    stuck: &[Coord],
    resolved: &[Coord],
) -> Option<Coord> {
    pool.iter()
        .enumerate()
        .filter(|(_, bomb)| scratch.is_empty(bomb.position) && !resolved.contains(&bomb.position))
        .map(|(index, bomb)| {
            let unlocked = bomb
                .footprint
                .iter()
                .filter(|&node| stuck.contains(node))
                .count();
            (index, unlocked, bomb.footprint.len())
        })
        .filter(|&(_, unlocked, _)| unlocked > 0)
        .max_by(|a, b| (a.1, a.2).cmp(&(b.1, b.2)).then(b.0.cmp(&a.0)))
        .map(|(index, _, _)| pool[index].position)
}

impl Solver for CoverPlanner {
    #[instrument(skip_all, name = "cover", fields(rounds = budget.rounds, devices = budget.devices))]
    fn solve(&mut self, grid: &Grid, budget: Budget) -> Plan {
        let start = Instant::now();
        self.stats = Stats::default();

        let pool = potential_bombs(grid);
        let reachable: HashSet<Coord> = pool
            .iter()
            .flat_map(|bomb| bomb.footprint.iter().copied())
            .collect();
        let targets: HashSet<Coord> = grid.nodes().into_iter().collect();
        for node in targets.difference(&reachable) {
            warn!("node {node:?} is out of reach of every cell");
        }
        let targets: HashSet<Coord> = targets.intersection(&reachable).copied().collect();

        let chosen: Vec<Coord> = select_cover(&pool, &targets)
            .into_iter()
            .map(|index| pool[index].position)
            .collect();
        let mut outstanding = schedule(grid, &pool, &chosen);
        debug!("schedule {outstanding:?}");
        if outstanding.len() > budget.devices {
            warn!(
                "cover needs {} devices, only {} available",
                outstanding.len(),
                budget.devices
            );
        }

        let mut replay = grid.clone();
        let mut devices_left = budget.devices;
        let mut actions = Vec::with_capacity(budget.rounds);
        for round in 0..budget.rounds {
            if outstanding.is_empty() || devices_left == 0 {
                break;
            }
            replay.tick();
            let next = outstanding
                .iter()
                .position(|&coord| replay.is_empty(coord));
            let action = match next {
                Some(index) if replay.place(outstanding[index]).is_ok() => {
                    let coord = outstanding.remove(index);
                    debug!("round {round}: place {coord:?}");
                    devices_left -= 1;
                    Action::Place(coord)
                }
                _ => Action::Wait,
            };
            actions.push(action);
        }

        let plan = Plan::padded(actions, budget.rounds);
        self.stats.record_plan(&plan, start);
        self.stats.print("cover");
        plan
    }

    fn stats(&self) -> &Stats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::Scenario;

    fn cover_of(grid: &Grid) -> (Vec<PotentialBomb>, Vec<usize>) {
        let pool = potential_bombs(grid);
        let targets = grid.nodes().into_iter().collect();
        let chosen = select_cover(&pool, &targets);
        (pool, chosen)
    }

    #[test]
    fn test_cover_is_complete_and_irredundant() {
        let boards: [&[&str]; 3] = [
            &["@..@...", ".......", "..@..@.", "...#...", "@.....@"],
            &["@@@@@@", "@....@", "@.##.@", "@@@@@@"],
            &[".@.@.@.", "@.@.@.@", ".@.@.@.", "#######", "@.@.@.@"],
        ];

        for rows in boards {
            let grid = Grid::from_rows(rows).unwrap();
            let (pool, chosen) = cover_of(&grid);

            let mut coverage: HashMap<Coord, usize> = HashMap::new();
            for &index in &chosen {
                for &node in &pool[index].footprint {
                    *coverage.entry(node).or_default() += 1;
                }
            }
            for node in grid.nodes() {
                assert!(coverage.get(&node).is_some_and(|&count| count > 0), "{node:?}");
            }
            for &index in &chosen {
                assert!(
                    pool[index].footprint.iter().any(|node| coverage[node] == 1),
                    "{:?} is redundant",
                    pool[index].position
                );
            }
        }
    }

    #[test]
    fn test_schedule_orders_by_dependency() {
        // The only useful cells hold nodes, so (1,0) has to open the line.
        let grid = Grid::from_rows(&["..@@@@@@"]).unwrap();
        let (pool, chosen) = cover_of(&grid);
        let chosen: Vec<Coord> = chosen.into_iter().map(|index| pool[index].position).collect();
        assert_eq!(chosen, vec![(4, 0), (5, 0)]);

        let order = schedule(&grid, &pool, &chosen);
        assert_eq!(order, vec![(1, 0), (4, 0), (5, 0)]);
    }

    #[test]
    fn test_scheduled_plan_replays() {
        let scenario = Scenario::load_from_file("map_file/test/line.yaml").unwrap();
        let grid = scenario.to_grid().unwrap();
        let budget = scenario.budget();
        let plan = CoverPlanner::new().solve(&grid, budget);
        assert_eq!(plan.get(0), Action::Place((1, 0)));
        assert_eq!(plan.get(4), Action::Place((4, 0)));
        assert!(plan.verify(&grid, budget), "{plan:?}");
    }

    #[test]
    fn test_replay_never_targets_occupied_cells() {
        let boards: [&[&str]; 3] = [
            &["@@@.", "@#@.", "@@@.", "...."],
            &["@.@.@.@.@", ".........", "@.@.@.@.@", "####.####", "@@@@.@@@@"],
            &["#@#", "@@@", "#@#", "..."],
        ];
        for rows in boards {
            let grid = Grid::from_rows(rows).unwrap();
            let budget = Budget::new(40, 20);
            let plan = CoverPlanner::new().solve(&grid, budget);
            let replayed = plan.replay(&grid).expect("placements target empty cells");
            assert_eq!(replayed.node_count(), 0, "{rows:?}: {plan:?}");
        }
    }

    #[test]
    fn test_unreachable_node_is_skipped() {
        let grid = Grid::from_rows(&["###..", "#@#.@", "###.."]).unwrap();
        let budget = Budget::new(6, 2);
        let plan = CoverPlanner::new().solve(&grid, budget);
        assert_eq!(plan.placements().count(), 1);
        let replayed = plan.replay(&grid).unwrap();
        assert_eq!(replayed.nodes(), vec![(1, 1)]);
    }
}
