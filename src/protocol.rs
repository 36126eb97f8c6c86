//! Line protocol spoken with the turn-based driver.
//!
//! Input starts with `width height` and `height` board rows (`@` node, `#`
//! passive, anything else empty), then one `rounds bombs` line per round.
//! Every round is answered with `x y` or `WAIT`.

use anyhow::{anyhow, bail, Context, Result};
use std::io::{BufRead, Lines, Write};
use tracing::{debug, info, warn};

use crate::common::{Action, Budget, Plan};
use crate::map::Grid;
use crate::solver::Solver;

fn parse_pair(line: &str) -> Result<(usize, usize)> {
    let mut parts = line.split_whitespace();
    let mut next = |name: &str| -> Result<usize> {
        let part = parts
            .next()
            .ok_or_else(|| anyhow!("missing {name} in {line:?}"))?;
        part.parse::<usize>()
            .with_context(|| format!("invalid {name} {part:?}"))
    };
    let first = next("first value")?;
    let second = next("second value")?;
    Ok((first, second))
}

pub fn parse_budget(line: &str) -> Result<Budget> {
    let (rounds, devices) = parse_pair(line).context("bad round line")?;
    Ok(Budget::new(rounds, devices))
}

pub fn read_grid<R: BufRead>(lines: &mut Lines<R>) -> Result<Grid> {
    let header = lines
        .next()
        .ok_or_else(|| anyhow!("missing board header"))??;
    let (width, height) = parse_pair(&header).context("bad board header")?;

    let mut rows = Vec::with_capacity(height);
    for y in 0..height {
        let row = lines
            .next()
            .ok_or_else(|| anyhow!("board ends after {y} of {height} rows"))??;
        let row = row.trim_end_matches('\r').to_string();
        if row.chars().count() != width {
            bail!("row {y} is {:?}, expected {width} cells", row);
        }
        rows.push(row);
    }

    Grid::from_rows(&rows)
}

/// Reads the board, plans once on the first round line and replays that plan.
/// Rounds past the end of the plan are answered with `WAIT`.
pub fn play<R: BufRead, W: Write>(reader: R, mut writer: W, solver: &mut dyn Solver) -> Result<()> {
    let mut lines = reader.lines();
    let mut grid = read_grid(&mut lines)?;
    info!("board {}x{} with {} nodes", grid.width, grid.height, grid.node_count());

    let mut plan: Option<Plan> = None;
    let mut round = 0;
    for line in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let budget = parse_budget(&line)?;
        let action = plan
            .get_or_insert_with(|| solver.solve(&grid, budget))
            .get(round);
        grid.tick();
        if let Action::Place(coord) = action {
            if let Err(err) = grid.place(coord) {
                warn!("board diverged from the plan: {err:#}");
            }
        }
        debug!("round {round} ({} left, {} devices): {action}", budget.rounds, budget.devices);

        writeln!(writer, "{action}")?;
        writer.flush()?;
        round += 1;
    }

    Ok(())
}
