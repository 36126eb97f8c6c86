use anyhow::{anyhow, bail, Result};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use tracing::trace;

use crate::common::Coord;

/// Rounds between placement and detonation.
pub const DEVICE_TIMER: u8 = 4;
/// Maximum ray length of a blast in each direction.
pub const BLAST_RANGE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cell {
    Empty,
    Passive,
    Node,
    Device,
}

impl Cell {
    pub fn from_char(ch: char) -> Self {
        match ch {
            '@' => Cell::Node,
            '#' => Cell::Passive,
            _ => Cell::Empty,
        }
    }

    pub fn to_char(self) -> char {
        match self {
            Cell::Empty => '.',
            Cell::Passive => '#',
            Cell::Node => '@',
            Cell::Device => '*',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Device {
    pub position: Coord,
    pub timer: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Grid {
    pub width: usize,
    pub height: usize,
    cells: Vec<Vec<Cell>>, // cells[row][column]
    devices: Vec<Device>,
}

impl Grid {
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self> {
        let height = rows.len();
        if height == 0 {
            bail!("grid has no rows");
        }
        let width = rows[0].as_ref().chars().count();
        if width == 0 {
            bail!("grid has zero width");
        }

        let mut cells = Vec::with_capacity(height);
        for (y, row) in rows.iter().enumerate() {
            let row: Vec<Cell> = row.as_ref().chars().map(Cell::from_char).collect();
            if row.len() != width {
                bail!("row {y} has {} cells, expected {width}", row.len());
            }
            cells.push(row);
        }

        Ok(Grid {
            width,
            height,
            cells,
            devices: Vec::new(),
        })
    }

    pub fn in_bounds(&self, coord: Coord) -> bool {
        coord.0 < self.width && coord.1 < self.height
    }

    pub fn cell(&self, (x, y): Coord) -> Cell {
        self.cells[y][x]
    }

    pub fn is_empty(&self, coord: Coord) -> bool {
        self.cell(coord) == Cell::Empty
    }

    /// All coordinates in row-major scan order.
    pub fn coords(&self) -> impl Iterator<Item = Coord> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| (x, y)))
    }

    pub fn nodes(&self) -> Vec<Coord> {
        self.coords()
            .filter(|&coord| self.cell(coord) == Cell::Node)
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|&&cell| cell == Cell::Node)
            .count()
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn has_devices(&self) -> bool {
        !self.devices.is_empty()
    }

    pub fn place(&mut self, coord: Coord) -> Result<()> {
        if !self.in_bounds(coord) {
            return Err(anyhow!(
                "{coord:?} is outside the {}x{} grid",
                self.width,
                self.height
            ));
        }
        let cell = self.cell(coord);
        if cell != Cell::Empty {
            bail!("{coord:?} holds {cell:?}, devices need an empty cell");
        }
        self.cells[coord.1][coord.0] = Cell::Device;
        self.devices.push(Device {
            position: coord,
            timer: DEVICE_TIMER,
        });
        Ok(())
    }

    /// Removes a node without any detonation. Other cell kinds are untouched.
    pub fn clear(&mut self, coord: Coord) -> bool {
        if self.cell(coord) == Cell::Node {
            self.cells[coord.1][coord.0] = Cell::Empty;
            true
        } else {
            false
        }
    }

    /// Cells reached from `origin`: down, up, right, left, each by increasing
    /// distance. The origin is never part of its own blast.
    pub fn blast(&self, origin: Coord) -> Vec<(Coord, Cell)> {
        let directions: [(isize, isize); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];
        let mut reached = Vec::new();

        for &(dx, dy) in &directions {
            for distance in 1..=BLAST_RANGE as isize {
                let x = origin.0 as isize + dx * distance;
                let y = origin.1 as isize + dy * distance;
                if x < 0 || y < 0 || x >= self.width as isize || y >= self.height as isize {
                    break;
                }
                let coord = (x as usize, y as usize);
                let cell = self.cell(coord);
                if cell == Cell::Passive {
                    break;
                }
                reached.push((coord, cell));
            }
        }

        reached
    }

    /// Clears every node the blast from `origin` reaches, as if it had already
    /// gone off. Devices are left alone.
    pub fn clear_blast(&mut self, origin: Coord) -> Vec<Coord> {
        self.blast(origin)
            .into_iter()
            .filter(|&(coord, _)| self.clear(coord))
            .map(|(coord, _)| coord)
            .collect()
    }

    pub fn tick(&mut self) -> Vec<Coord> {
        self.tick_with(|_| {})
    }

    /// Advances every armed device by one round and runs the detonation queue,
    /// chained devices included. `on_destroy` sees every node cleared.
    /// Returns every coordinate that became empty during this round.
    pub fn tick_with<F: FnMut(Coord)>(&mut self, mut on_destroy: F) -> Vec<Coord> {
        let mut queue = VecDeque::new();
        let mut queued = HashSet::new();

        for device in &mut self.devices {
            device.timer = device.timer.saturating_sub(1);
            if device.timer == 0 && queued.insert(device.position) {
                queue.push_back(device.position);
            }
        }

        let mut vacated = Vec::new();
        while let Some(origin) = queue.pop_front() {
            trace!("detonate {origin:?}");
            for (coord, cell) in self.blast(origin) {
                match cell {
                    Cell::Device => {
                        if queued.insert(coord) {
                            trace!("chain {origin:?} -> {coord:?}");
                            queue.push_back(coord);
                        }
                    }
                    Cell::Node => {
                        self.cells[coord.1][coord.0] = Cell::Empty;
                        on_destroy(coord);
                        vacated.push(coord);
                    }
                    _ => {}
                }
            }
            self.devices.retain(|device| device.position != origin);
            self.cells[origin.1][origin.0] = Cell::Empty;
            vacated.push(origin);
        }

        vacated
    }

    /// Ticks until no device is armed.
    pub fn settle(&mut self) {
        while self.has_devices() {
            self.tick();
        }
    }

    pub fn rows(&self) -> Vec<String> {
        self.cells
            .iter()
            .map(|row| row.iter().map(|cell| cell.to_char()).collect())
            .collect()
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows() {
            writeln!(f, "{row}")?;
        }
        Ok(())
    }
}
