use anyhow::{bail, Context, Result};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufReader, Write};
use tracing::info;

use crate::common::Budget;
use crate::map::Grid;

/// A board plus the budgets it is played with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub width: usize,
    pub height: usize,
    pub rounds: usize,
    pub bombs: usize,
    pub rows: Vec<String>,
}

impl Scenario {
    pub fn load_from_file(path: &str) -> Result<Scenario> {
        let file = File::open(path).with_context(|| format!("cannot open scenario {path}"))?;
        let reader = BufReader::new(file);
        let scenario: Scenario = serde_yaml::from_reader(reader)
            .with_context(|| format!("cannot parse scenario {path}"))?;
        Ok(scenario)
    }

    pub fn to_grid(&self) -> Result<Grid> {
        let grid = Grid::from_rows(&self.rows)?;
        if grid.width != self.width || grid.height != self.height {
            bail!(
                "scenario declares {}x{} but rows form {}x{}",
                self.width,
                self.height,
                grid.width,
                grid.height
            );
        }
        Ok(grid)
    }

    pub fn budget(&self) -> Budget {
        Budget::new(self.rounds, self.bombs)
    }

    pub fn generate_random<R: Rng + ?Sized>(
        width: usize,
        height: usize,
        nodes: usize,
        passives: usize,
        budget: Budget,
        rng: &mut R,
    ) -> Result<Scenario> {
        if nodes + passives > width * height {
            bail!("{nodes} nodes and {passives} passives do not fit on {width}x{height}");
        }

        let mut cells: Vec<usize> = (0..width * height).collect();
        cells.shuffle(rng);

        let mut board = vec!['.'; width * height];
        for &cell in &cells[..nodes] {
            board[cell] = '@';
        }
        for &cell in &cells[nodes..nodes + passives] {
            board[cell] = '#';
        }

        let rows: Vec<String> = board
            .chunks(width)
            .map(|row| row.iter().collect())
            .collect();

        let scenario = Scenario {
            width,
            height,
            rounds: budget.rounds,
            bombs: budget.devices,
            rows,
        };
        info!("Generate board:\n{}", scenario.rows.join("\n"));
        Ok(scenario)
    }

    pub fn write_to_yaml(&self, path: &str) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = io::BufWriter::new(file);
        let yaml_data = serde_yaml::to_string(self)?;
        writer.write_all(yaml_data.as_bytes())?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::Cell;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_read_scenario() {
        let scenario = Scenario::load_from_file("map_file/test/ring.yaml").unwrap();
        assert_eq!(scenario.budget(), Budget::new(5, 1));

        let grid = scenario.to_grid().unwrap();
        assert_eq!(grid.width, 3);
        assert_eq!(grid.height, 3);
        assert_eq!(grid.nodes(), vec![(1, 0), (0, 1), (2, 1), (1, 2)]);
    }

    #[test]
    fn test_mismatched_dimensions() {
        let scenario = Scenario {
            width: 4,
            height: 1,
            rounds: 3,
            bombs: 1,
            rows: vec!["@..".to_string()],
        };
        assert!(scenario.to_grid().is_err());
    }

    #[test]
    fn test_generate_random() {
        let mut rng = StdRng::seed_from_u64(0);
        let scenario =
            Scenario::generate_random(6, 4, 5, 3, Budget::new(10, 2), &mut rng).unwrap();
        let grid = scenario.to_grid().unwrap();
        assert_eq!(grid.node_count(), 5);
        assert_eq!(
            grid.coords()
                .filter(|&coord| grid.cell(coord) == Cell::Passive)
                .count(),
            3
        );

        let mut rng = StdRng::seed_from_u64(0);
        let again = Scenario::generate_random(6, 4, 5, 3, Budget::new(10, 2), &mut rng).unwrap();
        assert_eq!(scenario, again);

        assert!(Scenario::generate_random(2, 2, 3, 2, Budget::new(1, 1), &mut rng).is_err());
    }

    #[test]
    fn test_yaml_round_trip_through_file() {
        let mut rng = StdRng::seed_from_u64(3);
        let scenario = Scenario::generate_random(5, 5, 4, 2, Budget::new(8, 2), &mut rng).unwrap();
        let path = std::env::temp_dir().join("vox_planner_scenario.yaml");
        let path = path.to_str().unwrap();
        scenario.write_to_yaml(path).unwrap();
        assert_eq!(Scenario::load_from_file(path).unwrap(), scenario);
    }
}
