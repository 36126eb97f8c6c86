use serde::Serialize;
use std::time::Instant;
use tracing::info;

use crate::common::Plan;

#[derive(Debug, Clone, Default, Serialize)]
pub struct Stats {
    pub placements: usize,
    pub waits: usize,
    pub expanded_nodes: usize,
    pub time_us: usize,
}

impl Stats {
    pub(crate) fn record_plan(&mut self, plan: &Plan, start: Instant) {
        self.placements = plan.placements().count();
        self.waits = plan.len() - self.placements;
        self.time_us = start.elapsed().as_micros() as usize;
    }

    pub(crate) fn print(&self, solver: &str) {
        info!(
            "{solver}: placements {:?} waits {:?} Time(microseconds) {:?} Expand nodes number: {:?}",
            self.placements, self.waits, self.time_us, self.expanded_nodes
        );
    }
}
