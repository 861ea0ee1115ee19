use crate::dynamics::{StepReport, neighborhood};
use crate::model::{AgentType, Grid};
use crate::stats::{Accumulator, AccumulatorReport};
use anyhow::{Context, Result};
use serde::Serialize;
use std::{fs, path::Path};

/// Grid observed after a step, with the relocations that produced it.
pub struct Sample<'a> {
    pub grid: &'a Grid,
    pub step: &'a StepReport,
}

#[derive(Debug, Serialize)]
pub struct ObsReport {
    pub name: &'static str,
    pub stats: AccumulatorReport,
}

pub trait Obs {
    fn update(&mut self, sample: &Sample);
    fn report(&self) -> ObsReport;
}

/// Fraction of agents relocated in the sampled step.
pub struct FracDisplaced {
    acc: Accumulator,
}

impl FracDisplaced {
    pub fn new() -> Self {
        Self {
            acc: Accumulator::new(),
        }
    }
}

impl Obs for FracDisplaced {
    fn update(&mut self, sample: &Sample) {
        let n_agt = sample.grid.n_cells() - sample.grid.count(AgentType::Empty);
        if n_agt == 0 {
            return;
        }
        self.acc.add(sample.step.total() as f64 / n_agt as f64);
    }

    fn report(&self) -> ObsReport {
        ObsReport {
            name: "frac_displaced",
            stats: self.acc.report(),
        }
    }
}

/// Average share of alike neighbors among agents that have any neighbor.
pub struct MeanSimilarity {
    acc: Accumulator,
}

impl MeanSimilarity {
    pub fn new() -> Self {
        Self {
            acc: Accumulator::new(),
        }
    }
}

impl Obs for MeanSimilarity {
    fn update(&mut self, sample: &Sample) {
        let grid = sample.grid;
        let mut share_sum = 0.0;
        let mut n_agt = 0;
        for (idx, cell) in grid.cells().iter().enumerate() {
            if cell.is_empty() {
                continue;
            }
            let (row, col) = grid.position(idx);
            let nbhd = neighborhood(grid, row, col);
            if nbhd.n_neighbors == 0 {
                continue;
            }
            share_sum += nbhd.n_alike as f64 / nbhd.n_neighbors as f64;
            n_agt += 1;
        }
        if n_agt > 0 {
            self.acc.add(share_sum / n_agt as f64);
        }
    }

    fn report(&self) -> ObsReport {
        ObsReport {
            name: "mean_similarity",
            stats: self.acc.report(),
        }
    }
}

#[derive(Serialize)]
struct Results<'a> {
    observables: &'a [ObsReport],
}

pub struct Analyzer {
    obs_ptr_vec: Vec<Box<dyn Obs>>,
}

impl Analyzer {
    pub fn new() -> Self {
        let mut obs_ptr_vec: Vec<Box<dyn Obs>> = Vec::new();
        obs_ptr_vec.push(Box::new(FracDisplaced::new()));
        obs_ptr_vec.push(Box::new(MeanSimilarity::new()));
        Self { obs_ptr_vec }
    }

    pub fn update(&mut self, sample: &Sample) {
        for obs in &mut self.obs_ptr_vec {
            obs.update(sample);
        }
    }

    pub fn reports(&self) -> Vec<ObsReport> {
        self.obs_ptr_vec.iter().map(|obs| obs.report()).collect()
    }

    pub fn save_results<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let reports = self.reports();
        let contents = toml::to_string_pretty(&Results {
            observables: &reports,
        })
        .context("failed to serialize results")?;
        fs::write(file, contents).with_context(|| format!("failed to write {file:?}"))?;
        Ok(())
    }
}
