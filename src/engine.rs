use crate::analysis::{Analyzer, Sample};
use crate::config::Config;
use crate::dynamics::{StepReport, advance_step, initialize_world};
use crate::model::Grid;
use anyhow::{Context, Result};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use rmp_serde::{decode, encode};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

/// Simulation engine.
///
/// Owns the configuration, the grid and the random number generator,
/// and provides methods to initialize, run, save, and load simulations.
#[derive(Serialize, Deserialize)]
pub struct Engine {
    cfg: Config,
    grid: Grid,
    rng: ChaCha12Rng,
    step: usize,
}

impl Engine {
    /// Create a new `Engine` with the given configuration and a random initial grid.
    pub fn generate_initial_condition(cfg: Config) -> Result<Self> {
        let mut rng = match cfg.init.seed {
            Some(seed) => ChaCha12Rng::seed_from_u64(seed),
            None => ChaCha12Rng::try_from_os_rng()?,
        };

        let grid = initialize_world(cfg.init.side_len, &cfg.init.distribution, &mut rng)
            .context("failed to initialize grid")?;

        Ok(Self {
            cfg,
            grid,
            rng,
            step: 0,
        })
    }

    pub fn cfg(&self) -> &Config {
        &self.cfg
    }

    /// Current grid. Stepping needs `&mut self`, so a borrowed view never
    /// observes a step in progress.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Number of steps performed since the initial condition.
    pub fn step(&self) -> usize {
        self.step
    }

    /// Perform the simulation, feeding periodic samples to `analyzer`.
    pub fn perform_simulation(&mut self, analyzer: &mut Analyzer) -> Result<()> {
        let samples_per_run = self.cfg.output.samples_per_run;
        for i_sample in 0..samples_per_run {
            let mut report = StepReport::default();
            for _ in 0..self.cfg.output.steps_per_sample {
                report = self.perform_step().context("failed to perform step")?;
            }

            analyzer.update(&Sample {
                grid: &self.grid,
                step: &report,
            });

            let progress = 100.0 * (i_sample + 1) as f64 / samples_per_run as f64;
            log::info!("completed {progress:06.2}%");
        }

        Ok(())
    }

    /// Save a checkpoint of the entire engine state.
    ///
    /// Can be used to resume the simulation later.
    pub fn save_checkpoint<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);
        encode::write(&mut writer, &self).context("failed to serialize engine")?;
        writer.flush().context("failed to flush writer stream")?;
        Ok(())
    }

    /// Load a previously saved engine checkpoint.
    pub fn load_checkpoint<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);
        let engine: Engine =
            decode::from_read(&mut reader).context("failed to deserialize engine")?;
        engine.grid.check_shape().context("invalid checkpoint grid")?;
        Ok(engine)
    }

    fn perform_step(&mut self) -> Result<StepReport> {
        let report = advance_step(&mut self.grid, self.cfg.model.threshold, &mut self.rng)?;
        self.step += 1;
        log::debug!(
            "step {}: displaced {} A and {} B",
            self.step,
            report.displaced_a,
            report.displaced_b
        );
        Ok(report)
    }
}
