use crate::analysis::Analyzer;
use crate::config::Config;
use crate::engine::Engine;
use anyhow::{Context, Result, bail};
use glob::glob;
use std::{
    fs,
    path::{Path, PathBuf},
};

pub struct Manager {
    sim_dir: PathBuf,
    cfg: Config,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(sim_dir: P) -> Result<Self> {
        let sim_dir = sim_dir.as_ref().to_path_buf();

        let cfg =
            Config::from_file(sim_dir.join("config.toml")).context("failed to construct cfg")?;
        log::info!("{cfg:#?}");

        Ok(Self { sim_dir, cfg })
    }

    pub fn create_run(&self) -> Result<()> {
        let run_idx = self.next_run_idx().context("failed to find next run index")?;

        let run_dir = self.run_dir(run_idx);
        fs::create_dir(&run_dir).with_context(|| format!("failed to create {run_dir:?}"))?;
        log::info!("created {run_dir:?}");

        let engine = Engine::generate_initial_condition(self.cfg.clone())
            .context("failed to generate initial condition")?;

        self.simulate(run_idx, engine)
    }

    pub fn resume_run(&self, run_idx: usize) -> Result<()> {
        let engine = self.load_run(run_idx)?;
        if engine.cfg() != &self.cfg {
            bail!("checkpoint config differs from the current config");
        }

        self.simulate(run_idx, engine)
    }

    pub fn show_run(&self, run_idx: usize) -> Result<()> {
        let engine = self.load_run(run_idx)?;
        let side_len = engine.grid().side_len();
        log::info!(
            "run {run_idx}: {side_len}x{side_len} grid after {} steps",
            engine.step()
        );
        println!("{}", engine.grid());
        Ok(())
    }

    pub fn clean_sim(&self) -> Result<()> {
        for run_dir in self.run_dirs().context("failed to list run dirs")? {
            fs::remove_dir_all(&run_dir).with_context(|| format!("failed to remove {run_dir:?}"))?;
            log::info!("removed {run_dir:?}");
        }
        Ok(())
    }

    fn simulate(&self, run_idx: usize, mut engine: Engine) -> Result<()> {
        let file_idx = self
            .count_results_files(run_idx)
            .context("failed to count results files")?;

        let mut analyzer = Analyzer::new();
        engine
            .perform_simulation(&mut analyzer)
            .context("failed to perform simulation")?;

        let checkpoint_file = self.checkpoint_file(run_idx);
        engine
            .save_checkpoint(&checkpoint_file)
            .with_context(|| format!("failed to save {checkpoint_file:?}"))?;
        log::info!("saved {checkpoint_file:?}");

        analyzer
            .save_results(self.results_file(run_idx, file_idx))
            .context("failed to save results")?;
        for report in analyzer.reports() {
            log::info!("{report:?}");
        }

        Ok(())
    }

    fn load_run(&self, run_idx: usize) -> Result<Engine> {
        let checkpoint_file = self.checkpoint_file(run_idx);
        let engine = Engine::load_checkpoint(&checkpoint_file)
            .with_context(|| format!("failed to load {checkpoint_file:?}"))?;
        log::info!("loaded {checkpoint_file:?}");
        Ok(engine)
    }

    fn run_dirs(&self) -> Result<Vec<PathBuf>> {
        let pattern = self.sim_dir.join("run-*");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let run_dirs = glob(pattern)
            .context("failed to glob run dirs")?
            .filter_map(Result::ok)
            .filter(|p| p.is_dir())
            .collect();
        Ok(run_dirs)
    }

    /// One past the highest existing run index.
    fn next_run_idx(&self) -> Result<usize> {
        let mut next_idx = 0;
        for run_dir in self.run_dirs()? {
            let name = run_dir
                .file_name()
                .and_then(|name| name.to_str())
                .with_context(|| format!("invalid run dir name {run_dir:?}"))?;
            let Some(run_idx) = name
                .strip_prefix("run-")
                .and_then(|idx| idx.parse::<usize>().ok())
            else {
                continue;
            };
            next_idx = next_idx.max(run_idx + 1);
        }
        Ok(next_idx)
    }

    fn run_dir(&self, run_idx: usize) -> PathBuf {
        self.sim_dir.join(format!("run-{run_idx:04}"))
    }

    fn count_results_files(&self, run_idx: usize) -> Result<usize> {
        let pattern = self.run_dir(run_idx).join("results-*.toml");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let count = glob(pattern)
            .context("failed to glob results files")?
            .filter_map(Result::ok)
            .count();
        Ok(count)
    }

    fn checkpoint_file(&self, run_idx: usize) -> PathBuf {
        self.run_dir(run_idx).join("checkpoint.msgpack")
    }

    fn results_file(&self, run_idx: usize, file_idx: usize) -> PathBuf {
        self.run_dir(run_idx)
            .join(format!("results-{file_idx:04}.toml"))
    }
}
