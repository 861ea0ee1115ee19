use crate::model::Distribution;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Simulation configuration parameters.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Config {
    pub model: ModelConfig,
    pub init: InitConfig,
    pub output: OutputConfig,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Minimum share of alike neighbors an agent tolerates.
    pub threshold: f64,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct InitConfig {
    /// Side length of the square grid.
    pub side_len: usize,
    /// Share of the grid assigned to each cell state.
    pub distribution: Distribution,
    /// Seed of the random number generator (OS entropy if absent).
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Number of steps between observable samples.
    pub steps_per_sample: usize,
    /// Number of samples taken per run segment.
    pub samples_per_run: usize,
}

impl Config {
    /// Load a [`Config`] from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        check_num(self.model.threshold, 0.0..=1.0).context("invalid threshold")?;

        check_num(self.init.side_len, 1..=1000).context("invalid side length")?;
        check_dist(&self.init.distribution).context("invalid distribution")?;

        check_num(self.output.steps_per_sample, 1..10_000)
            .context("invalid number of steps per sample")?;
        check_num(self.output.samples_per_run, 1..10_000)
            .context("invalid number of samples per run")?;

        Ok(())
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

fn check_dist(dist: &Distribution) -> Result<()> {
    let fracs = [dist.type_a, dist.type_b, dist.empty];
    for (frac, name) in fracs.iter().zip(["type_a", "type_b", "empty"]) {
        check_num(*frac, 0.0..=1.0).with_context(|| format!("invalid {name} fraction"))?;
    }
    // Rounding down may leave cells over, but never more than the grid.
    let sum: f64 = fracs.iter().sum();
    let tol = 1e-8;
    if sum > 1.0 + tol {
        bail!("fractions must sum to at most 1.0 (tolerance: {tol}), but sum to {sum}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
[model]
threshold = 0.5

[init]
side_len = 30
seed = 42

[init.distribution]
type_a = 0.25
type_b = 0.25
empty = 0.5

[output]
steps_per_sample = 4
samples_per_run = 16
"#;

    #[test]
    fn parses_valid_config() {
        let cfg = Config::from_toml(CONFIG).unwrap();
        assert_eq!(cfg.model.threshold, 0.5);
        assert_eq!(cfg.init.side_len, 30);
        assert_eq!(cfg.init.seed, Some(42));
        assert_eq!(cfg.init.distribution.empty, 0.5);
        assert_eq!(cfg.output.samples_per_run, 16);
    }

    #[test]
    fn seed_is_optional() {
        let cfg = Config::from_toml(&CONFIG.replace("seed = 42\n", "")).unwrap();
        assert_eq!(cfg.init.seed, None);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let invalid = [
            CONFIG.replace("threshold = 0.5", "threshold = 1.5"),
            CONFIG.replace("side_len = 30", "side_len = 0"),
            CONFIG.replace("type_a = 0.25", "type_a = -0.25"),
            CONFIG.replace("empty = 0.5", "empty = 0.75"),
            CONFIG.replace("steps_per_sample = 4", "steps_per_sample = 0"),
        ];
        for contents in &invalid {
            assert!(
                Config::from_toml(contents).is_err(),
                "accepted:\n{contents}"
            );
        }
    }

    #[test]
    fn rejects_missing_section() {
        let contents = CONFIG.replace("[model]\nthreshold = 0.5\n", "");
        assert!(Config::from_toml(&contents).is_err());
    }
}
