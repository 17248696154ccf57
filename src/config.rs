use crate::curves::MAX_TIME_POINTS;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Simulation configuration parameters.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Shared time axis of every curve.
    pub axis: AxisConfig,
    /// Ranges of the randomized curve parameters.
    pub sampler: SamplerConfig,
    /// Batch size and seeding.
    pub batch: BatchConfig,
    /// Analysis settings.
    pub analysis: AnalysisConfig,
}

/// Uniform time axis `start, start + step, ...` up to (excluding) `end`.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AxisConfig {
    pub start: f64,
    pub end: f64,
    pub step: f64,
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self {
            start: 0.0,
            end: 50.0,
            step: 0.5,
        }
    }
}

/// Half-open `[low, high)` ranges of the per-curve parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SamplerConfig {
    /// Lag phase duration.
    pub lag_time: [u32; 2],
    /// Nominal exponential phase duration (recorded only).
    pub exp_time: [u32; 2],
    /// Carrying capacity.
    pub capacity: [u32; 2],
    /// Initial population.
    pub initial: [u32; 2],
    /// Growth rate.
    pub rate: [f64; 2],
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            lag_time: [2, 7],
            exp_time: [5, 12],
            capacity: [800, 1200],
            initial: [5, 15],
            rate: [0.2, 0.5],
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchConfig {
    /// Number of curves per batch.
    pub n_curves: usize,
    /// Seed of the random number generator (OS entropy if absent).
    pub seed: Option<u64>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            n_curves: 100,
            seed: None,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Fraction of the carrying capacity used for threshold times.
    pub fraction: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fraction: crate::model::DEFAULT_FRACTION,
        }
    }
}

impl Config {
    /// Load a [`Config`] from a file.
    ///
    /// The file must be TOML-encoded. Missing sections take their default values.
    /// Performs validation on all parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        let config: Config = toml::from_str(&contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        check_finite(self.axis.start).context("invalid axis start")?;
        check_finite(self.axis.end).context("invalid axis end")?;
        check_num(self.axis.start, 0.0..).context("invalid axis start")?;
        check_num(self.axis.step, f64::MIN_POSITIVE..).context("invalid axis step")?;
        if self.axis.end <= self.axis.start {
            bail!("axis end must exceed axis start {}", self.axis.start);
        }
        let n_points = ((self.axis.end - self.axis.start) / self.axis.step).ceil();
        check_num(n_points, 1.0..=MAX_TIME_POINTS as f64)
            .context("invalid number of time points")?;

        check_range(self.sampler.lag_time).context("invalid lag time range")?;
        check_range(self.sampler.exp_time).context("invalid exponential time range")?;
        check_range(self.sampler.capacity).context("invalid carrying capacity range")?;
        check_range(self.sampler.initial).context("invalid initial population range")?;
        check_num(self.sampler.initial[0], 1..).context("invalid initial population range")?;
        check_num(self.sampler.initial[1] - 1, ..self.sampler.capacity[0])
            .context("initial population range must lie below carrying capacity range")?;
        check_range(self.sampler.rate).context("invalid growth rate range")?;
        check_num(self.sampler.rate[0], f64::MIN_POSITIVE..).context("invalid growth rate range")?;

        check_num(self.batch.n_curves, 1..1_000_000).context("invalid number of curves")?;

        // Every curve must start below the threshold population.
        let max_initial_share =
            (self.sampler.initial[1] - 1) as f64 / self.sampler.capacity[0] as f64;
        let fraction = self.analysis.fraction;
        if !(fraction > max_initial_share && fraction < 1.0) {
            bail!(
                "analysis fraction must be in the range ({max_initial_share}, 1), but is {fraction}"
            );
        }

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

fn check_finite(num: f64) -> Result<()> {
    if !num.is_finite() {
        bail!("number must be finite, but is {num}");
    }
    Ok(())
}

fn check_range<T>(range: [T; 2]) -> Result<()>
where
    T: PartialOrd + Debug,
{
    let [low, high] = range;
    if !(low < high) {
        bail!("range must satisfy low < high, but is [{low:?}, {high:?})");
    }
    Ok(())
}
