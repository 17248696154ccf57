use crate::config::SamplerConfig;
use crate::curves::CurveParams;
use crate::error::ModelError;
use crate::model::GrowthParams;
use rand::distr::uniform::SampleUniform;
use rand::prelude::*;
use rand_distr::Uniform;
use std::fmt::Debug;

/// Source of independent per-curve parameter draws.
///
/// Holds one uniform distribution per parameter. The random number generator
/// is supplied by the caller on every draw.
#[derive(Debug, Clone)]
pub struct ParamSampler {
    lag_time: Uniform<u32>,
    exp_time: Uniform<u32>,
    capacity: Uniform<u32>,
    initial: Uniform<u32>,
    rate: Uniform<f64>,
}

impl ParamSampler {
    /// Build a sampler from half-open ranges.
    ///
    /// Every draw must be a valid [`GrowthParams`], so the largest initial
    /// population has to stay below the smallest carrying capacity.
    pub fn new(cfg: &SamplerConfig) -> Result<Self, ModelError> {
        let sampler = Self {
            lag_time: uniform("lag_time", cfg.lag_time)?,
            exp_time: uniform("exp_time", cfg.exp_time)?,
            capacity: uniform("capacity", cfg.capacity)?,
            initial: uniform("initial", cfg.initial)?,
            rate: uniform("rate", cfg.rate)?,
        };

        if cfg.initial[0] == 0 {
            return Err(ModelError::param("initial", "range must exclude zero"));
        }
        if cfg.initial[1] - 1 >= cfg.capacity[0] {
            return Err(ModelError::param(
                "initial",
                format!(
                    "range {:?} overlaps carrying capacity range {:?}",
                    cfg.initial, cfg.capacity
                ),
            ));
        }
        if cfg.rate[0] <= 0.0 {
            return Err(ModelError::param("rate", "range must be positive"));
        }

        Ok(sampler)
    }

    /// Draw one parameter set.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<CurveParams, ModelError> {
        let lag_time = self.lag_time.sample(rng);
        let exp_time = self.exp_time.sample(rng);
        let capacity = self.capacity.sample(rng);
        let initial = self.initial.sample(rng);
        let rate = self.rate.sample(rng);

        let growth = GrowthParams::new(capacity as f64, initial as f64, rate, lag_time as f64)?;
        Ok(CurveParams::new(growth, exp_time))
    }
}

fn uniform<T>(name: &'static str, range: [T; 2]) -> Result<Uniform<T>, ModelError>
where
    T: SampleUniform + Debug,
{
    let [low, high] = range;
    let msg = format!("invalid range [{low:?}, {high:?})");
    Uniform::new(low, high).map_err(|err| ModelError::param(name, format!("{msg}: {err}")))
}
