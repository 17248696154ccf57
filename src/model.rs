//! Lag-phase logistic growth model.

use crate::error::ModelError;
use serde::{Deserialize, Serialize};

/// Fraction of the carrying capacity used when none is given.
pub const DEFAULT_FRACTION: f64 = 0.8;

/// Parameters of a single growth curve.
///
/// Validated on construction: `0 < initial < capacity`, `rate > 0`, `lag_time >= 0`.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "RawGrowthParams")]
pub struct GrowthParams {
    capacity: f64,
    initial: f64,
    rate: f64,
    lag_time: f64,
}

impl GrowthParams {
    /// Create a new parameter set, rejecting values outside the model's domain.
    pub fn new(capacity: f64, initial: f64, rate: f64, lag_time: f64) -> Result<Self, ModelError> {
        check_finite("capacity", capacity)?;
        check_finite("initial", initial)?;
        check_finite("rate", rate)?;
        check_finite("lag_time", lag_time)?;

        if initial <= 0.0 {
            return Err(ModelError::param(
                "initial",
                format!("must be positive, but is {initial}"),
            ));
        }
        if capacity <= initial {
            return Err(ModelError::param(
                "capacity",
                format!("must exceed initial population {initial}, but is {capacity}"),
            ));
        }
        if rate <= 0.0 {
            return Err(ModelError::param(
                "rate",
                format!("must be positive, but is {rate}"),
            ));
        }
        if lag_time < 0.0 {
            return Err(ModelError::param(
                "lag_time",
                format!("must be non-negative, but is {lag_time}"),
            ));
        }

        Ok(Self {
            capacity,
            initial,
            rate,
            lag_time,
        })
    }

    /// Carrying capacity (K).
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Initial population (P0).
    pub fn initial(&self) -> f64 {
        self.initial
    }

    /// Growth rate (r).
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Lag phase duration.
    pub fn lag_time(&self) -> f64 {
        self.lag_time
    }

    /// Population at time `t`.
    ///
    /// Flat at `initial` before `lag_time`, logistic afterwards.
    pub fn population_at(&self, t: f64) -> f64 {
        if t < self.lag_time {
            return self.initial;
        }
        let ratio = (self.capacity - self.initial) / self.initial;
        self.capacity / (1.0 + ratio * (-self.rate * (t - self.lag_time)).exp())
    }

    /// Evaluate the model at every time point, keeping their order.
    pub fn simulate(&self, time_points: &[f64]) -> Result<Vec<f64>, ModelError> {
        if time_points.is_empty() {
            return Err(ModelError::EmptyInput("time points"));
        }
        time_points
            .iter()
            .map(|&t| {
                if !t.is_finite() || t < 0.0 {
                    return Err(ModelError::InvalidTimePoint(t));
                }
                Ok(self.population_at(t))
            })
            .collect()
    }

    /// Time at which the population reaches `fraction * capacity`.
    ///
    /// `fraction` must lie strictly between `initial / capacity` and 1.
    pub fn time_to_fraction(&self, fraction: f64) -> Result<f64, ModelError> {
        let min = self.initial / self.capacity;
        if !fraction.is_finite() || fraction <= min || fraction >= 1.0 {
            return Err(ModelError::InvalidFraction { fraction, min });
        }

        let target = fraction * self.capacity;
        let ratio = (self.capacity - self.initial) / self.initial;
        let odds = target / (self.capacity - target);
        Ok(self.lag_time + (ratio * odds).ln() / self.rate)
    }
}

#[derive(Deserialize)]
struct RawGrowthParams {
    capacity: f64,
    initial: f64,
    rate: f64,
    lag_time: f64,
}

impl TryFrom<RawGrowthParams> for GrowthParams {
    type Error = ModelError;

    fn try_from(raw: RawGrowthParams) -> Result<Self, Self::Error> {
        Self::new(raw.capacity, raw.initial, raw.rate, raw.lag_time)
    }
}

/// Evaluate the growth model for one parameter set over `time_points`.
pub fn simulate(
    time_points: &[f64],
    capacity: f64,
    initial: f64,
    rate: f64,
    lag_time: f64,
) -> Result<Vec<f64>, ModelError> {
    GrowthParams::new(capacity, initial, rate, lag_time)?.simulate(time_points)
}

/// Time at which the population reaches `fraction` of the carrying capacity.
pub fn time_to_fraction(
    capacity: f64,
    initial: f64,
    rate: f64,
    lag_time: f64,
    fraction: f64,
) -> Result<f64, ModelError> {
    GrowthParams::new(capacity, initial, rate, lag_time)?.time_to_fraction(fraction)
}

fn check_finite(name: &'static str, val: f64) -> Result<(), ModelError> {
    if !val.is_finite() {
        return Err(ModelError::param(name, format!("must be finite, but is {val}")));
    }
    Ok(())
}
