//! Growth curve data types and batch generation.

use crate::error::ModelError;
use crate::model::GrowthParams;
use crate::sampler::ParamSampler;
use rand::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Largest number of points of a uniform time axis.
pub const MAX_TIME_POINTS: usize = 10_000_000;

/// Ordered time points shared by every curve of a collection.
///
/// Never empty; points are finite, non-negative and strictly increasing.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawTimeAxis")]
pub struct TimeAxis {
    points: Vec<f64>,
}

impl TimeAxis {
    pub fn new(points: Vec<f64>) -> Result<Self, ModelError> {
        if points.is_empty() {
            return Err(ModelError::EmptyInput("time axis"));
        }
        let mut prev = f64::NEG_INFINITY;
        for &t in &points {
            if !t.is_finite() || t < 0.0 || t <= prev {
                return Err(ModelError::InvalidTimePoint(t));
            }
            prev = t;
        }
        Ok(Self { points })
    }

    /// Points `start + i * step` strictly below `end`.
    pub fn uniform(start: f64, end: f64, step: f64) -> Result<Self, ModelError> {
        if !step.is_finite() || step <= 0.0 {
            return Err(ModelError::param(
                "step",
                format!("must be positive, but is {step}"),
            ));
        }
        let span = end - start;
        if !span.is_finite() || span <= 0.0 {
            return Err(ModelError::EmptyInput("time axis"));
        }
        let n_points = (span / step).ceil();
        if !(n_points <= MAX_TIME_POINTS as f64) {
            return Err(ModelError::param(
                "step",
                format!("{step} gives more than {MAX_TIME_POINTS} time points"),
            ));
        }
        let n_points = n_points as usize;
        Self::new((0..n_points).map(|i| start + i as f64 * step).collect())
    }

    pub fn points(&self) -> &[f64] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Last time point.
    pub fn horizon(&self) -> f64 {
        self.points[self.points.len() - 1]
    }
}

#[derive(Deserialize)]
struct RawTimeAxis {
    points: Vec<f64>,
}

impl TryFrom<RawTimeAxis> for TimeAxis {
    type Error = ModelError;

    fn try_from(raw: RawTimeAxis) -> Result<Self, Self::Error> {
        Self::new(raw.points)
    }
}

/// Parameters of one generated curve.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub struct CurveParams {
    growth: GrowthParams,
    exp_time: u32,
}

impl CurveParams {
    pub fn new(growth: GrowthParams, exp_time: u32) -> Self {
        Self { growth, exp_time }
    }

    pub fn growth(&self) -> &GrowthParams {
        &self.growth
    }

    /// Nominal exponential phase duration.
    ///
    /// Recorded alongside the curve; the growth formula does not use it.
    pub fn exp_time(&self) -> u32 {
        self.exp_time
    }
}

/// A single labelled growth trajectory.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Curve {
    label: String,
    params: CurveParams,
    population: Vec<f64>,
}

impl Curve {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn params(&self) -> &CurveParams {
        &self.params
    }

    /// Population at each point of the collection's time axis.
    pub fn population(&self) -> &[f64] {
        &self.population
    }
}

/// Independent growth curves over a shared time axis.
///
/// Built once by [`generate_batch`] and read-only afterwards.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawCurveCollection")]
pub struct CurveCollection {
    time_axis: TimeAxis,
    curves: Vec<Curve>,
}

impl CurveCollection {
    pub fn time_axis(&self) -> &TimeAxis {
        &self.time_axis
    }

    /// Curves in generation order.
    pub fn curves(&self) -> &[Curve] {
        &self.curves
    }

    pub fn len(&self) -> usize {
        self.curves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    pub fn get(&self, label: &str) -> Option<&Curve> {
        self.curves.iter().find(|curve| curve.label == label)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.curves.iter().map(|curve| curve.label.as_str())
    }
}

#[derive(Deserialize)]
struct RawCurveCollection {
    time_axis: TimeAxis,
    curves: Vec<Curve>,
}

impl TryFrom<RawCurveCollection> for CurveCollection {
    type Error = ModelError;

    fn try_from(raw: RawCurveCollection) -> Result<Self, Self::Error> {
        if raw.curves.is_empty() {
            return Err(ModelError::EmptyInput("curves"));
        }
        let mut labels = HashSet::with_capacity(raw.curves.len());
        for curve in &raw.curves {
            if !labels.insert(curve.label.as_str()) {
                return Err(ModelError::InconsistentCollection(format!(
                    "duplicate label {}",
                    curve.label
                )));
            }
            if curve.population.len() != raw.time_axis.len() {
                return Err(ModelError::InconsistentCollection(format!(
                    "{} has {} values for {} time points",
                    curve.label,
                    curve.population.len(),
                    raw.time_axis.len()
                )));
            }
        }
        Ok(Self {
            time_axis: raw.time_axis,
            curves: raw.curves,
        })
    }
}

/// Generate `n_curves` curves labelled `Curve_1`, `Curve_2`, ...
///
/// Parameters are drawn sequentially from `rng`, one set per curve, so a
/// seeded generator gives a reproducible collection. Curves are then
/// evaluated in parallel.
pub fn generate_batch<R: Rng + ?Sized>(
    n_curves: usize,
    time_axis: &TimeAxis,
    sampler: &ParamSampler,
    rng: &mut R,
) -> Result<CurveCollection, ModelError> {
    if n_curves == 0 {
        return Err(ModelError::EmptyInput("number of curves"));
    }

    let mut params_vec = Vec::with_capacity(n_curves);
    for _ in 0..n_curves {
        params_vec.push(sampler.sample(rng)?);
    }

    let curves = params_vec
        .into_par_iter()
        .enumerate()
        .map(|(i_curve, params)| {
            let population = params.growth().simulate(time_axis.points())?;
            Ok(Curve {
                label: format!("Curve_{}", i_curve + 1),
                params,
                population,
            })
        })
        .collect::<Result<Vec<_>, ModelError>>()?;

    Ok(CurveCollection {
        time_axis: time_axis.clone(),
        curves,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SamplerConfig;
    use rand_chacha::ChaCha12Rng;

    fn reference_axis() -> TimeAxis {
        TimeAxis::uniform(0.0, 50.0, 0.5).unwrap()
    }

    fn reference_sampler() -> ParamSampler {
        ParamSampler::new(&SamplerConfig::default()).unwrap()
    }

    #[test]
    fn uniform_axis() {
        let axis = reference_axis();
        assert_eq!(axis.len(), 100);
        assert_eq!(axis.points()[0], 0.0);
        assert_eq!(axis.points()[1], 0.5);
        assert_eq!(axis.horizon(), 49.5);

        assert_eq!(TimeAxis::uniform(0.0, 1.0, 0.3).unwrap().len(), 4);
    }

    #[test]
    fn invalid_axis() {
        assert_eq!(
            TimeAxis::new(Vec::new()),
            Err(ModelError::EmptyInput("time axis"))
        );
        assert_eq!(
            TimeAxis::uniform(5.0, 5.0, 0.5),
            Err(ModelError::EmptyInput("time axis"))
        );
        assert!(matches!(
            TimeAxis::new(vec![0.0, 2.0, 1.0]),
            Err(ModelError::InvalidTimePoint(_))
        ));
        assert!(matches!(
            TimeAxis::new(vec![-1.0, 2.0]),
            Err(ModelError::InvalidTimePoint(_))
        ));
        assert!(TimeAxis::uniform(0.0, 5.0, 0.0).is_err());
    }

    #[test]
    fn tiny_step_is_rejected() {
        assert!(matches!(
            TimeAxis::uniform(0.0, 50.0, 1e-300),
            Err(ModelError::InvalidParameter { name: "step", .. })
        ));
        assert!(TimeAxis::uniform(0.0, 1.0, 1e-6).is_ok());
    }

    #[test]
    fn decoding_validates_axis() {
        let bytes = rmp_serde::to_vec(&reference_axis()).unwrap();
        let decoded: TimeAxis = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(decoded, reference_axis());

        let bytes = rmp_serde::to_vec(&(Vec::<f64>::new(),)).unwrap();
        assert!(rmp_serde::from_slice::<TimeAxis>(&bytes).is_err());

        let bytes = rmp_serde::to_vec(&(vec![0.0, 2.0, 1.0],)).unwrap();
        assert!(rmp_serde::from_slice::<TimeAxis>(&bytes).is_err());
    }

    #[test]
    fn decoding_validates_collection() {
        let growth = (1000.0, 10.0, 0.3, 4.0);
        let curve =
            |label: &'static str, population: Vec<f64>| (label, (growth, 5u32), population);

        let bytes =
            rmp_serde::to_vec(&((vec![0.0, 1.0],), vec![curve("Curve_1", vec![10.0, 10.0])]))
                .unwrap();
        let decoded: CurveCollection = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded.time_axis().horizon(), 1.0);

        let bytes =
            rmp_serde::to_vec(&((vec![0.0, 1.0],), vec![curve("Curve_1", vec![10.0])])).unwrap();
        assert!(rmp_serde::from_slice::<CurveCollection>(&bytes).is_err());

        let bytes = rmp_serde::to_vec(&(
            (vec![0.0],),
            vec![curve("Curve_1", vec![10.0]), curve("Curve_1", vec![10.0])],
        ))
        .unwrap();
        assert!(rmp_serde::from_slice::<CurveCollection>(&bytes).is_err());

        let bytes = rmp_serde::to_vec(&(
            (Vec::<f64>::new(),),
            vec![curve("Curve_1", Vec::new())],
        ))
        .unwrap();
        assert!(rmp_serde::from_slice::<CurveCollection>(&bytes).is_err());
    }

    #[test]
    fn batch_shape() {
        let axis = reference_axis();
        let mut rng = ChaCha12Rng::seed_from_u64(11);
        let batch = generate_batch(100, &axis, &reference_sampler(), &mut rng).unwrap();

        assert_eq!(batch.len(), 100);
        assert_eq!(batch.time_axis(), &axis);
        let labels: HashSet<_> = batch.labels().collect();
        assert_eq!(labels.len(), 100);
        assert!(labels.contains("Curve_1"));
        assert!(labels.contains("Curve_100"));
        for curve in batch.curves() {
            assert_eq!(curve.population().len(), axis.len());
        }
        assert_eq!(batch.get("Curve_42").unwrap().label(), "Curve_42");
        assert!(batch.get("Curve_0").is_none());
    }

    #[test]
    fn batch_curves_follow_model() {
        let axis = reference_axis();
        let mut rng = ChaCha12Rng::seed_from_u64(5);
        let batch = generate_batch(25, &axis, &reference_sampler(), &mut rng).unwrap();

        for curve in batch.curves() {
            let growth = curve.params().growth();
            for (&t, &pop) in axis.points().iter().zip(curve.population()) {
                if t < growth.lag_time() {
                    assert_eq!(pop, growth.initial());
                }
                assert!(pop <= growth.capacity());
            }
            for pair in curve.population().windows(2) {
                assert!(pair[1] >= pair[0]);
            }
        }
    }

    #[test]
    fn curves_are_independent() {
        let axis = reference_axis();
        let mut rng = ChaCha12Rng::seed_from_u64(9);
        let batch = generate_batch(50, &axis, &reference_sampler(), &mut rng).unwrap();
        let distinct: HashSet<_> = batch
            .curves()
            .iter()
            .map(|curve| curve.params().growth().rate().to_bits())
            .collect();
        assert!(distinct.len() > 1);
    }

    #[test]
    fn seeded_batches_reproduce() {
        let axis = reference_axis();
        let sampler = reference_sampler();
        let batch_a =
            generate_batch(10, &axis, &sampler, &mut ChaCha12Rng::seed_from_u64(1)).unwrap();
        let batch_b =
            generate_batch(10, &axis, &sampler, &mut ChaCha12Rng::seed_from_u64(1)).unwrap();
        let batch_c =
            generate_batch(10, &axis, &sampler, &mut ChaCha12Rng::seed_from_u64(2)).unwrap();
        assert_eq!(batch_a, batch_b);
        assert_ne!(batch_a, batch_c);
    }

    #[test]
    fn zero_curves() {
        let mut rng = ChaCha12Rng::seed_from_u64(0);
        assert_eq!(
            generate_batch(0, &reference_axis(), &reference_sampler(), &mut rng),
            Err(ModelError::EmptyInput("number of curves"))
        );
    }
}
