use crate::config::Config;
use crate::curves::{Curve, CurveCollection};
use crate::stats::Accumulator;
use anyhow::{Context, Result};
use rmp_serde::encode;
use serde::Serialize;
use serde_value::Value;
use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

/// Observable computed over the curves of a batch.
pub trait Obs {
    fn name(&self) -> &'static str;
    fn update(&mut self, curve: &Curve, horizon: f64) -> Result<()>;
    fn report(&self) -> Result<Value>;
}

/// Time for each curve to reach a fraction of its carrying capacity.
pub struct ThresholdTime {
    fraction: f64,
    acc: Accumulator,
    n_reached: usize,
}

#[derive(Serialize)]
struct ThresholdTimeReport {
    fraction: f64,
    n_reached: usize,
    time: crate::stats::AccumulatorReport,
}

impl ThresholdTime {
    pub fn new(fraction: f64) -> Self {
        Self {
            fraction,
            acc: Accumulator::new(),
            n_reached: 0,
        }
    }
}

impl Obs for ThresholdTime {
    fn name(&self) -> &'static str {
        "threshold_time"
    }

    fn update(&mut self, curve: &Curve, horizon: f64) -> Result<()> {
        let time = curve
            .params()
            .growth()
            .time_to_fraction(self.fraction)
            .with_context(|| format!("failed to compute threshold time of {}", curve.label()))?;
        self.acc.add(time);
        if time <= horizon {
            self.n_reached += 1;
        }
        Ok(())
    }

    fn report(&self) -> Result<Value> {
        let report = ThresholdTimeReport {
            fraction: self.fraction,
            n_reached: self.n_reached,
            time: self.acc.report(),
        };
        serde_value::to_value(report).context("failed to convert report")
    }
}

/// Population at the last point of the time axis.
pub struct FinalPopulation {
    acc: Accumulator,
}

impl FinalPopulation {
    pub fn new() -> Self {
        Self {
            acc: Accumulator::new(),
        }
    }
}

impl Obs for FinalPopulation {
    fn name(&self) -> &'static str {
        "final_population"
    }

    fn update(&mut self, curve: &Curve, _horizon: f64) -> Result<()> {
        let &last = curve
            .population()
            .last()
            .context("curve has no population values")?;
        self.acc.add(last);
        Ok(())
    }

    fn report(&self) -> Result<Value> {
        serde_value::to_value(self.acc.report()).context("failed to convert report")
    }
}

pub struct Analyzer {
    obs_ptr_vec: Vec<Box<dyn Obs>>,
}

impl Analyzer {
    pub fn new(cfg: &Config) -> Self {
        let obs_ptr_vec: Vec<Box<dyn Obs>> = vec![
            Box::new(ThresholdTime::new(cfg.analysis.fraction)),
            Box::new(FinalPopulation::new()),
        ];
        Self { obs_ptr_vec }
    }

    pub fn add_collection(&mut self, collection: &CurveCollection) -> Result<()> {
        let horizon = collection.time_axis().horizon();
        for curve in collection.curves() {
            for obs in &mut self.obs_ptr_vec {
                obs.update(curve, horizon)
                    .context("failed to update observable")?;
            }
        }
        Ok(())
    }

    pub fn reports(&self) -> Result<BTreeMap<&'static str, Value>> {
        self.obs_ptr_vec
            .iter()
            .map(|obs| Ok((obs.name(), obs.report()?)))
            .collect()
    }

    pub fn save_results<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);

        let reports = self.reports()?;
        encode::write_named(&mut writer, &reports).context("failed to serialize results")?;
        writer.flush().context("failed to flush writer stream")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curves::{TimeAxis, generate_batch};
    use crate::sampler::ParamSampler;
    use rand::prelude::*;
    use rand_chacha::ChaCha12Rng;

    fn field<'a>(value: &'a Value, key: &str) -> &'a Value {
        match value {
            Value::Map(map) => &map[&Value::String(key.to_string())],
            _ => panic!("expected map, got {value:?}"),
        }
    }

    #[test]
    fn analyze_batch() {
        let cfg = Config::default();
        let axis = TimeAxis::uniform(0.0, 50.0, 0.5).unwrap();
        let sampler = ParamSampler::new(&cfg.sampler).unwrap();
        let mut rng = ChaCha12Rng::seed_from_u64(17);
        let batch = generate_batch(40, &axis, &sampler, &mut rng).unwrap();

        let mut analyzer = Analyzer::new(&cfg);
        analyzer.add_collection(&batch).unwrap();
        let reports = analyzer.reports().unwrap();
        assert_eq!(reports.len(), 2);

        let threshold = &reports["threshold_time"];
        assert_eq!(field(threshold, "fraction"), &Value::F64(0.8));
        let time = field(threshold, "time");
        assert_eq!(field(time, "n_vals"), &Value::U64(40));
        match (field(time, "min"), field(time, "max")) {
            (Value::F64(min), Value::F64(max)) => {
                assert!(*min > 2.0);
                assert!(min <= max);
            }
            other => panic!("unexpected values {other:?}"),
        }

        let fin = &reports["final_population"];
        match field(fin, "max") {
            Value::F64(max) => assert!(*max < 1200.0),
            other => panic!("unexpected value {other:?}"),
        }
    }
}
