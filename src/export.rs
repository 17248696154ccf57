//! CSV tables of growth curves.

use crate::curves::CurveCollection;
use anyhow::{Context, Result, bail};
use std::io::Write;

/// Write a collection as a wide table: a `Time` column followed by one column per curve.
pub fn write_table<W: Write>(collection: &CurveCollection, writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);

    let mut header = vec!["Time"];
    header.extend(collection.labels());
    writer
        .write_record(&header)
        .context("failed to write header")?;

    for (i_time, t) in collection.time_axis().points().iter().enumerate() {
        let mut record = Vec::with_capacity(collection.len() + 1);
        record.push(t.to_string());
        for curve in collection.curves() {
            record.push(curve.population()[i_time].to_string());
        }
        writer
            .write_record(&record)
            .with_context(|| format!("failed to write row {i_time}"))?;
    }

    writer.flush().context("failed to flush writer stream")?;
    Ok(())
}

/// Write one `Time,Population` series.
pub fn write_series<W: Write>(time_points: &[f64], population: &[f64], writer: W) -> Result<()> {
    if time_points.len() != population.len() {
        bail!(
            "series lengths differ: {} time points, {} population values",
            time_points.len(),
            population.len()
        );
    }

    let mut writer = csv::Writer::from_writer(writer);
    writer
        .write_record(["Time", "Population"])
        .context("failed to write header")?;
    for (t, pop) in time_points.iter().zip(population) {
        writer
            .write_record([t.to_string(), pop.to_string()])
            .context("failed to write row")?;
    }

    writer.flush().context("failed to flush writer stream")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SamplerConfig;
    use crate::curves::{TimeAxis, generate_batch};
    use crate::sampler::ParamSampler;
    use rand::prelude::*;
    use rand_chacha::ChaCha12Rng;

    #[test]
    fn wide_table() {
        let axis = TimeAxis::uniform(0.0, 2.0, 0.5).unwrap();
        let sampler = ParamSampler::new(&SamplerConfig::default()).unwrap();
        let mut rng = ChaCha12Rng::seed_from_u64(4);
        let batch = generate_batch(3, &axis, &sampler, &mut rng).unwrap();

        let mut buf = Vec::new();
        write_table(&batch, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "Time,Curve_1,Curve_2,Curve_3");
        assert!(lines[1].starts_with("0,"));
        assert_eq!(lines[4].split(',').count(), 4);
    }

    #[test]
    fn series() {
        let mut buf = Vec::new();
        write_series(&[0.0, 0.5], &[10.0, 10.0], &mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "Time,Population\n0,10\n0.5,10\n"
        );

        assert!(write_series(&[0.0], &[], Vec::<u8>::new()).is_err());
    }
}
