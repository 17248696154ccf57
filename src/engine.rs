use crate::config::Config;
use crate::curves::{CurveCollection, TimeAxis, generate_batch};
use crate::sampler::ParamSampler;
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

/// Batch generation engine.
///
/// Holds the configuration and random number generator, and provides
/// methods to generate batches and to save and load its state.
#[derive(Serialize, Deserialize)]
pub struct Engine {
    cfg: Config,
    rng: ChaCha12Rng,
}

impl Engine {
    /// Create a new `Engine`, seeded from the configuration or from OS entropy.
    pub fn new(cfg: Config) -> Result<Self> {
        let rng = match cfg.batch.seed {
            Some(seed) => ChaCha12Rng::seed_from_u64(seed),
            None => ChaCha12Rng::try_from_os_rng()?,
        };
        Ok(Self { cfg, rng })
    }

    pub fn cfg(&self) -> &Config {
        &self.cfg
    }

    /// Generate the next batch of curves.
    ///
    /// Consecutive calls continue the same random stream.
    pub fn generate_batch(&mut self) -> Result<CurveCollection> {
        let axis = &self.cfg.axis;
        let time_axis = TimeAxis::uniform(axis.start, axis.end, axis.step)
            .context("failed to build time axis")?;
        let sampler = ParamSampler::new(&self.cfg.sampler).context("failed to build sampler")?;

        let collection =
            generate_batch(self.cfg.batch.n_curves, &time_axis, &sampler, &mut self.rng)
                .context("failed to generate curves")?;

        for curve in collection.curves() {
            log::debug!("{} {:?}", curve.label(), curve.params());
        }
        log::info!(
            "generated {} curves over {} time points",
            collection.len(),
            time_axis.len()
        );

        Ok(collection)
    }

    /// Save a checkpoint of the entire engine state.
    ///
    /// Can be used to continue the random stream later.
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
        let engine = decode::from_read(&mut reader).context("failed to deserialize engine")?;
        Ok(engine)
    }
}

/// Save a curve collection to a binary file.
pub fn save_collection<P: AsRef<Path>>(collection: &CurveCollection, file: P) -> Result<()> {
    let file = file.as_ref();
    let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
    let mut writer = BufWriter::new(file);
    encode::write(&mut writer, collection).context("failed to serialize collection")?;
    writer.flush().context("failed to flush writer stream")?;
    Ok(())
}

/// Load a curve collection saved with [`save_collection`].
pub fn load_collection<P: AsRef<Path>>(file: P) -> Result<CurveCollection> {
    let file = file.as_ref();
    let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
    let mut reader = BufReader::new(file);
    let collection = decode::from_read(&mut reader).context("failed to deserialize collection")?;
    Ok(collection)
}
