use crate::analysis::Analyzer;
use crate::config::Config;
use crate::engine::{Engine, load_collection, save_collection};
use crate::export::write_table;
use anyhow::{Context, Result, bail};
use glob::glob;
use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
};

/// Simulation directory.
///
/// Layout: `config.toml`, `checkpoint.msgpack`, and per batch
/// `batch-NNNN.msgpack`, `batch-NNNN.csv` and `results-NNNN.msgpack`.
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

    pub fn generate_batch(&self) -> Result<()> {
        let batch_idx = self
            .count_batch_files()
            .context("failed to count batch files")?;

        let checkpoint_file = self.checkpoint_file();
        let mut engine = if checkpoint_file.is_file() {
            let engine = Engine::load_checkpoint(&checkpoint_file)
                .with_context(|| format!("failed to load {checkpoint_file:?}"))?;
            if engine.cfg() != &self.cfg {
                bail!("checkpoint config differs from the current config");
            }
            log::info!("loaded {checkpoint_file:?}");
            engine
        } else {
            Engine::new(self.cfg.clone()).context("failed to construct engine")?
        };

        let collection = engine
            .generate_batch()
            .context("failed to generate batch")?;

        let mut analyzer = Analyzer::new(&self.cfg);
        analyzer
            .add_collection(&collection)
            .context("failed to analyze batch")?;
        log::info!("{:#?}", analyzer.reports()?);

        let batch_file = self.batch_file(batch_idx);
        save_collection(&collection, &batch_file)
            .with_context(|| format!("failed to save {batch_file:?}"))?;
        log::info!("created {batch_file:?}");

        let table_file = self.table_file(batch_idx);
        let file =
            File::create(&table_file).with_context(|| format!("failed to create {table_file:?}"))?;
        write_table(&collection, BufWriter::new(file))
            .with_context(|| format!("failed to write {table_file:?}"))?;
        log::info!("created {table_file:?}");

        engine
            .save_checkpoint(&checkpoint_file)
            .context("failed to save checkpoint")?;

        Ok(())
    }

    pub fn analyze_batches(&self) -> Result<()> {
        let n_batches = self
            .count_batch_files()
            .context("failed to count batch files")?;
        if n_batches == 0 {
            bail!("no batches found in {:?}", self.sim_dir);
        }

        for batch_idx in 0..n_batches {
            let batch_file = self.batch_file(batch_idx);
            let collection = load_collection(&batch_file)
                .with_context(|| format!("failed to load {batch_file:?}"))?;

            let mut analyzer = Analyzer::new(&self.cfg);
            analyzer
                .add_collection(&collection)
                .context("failed to add collection")?;

            let results_file = self.results_file(batch_idx);
            analyzer
                .save_results(&results_file)
                .context("failed to save results")?;
            log::info!("created {results_file:?}");
        }

        Ok(())
    }

    pub fn clean(&self) -> Result<()> {
        for pattern in ["batch-*.msgpack", "batch-*.csv", "results-*.msgpack"] {
            for file in self.glob_files(pattern)? {
                fs::remove_file(&file).with_context(|| format!("failed to remove {file:?}"))?;
                log::info!("removed {file:?}");
            }
        }

        let checkpoint_file = self.checkpoint_file();
        if checkpoint_file.is_file() {
            fs::remove_file(&checkpoint_file)
                .with_context(|| format!("failed to remove {checkpoint_file:?}"))?;
            log::info!("removed {checkpoint_file:?}");
        }

        Ok(())
    }

    fn glob_files(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let pattern = self.sim_dir.join(pattern);
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let files = glob(pattern)
            .context("failed to glob files")?
            .filter_map(Result::ok)
            .filter(|p| p.is_file())
            .collect();
        Ok(files)
    }

    fn count_batch_files(&self) -> Result<usize> {
        Ok(self.glob_files("batch-*.msgpack")?.len())
    }

    fn checkpoint_file(&self) -> PathBuf {
        self.sim_dir.join("checkpoint.msgpack")
    }

    fn batch_file(&self, batch_idx: usize) -> PathBuf {
        self.sim_dir.join(format!("batch-{batch_idx:04}.msgpack"))
    }

    fn table_file(&self, batch_idx: usize) -> PathBuf {
        self.sim_dir.join(format!("batch-{batch_idx:04}.csv"))
    }

    fn results_file(&self, batch_idx: usize) -> PathBuf {
        self.sim_dir.join(format!("results-{batch_idx:04}.msgpack"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sim_dir(name: &str, config: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("lagrowth-{name}-{}", std::process::id()));
        fs::remove_dir_all(&dir).ok();
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("config.toml"), config).unwrap();
        dir
    }

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut entries: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        entries.sort();
        entries
    }

    #[test]
    fn successive_batches_continue_stream() {
        let dir = sim_dir("stream", "[batch]\nn_curves = 5\nseed = 1\n");
        let mgr = Manager::new(&dir).unwrap();
        mgr.generate_batch().unwrap();
        mgr.generate_batch().unwrap();

        let batch_0 = load_collection(mgr.batch_file(0)).unwrap();
        let batch_1 = load_collection(mgr.batch_file(1)).unwrap();
        assert_ne!(batch_0, batch_1);
        assert!(mgr.checkpoint_file().is_file());

        mgr.analyze_batches().unwrap();
        assert!(mgr.results_file(1).is_file());

        mgr.clean().unwrap();
        assert_eq!(dir_entries(&dir), ["config.toml"]);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn unreachable_fraction_writes_nothing() {
        let dir = sim_dir(
            "fraction",
            "[batch]\nn_curves = 5\nseed = 1\n\n[analysis]\nfraction = 0.01\n",
        );
        assert!(Manager::new(&dir).is_err());
        assert!(Manager::new(&dir).is_err());
        assert_eq!(dir_entries(&dir), ["config.toml"]);

        fs::remove_dir_all(&dir).ok();
    }
}
