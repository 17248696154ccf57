use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lagrowth::config::SamplerConfig;
use lagrowth::manager::Manager;
use lagrowth::model::{self, DEFAULT_FRACTION, GrowthParams};
use lagrowth::{TimeAxis, export};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use rand_distr::Uniform;
use std::{io, path::PathBuf};

#[derive(Debug, Parser)]
#[command(version, about)]
struct CLI {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Simulate a single curve and print it as CSV.
    Simulate {
        #[arg(long, default_value_t = 1000.0)]
        capacity: f64,
        #[arg(long, default_value_t = 10.0)]
        initial: f64,
        #[arg(long, default_value_t = 0.3)]
        rate: f64,
        /// Drawn at random when omitted.
        #[arg(long)]
        lag_time: Option<f64>,
        #[arg(long, default_value_t = 0.0)]
        start: f64,
        #[arg(long, default_value_t = 50.0)]
        end: f64,
        #[arg(long, default_value_t = 0.5)]
        step: f64,
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print the time needed to reach a fraction of the carrying capacity.
    Threshold {
        #[arg(long)]
        capacity: f64,
        #[arg(long)]
        initial: f64,
        #[arg(long)]
        rate: f64,
        #[arg(long)]
        lag_time: f64,
        #[arg(long, default_value_t = DEFAULT_FRACTION)]
        fraction: f64,
    },

    Generate {
        #[arg(long)]
        sim_dir: PathBuf,
    },

    Analyze {
        #[arg(long)]
        sim_dir: PathBuf,
    },

    Clean {
        #[arg(long)]
        sim_dir: PathBuf,
    },
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = CLI::parse();
    log::info!("{args:#?}");

    match args.command {
        Command::Simulate {
            capacity,
            initial,
            rate,
            lag_time,
            start,
            end,
            step,
            seed,
        } => {
            let lag_time = match lag_time {
                Some(lag_time) => lag_time,
                None => random_lag_time(seed).context("failed to draw lag time")?,
            };
            log::info!("lag time: {lag_time}");

            let params = GrowthParams::new(capacity, initial, rate, lag_time)
                .context("invalid growth parameters")?;
            let time_axis =
                TimeAxis::uniform(start, end, step).context("failed to build time axis")?;
            let population = params
                .simulate(time_axis.points())
                .context("failed to simulate curve")?;

            export::write_series(time_axis.points(), &population, io::stdout().lock())
                .context("failed to write curve")?;
        }
        Command::Threshold {
            capacity,
            initial,
            rate,
            lag_time,
            fraction,
        } => {
            let time = model::time_to_fraction(capacity, initial, rate, lag_time, fraction)
                .context("failed to compute threshold time")?;
            println!(
                "time to reach {:.0}% of carrying capacity: {time:.2}",
                100.0 * fraction
            );
        }
        Command::Generate { sim_dir } => {
            let mgr = Manager::new(sim_dir).context("failed to construct mgr")?;
            mgr.generate_batch()?;
        }
        Command::Analyze { sim_dir } => {
            let mgr = Manager::new(sim_dir).context("failed to construct mgr")?;
            mgr.analyze_batches()?;
        }
        Command::Clean { sim_dir } => {
            let mgr = Manager::new(sim_dir).context("failed to construct mgr")?;
            mgr.clean()?;
        }
    }

    Ok(())
}

fn random_lag_time(seed: Option<u64>) -> Result<f64> {
    let mut rng = match seed {
        Some(seed) => ChaCha12Rng::seed_from_u64(seed),
        None => ChaCha12Rng::try_from_os_rng()?,
    };
    let [low, high] = SamplerConfig::default().lag_time;
    let lag_dist = Uniform::new(low, high)?;
    Ok(lag_dist.sample(&mut rng) as f64)
}
