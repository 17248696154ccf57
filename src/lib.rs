//! Lag-phase logistic growth curves.
//!
//! The core is pure: [`model`] evaluates the growth model and its threshold
//! times, [`curves`] generates batches of randomized curves from an injected
//! random number generator. The remaining modules back the `lagrowth` binary.

pub mod analysis;
pub mod config;
pub mod curves;
pub mod engine;
pub mod error;
pub mod export;
pub mod manager;
pub mod model;
pub mod sampler;
pub mod stats;

pub use curves::{CurveCollection, TimeAxis, generate_batch};
pub use error::ModelError;
pub use model::{GrowthParams, simulate, time_to_fraction};
