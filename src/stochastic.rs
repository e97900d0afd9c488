//! # Stochastic Process Simulation Modules
//!
//! | Module            | Description                                                                         |
//! |-------------------|-------------------------------------------------------------------------------------|
//! | [`noise`]         | Correlated Gaussian shocks and pluggable standard-normal sources.                   |
//! | [`volatility`]    | Sentiment-driven price–volatility system and its Euler–Maruyama path simulator.    |
//!
//! ## Parallelism
//!
//! `sample_par()` uses `rayon` for parallel execution over independent paths.
//!
//! ## Example Usage
//!
//! ```rust
//! use npsmle_rs::stochastic::volatility::{ModelParameters, SentimentVolatility};
//! use npsmle_rs::traits::ProcessExt;
//!
//! let params = ModelParameters::new(2.0, 100.0, 3.0, 0.04, 0.01, 0.3, -0.5);
//! let sim = SentimentVolatility::new(params, 1.0 / 252.0, 500, 10, 100.0, 0.04, sentiment, None, Some(42));
//! let [price, volatility] = sim.sample();
//! ```

pub mod noise;
pub mod volatility;

pub use crate::traits::NormalSource;
pub use crate::traits::ProcessExt;
