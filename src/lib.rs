//! # npsmle-rs
//!
//! $$
//! \hat\theta=\arg\max_\theta \sum_{i=1}^{N_{obs}-1}\log \hat p_\theta\bigl(x_i\mid x_{i-1}\bigr)
//! $$
//!
//! Nonparametric simulated maximum likelihood (NPSMLE) for a price–volatility
//! diffusion driven by an exogenous sentiment signal.
//!
//! | Module          | Description                                                                   |
//! |-----------------|-------------------------------------------------------------------------------|
//! | [`stochastic`]  | Euler–Maruyama path simulator and pluggable standard-normal sources.          |
//! | [`stats`]       | Gaussian kernel utilities and the simulated-likelihood evaluator.             |
//! | [`quant`]       | `argmin` calibration driver built on top of the evaluator.                    |
//! | [`traits`]      | Shared sampling contracts.                                                    |
//!
//! ## Example Usage
//!
//! ```rust
//! use npsmle_rs::stats::npsmle::{
//!   EnsembleWorkspace, InnovationDraws, ModelParameters, NpsmleConfig, ObservedSeries,
//!   SimulatedLikelihood, SimulationGrid,
//! };
//!
//! let grid = SimulationGrid::new(256, 4, 1.0 / 252.0);
//! let observed = ObservedSeries::with_coarse_sentiment(price, volatility, coarse, grid.m_sim)?;
//! let draws = InnovationDraws::seeded(grid.n_sim, grid.m_sim, 42);
//! let mut workspace = EnsembleWorkspace::new(grid.n_sim, grid.m_sim);
//! let likelihood = SimulatedLikelihood::new(&observed, &draws, grid, NpsmleConfig::default())?;
//! let nll = likelihood.evaluate(&[2.0, 100.0, 3.0, 0.04, 0.01, 0.3, -0.5], &mut workspace)?;
//! ```

pub mod quant;
pub mod stats;
pub mod stochastic;
pub mod traits;
