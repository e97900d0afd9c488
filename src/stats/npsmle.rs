//! # NPSMLE
//!
//! $$
//! \hat p_\theta(x_i\mid x_{i-1})=\frac1{N_{sim}}\sum_{j=1}^{N_{sim}}
//! \frac1{h_p}\varphi\Bigl(\frac{p_i-P^{(j)}_i}{h_p}\Bigr)
//! \frac1{h_v}\varphi\Bigl(\frac{v_i-V^{(j)}_i}{h_v}\Bigr)
//! $$
//!
//! Filtered simulated likelihood: every observation step restarts an ensemble
//! of `N_sim` Euler–Maruyama paths from the observed state, pushes it through
//! `M_sim` sub-steps with fixed pre-drawn shocks and scores the next
//! observation with a product Gaussian kernel. The ensemble's volatility
//! diffusion is `sigma_v * P * sqrt|V|`, which differs from the path simulator
//! by the price factor.
//!
//! Source:
//! - Kristensen & Shin (2012), Estimation of dynamic models with
//!   nonparametric simulated maximum likelihood
//!   https://doi.org/10.1016/j.jeconom.2011.09.042
pub mod config;
pub mod data;
pub mod likelihood;

pub use config::NpsmleConfig;
pub use config::NON_FINITE_PENALTY;
pub use data::interpolate_sentiment;
pub use data::EnsembleWorkspace;
pub use data::InnovationDraws;
pub use data::ObservedSeries;
pub use data::SimulationGrid;
pub use likelihood::SimulatedLikelihood;

pub use crate::stats::gaussian_kde::StdDevNormalization;
pub use crate::stochastic::volatility::ModelParameters;
