use anyhow::ensure;
use anyhow::Result;
use ndarray::s;
use ndarray::Array1;
use ndarray::Zip;
use tracing::debug;

use super::config::NpsmleConfig;
use super::config::NON_FINITE_PENALTY;
use super::data::EnsembleWorkspace;
use super::data::InnovationDraws;
use super::data::ObservedSeries;
use super::data::SimulationGrid;
use crate::stats::gaussian_kde::ensemble_std_dev;
use crate::stats::gaussian_kde::npsmle_bandwidth_fraction;
use crate::stats::gaussian_kde::scaled_gaussian_kernel;
use crate::stochastic::volatility::sentiment::ensemble_euler_step;
use crate::stochastic::volatility::ModelParameters;

/// Filtered simulated likelihood of an observed price/volatility series.
///
/// Borrows the observed data and the common random numbers for its whole
/// lifetime; scratch buffers are passed per call.
#[derive(Clone, Copy, Debug)]
pub struct SimulatedLikelihood<'a> {
  observed: &'a ObservedSeries,
  draws: &'a InnovationDraws,
  grid: SimulationGrid,
  config: NpsmleConfig,
}

/// Per-step bandwidth and sub-step constants.
#[derive(Clone, Copy)]
struct StepConstants {
  h_frac: f64,
  delta: f64,
  sqrt_delta: f64,
}

impl<'a> SimulatedLikelihood<'a> {
  pub fn new(
    observed: &'a ObservedSeries,
    draws: &'a InnovationDraws,
    grid: SimulationGrid,
    config: NpsmleConfig,
  ) -> Result<Self> {
    grid.validate()?;
    ensure!(
      observed.m_sim() == grid.m_sim,
      "observed sentiment was built for m_sim = {}, grid uses {}",
      observed.m_sim(),
      grid.m_sim
    );
    ensure!(
      draws.len() == grid.innovations_len(),
      "expected n_sim * m_sim = {} draws, got {}",
      grid.innovations_len(),
      draws.len()
    );

    Ok(Self {
      observed,
      draws,
      grid,
      config,
    })
  }

  pub fn grid(&self) -> SimulationGrid {
    self.grid
  }

  pub fn config(&self) -> NpsmleConfig {
    self.config
  }

  /// Negative log-likelihood for the positional vector
  /// `[gamma_p, mu_p, gamma_v, mu_v, beta_v, sigma_v, rho_pv]`.
  pub fn evaluate(&self, x: &[f64], workspace: &mut EnsembleWorkspace) -> Result<f64> {
    let params = ModelParameters::try_from(x)?;
    Ok(self.negative_log_likelihood(&params, workspace))
  }

  /// Negative log-likelihood of the observed series under `params`.
  ///
  /// With short-circuiting enabled the first step that drives the running
  /// log-likelihood to `-inf` or a non-normal value returns
  /// [`NON_FINITE_PENALTY`].
  pub fn negative_log_likelihood(
    &self,
    params: &ModelParameters,
    workspace: &mut EnsembleWorkspace,
  ) -> f64 {
    let constants = self.prepare(params, workspace);
    let mut ll = 0.0;

    for i in 1..self.observed.n_obs() {
      ll += self.step_log_density(i, params, workspace, constants);

      if self.config.short_circuit_on_non_finite && (ll == f64::NEG_INFINITY || !ll.is_normal()) {
        debug!(step = i, ll, "non-finite log-likelihood, short-circuiting");
        return NON_FINITE_PENALTY;
      }
    }

    -ll
  }

  /// Log transition density of every observation step, without short-circuiting.
  pub fn step_log_densities(
    &self,
    params: &ModelParameters,
    workspace: &mut EnsembleWorkspace,
  ) -> Array1<f64> {
    let constants = self.prepare(params, workspace);
    let n_obs = self.observed.n_obs();
    let mut out = Array1::<f64>::zeros(n_obs - 1);

    for i in 1..n_obs {
      out[i - 1] = self.step_log_density(i, params, workspace, constants);
    }

    out
  }

  fn prepare(&self, params: &ModelParameters, workspace: &mut EnsembleWorkspace) -> StepConstants {
    assert_eq!(
      workspace.n_sim(),
      self.grid.n_sim,
      "workspace ensemble size does not match the grid"
    );
    assert_eq!(
      workspace.m_sim(),
      self.grid.m_sim,
      "workspace sub-step count does not match the grid"
    );

    params.cgns().fill(
      self.draws.price(),
      self.draws.volatility(),
      workspace.wiener_price.view_mut(),
      workspace.wiener_volatility.view_mut(),
    );

    let delta = self.grid.delta();
    StepConstants {
      h_frac: npsmle_bandwidth_fraction(self.grid.n_sim),
      delta,
      sqrt_delta: delta.sqrt(),
    }
  }

  /// Resets the ensemble to observation `i - 1`, propagates it to observation
  /// `i` and returns the log kernel density at the observed state.
  fn step_log_density(
    &self,
    i: usize,
    params: &ModelParameters,
    workspace: &mut EnsembleWorkspace,
    constants: StepConstants,
  ) -> f64 {
    let m = self.grid.m_sim;
    let StepConstants {
      h_frac,
      delta,
      sqrt_delta,
    } = constants;

    let EnsembleWorkspace {
      simulated_price,
      simulated_volatility,
      wiener_price,
      wiener_volatility,
      kernel,
      ..
    } = workspace;

    let p_prev = self.observed.price()[i - 1];
    let v_prev = self.observed.volatility()[i - 1];
    let sentiment = self.observed.sentiment();
    let sentiment = sentiment.slice(s![(i - 1) * m..i * m]);
    let w_p = wiener_price.view();
    let w_v = wiener_volatility.view();

    let propagate = |j: usize, p: &mut f64, v: &mut f64| {
      *p = p_prev;
      *v = v_prev;
      let base = j * m;
      for k in 0..m {
        ensemble_euler_step(
          params,
          p,
          v,
          sentiment[k],
          w_p[base + k],
          w_v[base + k],
          delta,
          sqrt_delta,
        );
      }
    };

    let ensemble = Zip::indexed(simulated_price.view_mut()).and(simulated_volatility.view_mut());
    if self.config.parallel {
      ensemble.par_for_each(propagate);
    } else {
      ensemble.for_each(propagate);
    }

    let h_price = h_frac * ensemble_std_dev(simulated_price.view(), self.config.std_dev);
    let h_volatility = h_frac * ensemble_std_dev(simulated_volatility.view(), self.config.std_dev);
    debug_assert!(
      self.config.short_circuit_on_non_finite || (h_price > 0.0 && h_volatility > 0.0),
      "degenerate ensemble at step {i}: h_price = {h_price}, h_volatility = {h_volatility}"
    );

    let p_obs = self.observed.price()[i];
    let v_obs = self.observed.volatility()[i];
    let product = |k: &mut f64, &p: &f64, &v: &f64| {
      *k = scaled_gaussian_kernel(p_obs, p, h_price) * scaled_gaussian_kernel(v_obs, v, h_volatility);
    };

    let kernels = Zip::from(kernel.view_mut())
      .and(simulated_price.view())
      .and(simulated_volatility.view());
    if self.config.parallel {
      kernels.par_for_each(product);
    } else {
      kernels.for_each(product);
    }

    (kernel.sum() / self.grid.n_sim as f64).ln()
  }
}
