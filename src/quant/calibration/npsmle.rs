//! # NPSMLE calibration
//!
//! $$
//! \hat\theta=\arg\min_\theta\ -\sum_{i=1}^{N_{obs}-1}\log\hat p_\theta(x_i\mid x_{i-1})
//! $$
//!
//! Nelder–Mead over the positional parameter vector. The innovations are fixed
//! for the whole search so the objective is a deterministic function of `θ`.
//!
use std::cell::RefCell;

use anyhow::anyhow;
use anyhow::Result;
use argmin::core::CostFunction;
use argmin::core::Executor;
use argmin::solver::neldermead::NelderMead;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::quant::calibration::CalibrationHistory;
use crate::stats::npsmle::EnsembleWorkspace;
use crate::stats::npsmle::InnovationDraws;
use crate::stats::npsmle::ModelParameters;
use crate::stats::npsmle::NpsmleConfig;
use crate::stats::npsmle::ObservedSeries;
use crate::stats::npsmle::SimulatedLikelihood;
use crate::stats::npsmle::SimulationGrid;
use crate::stats::npsmle::NON_FINITE_PENALTY;

const ZERO_COORD_STEP: f64 = 0.00025;

#[derive(Clone, Debug)]
pub struct NpsmleCalibrationResult {
  /// Best parameters found
  pub params: ModelParameters,
  /// Negative log-likelihood at `params`
  pub nll: f64,
  /// Solver iterations
  pub iterations: u64,
  /// Objective evaluations
  pub evaluations: usize,
}

/// Simulated maximum likelihood calibrator.
///
/// Owns the data and the common random numbers; the ensemble workspace is
/// allocated on the first evaluation and reused afterwards.
pub struct NpsmleCalibrator {
  /// Initial guess
  pub params: Option<ModelParameters>,
  pub observed: ObservedSeries,
  pub draws: InnovationDraws,
  pub grid: SimulationGrid,
  pub config: NpsmleConfig,
  /// Maximum Nelder–Mead iterations
  pub max_iters: u64,
  /// Simplex standard-deviation tolerance
  pub sd_tolerance: f64,
  /// Relative step used to build the initial simplex
  pub simplex_step: f64,
  workspace: RefCell<Option<EnsembleWorkspace>>,
  calibration_history: RefCell<Vec<CalibrationHistory<ModelParameters>>>,
}

impl NpsmleCalibrator {
  /// Non-finite trials are mapped to [`NON_FINITE_PENALTY`] by default.
  pub fn new(
    params: Option<ModelParameters>,
    observed: ObservedSeries,
    draws: InnovationDraws,
    grid: SimulationGrid,
  ) -> Self {
    Self {
      params,
      observed,
      draws,
      grid,
      config: NpsmleConfig::default().with_short_circuit(true),
      max_iters: 500,
      sd_tolerance: 1e-8,
      simplex_step: 0.05,
      workspace: RefCell::new(None),
      calibration_history: RefCell::new(Vec::new()),
    }
  }

  pub fn with_config(mut self, config: NpsmleConfig) -> Self {
    self.config = config;
    self
  }

  pub fn with_max_iters(mut self, max_iters: u64) -> Self {
    self.max_iters = max_iters;
    self
  }

  pub fn with_sd_tolerance(mut self, sd_tolerance: f64) -> Self {
    self.sd_tolerance = sd_tolerance;
    self
  }

  pub fn with_simplex_step(mut self, simplex_step: f64) -> Self {
    self.simplex_step = simplex_step;
    self
  }

  /// Every evaluation made so far, in call order.
  pub fn history(&self) -> Vec<CalibrationHistory<ModelParameters>> {
    self.calibration_history.borrow().clone()
  }

  /// Objective at `params`, recorded in the history.
  pub fn objective(&self, params: &ModelParameters) -> Result<f64> {
    let likelihood = SimulatedLikelihood::new(&self.observed, &self.draws, self.grid, self.config)?;
    let mut workspace = self.workspace.borrow_mut();
    let workspace = workspace.get_or_insert_with(|| EnsembleWorkspace::for_grid(&self.grid));

    let mut nll = likelihood.negative_log_likelihood(params, workspace);
    if !nll.is_finite() {
      nll = NON_FINITE_PENALTY;
    }
    debug!(?params, nll, "objective evaluated");

    self.calibration_history.borrow_mut().push(CalibrationHistory {
      params: *params,
      loss: nll,
    });

    Ok(nll)
  }

  fn initial_simplex(&self, x0: &[f64]) -> Vec<Vec<f64>> {
    let mut simplex = Vec::with_capacity(x0.len() + 1);
    simplex.push(x0.to_vec());
    for i in 0..x0.len() {
      let mut point = x0.to_vec();
      point[i] = if point[i].abs() > f64::EPSILON {
        point[i] * (1.0 + self.simplex_step)
      } else {
        ZERO_COORD_STEP
      };
      simplex.push(point);
    }
    simplex
  }

  pub fn calibrate(&self) -> Result<NpsmleCalibrationResult> {
    let x0 = self
      .params
      .ok_or_else(|| anyhow!("initial parameters are required for calibration"))?;
    x0.validate()?;

    self.calibration_history.borrow_mut().clear();
    info!(
      initial = ?x0,
      n_obs = self.observed.n_obs(),
      n_sim = self.grid.n_sim,
      m_sim = self.grid.m_sim,
      "starting NPSMLE calibration"
    );

    let x0 = x0.to_vec();
    let solver = NelderMead::new(self.initial_simplex(&x0)).with_sd_tolerance(self.sd_tolerance)?;
    let res = Executor::new(NpsmleProblem { calibrator: self }, solver)
      .configure(|state| state.max_iters(self.max_iters))
      .run()?;

    let best = match res.state.best_param {
      Some(best) => best,
      None => {
        warn!("solver returned no best parameters, keeping the initial guess");
        x0
      }
    };
    let params = ModelParameters::from_slice(&best)?;
    let nll = res.state.best_cost;
    let evaluations = self.calibration_history.borrow().len();

    info!(
      params = ?params,
      nll,
      iterations = res.state.iter,
      evaluations,
      termination = ?res.state.termination_status,
      "NPSMLE calibration finished"
    );

    Ok(NpsmleCalibrationResult {
      params,
      nll,
      iterations: res.state.iter,
      evaluations,
    })
  }
}

struct NpsmleProblem<'a> {
  calibrator: &'a NpsmleCalibrator,
}

impl CostFunction for NpsmleProblem<'_> {
  type Param = Vec<f64>;
  type Output = f64;

  fn cost(&self, x: &Self::Param) -> std::result::Result<Self::Output, argmin::core::Error> {
    let params = ModelParameters::from_slice(x)?;
    if let Err(err) = params.validate() {
      debug!(%err, "trial outside the admissible region");
      return Ok(NON_FINITE_PENALTY);
    }

    Ok(self.calibrator.objective(&params)?)
  }
}
