use anyhow::ensure;
use anyhow::Result;
use impl_new_derive::ImplNew;
use ndarray::Array1;
use ndarray::ArrayViewMut1;
use rayon::prelude::*;

use crate::stochastic::noise::cgns::CGNS;
use crate::stochastic::noise::source::RngNormal;
use crate::traits::NormalSource;
use crate::traits::ProcessExt;

/// Parameters of the sentiment-driven price–volatility system
///
/// dP = gamma_p (mu_p - P) dt + P sqrt|V| dW_p
/// dV = gamma_v (mu_v + beta_v |S| - V) dt + sigma_v sqrt|V| dW_v
/// d<W_p, W_v> = rho_pv dt
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModelParameters {
  /// Price long-run mean
  pub mu_p: f64,
  /// Price mean-reversion speed
  pub gamma_p: f64,
  /// Volatility long-run mean
  pub mu_v: f64,
  /// Volatility mean-reversion speed
  pub gamma_v: f64,
  /// Sensitivity of the volatility target to |sentiment|
  pub beta_v: f64,
  /// Volatility diffusion scale
  pub sigma_v: f64,
  /// Correlation between price and volatility shocks
  pub rho_pv: f64,
}

impl ModelParameters {
  /// Length of the positional parameter vector.
  pub const LEN: usize = 7;

  /// Arguments follow the positional order
  /// `[gamma_p, mu_p, gamma_v, mu_v, beta_v, sigma_v, rho_pv]`.
  pub fn new(
    gamma_p: f64,
    mu_p: f64,
    gamma_v: f64,
    mu_v: f64,
    beta_v: f64,
    sigma_v: f64,
    rho_pv: f64,
  ) -> Self {
    assert!(
      (-1.0..=1.0).contains(&rho_pv),
      "rho_pv must be in [-1, 1]"
    );

    Self {
      mu_p,
      gamma_p,
      mu_v,
      gamma_v,
      beta_v,
      sigma_v,
      rho_pv,
    }
  }

  /// Reads the positional vector without asserting; pair with [`Self::validate`].
  pub fn from_slice(x: &[f64]) -> Result<Self> {
    ensure!(
      x.len() == Self::LEN,
      "expected {} parameters [gamma_p, mu_p, gamma_v, mu_v, beta_v, sigma_v, rho_pv], got {}",
      Self::LEN,
      x.len()
    );

    Ok(Self {
      gamma_p: x[0],
      mu_p: x[1],
      gamma_v: x[2],
      mu_v: x[3],
      beta_v: x[4],
      sigma_v: x[5],
      rho_pv: x[6],
    })
  }

  pub fn to_vec(&self) -> Vec<f64> {
    vec![
      self.gamma_p,
      self.mu_p,
      self.gamma_v,
      self.mu_v,
      self.beta_v,
      self.sigma_v,
      self.rho_pv,
    ]
  }

  pub fn validate(&self) -> Result<()> {
    for (name, value) in Self::NAMES.iter().zip(self.to_vec()) {
      ensure!(value.is_finite(), "{name} must be finite, got {value}");
    }
    ensure!(
      (-1.0..=1.0).contains(&self.rho_pv),
      "rho_pv must be in [-1, 1], got {}",
      self.rho_pv
    );
    Ok(())
  }

  pub fn cgns(&self) -> CGNS {
    CGNS::new(self.rho_pv)
  }

  const NAMES: [&'static str; 7] = [
    "gamma_p", "mu_p", "gamma_v", "mu_v", "beta_v", "sigma_v", "rho_pv",
  ];
}

impl TryFrom<&[f64]> for ModelParameters {
  type Error = anyhow::Error;

  fn try_from(x: &[f64]) -> Result<Self> {
    let params = Self::from_slice(x)?;
    params.validate()?;
    Ok(params)
  }
}

impl From<ModelParameters> for Vec<f64> {
  fn from(params: ModelParameters) -> Self {
    params.to_vec()
  }
}

/// Resolution at which the simulator reads the sentiment series.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SentimentGrid {
  /// `sentiment[i]` for every sub-step of observation interval `i`.
  #[default]
  Observation,
  /// `sentiment[(i - 1) * m + j]`, the grid the likelihood evaluator uses.
  SubStep,
}

impl SentimentGrid {
  #[inline]
  fn index(self, i: usize, j: usize, m: usize) -> usize {
    match self {
      SentimentGrid::Observation => i,
      SentimentGrid::SubStep => (i - 1) * m + j,
    }
  }

  /// Minimum sentiment length for `n` observations with `m` sub-steps.
  pub fn required_len(self, n: usize, m: usize) -> usize {
    match self {
      SentimentGrid::Observation => n,
      SentimentGrid::SubStep => n.saturating_sub(1) * m,
    }
  }
}

/// Euler–Maruyama sub-step of the path simulator.
///
/// Both diffusion terms use the pre-step `|volatility|`.
#[inline]
pub(crate) fn euler_step(
  params: &ModelParameters,
  price: &mut f64,
  volatility: &mut f64,
  sentiment: f64,
  w_p: f64,
  w_v: f64,
  delta: f64,
  sqrt_delta: f64,
) {
  let sqrt_vol = volatility.abs().sqrt();
  let sp = *price * sqrt_vol;
  let sv = params.sigma_v * sqrt_vol;
  advance(params, price, volatility, sentiment, w_p * sp, w_v * sv, delta, sqrt_delta);
}

/// Sub-step of the likelihood ensemble.
///
/// Same drift and price diffusion as [`euler_step`], but the volatility
/// diffusion is `sigma_v * P * sqrt|V|` with the pre-step price `P`.
#[inline]
pub(crate) fn ensemble_euler_step(
  params: &ModelParameters,
  price: &mut f64,
  volatility: &mut f64,
  sentiment: f64,
  w_p: f64,
  w_v: f64,
  delta: f64,
  sqrt_delta: f64,
) {
  let sp = *price * volatility.abs().sqrt();
  advance(
    params,
    price,
    volatility,
    sentiment,
    w_p * sp,
    w_v * sp * params.sigma_v,
    delta,
    sqrt_delta,
  );
}

#[inline]
fn advance(
  params: &ModelParameters,
  price: &mut f64,
  volatility: &mut f64,
  sentiment: f64,
  price_shock: f64,
  volatility_shock: f64,
  delta: f64,
  sqrt_delta: f64,
) {
  let mp = params.gamma_p * (params.mu_p - *price);
  let mv = params.gamma_v * (params.mu_v + params.beta_v * sentiment.abs() - *volatility);
  *price += mp * delta + price_shock * sqrt_delta;
  *volatility += mv * delta + volatility_shock * sqrt_delta;
}

/// Single-path simulator for the sentiment-driven price–volatility system.
#[derive(ImplNew, Clone, Debug)]
pub struct SentimentVolatility {
  /// Model parameters
  pub params: ModelParameters,
  /// Time between observations
  pub dt: f64,
  /// Number of observations
  pub n: usize,
  /// Sub-steps per observation interval
  pub m: usize,
  /// Initial price
  pub p0: f64,
  /// Initial volatility
  pub v0: f64,
  /// Exogenous sentiment path
  pub sentiment: Array1<f64>,
  /// Sentiment resolution, defaults to [`SentimentGrid::Observation`]
  pub grid: Option<SentimentGrid>,
  /// Seed for `sample`/`sample_par`; entropy when `None`
  pub seed: Option<u64>,
}

impl SentimentVolatility {
  fn check(&self) {
    assert!(self.dt > 0.0, "dt must be positive");
    assert!(self.n >= 1, "n must be at least 1");
    assert!(self.m >= 1, "m must be at least 1");
    let grid = self.grid.unwrap_or_default();
    assert!(
      self.sentiment.len() >= grid.required_len(self.n, self.m),
      "sentiment has {} entries, {:?} grid needs {}",
      self.sentiment.len(),
      grid,
      grid.required_len(self.n, self.m)
    );
  }

  /// Simulates into caller-owned buffers of length `n`.
  pub fn sample_into<S: NormalSource + ?Sized>(
    &self,
    source: &mut S,
    mut price: ArrayViewMut1<f64>,
    mut volatility: ArrayViewMut1<f64>,
  ) {
    self.check();
    assert_eq!(price.len(), self.n, "price buffer must have length n");
    assert_eq!(volatility.len(), self.n, "volatility buffer must have length n");

    let cgns = self.params.cgns();
    let grid = self.grid.unwrap_or_default();
    let delta = self.dt / self.m as f64;
    let sqrt_delta = delta.sqrt();

    price[0] = self.p0;
    volatility[0] = self.v0;

    for i in 1..self.n {
      let mut p = price[i - 1];
      let mut v = volatility[i - 1];

      for j in 0..self.m {
        let (w_p, w_v) = cgns.draw_pair(source);
        let s = self.sentiment[grid.index(i, j, self.m)];
        euler_step(&self.params, &mut p, &mut v, s, w_p, w_v, delta, sqrt_delta);
      }

      price[i] = p;
      volatility[i] = v;
    }
  }

  pub fn sample_with<S: NormalSource + ?Sized>(&self, source: &mut S) -> [Array1<f64>; 2] {
    let mut price = Array1::<f64>::zeros(self.n);
    let mut volatility = Array1::<f64>::zeros(self.n);
    self.sample_into(source, price.view_mut(), volatility.view_mut());
    [price, volatility]
  }

  fn source(&self, offset: u64) -> RngNormal<rand::rngs::StdRng> {
    match self.seed {
      Some(seed) => RngNormal::seeded(seed.wrapping_add(offset)),
      None => RngNormal::from_entropy(),
    }
  }
}

impl ProcessExt for SentimentVolatility {
  type Output = [Array1<f64>; 2];

  fn sample(&self) -> Self::Output {
    self.sample_with(&mut self.source(0))
  }

  /// Path `k` is seeded with `seed + k` when a seed is set.
  fn sample_par(&self, m: usize) -> Vec<Self::Output> {
    (0..m)
      .into_par_iter()
      .map(|k| self.sample_with(&mut self.source(k as u64)))
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use ndarray::array;

  use super::*;
  use crate::stochastic::noise::source::ReplayNormal;

  fn params() -> ModelParameters {
    ModelParameters::new(1.0, 100.0, 2.0, 0.05, 0.1, 0.3, -0.5)
  }

  fn process(n: usize, m: usize, seed: Option<u64>) -> SentimentVolatility {
    SentimentVolatility::new(
      params(),
      1.0 / 252.0,
      n,
      m,
      100.0,
      0.04,
      Array1::linspace(-1.0, 1.0, n.max(2) * m),
      None,
      seed,
    )
  }

  #[test]
  fn ensemble_step_scales_volatility_diffusion_by_price() {
    let p = ModelParameters::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.4, 0.0);
    let (delta, sqrt_delta) = (0.1, 0.1f64.sqrt());

    let (mut sp, mut sv) = (50.0, 0.04);
    euler_step(&p, &mut sp, &mut sv, 0.0, 0.0, 1.0, delta, sqrt_delta);
    let (mut ep, mut ev) = (50.0, 0.04);
    ensemble_euler_step(&p, &mut ep, &mut ev, 0.0, 0.0, 1.0, delta, sqrt_delta);

    assert_eq!(sp, ep);
    assert_abs_diff_eq!(sv - 0.04, 0.4 * 0.2 * sqrt_delta, epsilon = 1e-15);
    assert_abs_diff_eq!(ev - 0.04, 0.4 * 50.0 * 0.2 * sqrt_delta, epsilon = 1e-12);
  }

  #[test]
  fn zero_noise_single_step_is_exact() {
    let p = ModelParameters::new(1.0, 100.0, 2.5, 0.06, 0.2, 0.4, 0.0);
    let sentiment = array![-0.7, -0.7];
    let sim = SentimentVolatility::new(p, 1.0, 2, 1, 100.0, 0.04, sentiment.clone(), None, None);

    let [price, vol] = sim.sample_with(&mut ReplayNormal::constant(0.0));

    assert_eq!(price[0], 100.0);
    assert_eq!(price[1], 100.0);
    assert_eq!(vol[0], 0.04);
    assert_eq!(
      vol[1],
      0.04 + p.gamma_v * (p.mu_v + p.beta_v * sentiment[0].abs() - 0.04) * 1.0
    );
  }

  #[test]
  fn degenerate_volatility_stays_zero() {
    let p = ModelParameters::new(0.5, 100.0, 0.0, 0.0, 0.0, 0.0, 0.3);
    let mut sim = process(64, 8, Some(5));
    sim.params = p;
    sim.v0 = 0.0;

    let [price, vol] = sim.sample();
    assert!(vol.iter().all(|&v| v == 0.0));
    // no diffusion in price either once the volatility is zero
    assert!(price.iter().all(|x| x.is_finite()));
  }

  #[test]
  fn same_seed_same_path() {
    let sim = process(50, 4, Some(99));
    let [p1, v1] = sim.sample();
    let [p2, v2] = sim.sample();
    assert_eq!(p1, p2);
    assert_eq!(v1, v2);
  }

  #[test]
  fn sample_par_is_seeded_per_path() {
    let sim = process(30, 2, Some(10));
    let paths = sim.sample_par(4);
    assert_eq!(paths.len(), 4);
    assert_ne!(paths[0][0], paths[1][0]);

    let again = sim.sample_par(4);
    for (a, b) in paths.iter().zip(again.iter()) {
      assert_eq!(a[0], b[0]);
      assert_eq!(a[1], b[1]);
    }

    let mut third = sim.clone();
    third.seed = Some(12);
    assert_eq!(third.sample()[0], paths[2][0]);
  }

  #[test]
  fn sample_into_matches_sample_with() {
    let sim = process(20, 3, None);
    let draws: Vec<f64> = {
      let mut src = RngNormal::seeded(1);
      (0..2 * 19 * 3).map(|_| src.next_standard_normal()).collect()
    };

    let [p1, v1] = sim.sample_with(&mut ReplayNormal::new(draws.clone()));
    let mut p2 = Array1::zeros(20);
    let mut v2 = Array1::zeros(20);
    let mut replay = ReplayNormal::new(draws);
    sim.sample_into(&mut replay, p2.view_mut(), v2.view_mut());

    assert_eq!(p1, p2);
    assert_eq!(v1, v2);
    assert_eq!(replay.consumed(), 2 * 19 * 3);
  }

  #[test]
  fn single_observation_returns_initial_state() {
    let sim = process(1, 5, Some(3));
    let [p, v] = sim.sample();
    assert_eq!(p, array![100.0]);
    assert_eq!(v, array![0.04]);
  }

  #[test]
  fn observation_grid_reads_coarse_index() {
    let p = ModelParameters::new(0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0);
    let sentiment = array![10.0, 0.5, 20.0];
    let sim = SentimentVolatility::new(p, 1.0, 2, 2, 1.0, 0.0, sentiment, None, None);
    let [_, v] = sim.sample_with(&mut ReplayNormal::constant(0.0));
    // two half-steps toward |sentiment[1]| = 0.5
    assert_abs_diff_eq!(v[1], 0.25 + 0.5 * (0.5 - 0.25), epsilon = 1e-15);
  }

  #[test]
  fn substep_grid_reads_fine_index() {
    let p = ModelParameters::new(0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0);
    let sentiment = array![0.4, -0.8];
    let sim = SentimentVolatility::new(
      p,
      1.0,
      2,
      2,
      1.0,
      0.0,
      sentiment,
      Some(SentimentGrid::SubStep),
      None,
    );
    let [_, v] = sim.sample_with(&mut ReplayNormal::constant(0.0));
    let first = 0.5 * 0.4;
    assert_abs_diff_eq!(v[1], first + 0.5 * (0.8 - first), epsilon = 1e-15);
  }

  #[test]
  #[should_panic(expected = "grid needs")]
  fn short_sentiment_panics() {
    let mut sim = process(10, 2, Some(1));
    sim.grid = Some(SentimentGrid::SubStep);
    sim.sentiment = Array1::zeros(17);
    let _ = sim.sample();
  }

  #[test]
  fn negative_volatility_uses_absolute_value() {
    let mut sim = process(200, 10, Some(8));
    sim.v0 = -0.02;
    sim.params.mu_v = -0.05;
    let [p, v] = sim.sample();
    assert!(p.iter().chain(v.iter()).all(|x| x.is_finite()));
    assert!(v.iter().any(|&x| x < 0.0));
  }

  #[test]
  fn noiseless_price_reverts_to_mean() {
    let mut sim = process(400, 4, None);
    sim.p0 = 80.0;
    sim.dt = 0.05;
    let [p, _] = sim.sample_with(&mut ReplayNormal::constant(0.0));
    assert!(p.windows(2).into_iter().all(|w| w[1] >= w[0]));
    assert_abs_diff_eq!(p[399], 100.0, epsilon = 1e-6);
  }

  #[test]
  fn positional_vector_roundtrip_keeps_order() {
    let x = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 0.7];
    let p = ModelParameters::try_from(&x[..]).unwrap();
    assert_eq!(p.gamma_p, 1.0);
    assert_eq!(p.mu_p, 2.0);
    assert_eq!(p.gamma_v, 3.0);
    assert_eq!(p.mu_v, 4.0);
    assert_eq!(p.beta_v, 5.0);
    assert_eq!(p.sigma_v, 6.0);
    assert_eq!(p.rho_pv, 0.7);
    assert_eq!(Vec::from(p), x.to_vec());
  }

  #[test]
  fn invalid_vectors_are_rejected() {
    assert!(ModelParameters::try_from(&[1.0, 2.0][..]).is_err());
    assert!(ModelParameters::try_from(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 1.5][..]).is_err());
    assert!(ModelParameters::try_from(&[f64::NAN, 2.0, 3.0, 4.0, 5.0, 6.0, 0.0][..]).is_err());
  }
}
