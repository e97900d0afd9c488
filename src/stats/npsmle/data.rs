use anyhow::ensure;
use anyhow::Result;
use impl_new_derive::ImplNew;
use ndarray::Array1;
use ndarray::ArrayView1;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::StandardNormal;

use crate::traits::NormalSource;

/// Ensemble size, sub-steps per observation and observation spacing.
#[derive(ImplNew, Clone, Copy, Debug, PartialEq)]
pub struct SimulationGrid {
  /// Ensemble size `N_sim`
  pub n_sim: usize,
  /// Sub-steps per observation interval `M_sim`
  pub m_sim: usize,
  /// Time between observations
  pub dt: f64,
}

impl SimulationGrid {
  pub fn validate(&self) -> Result<()> {
    ensure!(
      self.n_sim > 1,
      "n_sim must exceed 1 for a bandwidth, got {}",
      self.n_sim
    );
    ensure!(self.m_sim >= 1, "m_sim must be at least 1");
    ensure!(
      self.dt.is_finite() && self.dt > 0.0,
      "dt must be finite and positive, got {}",
      self.dt
    );
    Ok(())
  }

  /// Sub-step length `dt / m_sim`.
  pub fn delta(&self) -> f64 {
    self.dt / self.m_sim as f64
  }

  /// Number of innovations per ensemble, `n_sim * m_sim`.
  pub fn innovations_len(&self) -> usize {
    self.n_sim * self.m_sim
  }
}

/// Maps a per-observation sentiment series onto the sub-step grid.
///
/// Entry `(i - 1) * m_sim + k` lies `k / m_sim` of the way from observation
/// `i - 1` to observation `i`.
pub fn interpolate_sentiment(coarse: ArrayView1<f64>, m_sim: usize) -> Array1<f64> {
  assert!(m_sim >= 1, "m_sim must be at least 1");
  let n_obs = coarse.len();
  let mut fine = Array1::<f64>::zeros(n_obs.saturating_sub(1) * m_sim);

  for i in 1..n_obs {
    let (a, b) = (coarse[i - 1], coarse[i]);
    for k in 0..m_sim {
      let w = k as f64 / m_sim as f64;
      fine[(i - 1) * m_sim + k] = a + (b - a) * w;
    }
  }

  fine
}

/// Observed price, volatility and sub-step sentiment.
#[derive(Clone, Debug)]
pub struct ObservedSeries {
  price: Array1<f64>,
  volatility: Array1<f64>,
  sentiment: Array1<f64>,
  m_sim: usize,
}

impl ObservedSeries {
  /// `sentiment` must already be sampled on the sub-step grid, i.e. hold at
  /// least `(N_obs - 1) * m_sim` values.
  pub fn new(
    price: Array1<f64>,
    volatility: Array1<f64>,
    sentiment: Array1<f64>,
    m_sim: usize,
  ) -> Result<Self> {
    ensure!(
      price.len() == volatility.len(),
      "price and volatility must have the same length ({} vs {})",
      price.len(),
      volatility.len()
    );
    ensure!(
      price.len() >= 2,
      "at least 2 observations are required, got {}",
      price.len()
    );
    ensure!(m_sim >= 1, "m_sim must be at least 1");
    let needed = (price.len() - 1) * m_sim;
    ensure!(
      sentiment.len() >= needed,
      "sentiment has {} entries, {} observations with m_sim = {} need {}",
      sentiment.len(),
      price.len(),
      m_sim,
      needed
    );
    ensure!(
      price.iter().chain(volatility.iter()).all(|x| x.is_finite()),
      "observed price and volatility must be finite"
    );
    ensure!(
      sentiment.iter().take(needed).all(|x| x.is_finite()),
      "sentiment must be finite"
    );

    Ok(Self {
      price,
      volatility,
      sentiment,
      m_sim,
    })
  }

  /// Builds the sub-step sentiment by linear interpolation of one value per observation.
  pub fn with_coarse_sentiment(
    price: Array1<f64>,
    volatility: Array1<f64>,
    coarse_sentiment: Array1<f64>,
    m_sim: usize,
  ) -> Result<Self> {
    ensure!(
      coarse_sentiment.len() == price.len(),
      "coarse sentiment needs one value per observation ({} vs {})",
      coarse_sentiment.len(),
      price.len()
    );
    let sentiment = interpolate_sentiment(coarse_sentiment.view(), m_sim);
    Self::new(price, volatility, sentiment, m_sim)
  }

  pub fn n_obs(&self) -> usize {
    self.price.len()
  }

  pub fn m_sim(&self) -> usize {
    self.m_sim
  }

  pub fn price(&self) -> ArrayView1<'_, f64> {
    self.price.view()
  }

  pub fn volatility(&self) -> ArrayView1<'_, f64> {
    self.volatility.view()
  }

  pub fn sentiment(&self) -> ArrayView1<'_, f64> {
    self.sentiment.view()
  }
}

/// Pre-drawn standard normals shared by every likelihood evaluation.
///
/// Index `j * m_sim + k` holds the draw for ensemble member `j` at sub-step `k`.
#[derive(Clone, Debug)]
pub struct InnovationDraws {
  price: Array1<f64>,
  volatility: Array1<f64>,
}

impl InnovationDraws {
  pub fn new(price: Array1<f64>, volatility: Array1<f64>) -> Result<Self> {
    ensure!(
      price.len() == volatility.len(),
      "price and volatility draws must have the same length ({} vs {})",
      price.len(),
      volatility.len()
    );
    ensure!(
      price.iter().chain(volatility.iter()).all(|x| x.is_finite()),
      "innovation draws must be finite"
    );
    Ok(Self { price, volatility })
  }

  /// Draws both buffers from a seeded `StdRng`, price first.
  pub fn seeded(n_sim: usize, m_sim: usize, seed: u64) -> Self {
    let mut rng = StdRng::seed_from_u64(seed);
    let len = n_sim * m_sim;
    let price = Array1::<f64>::random_using(len, StandardNormal, &mut rng);
    let volatility = Array1::<f64>::random_using(len, StandardNormal, &mut rng);
    Self { price, volatility }
  }

  /// Draws `(volatility, price)` pairs from `source`, one pair per index.
  pub fn from_source<S: NormalSource + ?Sized>(n_sim: usize, m_sim: usize, source: &mut S) -> Self {
    let len = n_sim * m_sim;
    let mut price = Array1::<f64>::zeros(len);
    let mut volatility = Array1::<f64>::zeros(len);
    for idx in 0..len {
      volatility[idx] = source.next_standard_normal();
      price[idx] = source.next_standard_normal();
    }
    Self { price, volatility }
  }

  pub fn len(&self) -> usize {
    self.price.len()
  }

  pub fn is_empty(&self) -> bool {
    self.price.is_empty()
  }

  pub fn price(&self) -> ArrayView1<'_, f64> {
    self.price.view()
  }

  pub fn volatility(&self) -> ArrayView1<'_, f64> {
    self.volatility.view()
  }
}

/// Caller-owned scratch reused across likelihood evaluations.
#[derive(Clone, Debug)]
pub struct EnsembleWorkspace {
  pub(crate) simulated_price: Array1<f64>,
  pub(crate) simulated_volatility: Array1<f64>,
  pub(crate) wiener_price: Array1<f64>,
  pub(crate) wiener_volatility: Array1<f64>,
  pub(crate) kernel: Array1<f64>,
  m_sim: usize,
}

impl EnsembleWorkspace {
  pub fn new(n_sim: usize, m_sim: usize) -> Self {
    Self {
      simulated_price: Array1::zeros(n_sim),
      simulated_volatility: Array1::zeros(n_sim),
      wiener_price: Array1::zeros(n_sim * m_sim),
      wiener_volatility: Array1::zeros(n_sim * m_sim),
      kernel: Array1::zeros(n_sim),
      m_sim,
    }
  }

  pub fn for_grid(grid: &SimulationGrid) -> Self {
    Self::new(grid.n_sim, grid.m_sim)
  }

  pub fn n_sim(&self) -> usize {
    self.simulated_price.len()
  }

  pub fn m_sim(&self) -> usize {
    self.m_sim
  }

  /// Ensemble prices after the last propagated observation step.
  pub fn simulated_price(&self) -> ArrayView1<'_, f64> {
    self.simulated_price.view()
  }

  /// Ensemble volatilities after the last propagated observation step.
  pub fn simulated_volatility(&self) -> ArrayView1<'_, f64> {
    self.simulated_volatility.view()
  }
}
