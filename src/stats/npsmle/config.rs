use crate::stats::gaussian_kde::StdDevNormalization;

/// Objective value returned for trials whose log-likelihood stops being a
/// normal float when short-circuiting is enabled.
pub const NON_FINITE_PENALTY: f64 = f64::MAX;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NpsmleConfig {
  /// Return [`NON_FINITE_PENALTY`] as soon as the running log-likelihood is
  /// `-inf` or not a normal float.
  pub short_circuit_on_non_finite: bool,
  /// Propagate the ensemble and evaluate kernels on the rayon pool.
  pub parallel: bool,
  /// Divisor of the ensemble standard deviation behind the bandwidths.
  pub std_dev: StdDevNormalization,
}

impl NpsmleConfig {
  pub fn with_short_circuit(mut self, enabled: bool) -> Self {
    self.short_circuit_on_non_finite = enabled;
    self
  }

  pub fn with_parallel(mut self, enabled: bool) -> Self {
    self.parallel = enabled;
    self
  }

  pub fn with_std_dev(mut self, normalization: StdDevNormalization) -> Self {
    self.std_dev = normalization;
    self
  }
}
