use ndarray::ArrayView1;
use ndarray::ArrayViewMut1;
use ndarray::Zip;

use crate::traits::NormalSource;

/// Correlated Gaussian noise for the price/volatility pair.
///
/// `W_v = Z_v`, `W_p = sqrt(1 - rho^2) Z_p + rho W_v`.
#[derive(Clone, Copy, Debug)]
pub struct CGNS {
  pub rho: f64,
  complement: f64,
}

impl CGNS {
  pub fn new(rho: f64) -> Self {
    assert!(
      (-1.0..=1.0).contains(&rho),
      "Correlation coefficient must be in [-1, 1]"
    );

    Self {
      rho,
      complement: (1.0 - rho * rho).sqrt(),
    }
  }

  #[inline]
  pub fn correlate(&self, z_price: f64, w_volatility: f64) -> f64 {
    self.complement * z_price + self.rho * w_volatility
  }

  /// Draws one `(W_p, W_v)` pair. The volatility draw is taken first.
  #[inline]
  pub fn draw_pair<S: NormalSource + ?Sized>(&self, source: &mut S) -> (f64, f64) {
    let w_v = source.next_standard_normal();
    let w_p = self.correlate(source.next_standard_normal(), w_v);
    (w_p, w_v)
  }

  /// Mixes whole buffers of independent draws into correlated shocks.
  pub fn fill(
    &self,
    z_price: ArrayView1<f64>,
    z_volatility: ArrayView1<f64>,
    w_price: ArrayViewMut1<f64>,
    w_volatility: ArrayViewMut1<f64>,
  ) {
    Zip::from(w_price)
      .and(w_volatility)
      .and(z_price)
      .and(z_volatility)
      .for_each(|w_p, w_v, &z_p, &z_v| {
        *w_v = z_v;
        *w_p = self.correlate(z_p, *w_v);
      });
  }
}

#[cfg(test)]
mod tests {
  use ndarray::Array1;

  use super::*;
  use crate::stochastic::noise::source::ReplayNormal;
  use crate::stochastic::noise::source::RngNormal;

  fn draws(seed: u64, n: usize) -> (Array1<f64>, Array1<f64>) {
    let mut src = RngNormal::seeded(seed);
    let mut zp = Array1::zeros(n);
    let mut zv = Array1::zeros(n);
    for i in 0..n {
      zp[i] = src.next_standard_normal();
      zv[i] = src.next_standard_normal();
    }
    (zp, zv)
  }

  #[test]
  #[should_panic(expected = "Correlation coefficient must be in [-1, 1]")]
  fn rho_outside_unit_interval_panics() {
    let _ = CGNS::new(1.01);
  }

  #[test]
  fn zero_correlation_passes_independent_draw_through() {
    let (zp, zv) = draws(3, 256);
    let mut wp = Array1::zeros(256);
    let mut wv = Array1::zeros(256);
    CGNS::new(0.0).fill(zp.view(), zv.view(), wp.view_mut(), wv.view_mut());
    assert_eq!(wp, zp);
    assert_eq!(wv, zv);
  }

  #[test]
  fn perfect_correlation_copies_volatility_shock() {
    let (zp, zv) = draws(4, 256);
    let mut wp = Array1::zeros(256);
    let mut wv = Array1::zeros(256);

    CGNS::new(1.0).fill(zp.view(), zv.view(), wp.view_mut(), wv.view_mut());
    assert_eq!(wp, wv);

    CGNS::new(-1.0).fill(zp.view(), zv.view(), wp.view_mut(), wv.view_mut());
    assert_eq!(wp, wv.mapv(|x| -x));
  }

  #[test]
  fn draw_pair_takes_volatility_first() {
    let mut src = ReplayNormal::new(vec![0.5, 2.0]);
    let (w_p, w_v) = CGNS::new(0.0).draw_pair(&mut src);
    assert_eq!(w_v, 0.5);
    assert_eq!(w_p, 2.0);
  }

  #[test]
  fn empirical_correlation_matches_rho() {
    let n = 100_000;
    let (zp, zv) = draws(11, n);
    let mut wp = Array1::zeros(n);
    let mut wv = Array1::zeros(n);
    CGNS::new(-0.6).fill(zp.view(), zv.view(), wp.view_mut(), wv.view_mut());

    let mp = wp.mean().unwrap();
    let mv = wv.mean().unwrap();
    let cov = wp
      .iter()
      .zip(wv.iter())
      .map(|(a, b)| (a - mp) * (b - mv))
      .sum::<f64>()
      / n as f64;
    let corr = cov / (wp.std(0.0) * wv.std(0.0));
    assert!((corr + 0.6).abs() < 0.01, "corr = {corr}");
  }
}
