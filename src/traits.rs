//! # Traits
//!
//! $$
//! \text{Trait contracts: }\mathcal{A}:\text{inputs}\to\text{samples}
//! $$
//!
use rayon::prelude::*;

/// A stream of independent standard-normal draws.
///
/// The path simulator consumes draws strictly in call order, so two sources
/// yielding the same sequence produce bit-identical paths.
pub trait NormalSource {
  fn next_standard_normal(&mut self) -> f64;

  fn fill_standard_normal(&mut self, out: &mut [f64]) {
    for x in out.iter_mut() {
      *x = self.next_standard_normal();
    }
  }
}

impl<S: NormalSource + ?Sized> NormalSource for &mut S {
  fn next_standard_normal(&mut self) -> f64 {
    (**self).next_standard_normal()
  }
}

pub trait ProcessExt: Send + Sync {
  type Output: Send;

  fn sample(&self) -> Self::Output;

  fn sample_par(&self, m: usize) -> Vec<Self::Output> {
    (0..m).into_par_iter().map(|_| self.sample()).collect()
  }
}
