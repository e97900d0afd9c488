pub mod npsmle;

/// One objective evaluation recorded during calibration.
#[derive(Clone, Debug)]
pub struct CalibrationHistory<T> {
  pub params: T,
  pub loss: f64,
}
