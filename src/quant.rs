//! # Quant
//!
//! $$
//! \hat\theta=\arg\min_\theta\ -\hat{\mathcal L}_N(\theta)
//! $$
//!
pub mod calibration;
