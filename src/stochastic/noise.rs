//! # Noise
//!
//! $$
//! W_p=\sqrt{1-\rho^2}\,Z_p+\rho\,W_v
//! $$
//!
pub mod cgns;
pub mod source;
