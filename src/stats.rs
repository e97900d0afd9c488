//! # Stats
//!
//! $$
//! \hat f_h(x)=\frac1{nh}\sum_{i=1}^n\varphi\Bigl(\frac{x-x_i}{h}\Bigr)
//! $$
//!
pub mod gaussian_kde;
pub mod npsmle;
