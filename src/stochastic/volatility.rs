//! # Volatility
//!
//! $$
//! \begin{aligned}
//! dP_t&=\gamma_p(\mu_p-P_t)\,dt+P_t\sqrt{|V_t|}\,dW^p_t\\
//! dV_t&=\gamma_v(\mu_v+\beta_v|S_t|-V_t)\,dt+\sigma_v\sqrt{|V_t|}\,dW^v_t
//! \end{aligned}
//! $$
//!
pub mod sentiment;

pub use sentiment::ModelParameters;
pub use sentiment::SentimentGrid;
pub use sentiment::SentimentVolatility;
