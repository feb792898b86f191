pub mod monte_carlo;
pub mod stats;

pub use monte_carlo::{simulate_with_rng, RiskSimulator};
