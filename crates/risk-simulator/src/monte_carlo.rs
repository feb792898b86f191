use std::time::Instant;

use rand::rngs::StdRng;
use rand::{thread_rng, RngCore, SeedableRng};
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use treasury_core::{
    AnalysisError, AnalysisResult, SimulationParameters, SimulationResult, ThresholdBreach,
};

use crate::stats;

/// Histogram sample size for `price_distribution`.
const DISTRIBUTION_POINTS: usize = 200;

/// Monte Carlo simulator for the terminal price of a held asset.
///
/// Each path is a discrete-time random walk: every day the price moves by a
/// simple return drawn from `Normal(0, annual_volatility / sqrt(365))` and is
/// clamped at `floor_price`. Paths run in parallel on the rayon pool.
///
/// Work and memory grow with `path_count * horizon_days` and `path_count`
/// respectively; there is no internal cap. The default workload is 10,000
/// paths over 365 days (3.65M draws). Callers serving untrusted input should
/// cap the product.
#[derive(Debug, Clone, Default)]
pub struct RiskSimulator {
    seed: Option<u64>,
}

impl RiskSimulator {
    /// Simulator backed by the thread-local entropy source.
    pub fn new() -> Self {
        Self { seed: None }
    }

    /// Simulator whose results are reproducible for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn simulate(
        &self,
        params: &SimulationParameters,
        threshold_prices: &[f64],
    ) -> AnalysisResult<SimulationResult> {
        match self.seed {
            Some(seed) => {
                let mut rng = StdRng::seed_from_u64(seed);
                simulate_with_rng(params, threshold_prices, &mut rng)
            }
            None => simulate_with_rng(params, threshold_prices, &mut thread_rng()),
        }
    }
}

/// Run a simulation drawing from `rng`.
///
/// One seed per path is drawn from `rng` up front, and each path owns a
/// `StdRng` built from its seed. Paths therefore never share random state, and
/// the output depends only on `rng`, not on how rayon schedules the work.
pub fn simulate_with_rng<R: RngCore + ?Sized>(
    params: &SimulationParameters,
    threshold_prices: &[f64],
    rng: &mut R,
) -> AnalysisResult<SimulationResult> {
    params.validate()?;
    let thresholds = normalize_thresholds(threshold_prices)?;

    let step = Normal::new(0.0, params.daily_volatility())
        .map_err(|e| AnalysisError::InvalidParameter(format!("volatility: {}", e)))?;

    let started = Instant::now();
    let path_seeds: Vec<u64> = (0..params.path_count).map(|_| rng.next_u64()).collect();

    let terminal_prices: Vec<f64> = path_seeds
        .into_par_iter()
        .map(|seed| {
            let mut path_rng = StdRng::seed_from_u64(seed);
            simulate_path(params, &step, &mut path_rng)
        })
        .collect();

    let result = summarize(params, terminal_prices, &thresholds);

    tracing::debug!(
        "Simulated {} paths x {} days in {:?} (median price {:.2}, P(loss) {:.3})",
        params.path_count,
        params.horizon_days,
        started.elapsed(),
        result.median_price,
        result.probability_of_loss
    );

    Ok(result)
}

fn simulate_path(params: &SimulationParameters, step: &Normal<f64>, rng: &mut StdRng) -> f64 {
    let mut price = params.initial_price;
    for _ in 0..params.horizon_days {
        let daily_return = step.sample(rng);
        price = (price * (1.0 + daily_return)).max(params.floor_price);
    }
    price
}

/// Finite thresholds, ascending, duplicates removed.
fn normalize_thresholds(threshold_prices: &[f64]) -> AnalysisResult<Vec<f64>> {
    if let Some(bad) = threshold_prices.iter().find(|t| !t.is_finite()) {
        return Err(AnalysisError::InvalidParameter(format!(
            "threshold price must be finite, got {}",
            bad
        )));
    }
    let mut thresholds = stats::sorted_copy(threshold_prices);
    thresholds.dedup();
    Ok(thresholds)
}

fn summarize(
    params: &SimulationParameters,
    terminal_prices: Vec<f64>,
    thresholds: &[f64],
) -> SimulationResult {
    let n = terminal_prices.len() as f64;

    let returns: Vec<f64> = terminal_prices
        .iter()
        .map(|p| (p - params.initial_price) / params.initial_price)
        .collect();
    let portfolio_values: Vec<f64> = terminal_prices
        .iter()
        .map(|p| params.holdings * p)
        .collect();

    let sorted_prices = stats::sorted_copy(&terminal_prices);
    let sorted_values = stats::sorted_copy(&portfolio_values);

    let loss_count = returns.iter().filter(|r| **r < 0.0).count();
    let severe_loss_count = returns.iter().filter(|r| **r < -0.5).count();
    let negative_returns: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();

    let threshold_breaches = thresholds
        .iter()
        .map(|&threshold| ThresholdBreach {
            threshold,
            probability: stats::fraction_below(&sorted_prices, threshold),
        })
        .collect();

    SimulationResult {
        path_count: params.path_count,
        horizon_days: params.horizon_days,
        mean_price: stats::mean(&terminal_prices),
        median_price: stats::median(&sorted_prices),
        std_dev_price: stats::std_dev(&terminal_prices),
        price_percentile_5: stats::percentile(&sorted_prices, 5.0),
        price_percentile_95: stats::percentile(&sorted_prices, 95.0),
        mean_portfolio_value: stats::mean(&portfolio_values),
        median_portfolio_value: stats::median(&sorted_values),
        var_5: stats::percentile(&sorted_values, 5.0),
        var_1: stats::percentile(&sorted_values, 1.0),
        probability_of_loss: loss_count as f64 / n,
        probability_of_severe_loss: severe_loss_count as f64 / n,
        mean_return: stats::mean(&returns),
        downside_deviation: stats::std_dev(&negative_returns),
        threshold_breaches,
        price_distribution: stats::sample_distribution(&sorted_prices, DISTRIBUTION_POINTS),
        terminal_prices,
    }
}
