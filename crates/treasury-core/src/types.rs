use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisResult};

/// Identifier reported for the subject when the caller does not name it.
pub const DEFAULT_SUBJECT_NAME: &str = "SUBJECT";

/// Minimum simulated price; keeps the random walk strictly positive.
pub const DEFAULT_FLOOR_PRICE: f64 = 0.01;

pub const DEFAULT_HORIZON_DAYS: u32 = 365;
pub const DEFAULT_PATH_COUNT: usize = 10_000;

fn default_subject_name() -> String {
    DEFAULT_SUBJECT_NAME.to_string()
}

fn default_floor_price() -> f64 {
    DEFAULT_FLOOR_PRICE
}

fn default_horizon_days() -> u32 {
    DEFAULT_HORIZON_DAYS
}

fn default_path_count() -> usize {
    DEFAULT_PATH_COUNT
}

/// A peer in the comparison table, e.g. another public company's
/// holdings-per-share.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonEntity {
    pub name: String,
    pub per_unit_metric: f64,
}

impl ComparisonEntity {
    pub fn new(name: impl Into<String>, per_unit_metric: f64) -> AnalysisResult<Self> {
        let entity = Self {
            name: name.into(),
            per_unit_metric,
        };
        entity.validate()?;
        Ok(entity)
    }

    pub fn validate(&self) -> AnalysisResult<()> {
        if self.name.trim().is_empty() {
            return Err(AnalysisError::InvalidInput(
                "comparison entity name must not be empty".to_string(),
            ));
        }
        if !self.per_unit_metric.is_finite() || self.per_unit_metric < 0.0 {
            return Err(AnalysisError::InvalidInput(format!(
                "comparison entity '{}' has no valid metric ({})",
                self.name, self.per_unit_metric
            )));
        }
        Ok(())
    }
}

/// The entity being ranked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    #[serde(default = "default_subject_name")]
    pub name: String,
    pub holdings: f64,
    pub unit_count: f64,
}

impl Subject {
    pub fn new(holdings: f64, unit_count: f64) -> AnalysisResult<Self> {
        Self::named(DEFAULT_SUBJECT_NAME, holdings, unit_count)
    }

    pub fn named(name: impl Into<String>, holdings: f64, unit_count: f64) -> AnalysisResult<Self> {
        let subject = Self {
            name: name.into(),
            holdings,
            unit_count,
        };
        subject.validate()?;
        Ok(subject)
    }

    pub fn validate(&self) -> AnalysisResult<()> {
        if self.name.trim().is_empty() {
            return Err(AnalysisError::InvalidInput(
                "subject name must not be empty".to_string(),
            ));
        }
        if !self.holdings.is_finite() || self.holdings < 0.0 {
            return Err(AnalysisError::InvalidInput(format!(
                "subject holdings must be a non-negative number, got {}",
                self.holdings
            )));
        }
        if !self.unit_count.is_finite() || self.unit_count < 0.0 {
            return Err(AnalysisError::InvalidInput(format!(
                "subject unit count must be a non-negative number, got {}",
                self.unit_count
            )));
        }
        Ok(())
    }

    /// Holdings per unit. A zero unit count yields 0 instead of dividing by zero.
    pub fn per_unit_metric(&self) -> f64 {
        if self.unit_count == 0.0 {
            0.0
        } else {
            self.holdings / self.unit_count
        }
    }
}

/// One row of the sorted standings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntity {
    pub rank: usize,
    pub name: String,
    pub per_unit_metric: f64,
    pub is_subject: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingResult {
    /// 1-based position of the subject (1 = highest metric).
    pub subject_rank: usize,
    pub total_entities: usize,
    pub subject_metric: f64,
    pub leader_name: String,
    pub standings: Vec<RankedEntity>,
}

impl RankingResult {
    pub fn subject_leads(&self) -> bool {
        self.subject_rank == 1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationParameters {
    pub initial_price: f64,
    pub holdings: f64,
    /// Annualized volatility as a fraction (0.8 = 80%).
    pub annual_volatility: f64,
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,
    #[serde(default = "default_path_count")]
    pub path_count: usize,
    #[serde(default = "default_floor_price")]
    pub floor_price: f64,
}

impl SimulationParameters {
    pub fn new(initial_price: f64, holdings: f64, annual_volatility: f64) -> AnalysisResult<Self> {
        let params = Self {
            initial_price,
            holdings,
            annual_volatility,
            horizon_days: DEFAULT_HORIZON_DAYS,
            path_count: DEFAULT_PATH_COUNT,
            floor_price: DEFAULT_FLOOR_PRICE,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn with_horizon_days(mut self, horizon_days: u32) -> Self {
        self.horizon_days = horizon_days;
        self
    }

    pub fn with_path_count(mut self, path_count: usize) -> Self {
        self.path_count = path_count;
        self
    }

    pub fn with_floor_price(mut self, floor_price: f64) -> Self {
        self.floor_price = floor_price;
        self
    }

    pub fn validate(&self) -> AnalysisResult<()> {
        if self.path_count < 1 {
            return Err(AnalysisError::InvalidParameter(
                "path_count must be at least 1".to_string(),
            ));
        }
        if self.horizon_days < 1 {
            return Err(AnalysisError::InvalidParameter(
                "horizon_days must be at least 1".to_string(),
            ));
        }
        if !self.initial_price.is_finite() || self.initial_price <= 0.0 {
            return Err(AnalysisError::InvalidParameter(format!(
                "initial_price must be positive, got {}",
                self.initial_price
            )));
        }
        if !self.annual_volatility.is_finite() || self.annual_volatility <= 0.0 {
            return Err(AnalysisError::InvalidParameter(format!(
                "annual_volatility must be positive, got {}",
                self.annual_volatility
            )));
        }
        if !self.holdings.is_finite() || self.holdings < 0.0 {
            return Err(AnalysisError::InvalidParameter(format!(
                "holdings must be non-negative, got {}",
                self.holdings
            )));
        }
        if !self.floor_price.is_finite() || self.floor_price < 0.0 {
            return Err(AnalysisError::InvalidParameter(format!(
                "floor_price must be non-negative, got {}",
                self.floor_price
            )));
        }
        Ok(())
    }

    /// Per-day volatility on a 365-day calendar.
    pub fn daily_volatility(&self) -> f64 {
        self.annual_volatility / 365.0_f64.sqrt()
    }

    /// Number of random draws a simulation will make, `None` on overflow.
    pub fn total_steps(&self) -> Option<u64> {
        (self.path_count as u64).checked_mul(self.horizon_days as u64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdBreach {
    pub threshold: f64,
    /// Fraction of paths ending strictly below `threshold`.
    pub probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub path_count: usize,
    pub horizon_days: u32,

    pub mean_price: f64,
    pub median_price: f64,
    pub std_dev_price: f64,
    pub price_percentile_5: f64,
    pub price_percentile_95: f64,

    pub mean_portfolio_value: f64,
    pub median_portfolio_value: f64,
    /// 5th percentile of portfolio value.
    pub var_5: f64,
    /// 1st percentile of portfolio value.
    pub var_1: f64,

    pub probability_of_loss: f64,
    /// Fraction of paths losing more than half their value.
    pub probability_of_severe_loss: f64,
    pub mean_return: f64,
    pub downside_deviation: f64,

    pub threshold_breaches: Vec<ThresholdBreach>,

    /// Sorted sample of terminal prices for histograms (up to 200 points).
    pub price_distribution: Vec<f64>,

    /// Every simulated terminal price, in path order.
    #[serde(skip)]
    pub terminal_prices: Vec<f64>,
}

impl SimulationResult {
    pub fn breach_probability(&self, threshold: f64) -> Option<f64> {
        self.threshold_breaches
            .iter()
            .find(|b| b.threshold == threshold)
            .map(|b| b.probability)
    }
}
