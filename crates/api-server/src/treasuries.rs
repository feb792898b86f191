//! Comparison-table provider: public companies and funds holding bitcoin.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use treasury_core::{AnalysisResult, ComparisonEntity};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreasuryProfile {
    pub company: String,
    pub symbol: String,
    pub btc_holdings: f64,
    pub btc_per_share: f64,
    /// Premium (+) or discount (-) to net asset value, in percent.
    #[serde(default)]
    pub premium_discount: Option<f64>,
}

impl TreasuryProfile {
    fn new(company: &str, symbol: &str, btc_holdings: f64, btc_per_share: f64, premium: f64) -> Self {
        Self {
            company: company.to_string(),
            symbol: symbol.to_string(),
            btc_holdings,
            btc_per_share,
            premium_discount: Some(premium),
        }
    }

    pub fn to_entity(&self) -> AnalysisResult<ComparisonEntity> {
        ComparisonEntity::new(self.company.clone(), self.btc_per_share)
    }
}

pub fn comparison_entities(profiles: &[TreasuryProfile]) -> AnalysisResult<Vec<ComparisonEntity>> {
    profiles.iter().map(TreasuryProfile::to_entity).collect()
}

/// Snapshot of the largest corporate holders (July 2025), used when no table
/// file is configured.
pub fn fallback_table() -> Vec<TreasuryProfile> {
    vec![
        TreasuryProfile::new("MicroStrategy (Strategy)", "MSTR", 607_770.0, 0.0049, 196.0),
        TreasuryProfile::new("BlackRock IBIT ETF", "IBIT", 714_094.0, 0.0001, 0.1),
        TreasuryProfile::new("MARA Holdings", "MARA", 49_940.0, 0.000142, 45.3),
        TreasuryProfile::new("Riot Platforms", "RIOT", 19_273.0, 0.000054, 32.1),
        TreasuryProfile::new("CleanSpark", "CLSK", 12_608.0, 0.000045, 44.8),
        TreasuryProfile::new("Hut 8 Corp", "HUT", 10_264.0, 0.000099, 53.0),
        TreasuryProfile::new("Tesla", "TSLA", 9_720.0, 0.000032, -12.5),
        TreasuryProfile::new("Coinbase", "COIN", 9_181.0, 0.000314, 5.2),
    ]
}

/// Load the comparison table from a JSON array of profiles, or fall back to
/// the built-in snapshot when `path` is `None`.
pub fn load_comparison_table(path: Option<&Path>) -> Result<Vec<TreasuryProfile>> {
    let Some(path) = path else {
        tracing::info!("No COMPARISON_TABLE_PATH set, using built-in treasury table");
        return Ok(fallback_table());
    };

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read comparison table {}", path.display()))?;
    let profiles: Vec<TreasuryProfile> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse comparison table {}", path.display()))?;

    // Every profile must convert to a valid entity.
    comparison_entities(&profiles)
        .with_context(|| format!("Invalid comparison table {}", path.display()))?;

    tracing::info!(
        "Loaded {} treasury profiles from {}",
        profiles.len(),
        path.display()
    );
    Ok(profiles)
}
