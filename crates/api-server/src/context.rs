//! Renders ranking and risk results as a plain-text context block for an
//! LLM prompt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use treasury_core::{RankingResult, SimulationResult, Subject};

use crate::treasuries::TreasuryProfile;

pub const SATS_PER_BTC: f64 = 100_000_000.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub btc_price: f64,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub dominance: Option<f64>,
    #[serde(default)]
    pub fear_greed_index: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    pub btc_per_share: f64,
    pub btc_per_share_sats: f64,
    pub total_btc_value: f64,
}

impl DerivedMetrics {
    pub fn compute(subject: &Subject, btc_price: f64) -> Self {
        let btc_per_share = subject.per_unit_metric();
        Self {
            btc_per_share,
            btc_per_share_sats: btc_per_share * SATS_PER_BTC,
            total_btc_value: subject.holdings * btc_price,
        }
    }
}

pub struct ContextInput<'a> {
    pub as_of: DateTime<Utc>,
    pub market: &'a MarketSnapshot,
    pub subject: &'a Subject,
    pub ranking: &'a RankingResult,
    pub simulation: Option<&'a SimulationResult>,
    pub profiles: &'a [TreasuryProfile],
}

pub fn render_context(input: &ContextInput<'_>) -> String {
    let mut out = String::new();
    let market = input.market;
    let subject = input.subject;
    let derived = DerivedMetrics::compute(subject, market.btc_price);

    out.push_str(&format!(
        "LIVE MARKET DATA (as of {}):\n",
        input.as_of.format("%Y-%m-%d %H:%M UTC")
    ));
    out.push_str(&format!("- Bitcoin Price: ${}\n", format_thousands(market.btc_price, 2)));
    if let Some(cap) = market.market_cap {
        out.push_str(&format!("- Bitcoin Market Cap: ${}\n", format_thousands(cap, 0)));
    }
    if let Some(dominance) = market.dominance {
        out.push_str(&format!("- Bitcoin Dominance: {:.1}%\n", dominance));
    }
    if let Some(fg) = market.fear_greed_index {
        out.push_str(&format!("- Fear & Greed Index: {}/100\n", fg));
    }

    out.push_str(&format!("\n{} CURRENT METRICS:\n", subject.name));
    out.push_str(&format!("- BTC Holdings: {:.8} BTC\n", subject.holdings));
    out.push_str(&format!(
        "- BTC per Share: {:.8} BTC ({:.0} sats)\n",
        derived.btc_per_share, derived.btc_per_share_sats
    ));
    out.push_str(&format!(
        "- Total BTC Value: ${}\n",
        format_thousands(derived.total_btc_value, 2)
    ));
    out.push_str(&format!(
        "- Shares Outstanding: {}\n",
        format_thousands(subject.unit_count, 0)
    ));

    out.push_str("\nBITCOIN TREASURY RANKINGS (by BTC per share):\n");
    for entry in &input.ranking.standings {
        if entry.is_subject {
            out.push_str(&format!(
                "{}. {}: {:.1} BTC ({:.8} BTC/share) <- {}\n",
                entry.rank, entry.name, subject.holdings, entry.per_unit_metric, subject.name
            ));
            continue;
        }
        let profile = input.profiles.iter().find(|p| p.company == entry.name);
        let holdings = profile
            .map(|p| format!("{} BTC ", format_thousands(p.btc_holdings, 0)))
            .unwrap_or_default();
        let premium = profile
            .and_then(|p| p.premium_discount)
            .map(format_premium)
            .unwrap_or_default();
        out.push_str(&format!(
            "{}. {}: {}({:.8} BTC/share{})\n",
            entry.rank, entry.name, holdings, entry.per_unit_metric, premium
        ));
    }
    out.push_str(&format!(
        "{} ranks #{} of {} by BTC per share. Leader: {}.\n",
        subject.name, input.ranking.subject_rank, input.ranking.total_entities, input.ranking.leader_name
    ));

    if let Some(sim) = input.simulation {
        out.push_str(&format!(
            "\nRISK SIMULATION ({} paths, {} days):\n",
            format_thousands(sim.path_count as f64, 0),
            sim.horizon_days
        ));
        out.push_str(&format!(
            "- Median BTC price: ${}\n",
            format_thousands(sim.median_price, 2)
        ));
        out.push_str(&format!(
            "- 5th-95th percentile price: ${} - ${}\n",
            format_thousands(sim.price_percentile_5, 2),
            format_thousands(sim.price_percentile_95, 2)
        ));
        out.push_str(&format!(
            "- Median holdings value: ${}\n",
            format_thousands(sim.median_portfolio_value, 2)
        ));
        out.push_str(&format!(
            "- VaR 5%: ${} | VaR 1%: ${}\n",
            format_thousands(sim.var_5, 2),
            format_thousands(sim.var_1, 2)
        ));
        out.push_str(&format!(
            "- Probability of loss: {:.1}%\n",
            sim.probability_of_loss * 100.0
        ));
        out.push_str(&format!(
            "- Probability of 50%+ loss: {:.1}%\n",
            sim.probability_of_severe_loss * 100.0
        ));
        for breach in &sim.threshold_breaches {
            out.push_str(&format!(
                "- Probability BTC < ${}: {:.1}%\n",
                format_thousands(breach.threshold, 0),
                breach.probability * 100.0
            ));
        }
    }

    out
}

fn format_premium(premium: f64) -> String {
    if premium < 0.0 {
        format!(", {:.1}% discount", premium)
    } else {
        format!(", +{:.1}% premium", premium)
    }
}

/// `1234567.891` with 2 decimals -> `1,234,567.89`.
pub fn format_thousands(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let negative = value < 0.0 && formatted.chars().any(|c| c.is_ascii_digit() && c != '0');
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}
