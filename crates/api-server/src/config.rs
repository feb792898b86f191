use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use treasury_core::{DEFAULT_FLOOR_PRICE, DEFAULT_HORIZON_DAYS, DEFAULT_PATH_COUNT, DEFAULT_SUBJECT_NAME};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    // Network
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,

    // Ranking
    pub subject_name: String,
    pub comparison_table_path: Option<PathBuf>,

    // Simulation defaults
    pub simulation_paths: usize,
    pub simulation_horizon_days: u32,
    pub annual_volatility: f64,       // 0.8 = 80%
    pub floor_price: f64,
    pub max_simulation_steps: u64,    // paths x days per request
    pub simulation_seed: Option<u64>, // fixed seed for reproducible responses
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: vec!["http://localhost:3000".to_string()],
            subject_name: DEFAULT_SUBJECT_NAME.to_string(),
            comparison_table_path: None,
            simulation_paths: DEFAULT_PATH_COUNT,
            simulation_horizon_days: DEFAULT_HORIZON_DAYS,
            annual_volatility: 0.8,
            floor_price: DEFAULT_FLOOR_PRICE,
            max_simulation_steps: 5_000_000,
            simulation_seed: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        let config = Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a port number")?,
            cors_origins: parse_list(
                &env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:3000".to_string()),
            ),

            subject_name: env::var("SUBJECT_NAME")
                .unwrap_or_else(|_| DEFAULT_SUBJECT_NAME.to_string()),
            comparison_table_path: env::var("COMPARISON_TABLE_PATH").ok().map(PathBuf::from),

            simulation_paths: env::var("SIMULATION_PATHS")
                .unwrap_or_else(|_| DEFAULT_PATH_COUNT.to_string())
                .parse()
                .context("SIMULATION_PATHS must be an integer")?,
            simulation_horizon_days: env::var("SIMULATION_HORIZON_DAYS")
                .unwrap_or_else(|_| DEFAULT_HORIZON_DAYS.to_string())
                .parse()
                .context("SIMULATION_HORIZON_DAYS must be an integer")?,
            annual_volatility: env::var("ANNUAL_VOLATILITY")
                .unwrap_or_else(|_| "0.8".to_string())
                .parse()
                .context("ANNUAL_VOLATILITY must be a number")?,
            floor_price: env::var("SIMULATION_FLOOR_PRICE")
                .unwrap_or_else(|_| DEFAULT_FLOOR_PRICE.to_string())
                .parse()
                .context("SIMULATION_FLOOR_PRICE must be a number")?,
            max_simulation_steps: env::var("MAX_SIMULATION_STEPS")
                .unwrap_or_else(|_| "5000000".to_string())
                .parse()
                .context("MAX_SIMULATION_STEPS must be an integer")?,
            simulation_seed: env::var("SIMULATION_SEED")
                .ok()
                .map(|s| s.parse())
                .transpose()
                .context("SIMULATION_SEED must be an unsigned integer")?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.subject_name.trim().is_empty() {
            bail!("SUBJECT_NAME must not be empty");
        }
        if self.simulation_paths == 0 {
            bail!("SIMULATION_PATHS must be at least 1");
        }
        if self.simulation_horizon_days == 0 {
            bail!("SIMULATION_HORIZON_DAYS must be at least 1");
        }
        if !(self.annual_volatility.is_finite() && self.annual_volatility > 0.0) {
            bail!("ANNUAL_VOLATILITY must be positive");
        }
        if !(self.floor_price.is_finite() && self.floor_price >= 0.0) {
            bail!("SIMULATION_FLOOR_PRICE must be non-negative");
        }
        if self.max_simulation_steps == 0 {
            bail!("MAX_SIMULATION_STEPS must be at least 1");
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
