//! Configuration management
//!
//! Describes a swing trade exit plan (entry, take-profit, stop-loss, fee and
//! the optional gradual exit schedule) and loads simulation runs from JSON
//! configuration files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::SimulationError;

/// Allowed deviation from 100% when checking a stage list
pub const STAGE_SUM_TOLERANCE: f64 = 0.1;

/// Spacing between auto-assigned stage TP thresholds, in percent
pub const STAGE_TP_STEP: f64 = 5.0;

/// Exchange id used in payloads when neither flag, config nor env sets one
pub const DEFAULT_EXCHANGE_ID: &str = "your_exchange_id";

/// One lot of a gradual exit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradualStage {
    /// Percent of the *original* position sold at this stage (e.g. 30.0)
    pub sell_percent: f64,
    /// Gain over entry, in percent, that triggers this stage (e.g. 10.0)
    pub tp_percent: f64,
}

impl GradualStage {
    pub fn new(sell_percent: f64, tp_percent: f64) -> Self {
        Self {
            sell_percent,
            tp_percent,
        }
    }
}

/// Swing trade exit plan
///
/// All percentages are plain numbers: `10.0` means 10%. `sl_percent` is the
/// magnitude of the drop (5.0 triggers at -5%). The fee is charged on the
/// gross proceeds of each sale, never on the purchase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Trading pair, e.g. "SOL/USDT"
    pub token: String,
    pub exchange: String,
    /// Unit purchase price in quote currency
    pub entry_price: f64,
    pub tp_percent: f64,
    pub sl_percent: f64,
    pub fee_percent: f64,
    pub gradual_enabled: bool,
    pub gradual_stages: Vec<GradualStage>,
    /// Monitoring interval of the live strategy, in minutes
    pub check_interval_min: u32,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig {
            token: "SOL/USDT".to_string(),
            exchange: "OKX".to_string(),
            entry_price: 36.0,
            tp_percent: 10.0,
            sl_percent: 5.0,
            fee_percent: 0.5,
            gradual_enabled: false,
            gradual_stages: Vec::new(),
            check_interval_min: 15,
        }
    }
}

impl StrategyConfig {
    /// Enable gradual mode with the given stages
    pub fn with_gradual_stages(mut self, stages: Vec<GradualStage>) -> Self {
        self.gradual_enabled = true;
        self.gradual_stages = stages;
        self
    }

    pub fn has_stages(&self) -> bool {
        !self.gradual_stages.is_empty()
    }

    /// Gradual mode is active only when enabled and at least one stage exists
    pub fn is_gradual(&self) -> bool {
        self.gradual_enabled && self.has_stages()
    }

    /// Sum of stage sell percentages
    pub fn allocated_percent(&self) -> f64 {
        self.gradual_stages.iter().map(|s| s.sell_percent).sum()
    }

    /// Base asset of the trading pair ("SOL" for "SOL/USDT")
    pub fn base_asset(&self) -> &str {
        self.token.split('/').next().unwrap_or(&self.token)
    }

    /// Reject configurations that would make cost or return figures
    /// divide by zero or turn into NaN.
    pub fn validate(&self) -> Result<(), SimulationError> {
        if !self.entry_price.is_finite() || self.entry_price <= 0.0 {
            return Err(SimulationError::InvalidConfig(format!(
                "entry price must be positive, got {}",
                self.entry_price
            )));
        }

        for (name, value) in [
            ("tp_percent", self.tp_percent),
            ("sl_percent", self.sl_percent),
            ("fee_percent", self.fee_percent),
        ] {
            if !value.is_finite() {
                return Err(SimulationError::InvalidConfig(format!(
                    "{} must be a finite number, got {}",
                    name, value
                )));
            }
        }

        for (i, stage) in self.gradual_stages.iter().enumerate() {
            if !stage.sell_percent.is_finite() || stage.sell_percent < 0.0 {
                return Err(SimulationError::InvalidConfig(format!(
                    "stage {} sell percent must be a non-negative number, got {}",
                    i + 1,
                    stage.sell_percent
                )));
            }
            if !stage.tp_percent.is_finite() {
                return Err(SimulationError::InvalidConfig(format!(
                    "stage {} tp percent must be a finite number, got {}",
                    i + 1,
                    stage.tp_percent
                )));
            }
        }

        Ok(())
    }

    /// Check that the stages liquidate the whole position.
    ///
    /// The engine itself accepts under- and over-allocated stage lists; this
    /// check is for the layers that build a configuration from user input.
    pub fn validate_stage_allocation(&self) -> Result<(), SimulationError> {
        let sell_percents: Vec<f64> = self.gradual_stages.iter().map(|s| s.sell_percent).collect();
        check_stage_sum(&sell_percents)
    }
}

/// Check that sell percentages sum to 100 within [`STAGE_SUM_TOLERANCE`]
pub fn check_stage_sum(sell_percents: &[f64]) -> Result<(), SimulationError> {
    let total: f64 = sell_percents.iter().sum();
    if (total - 100.0).abs() > STAGE_SUM_TOLERANCE {
        return Err(SimulationError::StageAllocation { total });
    }
    Ok(())
}

/// Parse a comma-separated list of percentages, e.g. "30,30,20,20"
pub fn parse_percent_list(input: &str) -> Result<Vec<f64>> {
    input
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<f64>()
                .with_context(|| format!("Invalid percentage: '{}'", part))
        })
        .collect()
}

/// Build stages from sell percentages, assigning TP thresholds
/// `base_tp + STAGE_TP_STEP * index`
pub fn stages_from_sell_percents(sell_percents: &[f64], base_tp: f64) -> Vec<GradualStage> {
    sell_percents
        .iter()
        .enumerate()
        .map(|(i, &pct)| GradualStage::new(pct, base_tp + STAGE_TP_STEP * i as f64))
        .collect()
}

/// Replace stage TP thresholds position by position.
/// Extra thresholds are ignored; stages without one keep theirs.
pub fn apply_tp_overrides(stages: &mut [GradualStage], tps: &[f64]) {
    for (stage, &tp) in stages.iter_mut().zip(tps) {
        stage.tp_percent = tp;
    }
}

/// A complete simulation run: the plan plus the position size to scale it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub strategy: StrategyConfig,
    /// Units of the traded asset held (simulation input, not part of the plan)
    pub quantity: f64,
    /// Exchange id for the strategy payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange_id: Option<String>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let strategy = StrategyConfig::default().with_gradual_stages(vec![
            GradualStage::new(30.0, 10.0),
            GradualStage::new(30.0, 15.0),
            GradualStage::new(20.0, 20.0),
            GradualStage::new(20.0, 25.0),
        ]);

        SimulationConfig {
            strategy,
            quantity: 0.44,
            exchange_id: None,
        }
    }
}

impl SimulationConfig {
    /// Load configuration from JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("Failed to read config file")?;
        let config: SimulationConfig =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;
        Ok(config)
    }

    /// Exchange id for the payload: explicit value, then `EXCHANGE_ID` from
    /// the environment, then a placeholder.
    pub fn resolve_exchange_id(&self) -> String {
        self.exchange_id
            .clone()
            .or_else(|| std::env::var("EXCHANGE_ID").ok())
            .unwrap_or_else(|| DEFAULT_EXCHANGE_ID.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_percent_list() {
        let parts = parse_percent_list("30, 30,20 ,20").unwrap();
        assert_eq!(parts, vec![30.0, 30.0, 20.0, 20.0]);

        assert!(parse_percent_list("").unwrap().is_empty());
        assert!(parse_percent_list("30,abc").is_err());
    }

    #[test]
    fn test_auto_assigned_stage_tps() {
        let stages = stages_from_sell_percents(&[30.0, 30.0, 20.0, 20.0], 10.0);
        let tps: Vec<f64> = stages.iter().map(|s| s.tp_percent).collect();
        assert_eq!(tps, vec![10.0, 15.0, 20.0, 25.0]);
    }

    #[test]
    fn test_tp_overrides_are_positional() {
        let mut stages = stages_from_sell_percents(&[50.0, 30.0, 20.0], 10.0);
        apply_tp_overrides(&mut stages, &[8.0, 12.0]);
        assert_eq!(stages[0].tp_percent, 8.0);
        assert_eq!(stages[1].tp_percent, 12.0);
        assert_eq!(stages[2].tp_percent, 20.0);

        apply_tp_overrides(&mut stages, &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(stages.len(), 3);
    }

    #[test]
    fn test_stage_sum_tolerance() {
        assert!(check_stage_sum(&[30.0, 30.0, 20.0, 20.0]).is_ok());
        assert!(check_stage_sum(&[33.33, 33.33, 33.33]).is_ok());
        assert_eq!(
            check_stage_sum(&[30.0, 30.0]),
            Err(SimulationError::StageAllocation { total: 60.0 })
        );
    }

    #[test]
    fn test_validate_rejects_degenerate_entry() {
        let config = StrategyConfig {
            entry_price: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SimulationError::InvalidConfig(_))
        ));

        let config = StrategyConfig {
            entry_price: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_tolerates_under_allocation() {
        let config = StrategyConfig::default()
            .with_gradual_stages(vec![GradualStage::new(40.0, 10.0)]);
        assert!(config.validate().is_ok());
        assert!(config.validate_stage_allocation().is_err());
    }

    #[test]
    fn test_gradual_requires_stages() {
        let mut config = StrategyConfig::default();
        config.gradual_enabled = true;
        assert!(!config.is_gradual());

        let config = SimulationConfig::default().strategy;
        assert!(config.is_gradual());
        assert_eq!(config.allocated_percent(), 100.0);
        assert_eq!(config.base_asset(), "SOL");
    }

    #[test]
    fn test_config_json_defaults() {
        let json = r#"{
            "strategy": { "token": "ETH/USDT", "entry_price": 2000.0 },
            "quantity": 1.5
        }"#;
        let config: SimulationConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.strategy.token, "ETH/USDT");
        assert_eq!(config.strategy.tp_percent, 10.0);
        assert_eq!(config.strategy.check_interval_min, 15);
        assert!(!config.strategy.gradual_enabled);
        assert_eq!(config.exchange_id, None);
    }

    #[test]
    fn test_explicit_exchange_id_wins() {
        let config = SimulationConfig {
            exchange_id: Some("abc123".to_string()),
            ..Default::default()
        };
        assert_eq!(config.resolve_exchange_id(), "abc123");
    }
}
