//! Strategy payload adapter
//!
//! Translates an exit plan into the trading service's "create strategy"
//! request. Field names and nesting are the service's wire contract.

use serde::{Deserialize, Serialize};

use crate::StrategyConfig;

pub const STRATEGY_TYPE: &str = "swing_trade";
pub const MODE_SPOT: &str = "spot";

/// Request body for `POST /strategies`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateStrategyRequest {
    pub name: String,
    pub strategy_type: String,
    pub symbol: String,
    pub exchange_id: String,
    pub exchange_name: String,
    pub check_interval_secs: i64,
    pub config: StrategyPayloadConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyPayloadConfig {
    pub fee_percent: f64,
    pub stop_loss: StopLossConfig,
    pub mode: String,
    /// Present only in gradual mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gradual_sell: Option<GradualSellConfig>,
    /// Present only without gradual mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take_profit_levels: Option<Vec<TakeProfitLevel>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopLossConfig {
    pub enabled: bool,
    pub percent: f64,
    pub trailing: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradualSellConfig {
    pub enabled: bool,
    pub lots: Vec<GradualLot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradualLot {
    pub sell_percent: f64,
    pub tp_percent: f64,
    pub executed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TakeProfitLevel {
    pub percent: f64,
    pub sell_percent: f64,
    pub executed: bool,
}

impl CreateStrategyRequest {
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Build the strategy-creation request for `config`
pub fn build_create_request(config: &StrategyConfig, exchange_id: &str) -> CreateStrategyRequest {
    let gradual = config.is_gradual();

    let (gradual_sell, take_profit_levels) = if gradual {
        let lots = config
            .gradual_stages
            .iter()
            .map(|stage| GradualLot {
                sell_percent: stage.sell_percent,
                tp_percent: stage.tp_percent,
                executed: false,
            })
            .collect();
        (
            Some(GradualSellConfig {
                enabled: true,
                lots,
            }),
            None,
        )
    } else {
        let level = TakeProfitLevel {
            percent: config.tp_percent,
            sell_percent: 100.0,
            executed: false,
        };
        (None, Some(vec![level]))
    };

    CreateStrategyRequest {
        name: format!(
            "{} Swing {}",
            config.base_asset(),
            if gradual { "Gradual" } else { "Simple" }
        ),
        strategy_type: STRATEGY_TYPE.to_string(),
        symbol: config.token.clone(),
        exchange_id: exchange_id.to_string(),
        exchange_name: config.exchange.clone(),
        check_interval_secs: i64::from(config.check_interval_min) * 60,
        config: StrategyPayloadConfig {
            fee_percent: config.fee_percent,
            stop_loss: StopLossConfig {
                enabled: true,
                percent: config.sl_percent,
                trailing: false,
            },
            mode: MODE_SPOT.to_string(),
            gradual_sell,
            take_profit_levels,
        },
    }
}
