//! Scenario engine
//!
//! Computes what a swing trade exit plan would earn or lose for a given
//! position size:
//! - single sell: the whole position exits at TP
//! - gradual sell: every stage reaches its TP
//! - partial exit: the first N stages reach TP, the rest is stopped out
//! - price series: tick-by-tick walk, see [`crate::walker`]
//!
//! Fees are charged on the gross proceeds of each sale only. Cost basis for
//! staged scenarios is allocated by share of the original position.

use tracing::{debug, warn};

use crate::config::{GradualStage, StrategyConfig, STAGE_SUM_TOLERANCE};
use crate::types::{LotResult, PriceSeriesReport, SimulationError, SimulationResult};
use crate::walker;

/// Stop-loss losses at or below this magnitude leave risk/reward unreported
const NEGLIGIBLE_LOSS: f64 = 1e-9;

/// Remainders up to this fraction of the position are float residue
const REMAINDER_TOLERANCE: f64 = 0.001;

/// Swing trade scenario simulator
#[derive(Debug, Clone)]
pub struct StrategySimulator {
    config: StrategyConfig,
    quantity: f64,
    total_cost: f64,
}

impl StrategySimulator {
    /// Create a simulator for `quantity` units bought at the configured entry.
    ///
    /// Fails fast on configurations that would produce NaN or infinite
    /// figures (non-positive entry price or quantity).
    pub fn new(config: StrategyConfig, quantity: f64) -> Result<Self, SimulationError> {
        config.validate()?;

        if !quantity.is_finite() || quantity <= 0.0 {
            return Err(SimulationError::InvalidConfig(format!(
                "quantity must be positive, got {}",
                quantity
            )));
        }

        if config.has_stages() && (config.allocated_percent() - 100.0).abs() > STAGE_SUM_TOLERANCE
        {
            warn!(
                "Gradual stages allocate {:.2}% of the position; results will not cover 100%",
                config.allocated_percent()
            );
        }

        let total_cost = config.entry_price * quantity;
        debug!(
            "Simulator ready: entry={} qty={} total_cost={}",
            config.entry_price, quantity, total_cost
        );

        Ok(StrategySimulator {
            config,
            quantity,
            total_cost,
        })
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    pub fn total_cost(&self) -> f64 {
        self.total_cost
    }

    /// Price at `percent` above entry
    pub fn tp_price(&self, percent: f64) -> f64 {
        self.config.entry_price * (1.0 + percent / 100.0)
    }

    /// Stop-loss trigger price
    pub fn sl_price(&self) -> f64 {
        self.config.entry_price * (1.0 - self.config.sl_percent / 100.0)
    }

    /// Sell 100% of the position at TP
    pub fn simulate_single_sell(&self) -> SimulationResult {
        let c = &self.config;
        let mut result = self.empty_result("Single Sell");

        let lot = self.sell_slice(
            0,
            100.0,
            c.tp_percent,
            self.quantity,
            self.total_cost,
            self.tp_price(c.tp_percent),
        );
        result.push_lot(lot);
        result.total_net_return_pct = self.return_pct(result.total_net_profit);

        let sl_loss = self.attach_stop_loss(&mut result);
        result.risk_reward_ratio = risk_reward(result.total_net_profit, sl_loss);

        result
    }

    /// Every gradual stage sells its share at its own TP
    pub fn simulate_gradual_sell(&self) -> SimulationResult {
        let mut result = self.empty_result("Gradual Sell");

        if !self.config.has_stages() {
            return result;
        }

        for (i, stage) in self.config.gradual_stages.iter().enumerate() {
            result.push_lot(self.stage_lot(i, stage));
        }
        result.total_net_return_pct = self.return_pct(result.total_net_profit);

        let sl_loss = self.attach_stop_loss(&mut result);
        result.risk_reward_ratio = risk_reward(result.total_net_profit, sl_loss);

        result
    }

    /// The first `stages_hit` stages reach TP; whatever they leave unsold
    /// is closed at the stop-loss price.
    pub fn simulate_partial_exit(&self, stages_hit: usize) -> SimulationResult {
        let c = &self.config;

        if !c.has_stages() {
            return self.empty_result(format!("Partial ({} stages)", stages_hit));
        }

        let mut result = self.empty_result(format!(
            "Partial: {} stage(s) TP + SL on remainder",
            stages_hit
        ));

        let executed = stages_hit.min(c.gradual_stages.len());
        let mut sold_pct = 0.0;

        for (i, stage) in c.gradual_stages.iter().take(executed).enumerate() {
            result.push_lot(self.stage_lot(i, stage));
            sold_pct += stage.sell_percent;
        }

        let remaining_pct = (100.0 - sold_pct) / 100.0;
        if remaining_pct > REMAINDER_TOLERANCE {
            let lot = self.sell_slice(
                executed,
                remaining_pct * 100.0,
                -c.sl_percent,
                self.quantity * remaining_pct,
                self.total_cost * remaining_pct,
                self.sl_price(),
            );
            result.push_lot(lot);
        }

        result.total_net_return_pct = self.return_pct(result.total_net_profit);
        self.attach_stop_loss(&mut result);

        result
    }

    /// Walk a price series tick by tick, see [`crate::walker::walk`]
    pub fn simulate_price_series(
        &self,
        prices: &[f64],
    ) -> Result<PriceSeriesReport, SimulationError> {
        walker::walk(&self.config, self.quantity, prices)
    }

    fn empty_result(&self, scenario: impl Into<String>) -> SimulationResult {
        SimulationResult::empty(scenario, &self.config, self.quantity, self.total_cost)
    }

    fn stage_lot(&self, index: usize, stage: &GradualStage) -> LotResult {
        let share = stage.sell_percent / 100.0;
        self.sell_slice(
            index,
            stage.sell_percent,
            stage.tp_percent,
            self.quantity * share,
            self.total_cost * share,
            self.tp_price(stage.tp_percent),
        )
    }

    fn sell_slice(
        &self,
        lot_index: usize,
        sell_percent: f64,
        tp_percent: f64,
        quantity: f64,
        cost: f64,
        sell_price: f64,
    ) -> LotResult {
        let gross_value = quantity * sell_price;
        let gross_profit = gross_value - cost;
        let fee = gross_value * (self.config.fee_percent / 100.0);
        let net_profit = gross_profit - fee;

        // A zero-percent stage has no cost basis to measure a return against
        let net_return_pct = if cost > 0.0 {
            (net_profit / cost) * 100.0
        } else {
            0.0
        };

        LotResult {
            lot_index,
            sell_percent,
            tp_percent,
            quantity,
            sell_price,
            gross_value,
            cost,
            gross_profit,
            fee,
            net_profit,
            net_return_pct,
        }
    }

    /// Net loss and return if the full position hits the stop-loss
    fn full_stop_loss(&self) -> (f64, f64) {
        let sl_value = self.quantity * self.sl_price();
        let sl_loss_gross = sl_value - self.total_cost;
        let sl_fee = sl_value * (self.config.fee_percent / 100.0);
        let sl_loss = sl_loss_gross - sl_fee;
        (sl_loss, self.return_pct(sl_loss))
    }

    fn attach_stop_loss(&self, result: &mut SimulationResult) -> f64 {
        let (sl_loss, sl_return_pct) = self.full_stop_loss();
        result.sl_loss = Some(sl_loss);
        result.sl_return_pct = Some(sl_return_pct);
        sl_loss
    }

    fn return_pct(&self, net_profit: f64) -> f64 {
        (net_profit / self.total_cost) * 100.0
    }
}

fn risk_reward(net_profit: f64, sl_loss: f64) -> f64 {
    if sl_loss.abs() > NEGLIGIBLE_LOSS {
        (net_profit / sl_loss).abs()
    } else {
        0.0
    }
}
