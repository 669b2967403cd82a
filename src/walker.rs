//! Price-series walker
//!
//! Replays a finite price sequence against an exit plan, one tick at a time,
//! and records every sale the plan would have triggered.
//!
//! Per tick, in strict priority order:
//! 1. stop-loss: liquidates everything left and ends the walk
//! 2. gradual stages: the first pending stage whose threshold is met fires
//!    (at most one stage per tick, the others wait for later ticks)
//! 3. single take-profit (no stages configured): liquidates everything left
//!    and ends the walk
//!
//! The walk also ends once the remaining quantity is negligible.

use std::ops::ControlFlow;

use tracing::{debug, info};

use crate::config::{GradualStage, StrategyConfig};
use crate::types::{
    EventKind, Money, PriceEvent, PriceSeriesReport, SimulationError, WalkStatus, WalkSummary,
};

/// Quantities at or below this many units count as fully sold
pub const NEGLIGIBLE_QTY: f64 = 1e-4;

/// Mutable state of a single walk, owned by that walk only
#[derive(Debug)]
struct WalkState {
    remaining_qty: f64,
    executed: Vec<bool>,
    realized_pnl: Money,
    total_fees: Money,
    events: Vec<PriceEvent>,
}

impl WalkState {
    fn new(quantity: f64, stage_count: usize) -> Self {
        Self {
            remaining_qty: quantity,
            executed: vec![false; stage_count],
            realized_pnl: Money::ZERO,
            total_fees: Money::ZERO,
            events: Vec::new(),
        }
    }

    fn has_position(&self) -> bool {
        self.remaining_qty > NEGLIGIBLE_QTY
    }

    /// Add the sale to the running totals and the log.
    ///
    /// Fails instead of dropping amounts that do not fit a `Money` total.
    fn record(&mut self, event: PriceEvent) -> Result<(), SimulationError> {
        debug!(
            "Tick {} @ {:.4} ({:+.2}%): {} qty={:.8} net={:+.4}",
            event.tick, event.price, event.change_pct, event.kind, event.sell_qty, event.net_pnl
        );
        self.realized_pnl = accumulate(self.realized_pnl, event.tick, event.net_pnl)?;
        self.total_fees = accumulate(self.total_fees, event.tick, event.fee)?;
        self.events.push(event);
        Ok(())
    }
}

fn accumulate(total: Money, tick: usize, value: f64) -> Result<Money, SimulationError> {
    Money::try_from_f64(value)
        .and_then(|amount| total.checked_add(amount))
        .ok_or(SimulationError::AmountOutOfRange { tick, value })
}

/// Fixed inputs of a walk
struct Walker<'a> {
    config: &'a StrategyConfig,
    quantity: f64,
    total_cost: f64,
}

impl Walker<'_> {
    fn change_pct(&self, price: f64) -> f64 {
        (price - self.config.entry_price) / self.config.entry_price * 100.0
    }

    fn step(
        &self,
        state: &mut WalkState,
        tick: usize,
        price: f64,
    ) -> Result<ControlFlow<()>, SimulationError> {
        let c = self.config;
        let change_pct = self.change_pct(price);

        // Stop-loss pre-empts take-profit on the same tick
        if change_pct <= -c.sl_percent && state.has_position() {
            self.liquidate(state, tick, price, change_pct, EventKind::StopLoss)?;
            return Ok(ControlFlow::Break(()));
        }

        if c.has_stages() {
            let next = c
                .gradual_stages
                .iter()
                .zip(&state.executed)
                .position(|(stage, &done)| !done && change_pct >= stage.tp_percent);

            if let Some(index) = next {
                self.sell_stage(state, tick, price, change_pct, index, &c.gradual_stages[index])?;
            }
        } else if change_pct >= c.tp_percent && state.has_position() {
            self.liquidate(state, tick, price, change_pct, EventKind::TakeProfit)?;
            return Ok(ControlFlow::Break(()));
        }

        if state.has_position() {
            Ok(ControlFlow::Continue(()))
        } else {
            Ok(ControlFlow::Break(()))
        }
    }

    /// Sell everything left at `price`
    fn liquidate(
        &self,
        state: &mut WalkState,
        tick: usize,
        price: f64,
        change_pct: f64,
        kind: EventKind,
    ) -> Result<(), SimulationError> {
        let share = state.remaining_qty / self.quantity;
        let sell_qty = state.remaining_qty;
        let (gross_pnl, fee, net_pnl) = self.sale(sell_qty, self.total_cost * share, price);

        state.remaining_qty = 0.0;
        state.record(PriceEvent {
            tick,
            price,
            change_pct,
            kind,
            sell_qty,
            sell_pct: share * 100.0,
            tp_pct: None,
            gross_pnl,
            fee,
            net_pnl,
        })
    }

    /// Sell one stage's share of the original position at `price`
    fn sell_stage(
        &self,
        state: &mut WalkState,
        tick: usize,
        price: f64,
        change_pct: f64,
        index: usize,
        stage: &GradualStage,
    ) -> Result<(), SimulationError> {
        // Over-allocated stage lists cannot sell more than is left
        let share = (stage.sell_percent / 100.0)
            .min(state.remaining_qty / self.quantity)
            .max(0.0);
        let sell_qty = self.quantity * share;
        let (gross_pnl, fee, net_pnl) = self.sale(sell_qty, self.total_cost * share, price);

        state.executed[index] = true;
        state.remaining_qty = (state.remaining_qty - sell_qty).max(0.0);
        state.record(PriceEvent {
            tick,
            price,
            change_pct,
            kind: EventKind::TakeProfitLot(index + 1),
            sell_qty,
            sell_pct: share * 100.0,
            tp_pct: Some(stage.tp_percent),
            gross_pnl,
            fee,
            net_pnl,
        })
    }

    /// Gross P&L, fee and net P&L of selling `qty` with cost basis `cost`
    fn sale(&self, qty: f64, cost: f64, price: f64) -> (f64, f64, f64) {
        let value = qty * price;
        let gross = value - cost;
        let fee = value * (self.config.fee_percent / 100.0);
        (gross, fee, gross - fee)
    }

    fn summarize(&self, state: WalkState) -> PriceSeriesReport {
        let remaining_pct = if self.quantity > 0.0 {
            state.remaining_qty / self.quantity * 100.0
        } else {
            0.0
        };
        let return_pct = if self.total_cost > 0.0 {
            state.realized_pnl.to_f64() / self.total_cost * 100.0
        } else {
            0.0
        };
        let status = if state.has_position() {
            WalkStatus::Open
        } else {
            WalkStatus::Completed
        };

        PriceSeriesReport {
            events: state.events,
            summary: WalkSummary {
                total_realized_pnl: state.realized_pnl,
                total_fees: state.total_fees,
                remaining_qty: state.remaining_qty,
                remaining_pct,
                return_pct,
                status,
            },
        }
    }
}

/// Walk `prices` against `config` for a position of `quantity` units.
///
/// Rejects degenerate configurations and non-finite prices before
/// evaluating any tick.
pub fn walk(
    config: &StrategyConfig,
    quantity: f64,
    prices: &[f64],
) -> Result<PriceSeriesReport, SimulationError> {
    config.validate()?;
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(SimulationError::InvalidConfig(format!(
            "quantity must be positive, got {}",
            quantity
        )));
    }

    if let Some((tick, &price)) = prices.iter().enumerate().find(|(_, p)| !p.is_finite()) {
        return Err(SimulationError::InvalidPrice { tick, price });
    }

    let walker = Walker {
        config,
        quantity,
        total_cost: config.entry_price * quantity,
    };
    let mut state = WalkState::new(quantity, config.gradual_stages.len());

    for (tick, &price) in prices.iter().enumerate() {
        if walker.step(&mut state, tick, price)?.is_break() {
            break;
        }
    }

    let report = walker.summarize(state);
    info!(
        "Price walk finished: {} events, realized {} ({:+.2}%), status {}",
        report.events.len(),
        report.summary.total_realized_pnl.round_dp(2),
        report.summary.return_pct,
        report.summary.status
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn config(stages: &[(f64, f64)]) -> StrategyConfig {
        let base = StrategyConfig {
            entry_price: 100.0,
            tp_percent: 10.0,
            sl_percent: 5.0,
            fee_percent: 0.5,
            ..Default::default()
        };
        if stages.is_empty() {
            base
        } else {
            base.with_gradual_stages(
                stages
                    .iter()
                    .map(|&(sell, tp)| GradualStage::new(sell, tp))
                    .collect(),
            )
        }
    }

    #[test]
    fn test_stop_loss_preempts_and_terminates() {
        let prices: Vec<f64> = (0..10).map(|i| 100.0 * (1.0 - i as f64 * 0.01)).collect();
        let report = walk(&config(&[]), 2.0, &prices).unwrap();

        assert_eq!(report.events.len(), 1);
        let event = &report.events[0];
        assert_eq!(event.kind, EventKind::StopLoss);
        assert_eq!(event.tick, 5);
        assert_abs_diff_eq!(event.sell_qty, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(event.sell_pct, 100.0, epsilon = 1e-9);

        // 2 * 95 = 190 proceeds, 200 cost, 0.95 fee
        assert_abs_diff_eq!(event.gross_pnl, -10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(event.fee, 0.95, epsilon = 1e-9);
        assert_abs_diff_eq!(event.net_pnl, -10.95, epsilon = 1e-9);

        assert!(report.is_completed());
        assert_eq!(report.summary.remaining_qty, 0.0);
    }

    #[test]
    fn test_single_take_profit() {
        let prices = [100.0, 105.0, 110.0, 120.0];
        let report = walk(&config(&[]), 1.0, &prices).unwrap();

        assert_eq!(report.event_kinds(), vec![EventKind::TakeProfit]);
        let event = &report.events[0];
        assert_eq!(event.tick, 2);
        assert_abs_diff_eq!(event.gross_pnl, 10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(event.net_pnl, 10.0 - 0.55, epsilon = 1e-9);
        assert_abs_diff_eq!(report.summary.return_pct, 9.45, epsilon = 1e-9);
        assert_eq!(report.summary.status, WalkStatus::Completed);
    }

    #[test]
    fn test_one_stage_per_tick_on_gap() {
        // Price gaps straight past both thresholds, then keeps rising
        let prices = [100.0, 125.0, 126.0];
        let report = walk(&config(&[(50.0, 10.0), (50.0, 20.0)]), 1.0, &prices).unwrap();

        assert_eq!(
            report.event_kinds(),
            vec![EventKind::TakeProfitLot(1), EventKind::TakeProfitLot(2)]
        );
        assert_eq!(report.events[0].tick, 1);
        assert_eq!(report.events[1].tick, 2);
        assert_eq!(report.events[1].tp_pct, Some(20.0));
        assert!(report.is_completed());
    }

    #[test]
    fn test_gap_on_last_tick_leaves_stage_pending() {
        let prices = [100.0, 125.0];
        let report = walk(&config(&[(50.0, 10.0), (50.0, 20.0)]), 1.0, &prices).unwrap();

        assert_eq!(report.event_kinds(), vec![EventKind::TakeProfitLot(1)]);
        assert_eq!(report.summary.status, WalkStatus::Open);
        assert_abs_diff_eq!(report.summary.remaining_qty, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(report.summary.remaining_pct, 50.0, epsilon = 1e-9);
    }

    #[test]
    fn test_stop_loss_after_partial_take_profit() {
        let prices = [100.0, 110.0, 104.0, 94.0, 130.0];
        let report = walk(&config(&[(40.0, 10.0), (60.0, 20.0)]), 1.0, &prices).unwrap();

        assert_eq!(
            report.event_kinds(),
            vec![EventKind::TakeProfitLot(1), EventKind::StopLoss]
        );
        let sl = &report.events[1];
        assert_eq!(sl.tick, 3);
        assert_abs_diff_eq!(sl.sell_qty, 0.6, epsilon = 1e-12);
        assert_abs_diff_eq!(sl.sell_pct, 60.0, epsilon = 1e-9);
        // 0.6 * 94 = 56.4 proceeds against 60 cost
        assert_abs_diff_eq!(sl.gross_pnl, -3.6, epsilon = 1e-9);
        assert!(report.is_completed());
    }

    #[test]
    fn test_flat_series_stays_open() {
        let prices = [100.0, 101.0, 99.0, 104.0, 96.0];
        let report = walk(&config(&[(50.0, 10.0), (50.0, 20.0)]), 1.0, &prices).unwrap();

        assert!(report.events.is_empty());
        assert_eq!(report.summary.status, WalkStatus::Open);
        assert_eq!(report.summary.total_realized_pnl, Money::ZERO);
        assert_eq!(report.summary.return_pct, 0.0);
        assert_abs_diff_eq!(report.summary.remaining_pct, 100.0, epsilon = 1e-12);
    }

    #[test]
    fn test_over_allocated_stages_never_go_negative() {
        let prices = [100.0, 111.0, 121.0, 131.0];
        let report = walk(&config(&[(70.0, 10.0), (70.0, 20.0), (10.0, 30.0)]), 1.0, &prices).unwrap();

        assert_eq!(report.events.len(), 2);
        assert_abs_diff_eq!(report.events[1].sell_qty, 0.3, epsilon = 1e-12);
        assert_eq!(report.summary.remaining_qty, 0.0);
        assert!(report.is_completed());
    }

    #[test]
    fn test_empty_series() {
        let report = walk(&config(&[]), 1.0, &[]).unwrap();
        assert!(report.events.is_empty());
        assert_eq!(report.summary.status, WalkStatus::Open);
    }

    #[test]
    fn test_remaining_quantity_never_increases() {
        let stages = config(&[(30.0, 10.0), (30.0, 15.0), (20.0, 20.0), (20.0, 25.0)]);
        let prices = [100.0, 111.0, 108.0, 116.0, 121.0, 119.0, 126.0, 130.0];

        let remaining: Vec<f64> = (0..=prices.len())
            .map(|n| walk(&stages, 0.44, &prices[..n]).unwrap().summary.remaining_qty)
            .collect();

        for pair in remaining.windows(2) {
            assert!(pair[1] <= pair[0], "remaining went up: {:?}", remaining);
        }
        assert_abs_diff_eq!(remaining[0], 0.44, epsilon = 1e-12);
        assert!(remaining[prices.len()] <= NEGLIGIBLE_QTY);
    }

    #[test]
    fn test_walk_is_repeatable() {
        let stages = config(&[(50.0, 10.0), (50.0, 20.0)]);
        let prices = [100.0, 112.0, 103.0, 121.0];

        let first = walk(&stages, 1.5, &prices).unwrap();
        let second = walk(&stages, 1.5, &prices).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_rejects_pnl_beyond_decimal_range() {
        let huge = StrategyConfig {
            entry_price: 1e20,
            ..config(&[])
        };
        let err = walk(&huge, 1e10, &[1e20, 1.2e20]).unwrap_err();
        assert!(matches!(err, SimulationError::AmountOutOfRange { tick: 1, .. }));
    }

    #[test]
    fn test_rejects_non_finite_price() {
        let err = walk(&config(&[]), 1.0, &[100.0, f64::NAN]).unwrap_err();
        assert!(matches!(err, SimulationError::InvalidPrice { tick: 1, .. }));
    }
}
