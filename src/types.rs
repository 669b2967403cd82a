//! Core data types used across the simulator

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

use crate::StrategyConfig;

/// Errors surfaced by the simulation engine
#[derive(Debug, Error, PartialEq)]
pub enum SimulationError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("price at tick {tick} is not a finite number: {price}")]
    InvalidPrice { tick: usize, price: f64 },

    #[error("stage sell percentages sum to {total}% (must be 100%)")]
    StageAllocation { total: f64 },

    #[error("amount at tick {tick} is outside the decimal range: {value}")]
    AmountOutOfRange { tick: usize, value: f64 },
}

/// One executed (or hypothetically executed) slice of the position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotResult {
    pub lot_index: usize,
    /// Share of the original position, in percent
    pub sell_percent: f64,
    /// TP threshold of the slice. A slice closed by the stop-loss carries
    /// the negative SL percent instead.
    pub tp_percent: f64,
    pub quantity: f64,
    pub sell_price: f64,
    pub gross_value: f64,
    /// Cost basis allocated to this slice
    pub cost: f64,
    pub gross_profit: f64,
    pub fee: f64,
    pub net_profit: f64,
    /// Net profit relative to this slice's own cost basis
    pub net_return_pct: f64,
}

impl LotResult {
    pub fn is_stop_loss(&self) -> bool {
        self.tp_percent < 0.0
    }

    pub fn is_profitable(&self) -> bool {
        self.net_profit >= 0.0
    }
}

/// Outcome of one scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub scenario: String,
    pub config: StrategyConfig,
    pub quantity: f64,
    pub total_cost: f64,
    pub lots: Vec<LotResult>,
    pub total_gross_profit: f64,
    pub total_fees: f64,
    pub total_net_profit: f64,
    /// Net profit relative to the *total* cost basis
    pub total_net_return_pct: f64,
    /// Net loss if the whole position hit the stop-loss
    pub sl_loss: Option<f64>,
    pub sl_return_pct: Option<f64>,
    /// |net profit / sl loss|, 0 when the stop-loss risks nothing
    pub risk_reward_ratio: f64,
}

impl SimulationResult {
    pub(crate) fn empty(
        scenario: impl Into<String>,
        config: &StrategyConfig,
        quantity: f64,
        total_cost: f64,
    ) -> Self {
        Self {
            scenario: scenario.into(),
            config: config.clone(),
            quantity,
            total_cost,
            lots: Vec::new(),
            total_gross_profit: 0.0,
            total_fees: 0.0,
            total_net_profit: 0.0,
            total_net_return_pct: 0.0,
            sl_loss: None,
            sl_return_pct: None,
            risk_reward_ratio: 0.0,
        }
    }

    pub(crate) fn push_lot(&mut self, lot: LotResult) {
        self.total_gross_profit += lot.gross_profit;
        self.total_fees += lot.fee;
        self.total_net_profit += lot.net_profit;
        self.lots.push(lot);
    }

    /// Cost basis covered by the lots
    pub fn allocated_cost(&self) -> f64 {
        self.lots.iter().map(|l| l.cost).sum()
    }

    /// Percent of the position covered by the lots
    pub fn sold_percent(&self) -> f64 {
        self.lots.iter().map(|l| l.sell_percent).sum()
    }
}

// ============================================================================
// Price-series event log
// ============================================================================

/// What happened at a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    StopLoss,
    /// Gradual stage fired; carries the 1-based stage number
    TakeProfitLot(usize),
    TakeProfit,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::StopLoss => write!(f, "STOP_LOSS"),
            EventKind::TakeProfitLot(n) => write!(f, "TP_LOT_{}", n),
            EventKind::TakeProfit => write!(f, "TAKE_PROFIT"),
        }
    }
}

impl Serialize for EventKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// One sale recorded while walking a price series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceEvent {
    pub tick: usize,
    pub price: f64,
    /// Percent change from entry
    pub change_pct: f64,
    #[serde(rename = "event")]
    pub kind: EventKind,
    pub sell_qty: f64,
    /// Sold quantity as percent of the original position
    pub sell_pct: f64,
    /// Threshold of the stage that fired (gradual events only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tp_pct: Option<f64>,
    pub gross_pnl: f64,
    pub fee: f64,
    pub net_pnl: f64,
}

/// Position state at the end of a walk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WalkStatus {
    /// Position fully liquidated
    Completed,
    /// Some quantity is still held
    Open,
}

impl fmt::Display for WalkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalkStatus::Completed => write!(f, "COMPLETED"),
            WalkStatus::Open => write!(f, "OPEN"),
        }
    }
}

/// Closing SUMMARY entry of the event log
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalkSummary {
    pub total_realized_pnl: Money,
    pub total_fees: Money,
    pub remaining_qty: f64,
    pub remaining_pct: f64,
    /// Realized net P&L relative to the total cost basis
    pub return_pct: f64,
    pub status: WalkStatus,
}

/// Event log of one walk: the sales in tick order, then the summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeriesReport {
    pub events: Vec<PriceEvent>,
    pub summary: WalkSummary,
}

impl PriceSeriesReport {
    pub fn is_completed(&self) -> bool {
        self.summary.status == WalkStatus::Completed
    }

    pub fn event_kinds(&self) -> Vec<EventKind> {
        self.events.iter().map(|e| e.kind).collect()
    }
}

// ============================================================================
// Money Type - Precise Decimal Arithmetic for Running Totals
// ============================================================================

use rust_decimal::Decimal;
use std::ops::{Add, AddAssign};

/// Money type for precise decimal accumulation of realized P&L and fees.
///
/// Wraps `rust_decimal::Decimal` so that a long run of partial fills sums
/// without floating-point drift.
///
/// # Example
/// ```
/// use swing_simulator::Money;
/// let mut total = Money::ZERO;
/// total += Money::from_f64(0.1);
/// total += Money::from_f64(0.2);
/// assert_eq!(total, Money::from_f64(0.3));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(#[serde(with = "rust_decimal::serde::str")] Decimal);

impl Money {
    /// Zero value
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Create from f64
    /// Note: This conversion may lose precision for values with many decimal places
    pub fn from_f64(value: f64) -> Self {
        Money(Decimal::try_from(value).unwrap_or_else(|_| {
            // Fallback for extreme values (NaN, Infinity)
            if value.is_nan() || value.is_infinite() {
                Decimal::ZERO
            } else {
                Decimal::from_f64_retain(value).unwrap_or(Decimal::ZERO)
            }
        }))
    }

    /// Exact conversion, `None` for NaN, infinities and magnitudes past
    /// `Decimal::MAX`
    pub fn try_from_f64(value: f64) -> Option<Self> {
        Decimal::try_from(value).ok().map(Money)
    }

    /// `None` on overflow
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Money)
    }

    /// Convert to f64 for percentage calculations
    pub fn to_f64(self) -> f64 {
        use rust_decimal::prelude::ToPrimitive;
        self.0.to_f64().unwrap_or(0.0)
    }

    pub fn is_negative(self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Round to specified decimal places
    pub fn round_dp(self, dp: u32) -> Self {
        Money(self.0.round_dp(dp))
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}
