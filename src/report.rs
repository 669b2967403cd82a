//! Console rendering of simulation results
//!
//! Every renderer returns a `String` so callers decide where it goes.

use itertools::Itertools;
use std::fmt::Write;

use crate::{LotResult, Money, PriceSeriesReport, SimulationResult, StrategyConfig};

const WIDTH: usize = 60;

fn heavy_rule() -> String {
    "=".repeat(WIDTH)
}

fn light_rule() -> String {
    "-".repeat(WIDTH)
}

fn marker(value: f64) -> &'static str {
    if value >= 0.0 {
        "✓"
    } else {
        "✗"
    }
}

/// Plan summary shown before any scenario
pub fn render_header(config: &StrategyConfig, quantity: f64) -> String {
    let mut out = String::new();
    let total_cost = config.entry_price * quantity;

    let _ = writeln!(out, "\n{}", heavy_rule());
    let _ = writeln!(out, "  SWING TRADE SIMULATOR");
    let _ = writeln!(out, "{}", heavy_rule());
    let _ = writeln!(out, "  Token:         {}", config.token);
    let _ = writeln!(out, "  Exchange:      {}", config.exchange);
    let _ = writeln!(out, "  Entry price:   ${:.2}", config.entry_price);
    let _ = writeln!(out, "  Quantity:      {:.6}", quantity);
    let _ = writeln!(out, "  Total cost:    ${:.2}", total_cost);
    let _ = writeln!(out, "  TP:            +{}%", config.tp_percent);
    let _ = writeln!(out, "  SL:            -{}%", config.sl_percent);
    let _ = writeln!(out, "  Fee:           {}%", config.fee_percent);
    let _ = writeln!(out, "  Check:         every {}min", config.check_interval_min);
    if config.is_gradual() {
        let lots = config
            .gradual_stages
            .iter()
            .map(|s| format!("{:.0}", s.sell_percent))
            .join("/");
        let tps = config
            .gradual_stages
            .iter()
            .map(|s| format!("+{}%", s.tp_percent))
            .join("/");
        let _ = writeln!(out, "  Gradual:       [{}] -> TPs [{}]", lots, tps);
    }
    let _ = writeln!(out, "{}", heavy_rule());

    out
}

fn render_lot(out: &mut String, lot: &LotResult, fee_percent: f64) {
    let label = if lot.is_stop_loss() {
        format!("SL {}%", lot.tp_percent)
    } else {
        format!("TP +{}%", lot.tp_percent)
    };

    let _ = writeln!(
        out,
        "\n  Lot {} | {:.0}% | ${:.2} | {}",
        lot.lot_index + 1,
        lot.sell_percent,
        lot.cost,
        label
    );
    let _ = writeln!(out, "  ├ Sells at:     ${:.2}", lot.sell_price);
    let _ = writeln!(out, "  ├ Receives:     ${:.2}", lot.gross_value);
    let _ = writeln!(out, "  ├ Gross profit: ${:+.2}", lot.gross_profit);
    let _ = writeln!(out, "  ├ Fee {}%:     -${:.2}", fee_percent, lot.fee);
    let _ = writeln!(
        out,
        "  └ Net:          ${:+.2} {} ({:+.2}%)",
        lot.net_profit,
        marker(lot.net_profit),
        lot.net_return_pct
    );
}

/// Per-lot breakdown and totals of one scenario
pub fn render_result(result: &SimulationResult) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "\n{}", light_rule());
    let _ = writeln!(out, "  {}", result.scenario);
    let _ = writeln!(out, "{}", light_rule());

    for lot in &result.lots {
        render_lot(&mut out, lot, result.config.fee_percent);
    }

    let _ = writeln!(out, "\n  {}", "-".repeat(50));
    let _ = writeln!(
        out,
        "  Net profit:      ${:+.2} {}",
        result.total_net_profit,
        marker(result.total_net_profit)
    );
    let _ = writeln!(out, "  Return:          {:+.2}%", result.total_net_return_pct);
    let _ = writeln!(out, "  Total fees:      ${:.2}", result.total_fees);
    if let (Some(loss), Some(pct)) = (result.sl_loss, result.sl_return_pct) {
        let _ = writeln!(out, "  Max loss (SL):   ${:.2} ({:+.2}%)", loss, pct);
    }
    let _ = writeln!(out, "  Risk/Reward:     1:{:.1}", result.risk_reward_ratio);
    let _ = writeln!(out, "  {}", "-".repeat(50));

    out
}

/// Side-by-side single vs gradual figures
pub fn render_comparison(single: &SimulationResult, gradual: &SimulationResult) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "\n{}", heavy_rule());
    let _ = writeln!(out, "  COMPARISON");
    let _ = writeln!(out, "{}", heavy_rule());
    let _ = writeln!(out, "  {:20} {:>16}  {:>16}", "", "Single Sell", "Gradual");
    let _ = writeln!(out, "  {}", "-".repeat(56));
    let _ = writeln!(
        out,
        "  {:20} ${:>+15.2}  ${:>+15.2}",
        "Net profit", single.total_net_profit, gradual.total_net_profit
    );
    let _ = writeln!(
        out,
        "  {:20} {:>+15.2}%  {:>+15.2}%",
        "Return", single.total_net_return_pct, gradual.total_net_return_pct
    );
    let _ = writeln!(
        out,
        "  {:20} ${:>15.2}  ${:>15.2}",
        "Fees", single.total_fees, gradual.total_fees
    );
    let _ = writeln!(
        out,
        "  {:20} {:>16}  {:>16}",
        "Risk/Reward",
        format!("1:{:.1}", single.risk_reward_ratio),
        format!("1:{:.1}", gradual.risk_reward_ratio)
    );

    if single.total_net_profit > 0.0 {
        let diff = gradual.total_net_profit - single.total_net_profit;
        let diff_pct = diff / single.total_net_profit * 100.0;
        let _ = writeln!(
            out,
            "\n  Gradual yields ${:+.2} ({:+.0}%) versus single sell",
            diff, diff_pct
        );
    }
    let _ = writeln!(out, "{}", heavy_rule());

    out
}

/// One line per partial scenario
pub fn render_partials(partials: &[SimulationResult]) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "\n{}", heavy_rule());
    let _ = writeln!(out, "  PARTIAL SCENARIOS (partial TP + SL on remainder)");
    let _ = writeln!(out, "{}", heavy_rule());

    for partial in partials {
        let tp_lots: Vec<&LotResult> = partial.lots.iter().filter(|l| !l.is_stop_loss()).collect();
        let sold_pct: f64 = tp_lots.iter().map(|l| l.sell_percent).sum();
        let _ = writeln!(
            out,
            "\n  {} stage(s) sold ({:.0}%) + SL on remainder:",
            tp_lots.len(),
            sold_pct
        );
        let _ = writeln!(
            out,
            "  └ Result: ${:+.2} ({:+.2}%) {}",
            partial.total_net_profit,
            partial.total_net_return_pct,
            marker(partial.total_net_profit)
        );
    }

    out
}

/// Event log of a price walk followed by its summary
pub fn render_price_events(title: &str, report: &PriceSeriesReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "\n{}", heavy_rule());
    let _ = writeln!(out, "  BACKTEST - {}", title);
    let _ = writeln!(out, "{}", heavy_rule());

    for e in &report.events {
        let _ = writeln!(
            out,
            "  Tick {:3} | ${:.2} ({:+.1}%) | {:12} | ${:+.2} {}",
            e.tick,
            e.price,
            e.change_pct,
            e.kind.to_string(),
            e.net_pnl,
            marker(e.net_pnl)
        );
    }

    let s = &report.summary;
    let _ = writeln!(out, "\n  {}", "-".repeat(50));
    let _ = writeln!(out, "  SUMMARY:");
    let _ = writeln!(out, "  ├ Realized P&L:  ${}", signed(s.total_realized_pnl.round_dp(2)));
    let _ = writeln!(out, "  ├ Total fees:    ${}", s.total_fees.round_dp(2));
    let _ = writeln!(out, "  ├ Remaining:     {:.1}%", s.remaining_pct);
    let _ = writeln!(out, "  ├ Return:        {:+.2}%", s.return_pct);
    let _ = writeln!(out, "  └ Status:        {}", s.status);

    out
}

fn signed(value: Money) -> String {
    if value.is_negative() {
        value.to_string()
    } else {
        format!("+{}", value)
    }
}
